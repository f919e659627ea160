//! Repository seam between the engine and MySQL.
//!
//! Reads are always bounded by an employee and a date range. Every write
//! that changes a status is conditional on the status the caller last saw.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::AppResult;
use crate::model::attendance::AttendanceEvent;
use crate::model::employee::Employee;
use crate::model::leave_request::{LeaveBalance, LeaveRequest, LeaveStatus, LeaveTypeCode};
use crate::model::summary::{MonthlySummary, SummaryStatus};
use crate::model::timesheet::Timesheet;
use crate::service::calculator::DateRange;

#[cfg(test)]
pub mod memory;
pub mod mysql;

pub use mysql::MySqlStore;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SummaryFilter {
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub status: Option<SummaryStatus>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeaveFilter {
    pub employee_id: Option<u64>,
    pub status: Option<LeaveStatus>,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLeaveRequest {
    pub employee_id: u64,
    pub leave_type: LeaveTypeCode,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub number_of_days: u32,
}

/// Days to add to `used_days` of one balance row.
#[derive(Debug, Clone, PartialEq)]
pub struct BalanceDebit {
    pub employee_id: u64,
    pub leave_type: LeaveTypeCode,
    pub year: i32,
    pub days: u32,
}

/// A move out of `pending`. Applied together with `debit`, if any, or not at all.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaveStatusUpdate {
    pub to: LeaveStatus,
    pub actor_id: Option<u64>,
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
    /// Restricts the update to requests owned by this employee
    pub requester: Option<u64>,
    pub debit: Option<BalanceDebit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveUpdateOutcome {
    Applied,
    /// The request was not pending (or not owned by `requester`) any more
    NotPending,
    MissingBalance,
    InsufficientBalance,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    async fn fetch_attendance(
        &self,
        employee_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<AttendanceEvent>>;

    /// Approved requests whose range intersects `range`.
    async fn fetch_approved_leave(
        &self,
        employee_id: u64,
        range: DateRange,
    ) -> AppResult<Vec<LeaveRequest>>;

    async fn fetch_timesheets(&self, employee_id: u64, range: DateRange)
    -> AppResult<Vec<Timesheet>>;

    async fn fetch_leave_balance(&self, employee_id: u64, year: i32)
    -> AppResult<Vec<LeaveBalance>>;

    async fn fetch_employee(&self, employee_id: u64) -> AppResult<Option<Employee>>;

    async fn list_active_employee_ids(&self) -> AppResult<Vec<u64>>;

    async fn find_summary(
        &self,
        employee_id: u64,
        month: u32,
        year: i32,
    ) -> AppResult<Option<MonthlySummary>>;

    async fn get_summary(&self, id: u64) -> AppResult<Option<MonthlySummary>>;

    async fn list_summaries(&self, filter: SummaryFilter) -> AppResult<(Vec<MonthlySummary>, i64)>;

    /// Returns the new id, or `None` when the (employee, month, year) key is
    /// already taken.
    async fn insert_summary(&self, summary: &MonthlySummary) -> AppResult<Option<u64>>;

    /// Overwrites the row only while its status still equals `expected`.
    async fn update_summary_if(
        &self,
        summary: &MonthlySummary,
        expected: SummaryStatus,
    ) -> AppResult<bool>;

    /// Writes only the status and signature columns, while the status still
    /// equals `expected`. Computed figures are left as stored.
    async fn update_summary_signatures_if(
        &self,
        summary: &MonthlySummary,
        expected: SummaryStatus,
    ) -> AppResult<bool>;

    async fn insert_leave_request(&self, request: &NewLeaveRequest) -> AppResult<u64>;

    async fn get_leave_request(&self, id: u64) -> AppResult<Option<LeaveRequest>>;

    async fn list_leave_requests(&self, filter: LeaveFilter)
    -> AppResult<(Vec<LeaveRequest>, i64)>;

    /// Moves a pending request to `update.to`, debiting the balance in the
    /// same transaction.
    async fn update_leave_request_status(
        &self,
        id: u64,
        update: &LeaveStatusUpdate,
    ) -> AppResult<LeaveUpdateOutcome>;
}
