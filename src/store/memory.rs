//! In-process `Store` used by the service tests.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AppResult;
use crate::model::attendance::AttendanceEvent;
use crate::model::employee::{Employee, HoursSource};
use crate::model::leave_request::{LeaveBalance, LeaveRequest, LeaveStatus};
use crate::model::summary::{MonthlySummary, SummaryStatus};
use crate::model::timesheet::Timesheet;
use crate::service::calculator::DateRange;

use super::{
    LeaveFilter, LeaveStatusUpdate, LeaveUpdateOutcome, NewLeaveRequest, Store, SummaryFilter,
};

#[derive(Default)]
struct Tables {
    employees: Vec<Employee>,
    attendance: Vec<AttendanceEvent>,
    timesheets: Vec<Timesheet>,
    leave_requests: Vec<LeaveRequest>,
    balances: Vec<LeaveBalance>,
    summaries: Vec<MonthlySummary>,
    failing_employees: Vec<u64>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_employee(&self, id: u64, hours_source: HoursSource) {
        self.tables.lock().unwrap().employees.push(Employee {
            id,
            employee_code: format!("EMP-{id:03}"),
            first_name: "Test".into(),
            last_name: format!("Employee {id}"),
            status: "active".into(),
            hours_source,
        });
    }

    pub fn add_attendance(&self, employee_id: u64, check_in: &str, check_out: Option<&str>) {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.attendance.len() as u64 + 1;
        tables.attendance.push(AttendanceEvent {
            id,
            employee_id,
            check_in_time: check_in.parse().unwrap(),
            check_out_time: check_out.map(|t| t.parse().unwrap()),
        });
    }

    pub fn add_timesheet(&self, row: Timesheet) {
        self.tables.lock().unwrap().timesheets.push(row);
    }

    pub fn add_leave(&self, request: LeaveRequest) {
        self.tables.lock().unwrap().leave_requests.push(request);
    }

    pub fn add_balance(&self, balance: LeaveBalance) {
        self.tables.lock().unwrap().balances.push(balance);
    }

    /// Every read for this employee fails with a database error.
    pub fn fail_for(&self, employee_id: u64) {
        self.tables.lock().unwrap().failing_employees.push(employee_id);
    }

    pub fn balance(&self, employee_id: u64, year: i32) -> Vec<LeaveBalance> {
        let tables = self.tables.lock().unwrap();
        tables
            .balances
            .iter()
            .filter(|b| b.employee_id == employee_id && b.year == year)
            .cloned()
            .collect()
    }

    pub fn summary_count(&self) -> usize {
        self.tables.lock().unwrap().summaries.len()
    }

    fn check(&self, employee_id: u64) -> AppResult<()> {
        if self.tables.lock().unwrap().failing_employees.contains(&employee_id) {
            return Err(sqlx::Error::PoolTimedOut.into());
        }
        Ok(())
    }
}

fn page<T: Clone>(rows: Vec<T>, limit: u32, offset: u32) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    let limit = if limit == 0 { usize::MAX } else { limit as usize };
    let page = rows.into_iter().skip(offset as usize).take(limit).collect();
    (page, total)
}

#[async_trait]
impl Store for MemoryStore {
    async fn fetch_attendance(
        &self,
        employee_id: u64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> AppResult<Vec<AttendanceEvent>> {
        self.check(employee_id)?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .attendance
            .iter()
            .filter(|e| e.employee_id == employee_id && e.check_in_time >= from && e.check_in_time < to)
            .cloned()
            .collect())
    }

    async fn fetch_approved_leave(
        &self,
        employee_id: u64,
        range: DateRange,
    ) -> AppResult<Vec<LeaveRequest>> {
        self.check(employee_id)?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .leave_requests
            .iter()
            .filter(|r| {
                r.employee_id == employee_id
                    && r.status == LeaveStatus::Approved
                    && r.start_date <= range.end()
                    && r.end_date >= range.start()
            })
            .cloned()
            .collect())
    }

    async fn fetch_timesheets(
        &self,
        employee_id: u64,
        range: DateRange,
    ) -> AppResult<Vec<Timesheet>> {
        self.check(employee_id)?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .timesheets
            .iter()
            .filter(|t| t.staff_id == employee_id && range.contains(t.work_date))
            .cloned()
            .collect())
    }

    async fn fetch_leave_balance(&self, employee_id: u64, year: i32) -> AppResult<Vec<LeaveBalance>> {
        Ok(self.balance(employee_id, year))
    }

    async fn fetch_employee(&self, employee_id: u64) -> AppResult<Option<Employee>> {
        self.check(employee_id)?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.employees.iter().find(|e| e.id == employee_id).cloned())
    }

    async fn list_active_employee_ids(&self) -> AppResult<Vec<u64>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .employees
            .iter()
            .filter(|e| e.status == "active")
            .map(|e| e.id)
            .collect())
    }

    async fn find_summary(
        &self,
        employee_id: u64,
        month: u32,
        year: i32,
    ) -> AppResult<Option<MonthlySummary>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .summaries
            .iter()
            .find(|s| s.employee_id == employee_id && s.month == month && s.year == year)
            .cloned())
    }

    async fn get_summary(&self, id: u64) -> AppResult<Option<MonthlySummary>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.summaries.iter().find(|s| s.id == id).cloned())
    }

    async fn list_summaries(&self, filter: SummaryFilter) -> AppResult<(Vec<MonthlySummary>, i64)> {
        let tables = self.tables.lock().unwrap();
        let rows: Vec<MonthlySummary> = tables
            .summaries
            .iter()
            .filter(|s| filter.month.is_none_or(|m| s.month == m))
            .filter(|s| filter.year.is_none_or(|y| s.year == y))
            .filter(|s| filter.status.is_none_or(|st| s.status == st))
            .cloned()
            .collect();
        Ok(page(rows, filter.limit, filter.offset))
    }

    async fn insert_summary(&self, summary: &MonthlySummary) -> AppResult<Option<u64>> {
        let mut tables = self.tables.lock().unwrap();
        let taken = tables.summaries.iter().any(|s| {
            s.employee_id == summary.employee_id && s.month == summary.month && s.year == summary.year
        });
        if taken {
            return Ok(None);
        }

        let id = tables.summaries.len() as u64 + 1;
        let mut stored = summary.clone();
        stored.id = id;
        tables.summaries.push(stored);
        Ok(Some(id))
    }

    async fn update_summary_if(
        &self,
        summary: &MonthlySummary,
        expected: SummaryStatus,
    ) -> AppResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        match tables
            .summaries
            .iter_mut()
            .find(|s| s.id == summary.id && s.status == expected)
        {
            Some(row) => {
                *row = summary.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_summary_signatures_if(
        &self,
        summary: &MonthlySummary,
        expected: SummaryStatus,
    ) -> AppResult<bool> {
        let mut tables = self.tables.lock().unwrap();
        match tables
            .summaries
            .iter_mut()
            .find(|s| s.id == summary.id && s.status == expected)
        {
            Some(row) => {
                row.status = summary.status;
                row.staff_signature = summary.staff_signature.clone();
                row.staff_signed_at = summary.staff_signed_at;
                row.admin_signature = summary.admin_signature.clone();
                row.admin_approved_at = summary.admin_approved_at;
                row.admin_remarks = summary.admin_remarks.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_leave_request(&self, request: &NewLeaveRequest) -> AppResult<u64> {
        let mut tables = self.tables.lock().unwrap();
        let id = tables.leave_requests.len() as u64 + 1;
        tables.leave_requests.push(LeaveRequest {
            id,
            employee_id: request.employee_id,
            leave_type: request.leave_type,
            start_date: request.start_date,
            end_date: request.end_date,
            number_of_days: request.number_of_days,
            status: LeaveStatus::Pending,
            rejection_reason: None,
            approved_by: None,
            approved_at: None,
            created_at: Some(Utc::now()),
        });
        Ok(id)
    }

    async fn get_leave_request(&self, id: u64) -> AppResult<Option<LeaveRequest>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.leave_requests.iter().find(|r| r.id == id).cloned())
    }

    async fn list_leave_requests(&self, filter: LeaveFilter) -> AppResult<(Vec<LeaveRequest>, i64)> {
        let tables = self.tables.lock().unwrap();
        let rows: Vec<LeaveRequest> = tables
            .leave_requests
            .iter()
            .filter(|r| filter.employee_id.is_none_or(|id| r.employee_id == id))
            .filter(|r| filter.status.is_none_or(|st| r.status == st))
            .cloned()
            .collect();
        Ok(page(rows, filter.limit, filter.offset))
    }

    async fn update_leave_request_status(
        &self,
        id: u64,
        update: &LeaveStatusUpdate,
    ) -> AppResult<LeaveUpdateOutcome> {
        let mut tables = self.tables.lock().unwrap();
        let Tables {
            leave_requests,
            balances,
            ..
        } = &mut *tables;

        let Some(request) = leave_requests.iter_mut().find(|r| {
            r.id == id
                && r.status == LeaveStatus::Pending
                && update.requester.is_none_or(|owner| r.employee_id == owner)
        }) else {
            return Ok(LeaveUpdateOutcome::NotPending);
        };

        if let Some(debit) = &update.debit {
            let Some(balance) = balances.iter_mut().find(|b| {
                b.employee_id == debit.employee_id
                    && b.leave_type == debit.leave_type
                    && b.year == debit.year
            }) else {
                return Ok(LeaveUpdateOutcome::MissingBalance);
            };
            if !balance.covers(debit.days) {
                return Ok(LeaveUpdateOutcome::InsufficientBalance);
            }
            balance.used_days += debit.days;
        }

        request.status = update.to;
        if update.actor_id.is_some() {
            request.approved_by = update.actor_id;
        }
        if update.to == LeaveStatus::Approved {
            request.approved_at = Some(update.at);
        }
        if update.reason.is_some() {
            request.rejection_reason = update.reason.clone();
        }
        Ok(LeaveUpdateOutcome::Applied)
    }
}
