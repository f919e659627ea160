use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LeaveTypeCode {
    Annual,
    Sick,
    Unpaid,
}

impl LeaveTypeCode {
    /// Capped types draw down a yearly balance; unpaid leave never does.
    pub fn is_capped(self) -> bool {
        matches!(self, LeaveTypeCode::Annual | LeaveTypeCode::Sick)
    }

    pub fn leave_type(self) -> LeaveType {
        let name = match self {
            LeaveTypeCode::Annual => "Annual Leave",
            LeaveTypeCode::Sick => "Sick Leave",
            LeaveTypeCode::Unpaid => "Unpaid Leave",
        };
        LeaveType {
            code: self,
            name: name.to_string(),
            capped: self.is_capped(),
        }
    }
}

/// Display data for a leave type, as shown next to a balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveType {
    pub code: LeaveTypeCode,
    pub name: String,
    pub capped: bool,
}

/// Wire values are lowercase and must stay that way.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl LeaveStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, LeaveStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "employee_id": 1000,
    "leave_type": "ANNUAL",
    "start_date": "2025-03-07",
    "end_date": "2025-03-10",
    "number_of_days": 2,
    "status": "pending",
    "rejection_reason": null,
    "approved_by": null,
    "approved_at": null,
    "created_at": "2025-03-01T08:00:00Z"
}))]
pub struct LeaveRequest {
    pub id: u64,
    pub employee_id: u64,
    pub leave_type: LeaveTypeCode,
    #[schema(example = "2025-03-07", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2025-03-10", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    /// Business days in the range, computed at submission
    pub number_of_days: u32,
    pub status: LeaveStatus,
    pub rejection_reason: Option<String>,
    pub approved_by: Option<u64>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub approved_at: Option<DateTime<Utc>>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Entitlement for one (employee, leave type, year).
///
/// `total_days` is empty for uncapped types, which have no upper bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LeaveBalance {
    pub employee_id: u64,
    pub leave_type: LeaveTypeCode,
    pub year: i32,
    pub total_days: Option<u32>,
    pub used_days: u32,
}

impl LeaveBalance {
    /// `None` means unbounded.
    pub fn remaining_days(&self) -> Option<u32> {
        self.total_days
            .map(|total| total.saturating_sub(self.used_days))
    }

    pub fn covers(&self, days: u32) -> bool {
        self.remaining_days().is_none_or(|remaining| remaining >= days)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeaveBalanceView {
    pub leave_type: LeaveType,
    pub year: i32,
    pub total_days: Option<u32>,
    pub used_days: u32,
    pub remaining_days: Option<u32>,
}

impl From<&LeaveBalance> for LeaveBalanceView {
    fn from(balance: &LeaveBalance) -> Self {
        Self {
            leave_type: balance.leave_type.leave_type(),
            year: balance.year,
            total_days: balance.total_days,
            used_days: balance.used_days,
            remaining_days: balance.remaining_days(),
        }
    }
}
