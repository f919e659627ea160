use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Lifecycle of a monthly summary. The spelling is part of the wire contract.
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
pub enum SummaryStatus {
    Draft,
    SignedByStaff,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProjectBreakdown {
    pub project_id: u64,
    pub project_name: String,
    pub days_worked: f64,
    pub total_hours: f64,
    pub ot_hours: f64,
}

/// Payroll-ready roll-up of one employee's month.
///
/// Unique per `(employee_id, month, year)` and never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlySummary {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = 3, minimum = 1, maximum = 12)]
    pub month: u32,
    #[schema(example = 2025)]
    pub year: i32,
    pub status: SummaryStatus,
    pub total_working_days: u32,
    pub total_worked_hours: f64,
    pub total_ot_hours: f64,
    pub approved_leaves: u32,
    pub absent_days: u32,
    pub project_breakdown: Vec<ProjectBreakdown>,
    /// `data:image/png;base64,...`
    pub staff_signature: Option<String>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub staff_signed_at: Option<DateTime<Utc>>,
    pub admin_signature: Option<String>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub admin_approved_at: Option<DateTime<Utc>>,
    pub admin_remarks: Option<String>,
}

impl MonthlySummary {
    /// Drops every trace of a previous signing cycle.
    pub fn clear_signatures(&mut self) {
        self.staff_signature = None;
        self.staff_signed_at = None;
        self.admin_signature = None;
        self.admin_approved_at = None;
        self.admin_remarks = None;
    }
}
