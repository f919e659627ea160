use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One check-in/check-out session recorded by the mobile client.
///
/// `check_out_time` stays empty while the session is open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceEvent {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "2025-03-03T09:00:00Z", format = "date-time", value_type = String)]
    pub check_in_time: DateTime<Utc>,
    #[schema(example = "2025-03-03T19:00:00Z", format = "date-time", value_type = Option<String>, nullable = true)]
    pub check_out_time: Option<DateTime<Utc>>,
}
