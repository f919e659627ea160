use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

/// Which records are authoritative for an employee's worked hours.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HoursSource {
    Attendance,
    Timesheet,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(
    example = json!({
        "id": 142,
        "employee_code": "CW-0142",
        "first_name": "Rahim",
        "last_name": "Uddin",
        "status": "active",
        "hours_source": "attendance"
    })
)]
pub struct Employee {
    #[schema(example = 142)]
    pub id: u64,

    #[schema(example = "CW-0142")]
    pub employee_code: String,

    #[schema(example = "Rahim")]
    pub first_name: String,

    #[schema(example = "Uddin")]
    pub last_name: String,

    #[schema(example = "active")]
    pub status: String,

    pub hours_source: HoursSource,
}
