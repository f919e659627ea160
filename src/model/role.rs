use serde::Serialize;
use strum_macros::{AsRefStr, Display};
use utoipa::ToSchema;

/// Role id carried in the `role` claim of an access token.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, ToSchema, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    Admin = 1,
    Hr = 2,
    Employee = 3,
    System = 4,
    ApiUser = 5,
}

impl Role {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Role::Admin),
            2 => Some(Role::Hr),
            3 => Some(Role::Employee),
            4 => Some(Role::System),
            5 => Some(Role::ApiUser),
            _ => None,
        }
    }

    /// Generates, approves and rejects monthly summaries.
    pub fn manages_payroll(self) -> bool {
        self == Role::Admin
    }

    /// Approves and rejects leave, and reads other employees' records.
    pub fn manages_people(self) -> bool {
        matches!(self, Role::Admin | Role::Hr)
    }
}
