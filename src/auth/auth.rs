use crate::error::AppError;
use crate::model::role::Role;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

/// Caller identity placed in the request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| ErrorUnauthorized("Missing token")),
        )
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role.manages_payroll() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_hr_or_admin(&self) -> Result<(), AppError> {
        if self.role.manages_people() {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// The caller's own employee id; accounts without one cannot act as staff.
    pub fn own_employee_id(&self) -> Result<u64, AppError> {
        self.employee_id.ok_or(AppError::Forbidden)
    }

    /// HR and admins read anyone's records, everyone else only their own.
    pub fn require_self_or_hr(&self, employee_id: u64) -> Result<(), AppError> {
        if self.role.manages_people() || self.employee_id == Some(employee_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}
