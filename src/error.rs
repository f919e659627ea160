use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::NaiveDate;
use derive_more::Display;
use serde_json::json;

/// Errors surfaced by the summary and leave engines.
///
/// Validation failures are raised before anything is written. State
/// conflicts mean another caller already acted on the record, which the
/// client reports differently from bad input.
#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "{}: {}", field, message)]
    Validation { field: &'static str, message: String },

    #[display(fmt = "invalid date range {} to {}: {}", start, end, reason)]
    InvalidRange {
        start: NaiveDate,
        end: NaiveDate,
        reason: &'static str,
    },

    #[display(fmt = "{} {} is no longer {}", entity, id, expected)]
    StateConflict {
        entity: &'static str,
        id: u64,
        expected: String,
    },

    #[display(fmt = "summary {} is already signed by staff", id)]
    AlreadySigned { id: u64 },

    #[display(fmt = "summary {} is {} and cannot be regenerated", id, status)]
    ImmutableSummary { id: u64, status: String },

    #[display(
        fmt = "no summary generated for employee {} in {}/{}",
        employee_id,
        month,
        year
    )]
    NotGenerated {
        employee_id: u64,
        month: u32,
        year: i32,
    },

    #[display(fmt = "{} not found", entity)]
    NotFound { entity: &'static str },

    #[display(fmt = "not allowed to act on this record")]
    Forbidden,

    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
}

impl AppError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        AppError::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str) -> Self {
        AppError::NotFound { entity }
    }

    /// Stable machine-readable code returned to clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation { .. } => "VALIDATION_ERROR",
            AppError::InvalidRange { .. } => "INVALID_RANGE",
            AppError::StateConflict { .. } => "STATE_CONFLICT",
            AppError::AlreadySigned { .. } => "ALREADY_SIGNED",
            AppError::ImmutableSummary { .. } => "IMMUTABLE_SUMMARY",
            AppError::NotGenerated { .. } => "SUMMARY_NOT_GENERATED",
            AppError::NotFound { .. } => "NOT_FOUND",
            AppError::Forbidden => "FORBIDDEN",
            AppError::Database(_) => "INTERNAL_ERROR",
        }
    }

    /// True for errors that mean "someone already acted on this".
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            AppError::StateConflict { .. }
                | AppError::AlreadySigned { .. }
                | AppError::ImmutableSummary { .. }
        )
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Database(e)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::InvalidRange { .. } => StatusCode::BAD_REQUEST,
            AppError::StateConflict { .. }
            | AppError::AlreadySigned { .. }
            | AppError::ImmutableSummary { .. } => StatusCode::CONFLICT,
            AppError::NotGenerated { .. } | AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                json!({ "code": self.code(), "message": "Internal Server Error" })
            }
            AppError::Validation { field, message } => json!({
                "code": self.code(),
                "field": field,
                "message": message,
            }),
            AppError::InvalidRange { .. } => json!({
                "code": self.code(),
                "field": "end_date",
                "message": self.to_string(),
            }),
            _ => json!({ "code": self.code(), "message": self.to_string() }),
        };

        HttpResponse::build(self.status_code()).json(body)
    }
}

pub type AppResult<T> = Result<T, AppError>;
