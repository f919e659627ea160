use std::sync::Arc;

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::service::attendance::aggregate_attendance;
use crate::service::calculator::DateRange;
use crate::store::Store;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct HoursQuery {
    /// Defaults to the caller's own employee record
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
    #[schema(example = "2025-03-01", format = "date", value_type = String)]
    #[param(value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(example = "2025-03-31", format = "date", value_type = String)]
    #[param(value_type = String, format = "date")]
    pub to: NaiveDate,
}

/// Regular and overtime hours per day, from check-in/check-out sessions
#[utoipa::path(
    get,
    path = "/api/attendance/hours",
    params(HoursQuery),
    responses(
        (status = 200, description = "Per-day hours and totals", body = AttendanceHours),
        (status = 400, description = "Reversed range, or longer than 366 days"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal server error")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn attendance_hours(
    auth: AuthUser,
    store: web::Data<Arc<dyn Store>>,
    config: web::Data<Config>,
    query: web::Query<HoursQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = match query.employee_id {
        Some(id) => id,
        None => auth.own_employee_id()?,
    };
    auth.require_self_or_hr(employee_id)?;

    let range = DateRange::bounded(query.from, query.to)?;

    let hours = aggregate_attendance(
        store.get_ref().as_ref(),
        employee_id,
        &range,
        config.reporting_offset,
    )
    .await?;

    Ok(HttpResponse::Ok().json(hours))
}
