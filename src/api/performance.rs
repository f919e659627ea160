use std::sync::Arc;

use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::AppError;
use crate::service::performance::PerformanceScorer;
use crate::store::Store;
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

const DEFAULT_LOOKBACK_DAYS: i64 = 90;

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PerformanceQuery {
    /// Comma separated employee ids; defaults to every active employee
    #[schema(example = "1000,1001")]
    pub employee_ids: Option<String>,
    /// Days of attendance history to read
    #[schema(example = 90)]
    pub days: Option<i64>,
}

fn parse_ids(raw: &str) -> Result<Vec<u64>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map_err(|_| AppError::validation("employee_ids", format!("'{s}' is not an employee id")))
        })
        .collect()
}

/// Attendance ranking: GOOD first (best first), then MEDIUM and HIGH (worst first)
#[utoipa::path(
    get,
    path = "/api/performance",
    params(PerformanceQuery),
    responses(
        (status = 200, description = "Scores in display order", body = Vec<PerformanceScore>),
        (status = 400, description = "Malformed employee id list"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Performance"
)]
pub async fn performance(
    auth: AuthUser,
    scorer: web::Data<PerformanceScorer>,
    store: web::Data<Arc<dyn Store>>,
    config: web::Data<Config>,
    query: web::Query<PerformanceQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let ids = match query.employee_ids.as_deref() {
        Some(raw) => parse_ids(raw)?,
        None => store.list_active_employee_ids().await?,
    };
    let today = Utc::now().with_timezone(&config.reporting_offset).date_naive();
    let days = query.days.unwrap_or(DEFAULT_LOOKBACK_DAYS).clamp(1, 366);

    let scores = scorer.score_employees(&ids, today, days).await?;
    Ok(HttpResponse::Ok().json(scores))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_parsing() {
        assert_eq!(parse_ids("1000, 1001,,1002").unwrap(), vec![1000, 1001, 1002]);
        assert!(matches!(
            parse_ids("1000,abc"),
            Err(AppError::Validation { field: "employee_ids", .. })
        ));
    }
}
