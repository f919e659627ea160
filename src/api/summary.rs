use crate::api::Pagination;
use crate::auth::auth::AuthUser;
use crate::model::summary::{MonthlySummary, SummaryStatus};
use crate::service::approval::SummaryApproval;
use crate::service::summary::SummaryBuilder;
use crate::store::SummaryFilter;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct GenerateBatch {
    #[schema(example = 3)]
    pub month: u32,
    #[schema(example = 2025)]
    pub year: i32,
    /// Defaults to every active employee
    #[schema(example = json!([1000, 1001]))]
    pub employee_ids: Option<Vec<u64>>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PeriodQuery {
    #[schema(example = 2025)]
    pub year: i32,
    #[schema(example = 3)]
    pub month: u32,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct SummaryListQuery {
    /// Filter by year
    pub year: Option<i32>,
    /// Filter by month (1-12)
    pub month: Option<u32>,
    /// Filter by status
    pub status: Option<SummaryStatus>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct SummaryListResponse {
    pub data: Vec<MonthlySummary>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct SignaturePayload {
    /// `data:image/png;base64,...`
    #[schema(example = "data:image/png;base64,iVBORw0KGgo=")]
    pub signature: String,
}

#[derive(Deserialize, ToSchema)]
pub struct RejectSummary {
    #[schema(example = "Overtime on 2025-03-12 is not approved")]
    pub remarks: String,
}

/* =========================
Generate summaries (Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/summaries/generate",
    request_body(content = GenerateBatch, content_type = "application/json"),
    responses(
        (status = 200, description = "Per-employee generation outcomes", body = BatchReport),
        (status = 400, description = "Invalid month or year"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Summary"
)]
pub async fn generate_batch(
    auth: AuthUser,
    builder: web::Data<SummaryBuilder>,
    payload: web::Json<GenerateBatch>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let GenerateBatch {
        month,
        year,
        employee_ids,
    } = payload.into_inner();
    let report = builder.generate_batch(month, year, employee_ids).await?;

    Ok(HttpResponse::Ok().json(report))
}

#[utoipa::path(
    post,
    path = "/api/summaries/{employee_id}/{year}/{month}/generate",
    params(
        ("employee_id" = u64, Path, description = "Employee to generate for"),
        ("year" = i32, Path, description = "Calendar year"),
        ("month" = u32, Path, description = "Month 1-12")
    ),
    responses(
        (status = 200, description = "Summary created or refreshed", body = GeneratedSummary),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Summary already signed or approved"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Summary"
)]
pub async fn generate_one(
    auth: AuthUser,
    builder: web::Data<SummaryBuilder>,
    path: web::Path<(u64, i32, u32)>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let (employee_id, year, month) = path.into_inner();
    let generated = builder.generate_or_refresh(employee_id, month, year).await?;

    Ok(HttpResponse::Ok().json(generated))
}

/* =========================
Read summaries
========================= */
#[utoipa::path(
    get,
    path = "/api/summaries/{employee_id}/{year}/{month}",
    params(
        ("employee_id" = u64, Path, description = "Employee id"),
        ("year" = i32, Path, description = "Calendar year"),
        ("month" = u32, Path, description = "Month 1-12")
    ),
    responses(
        (status = 200, description = "Stored summary", body = MonthlySummary),
        (status = 404, description = "SUMMARY_NOT_GENERATED"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Summary"
)]
pub async fn get_for_period(
    auth: AuthUser,
    approval: web::Data<SummaryApproval>,
    path: web::Path<(u64, i32, u32)>,
) -> actix_web::Result<impl Responder> {
    let (employee_id, year, month) = path.into_inner();
    auth.require_self_or_hr(employee_id)?;

    let summary = approval.for_period(employee_id, month, year).await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[utoipa::path(
    get,
    path = "/api/summaries/me",
    params(PeriodQuery),
    responses(
        (status = 200, description = "Caller's own summary", body = MonthlySummary),
        (status = 404, description = "SUMMARY_NOT_GENERATED"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Summary"
)]
pub async fn my_summary(
    auth: AuthUser,
    approval: web::Data<SummaryApproval>,
    query: web::Query<PeriodQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.own_employee_id()?;

    let summary = approval
        .for_period(employee_id, query.month, query.year)
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[utoipa::path(
    get,
    path = "/api/summaries",
    params(SummaryListQuery),
    responses(
        (status = 200, description = "Paginated summary list", body = SummaryListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Summary"
)]
pub async fn list_summaries(
    auth: AuthUser,
    approval: web::Data<SummaryApproval>,
    query: web::Query<SummaryListQuery>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let paging = Pagination::new(query.page, query.per_page);
    let (data, total) = approval
        .list(SummaryFilter {
            month: query.month,
            year: query.year,
            status: query.status,
            limit: paging.per_page,
            offset: paging.offset(),
        })
        .await?;

    Ok(HttpResponse::Ok().json(SummaryListResponse {
        data,
        page: paging.page,
        per_page: paging.per_page,
        total,
    }))
}

/* =========================
Sign / approve / reject
========================= */
#[utoipa::path(
    put,
    path = "/api/summaries/{summary_id}/sign",
    params(("summary_id" = u64, Path, description = "Summary to sign")),
    request_body(content = SignaturePayload, content_type = "application/json"),
    responses(
        (status = 200, description = "Signed by staff", body = MonthlySummary),
        (status = 400, description = "Signature missing or not a PNG data URI"),
        (status = 409, description = "Already signed, or status changed meanwhile"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the summary's employee")
    ),
    security(("bearer_auth" = [])),
    tag = "Summary"
)]
pub async fn sign_summary(
    auth: AuthUser,
    approval: web::Data<SummaryApproval>,
    path: web::Path<u64>,
    payload: web::Json<SignaturePayload>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.own_employee_id()?;

    let summary = approval
        .sign(path.into_inner(), employee_id, &payload.signature)
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[utoipa::path(
    put,
    path = "/api/summaries/{summary_id}/approve",
    params(("summary_id" = u64, Path, description = "Summary to approve")),
    request_body(content = SignaturePayload, content_type = "application/json"),
    responses(
        (status = 200, description = "Approved and payroll-ready", body = MonthlySummary),
        (status = 400, description = "Signature missing or not a PNG data URI"),
        (status = 409, description = "Summary is not signed by staff"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Summary"
)]
pub async fn approve_summary(
    auth: AuthUser,
    approval: web::Data<SummaryApproval>,
    path: web::Path<u64>,
    payload: web::Json<SignaturePayload>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let summary = approval
        .approve(path.into_inner(), &payload.signature)
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[utoipa::path(
    put,
    path = "/api/summaries/{summary_id}/reject",
    params(("summary_id" = u64, Path, description = "Summary to reject")),
    request_body(content = RejectSummary, content_type = "application/json"),
    responses(
        (status = 200, description = "Returned to staff", body = MonthlySummary),
        (status = 400, description = "Remarks are required"),
        (status = 409, description = "Summary is not signed by staff"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Summary"
)]
pub async fn reject_summary(
    auth: AuthUser,
    approval: web::Data<SummaryApproval>,
    path: web::Path<u64>,
    payload: web::Json<RejectSummary>,
) -> actix_web::Result<impl Responder> {
    auth.require_admin()?;

    let summary = approval.reject(path.into_inner(), &payload.remarks).await?;
    Ok(HttpResponse::Ok().json(summary))
}
