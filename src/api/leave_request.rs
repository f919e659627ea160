use crate::api::Pagination;
use crate::auth::auth::AuthUser;
use crate::model::leave_request::{LeaveRequest, LeaveStatus, LeaveTypeCode};
use crate::service::leave_workflow::LeaveWorkflow;
use crate::store::LeaveFilter;
use actix_web::{HttpResponse, Responder, web};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "2025-03-07", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2025-03-10", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "ANNUAL")]
    pub leave_type: LeaveTypeCode, // enum ensures Swagger dropdown
}

#[derive(Deserialize, ToSchema)]
pub struct PreviewLeave {
    #[schema(example = "2025-03-07", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2025-03-10", format = "date", value_type = String)]
    pub end_date: NaiveDate,
}

#[derive(Deserialize, ToSchema)]
pub struct RejectLeave {
    #[schema(example = "Project deadline that week")]
    pub reason: String,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveQuery {
    #[schema(example = 123)]
    /// Filter by employee ID (HR/Admin only)
    pub employee_id: Option<u64>,
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u32>,
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u32>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct BalanceQuery {
    /// Defaults to the current year
    #[schema(example = 2025)]
    pub year: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "Range has no working days, or balance is insufficient"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    workflow: web::Data<LeaveWorkflow>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.own_employee_id()?;

    let request = workflow
        .submit(
            employee_id,
            payload.leave_type,
            payload.start_date,
            payload.end_date,
        )
        .await?;

    Ok(HttpResponse::Created().json(request))
}

/// Working days the server would store for a range; for live client previews
#[utoipa::path(
    post,
    path = "/api/leave/preview",
    request_body(content = PreviewLeave, content_type = "application/json"),
    responses(
        (status = 200, description = "Working days in the range", body = WorkingDays),
        (status = 400, description = "End date before start date"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn preview_leave(
    workflow: web::Data<LeaveWorkflow>,
    payload: web::Json<PreviewLeave>,
) -> actix_web::Result<impl Responder> {
    let days = workflow.preview(payload.start_date, payload.end_date)?;
    Ok(HttpResponse::Ok().json(days))
}

/* =========================
Approve / reject (HR/Admin), cancel (requester)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to approve")
    ),
    responses(
        (status = 200, description = "Leave approved and balance debited", body = LeaveRequest),
        (status = 400, description = "Balance no longer covers the request"),
        (status = 409, description = "Leave request already processed"),
        (status = 404, description = "Leave request not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    workflow: web::Data<LeaveWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let request = workflow.approve(path.into_inner(), auth.user_id).await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to reject")
    ),
    request_body(content = RejectLeave, content_type = "application/json"),
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 400, description = "Reason is required"),
        (status = 409, description = "Leave request already processed"),
        (status = 404, description = "Leave request not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    workflow: web::Data<LeaveWorkflow>,
    path: web::Path<u64>,
    payload: web::Json<RejectLeave>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;

    let request = workflow
        .reject(path.into_inner(), auth.user_id, &payload.reason)
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to withdraw")
    ),
    responses(
        (status = 200, description = "Leave cancelled", body = LeaveRequest),
        (status = 409, description = "Leave request already processed"),
        (status = 404, description = "Leave request not found"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the requester")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    workflow: web::Data<LeaveWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.own_employee_id()?;

    let request = workflow.cancel(path.into_inner(), employee_id).await?;
    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Read leave
========================= */
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = u64, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    workflow: web::Data<LeaveWorkflow>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let request = workflow.get(path.into_inner()).await?;
    auth.require_self_or_hr(request.employee_id)?;

    Ok(HttpResponse::Ok().json(request))
}

/// Staff see only their own requests; HR and admins may filter by employee
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveQuery),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    workflow: web::Data<LeaveWorkflow>,
    query: web::Query<LeaveQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = if auth.role.manages_people() {
        query.employee_id
    } else {
        Some(auth.own_employee_id()?)
    };

    let paging = Pagination::new(query.page, query.per_page);
    let (data, total) = workflow
        .list(LeaveFilter {
            employee_id,
            status: query.status,
            limit: paging.per_page,
            offset: paging.offset(),
        })
        .await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page: paging.page,
        per_page: paging.per_page,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/api/leave/balance",
    params(BalanceQuery),
    responses(
        (status = 200, description = "Caller's leave balances", body = Vec<LeaveBalanceView>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "No employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_balance(
    auth: AuthUser,
    workflow: web::Data<LeaveWorkflow>,
    query: web::Query<BalanceQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = auth.own_employee_id()?;
    let year = query.year.unwrap_or_else(|| Utc::now().year());

    let balances = workflow.balances(employee_id, year).await?;
    Ok(HttpResponse::Ok().json(balances))
}
