use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::service::projects::{AssignedProject, AssignmentSource, ProjectDirectory};
use actix_web::{HttpResponse, Responder, web};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AssignedQuery {
    /// Defaults to the caller's own employee record
    #[schema(example = 1000)]
    pub employee_id: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct AssignedProjects {
    pub employee_id: u64,
    pub source: AssignmentSource,
    pub projects: Vec<AssignedProject>,
}

#[utoipa::path(
    get,
    path = "/api/projects/assigned",
    params(AssignedQuery),
    responses(
        (status = 200, description = "Projects the employee works on", body = AssignedProjects),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Projects"
)]
pub async fn assigned_projects(
    auth: AuthUser,
    directory: web::Data<ProjectDirectory>,
    config: web::Data<Config>,
    query: web::Query<AssignedQuery>,
) -> actix_web::Result<impl Responder> {
    let employee_id = match query.employee_id {
        Some(id) => id,
        None => auth.own_employee_id()?,
    };
    auth.require_self_or_hr(employee_id)?;

    let today = Utc::now().with_timezone(&config.reporting_offset).date_naive();
    let projects = directory.assigned_projects(employee_id, today).await?;

    Ok(HttpResponse::Ok().json(AssignedProjects {
        employee_id,
        source: directory.source().await?,
        projects: projects.as_ref().clone(),
    }))
}
