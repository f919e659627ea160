use crate::api::attendance::HoursQuery;
use crate::api::leave_request::{
    BalanceQuery, CreateLeave, LeaveListResponse, LeaveQuery, PreviewLeave, RejectLeave,
};
use crate::api::performance::PerformanceQuery;
use crate::api::projects::{AssignedProjects, AssignedQuery};
use crate::api::summary::{
    GenerateBatch, PeriodQuery, RejectSummary, SignaturePayload, SummaryListQuery,
    SummaryListResponse,
};
use crate::model::leave_request::{
    LeaveBalanceView, LeaveRequest, LeaveStatus, LeaveType, LeaveTypeCode,
};
use crate::model::summary::{MonthlySummary, ProjectBreakdown, SummaryStatus};
use crate::service::attendance::{AttendanceHours, DayHours};
use crate::service::calculator::{HourSplit, WorkingDays};
use crate::service::performance::{PerformanceScore, Priority};
use crate::service::projects::{AssignedProject, AssignmentSource};
use crate::service::summary::{BatchEntry, BatchOutcome, BatchReport, GeneratedSummary};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "HRM Payroll API",
        version = "1.0.0",
        description = r#"
## Monthly Payroll Summaries

This API rolls attendance, approved leave and project timesheets into **monthly payroll summaries**
that are signed by the staff member and approved by an administrator.

### 🔹 Key Features
- **Summary Generation**
  - Generate one employee's month or a whole batch; drafts regenerate in place
- **Dual Signature Approval**
  - Staff sign, admins approve or reject; approved summaries are immutable
- **Leave Management**
  - Submit, preview, approve/reject/cancel requests with balance tracking
- **Attendance & Performance**
  - Regular/overtime hour splits and attendance-based ranking

### 🔐 Security
Every endpoint is protected using **JWT Bearer authentication**.
Generation and approval require the **Admin** role; leave decisions require **HR** or **Admin**.

### 📦 Response Format
- JSON-based RESTful responses
- Errors carry a machine readable `code`, e.g. `SUMMARY_NOT_GENERATED`

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::summary::generate_batch,
        crate::api::summary::generate_one,
        crate::api::summary::get_for_period,
        crate::api::summary::my_summary,
        crate::api::summary::list_summaries,
        crate::api::summary::sign_summary,
        crate::api::summary::approve_summary,
        crate::api::summary::reject_summary,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::preview_leave,
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::cancel_leave,
        crate::api::leave_request::leave_balance,

        crate::api::attendance::attendance_hours,
        crate::api::performance::performance,
        crate::api::projects::assigned_projects
    ),
    components(
        schemas(
            MonthlySummary,
            ProjectBreakdown,
            SummaryStatus,
            GeneratedSummary,
            GenerateBatch,
            BatchReport,
            BatchEntry,
            BatchOutcome,
            PeriodQuery,
            SummaryListQuery,
            SummaryListResponse,
            SignaturePayload,
            RejectSummary,
            LeaveRequest,
            LeaveStatus,
            LeaveTypeCode,
            LeaveBalanceView,
            LeaveType,
            CreateLeave,
            PreviewLeave,
            RejectLeave,
            LeaveQuery,
            BalanceQuery,
            LeaveListResponse,
            WorkingDays,
            HourSplit,
            HoursQuery,
            AttendanceHours,
            DayHours,
            PerformanceQuery,
            PerformanceScore,
            Priority,
            AssignedQuery,
            AssignedProjects,
            AssignedProject,
            AssignmentSource
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Summary", description = "Monthly summary generation and approval APIs"),
        (name = "Leave", description = "Leave management APIs"),
        (name = "Attendance", description = "Attendance hour APIs"),
        (name = "Performance", description = "Attendance performance APIs"),
        (name = "Projects", description = "Project assignment APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route_and_the_bearer_scheme() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/summaries/generate",
            "/api/summaries/{summary_id}/sign",
            "/api/leave/preview",
            "/api/attendance/hours",
            "/api/projects/assigned",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
