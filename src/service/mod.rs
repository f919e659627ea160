pub mod approval;
pub mod attendance;
pub mod calculator;
pub mod leave;
pub mod leave_workflow;
pub mod performance;
pub mod projects;
pub mod signature;
pub mod summary;
pub mod timesheet;
pub mod transitions;
