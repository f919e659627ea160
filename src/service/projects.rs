//! Resolves the projects an employee is assigned to.
//!
//! Older deployments have no `project_assignments` table; there the
//! assignments are derived from recent timesheets instead. Which of the two
//! is available is probed once per process and remembered, so callers never
//! try one and fall back to the other themselves.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use moka::future::Cache;
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::error::AppResult;

/// How far back timesheets are read when assignments are derived from them.
pub const HISTORY_WINDOW_DAYS: i64 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentSource {
    AssignmentTable,
    TimesheetHistory,
}

impl AssignmentSource {
    pub fn negotiate(has_assignment_table: bool) -> Self {
        if has_assignment_table {
            AssignmentSource::AssignmentTable
        } else {
            AssignmentSource::TimesheetHistory
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AssignedProject {
    pub project_id: u64,
    pub project_name: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssignmentBackend: Send + Sync {
    async fn has_assignment_table(&self) -> AppResult<bool>;

    async fn assigned_from_table(&self, employee_id: u64) -> AppResult<Vec<AssignedProject>>;

    async fn assigned_from_history(
        &self,
        employee_id: u64,
        since: NaiveDate,
    ) -> AppResult<Vec<AssignedProject>>;
}

pub struct ProjectDirectory {
    backend: Arc<dyn AssignmentBackend>,
    source: OnceCell<AssignmentSource>,
    cache: Cache<u64, Arc<Vec<AssignedProject>>>,
}

impl ProjectDirectory {
    pub fn new(backend: Arc<dyn AssignmentBackend>, ttl_secs: u64) -> Self {
        Self {
            backend,
            source: OnceCell::new(),
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(StdDuration::from_secs(ttl_secs))
                .build(),
        }
    }

    pub async fn source(&self) -> AppResult<AssignmentSource> {
        if let Some(source) = self.source.get() {
            return Ok(*source);
        }

        let negotiated = AssignmentSource::negotiate(self.backend.has_assignment_table().await?);
        info!(source = ?negotiated, "Project assignment source negotiated");
        Ok(*self.source.get_or_init(|| negotiated))
    }

    pub async fn assigned_projects(
        &self,
        employee_id: u64,
        today: NaiveDate,
    ) -> AppResult<Arc<Vec<AssignedProject>>> {
        if let Some(hit) = self.cache.get(&employee_id).await {
            return Ok(hit);
        }

        let projects = match self.source().await? {
            AssignmentSource::AssignmentTable => {
                self.backend.assigned_from_table(employee_id).await?
            }
            AssignmentSource::TimesheetHistory => {
                let since = today - Duration::days(HISTORY_WINDOW_DAYS);
                self.backend.assigned_from_history(employee_id, since).await?
            }
        };

        let projects = Arc::new(projects);
        self.cache.insert(employee_id, projects.clone()).await;
        Ok(projects)
    }
}
