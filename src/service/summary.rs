use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{FixedOffset, NaiveDate};
use futures::{StreamExt, stream};
use serde::Serialize;
use tracing::{error, info, instrument};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};
use crate::model::employee::HoursSource;
use crate::model::summary::{MonthlySummary, ProjectBreakdown, SummaryStatus};
use crate::service::attendance::{AttendanceHours, aggregate_attendance};
use crate::service::calculator::{DateRange, WorkingDays, round2, working_days_in};
use crate::service::leave::{ApprovedLeave, aggregate_approved_leave};
use crate::service::timesheet::aggregate_timesheets;
use crate::service::transitions::{Lifecycle, SummaryAction};
use crate::store::Store;

/// Computed fields of a summary, before it is written.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthFigures {
    pub total_working_days: u32,
    pub total_worked_hours: f64,
    pub total_ot_hours: f64,
    pub approved_leaves: u32,
    pub absent_days: u32,
    pub present_days: u32,
    pub project_breakdown: Vec<ProjectBreakdown>,
}

/// Folds the aggregator outputs into summary figures.
///
/// A working day with both attendance and approved leave counts as leave,
/// so `present + leave + absent == working days`.
pub fn compute_figures(
    working: &WorkingDays,
    hours: &AttendanceHours,
    leave: &ApprovedLeave,
    project_breakdown: Vec<ProjectBreakdown>,
) -> MonthFigures {
    let working_set: BTreeSet<NaiveDate> = working.days.iter().copied().collect();

    let leave_days = leave.days.intersection(&working_set).count() as u32;
    let present_days = hours
        .present_days()
        .iter()
        .filter(|d| working_set.contains(d) && !leave.days.contains(d))
        .count() as u32;

    MonthFigures {
        total_working_days: working.count,
        total_worked_hours: round2(hours.total_regular + hours.total_overtime),
        total_ot_hours: round2(hours.total_overtime),
        approved_leaves: leave_days,
        absent_days: working
            .count
            .saturating_sub(present_days)
            .saturating_sub(leave_days),
        present_days,
        project_breakdown,
    }
}

impl MonthFigures {
    fn apply_to(self, summary: &mut MonthlySummary) {
        summary.total_working_days = self.total_working_days;
        summary.total_worked_hours = self.total_worked_hours;
        summary.total_ot_hours = self.total_ot_hours;
        summary.approved_leaves = self.approved_leaves;
        summary.absent_days = self.absent_days;
        summary.project_breakdown = self.project_breakdown;
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GeneratedSummary {
    pub summary: MonthlySummary,
    /// Timesheet hours still waiting for approval, shown but not paid
    pub unapproved_timesheets: Vec<ProjectBreakdown>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BatchOutcome {
    Generated,
    Immutable,
    Failed,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchEntry {
    pub employee_id: u64,
    pub outcome: BatchOutcome,
    pub summary_id: Option<u64>,
    pub status: Option<SummaryStatus>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchReport {
    pub month: u32,
    pub year: i32,
    pub generated: usize,
    pub immutable: usize,
    pub failed: usize,
    pub results: Vec<BatchEntry>,
}

pub struct SummaryBuilder {
    store: Arc<dyn Store>,
    offset: FixedOffset,
    batch_concurrency: usize,
}

impl SummaryBuilder {
    pub fn new(store: Arc<dyn Store>, offset: FixedOffset, batch_concurrency: usize) -> Self {
        Self {
            store,
            offset,
            batch_concurrency: batch_concurrency.max(1),
        }
    }

    /// Creates the month's summary in `DRAFT`, or recomputes it while nobody
    /// has attested to it yet.
    #[instrument(name = "generate_summary", skip(self))]
    pub async fn generate_or_refresh(
        &self,
        employee_id: u64,
        month: u32,
        year: i32,
    ) -> AppResult<GeneratedSummary> {
        let range = DateRange::month(month, year)?;
        let store = self.store.as_ref();

        let employee = store
            .fetch_employee(employee_id)
            .await?
            .ok_or_else(|| AppError::not_found("employee"))?;

        let existing = store.find_summary(employee_id, month, year).await?;
        if let Some(current) = &existing {
            if current.status.next(SummaryAction::Regenerate).is_none() {
                return Err(AppError::ImmutableSummary {
                    id: current.id,
                    status: current.status.to_string(),
                });
            }
        }

        let attendance = async {
            match employee.hours_source {
                HoursSource::Attendance => {
                    aggregate_attendance(store, employee_id, &range, self.offset).await
                }
                HoursSource::Timesheet => Ok(AttendanceHours::default()),
            }
        };
        let (attendance, leave, timesheets) = futures::try_join!(
            attendance,
            aggregate_approved_leave(store, employee_id, &range),
            aggregate_timesheets(store, employee_id, &range),
        )?;

        let hours = match employee.hours_source {
            HoursSource::Attendance => attendance,
            HoursSource::Timesheet => timesheets.hours,
        };
        let breakdown = timesheets.breakdown;
        let figures = compute_figures(&working_days_in(&range), &hours, &leave, breakdown.payroll);

        let summary = match existing {
            None => {
                let mut summary = MonthlySummary {
                    id: 0,
                    employee_id,
                    month,
                    year,
                    status: SummaryStatus::Draft,
                    total_working_days: 0,
                    total_worked_hours: 0.0,
                    total_ot_hours: 0.0,
                    approved_leaves: 0,
                    absent_days: 0,
                    project_breakdown: Vec::new(),
                    staff_signature: None,
                    staff_signed_at: None,
                    admin_signature: None,
                    admin_approved_at: None,
                    admin_remarks: None,
                };
                figures.apply_to(&mut summary);

                summary.id = store.insert_summary(&summary).await?.ok_or_else(|| {
                    AppError::StateConflict {
                        entity: "summary",
                        id: 0,
                        expected: "not yet generated".to_string(),
                    }
                })?;
                summary
            }
            Some(previous) => {
                let mut summary = previous.clone();
                figures.apply_to(&mut summary);
                summary.clear_signatures();
                summary.status = SummaryStatus::Draft;

                if !store.update_summary_if(&summary, previous.status).await? {
                    return Err(AppError::StateConflict {
                        entity: "summary",
                        id: previous.id,
                        expected: previous.status.to_string(),
                    });
                }
                summary
            }
        };

        info!(
            summary_id = summary.id,
            employee_id,
            month,
            year,
            worked_hours = summary.total_worked_hours,
            absent_days = summary.absent_days,
            "Monthly summary generated"
        );

        Ok(GeneratedSummary {
            summary,
            unapproved_timesheets: breakdown.unapproved,
        })
    }

    /// Generates one month for many employees.
    ///
    /// One employee failing never stops the rest: the failure is logged and
    /// reported, and that employee can be retried on their own.
    #[instrument(name = "generate_batch", skip(self, employee_ids))]
    pub async fn generate_batch(
        &self,
        month: u32,
        year: i32,
        employee_ids: Option<Vec<u64>>,
    ) -> AppResult<BatchReport> {
        DateRange::month(month, year)?;

        let ids = match employee_ids {
            Some(ids) => ids,
            None => self.store.list_active_employee_ids().await?,
        };
        info!(employees = ids.len(), month, year, "Batch generation started");

        let results: Vec<BatchEntry> = stream::iter(ids)
            .map(|employee_id| async move {
                let result = self.generate_or_refresh(employee_id, month, year).await;
                batch_entry(employee_id, month, year, result)
            })
            .buffered(self.batch_concurrency)
            .collect()
            .await;

        let count = |outcome| results.iter().filter(|r| r.outcome == outcome).count();
        let (generated, immutable, failed) = (
            count(BatchOutcome::Generated),
            count(BatchOutcome::Immutable),
            count(BatchOutcome::Failed),
        );
        let report = BatchReport {
            month,
            year,
            generated,
            immutable,
            failed,
            results,
        };

        info!(
            month,
            year,
            generated = report.generated,
            immutable = report.immutable,
            failed = report.failed,
            "Batch generation finished"
        );
        Ok(report)
    }
}

fn batch_entry(
    employee_id: u64,
    month: u32,
    year: i32,
    result: AppResult<GeneratedSummary>,
) -> BatchEntry {
    match result {
        Ok(generated) => BatchEntry {
            employee_id,
            outcome: BatchOutcome::Generated,
            summary_id: Some(generated.summary.id),
            status: Some(generated.summary.status),
            message: None,
        },
        Err(AppError::ImmutableSummary { id, status }) => BatchEntry {
            employee_id,
            outcome: BatchOutcome::Immutable,
            summary_id: Some(id),
            status: status.parse().ok(),
            message: None,
        },
        Err(e) => {
            error!(error = %e, employee_id, month, year, "Summary generation failed");
            BatchEntry {
                employee_id,
                outcome: BatchOutcome::Failed,
                summary_id: None,
                status: None,
                message: Some(e.to_string()),
            }
        }
    }
}

/// The stored summary for a period, or `NotGenerated` when there is none yet.
pub async fn load_for_period(
    store: &dyn Store,
    employee_id: u64,
    month: u32,
    year: i32,
) -> AppResult<MonthlySummary> {
    DateRange::month(month, year)?;
    store
        .find_summary(employee_id, month, year)
        .await?
        .ok_or(AppError::NotGenerated {
            employee_id,
            month,
            year,
        })
}
