use std::collections::BTreeSet;

use chrono::NaiveDate;
use tracing::warn;

use crate::error::AppResult;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::service::calculator::{DateRange, working_days_in};
use crate::store::Store;

/// Business days of approved leave falling inside one month.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovedLeave {
    pub days: BTreeSet<NaiveDate>,
}

impl ApprovedLeave {
    pub fn total(&self) -> u32 {
        self.days.len() as u32
    }
}

pub async fn aggregate_approved_leave(
    store: &dyn Store,
    employee_id: u64,
    month: &DateRange,
) -> AppResult<ApprovedLeave> {
    let requests = store.fetch_approved_leave(employee_id, *month).await?;
    Ok(approved_leave_days(employee_id, &requests, month))
}

/// Requests straddling a month boundary only contribute the business days
/// inside `month`, never their full stored `number_of_days`. Overlapping
/// requests count each day once.
pub fn approved_leave_days(
    employee_id: u64,
    requests: &[LeaveRequest],
    month: &DateRange,
) -> ApprovedLeave {
    let mut out = ApprovedLeave::default();

    for request in requests
        .iter()
        .filter(|r| r.employee_id == employee_id && r.status == LeaveStatus::Approved)
    {
        let Ok(full) = DateRange::new(request.start_date, request.end_date) else {
            warn!(leave_id = request.id, "Approved leave with reversed date range, skipping");
            continue;
        };

        let recomputed = working_days_in(&full).count;
        if recomputed != request.number_of_days {
            warn!(
                leave_id = request.id,
                stored = request.number_of_days,
                recomputed,
                "Stored leave length disagrees with working-day calculator"
            );
        }

        if let Some(overlap) = full.intersect(month) {
            out.days.extend(working_days_in(&overlap).days);
        }
    }

    out
}
