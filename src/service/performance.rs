use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, FixedOffset, NaiveDate};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::service::calculator::{DateRange, is_working_day, working_days_in};
use crate::store::Store;

/// Trailing window used when an employee has no attendance at all.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Follow-up priority. `High` means attendance needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Good,
    Medium,
    High,
}

impl Priority {
    pub fn from_pct(pct: u32) -> Self {
        match pct {
            p if p > 80 => Priority::Good,
            p if p >= 50 => Priority::Medium,
            _ => Priority::High,
        }
    }

    fn rank(self) -> u8 {
        match self {
            Priority::Good => 0,
            Priority::Medium => 1,
            Priority::High => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PerformanceScore {
    pub employee_id: u64,
    pub attendance_pct: u32,
    pub priority: Priority,
    pub present_days: u32,
    pub working_days: u32,
    #[schema(value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to: NaiveDate,
}

/// Scores one employee from the local dates they checked in on.
///
/// The observed range runs from the first attendance to the later of the
/// last attendance and `today`. Only working days count, on both sides of
/// the fraction, so weekend check-ins never lift the percentage.
pub fn score(employee_id: u64, attendance_dates: &[NaiveDate], today: NaiveDate) -> PerformanceScore {
    let present: BTreeSet<NaiveDate> = attendance_dates.iter().copied().collect();

    let (from, to) = match (present.first(), present.last()) {
        (Some(first), Some(last)) => (*first, (*last).max(today)),
        _ => (today - Duration::days(DEFAULT_WINDOW_DAYS - 1), today),
    };

    let working = DateRange::new(from, to)
        .map(|range| working_days_in(&range).count)
        .unwrap_or(0);
    let present_days = present.iter().filter(|d| is_working_day(**d)).count() as u32;

    let attendance_pct = if working == 0 {
        0
    } else {
        ((present_days as f64 / working as f64) * 100.0).round() as u32
    };

    PerformanceScore {
        employee_id,
        attendance_pct,
        priority: Priority::from_pct(attendance_pct),
        present_days,
        working_days: working,
        from,
        to,
    }
}

/// GOOD first, then MEDIUM, then HIGH. Within GOOD the best attendance
/// leads; within MEDIUM and HIGH the worst leads.
pub fn sort_for_display(scores: &mut [PerformanceScore]) {
    scores.sort_by(|a, b| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then_with(|| match a.priority {
                Priority::Good => b.attendance_pct.cmp(&a.attendance_pct),
                Priority::Medium | Priority::High => a.attendance_pct.cmp(&b.attendance_pct),
            })
            .then_with(|| a.employee_id.cmp(&b.employee_id))
    });
}

pub struct PerformanceScorer {
    store: Arc<dyn Store>,
    offset: FixedOffset,
}

impl PerformanceScorer {
    pub fn new(store: Arc<dyn Store>, offset: FixedOffset) -> Self {
        Self { store, offset }
    }

    /// Scores each employee over at most `lookback_days` of history, sorted
    /// for display.
    pub async fn score_employees(
        &self,
        employee_ids: &[u64],
        today: NaiveDate,
        lookback_days: i64,
    ) -> AppResult<Vec<PerformanceScore>> {
        let window = DateRange::new(today - Duration::days(lookback_days.max(1) - 1), today)?;
        let (from, to) = window.utc_bounds(self.offset);

        let mut scores = Vec::with_capacity(employee_ids.len());
        for &employee_id in employee_ids {
            let events = self.store.fetch_attendance(employee_id, from, to).await?;
            let dates: Vec<NaiveDate> = events
                .iter()
                .filter(|e| e.employee_id == employee_id)
                .map(|e| e.check_in_time.with_timezone(&self.offset).date_naive())
                .collect();
            scores.push(score(employee_id, &dates, today));
        }

        sort_for_display(&mut scores);
        Ok(scores)
    }
}
