use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::model::summary::ProjectBreakdown;
use crate::model::timesheet::{DayStatus, Timesheet};
use crate::service::attendance::{AttendanceHours, DayHours};
use crate::service::calculator::{DateRange, round2, split_hours};
use crate::store::Store;

/// Per-project totals for a month.
///
/// Only approved rows reach `payroll`; the rest are kept in `unapproved` so
/// they can be shown without feeding the summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct TimesheetBreakdown {
    pub payroll: Vec<ProjectBreakdown>,
    pub unapproved: Vec<ProjectBreakdown>,
}

/// A month of timesheet rows folded two ways from a single fetch.
#[derive(Debug, Clone, Default)]
pub struct TimesheetMonth {
    pub breakdown: TimesheetBreakdown,
    /// Daily payable hours, used when timesheets are the hours source
    pub hours: AttendanceHours,
}

pub async fn aggregate_timesheets(
    store: &dyn Store,
    employee_id: u64,
    month: &DateRange,
) -> AppResult<TimesheetMonth> {
    let rows = store.fetch_timesheets(employee_id, *month).await?;
    Ok(TimesheetMonth {
        breakdown: breakdown_rows(employee_id, &rows, month),
        hours: daily_hours(employee_id, &rows, month),
    })
}

#[derive(Default)]
struct ProjectTally {
    name: String,
    days: BTreeMap<NaiveDate, f64>,
    total_hours: f64,
    ot_hours: f64,
}

impl ProjectTally {
    fn add_day(&mut self, date: NaiveDate, status: DayStatus) {
        let credit = self.days.entry(date).or_insert(0.0);
        *credit = credit.max(status.day_credit());
    }

    fn finish(self, project_id: u64) -> ProjectBreakdown {
        ProjectBreakdown {
            project_id,
            project_name: self.name,
            days_worked: self.days.values().sum(),
            total_hours: round2(self.total_hours),
            ot_hours: round2(self.ot_hours),
        }
    }
}

pub fn breakdown_rows(employee_id: u64, rows: &[Timesheet], month: &DateRange) -> TimesheetBreakdown {
    let mut payroll: BTreeMap<u64, ProjectTally> = BTreeMap::new();
    let mut unapproved: BTreeMap<u64, ProjectTally> = BTreeMap::new();

    for row in rows
        .iter()
        .filter(|r| r.staff_id == employee_id && month.contains(r.work_date))
    {
        let (bucket, hours, ot) = if row.is_approved() {
            (&mut payroll, row.payable_hours(), row.payable_overtime())
        } else {
            (&mut unapproved, row.total_hours.max(0.0), row.overtime_hours.max(0.0))
        };

        let tally = bucket.entry(row.project_id).or_insert_with(|| ProjectTally {
            name: row.project_name.clone(),
            ..Default::default()
        });
        tally.add_day(row.work_date, row.status);
        tally.total_hours += hours;
        tally.ot_hours += ot;
    }

    TimesheetBreakdown {
        payroll: payroll.into_iter().map(|(id, t)| t.finish(id)).collect(),
        unapproved: unapproved.into_iter().map(|(id, t)| t.finish(id)).collect(),
    }
}

/// Daily hours for employees whose timesheets are the system of record.
///
/// Approved hours are summed per day across projects and split with the
/// same rule as attendance. A day counts as present when an approved row
/// for it is not marked absent.
pub fn daily_hours(employee_id: u64, rows: &[Timesheet], month: &DateRange) -> AttendanceHours {
    let mut worked: BTreeMap<NaiveDate, f64> = BTreeMap::new();

    for row in rows.iter().filter(|r| {
        r.staff_id == employee_id
            && month.contains(r.work_date)
            && r.is_approved()
            && r.status != DayStatus::Absent
    }) {
        *worked.entry(row.work_date).or_insert(0.0) += row.payable_hours();
    }

    let mut out = AttendanceHours::default();
    for (day, hours) in worked {
        let split = split_hours(hours);
        out.total_regular += split.regular;
        out.total_overtime += split.overtime;
        out.per_day.insert(
            day,
            DayHours {
                regular: split.regular,
                overtime: split.overtime,
                complete: true,
            },
        );
    }
    out.total_regular = round2(out.total_regular);
    out.total_overtime = round2(out.total_overtime);
    out
}
