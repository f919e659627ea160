//! Working-day and hour-splitting arithmetic.
//!
//! Leave submission, leave aggregation, the summary builder and the client
//! preview endpoint all go through these functions, so a leave request's
//! stored `number_of_days` always matches a later recomputation.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc, Weekday};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// Regular hours paid per day before overtime starts.
pub const REGULAR_HOURS_PER_DAY: f64 = 8.0;
/// Upper bound on hours credited for a single calendar day.
pub const MAX_HOURS_PER_DAY: f64 = 24.0;
/// Longest range a caller may ask about in one request.
pub const MAX_RANGE_DAYS: i64 = 366;

/// Inclusive calendar date range. `end >= start` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        if end < start {
            return Err(AppError::InvalidRange {
                start,
                end,
                reason: "end date is before start date",
            });
        }
        Ok(Self { start, end })
    }

    /// Like `new`, but refuses ranges longer than `MAX_RANGE_DAYS`.
    pub fn bounded(start: NaiveDate, end: NaiveDate) -> AppResult<Self> {
        let range = Self::new(start, end)?;
        if range.calendar_days() > MAX_RANGE_DAYS {
            return Err(AppError::InvalidRange {
                start,
                end,
                reason: "range may cover at most 366 days",
            });
        }
        Ok(range)
    }

    /// First to last day of a calendar month.
    pub fn month(month: u32, year: i32) -> AppResult<Self> {
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or_else(|| AppError::validation("month", format!("invalid month {month}/{year}")))?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(|| AppError::validation("year", format!("year {year} out of range")))?;

        Self::new(start, next - Duration::days(1))
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn intersect(&self, other: &DateRange) -> Option<DateRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(DateRange { start, end })
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }

    pub fn calendar_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Half-open UTC instants covering the range in the reporting timezone.
    pub fn utc_bounds(&self, offset: FixedOffset) -> (DateTime<Utc>, DateTime<Utc>) {
        let local_midnight = |date: NaiveDate| {
            let naive = date.and_hms_opt(0, 0, 0).unwrap_or_default();
            offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| naive.and_utc())
        };
        (
            local_midnight(self.start),
            local_midnight(self.end + Duration::days(1)),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct WorkingDays {
    pub count: u32,
    #[schema(value_type = Vec<String>)]
    pub days: Vec<NaiveDate>,
}

pub fn is_working_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Business days between `start` and `end`, both inclusive. The range is
/// capped at `MAX_RANGE_DAYS`.
pub fn working_days(start: NaiveDate, end: NaiveDate) -> AppResult<WorkingDays> {
    Ok(working_days_in(&DateRange::bounded(start, end)?))
}

pub fn working_days_in(range: &DateRange) -> WorkingDays {
    let days: Vec<NaiveDate> = range.days().filter(|d| is_working_day(*d)).collect();
    WorkingDays {
        count: days.len() as u32,
        days,
    }
}

/// Hours for one day after splitting at the regular-hours threshold.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, ToSchema)]
pub struct HourSplit {
    pub regular: f64,
    pub overtime: f64,
}

impl HourSplit {
    pub fn worked(&self) -> f64 {
        self.regular + self.overtime
    }
}

/// `regular = min(worked, 8)`, `overtime = max(worked - 8, 0)`, with worked
/// clamped into `[0, 24]`.
pub fn split_hours(worked: f64) -> HourSplit {
    let worked = if worked.is_finite() {
        worked.clamp(0.0, MAX_HOURS_PER_DAY)
    } else {
        0.0
    };
    HourSplit {
        regular: round2(worked.min(REGULAR_HOURS_PER_DAY)),
        overtime: round2((worked - REGULAR_HOURS_PER_DAY).max(0.0)),
    }
}

pub fn hours_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    (to - from).num_seconds() as f64 / 3600.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn full_weeks_count_five_days_each() {
        // 2025-03-03 is a Monday
        for weeks in 1..=6 {
            let start = date(2025, 3, 3);
            let end = start + Duration::days(7 * weeks - 1);
            assert_eq!(working_days(start, end).unwrap().count, 5 * weeks as u32);
        }
    }

    #[test]
    fn weekend_only_range_is_empty() {
        let result = working_days(date(2025, 3, 8), date(2025, 3, 9)).unwrap();
        assert_eq!(result.count, 0);
        assert!(result.days.is_empty());
    }

    #[test]
    fn monday_to_friday_is_five_and_friday_to_monday_is_two() {
        assert_eq!(working_days(date(2025, 3, 3), date(2025, 3, 7)).unwrap().count, 5);

        let wrap = working_days(date(2025, 3, 7), date(2025, 3, 10)).unwrap();
        assert_eq!(wrap.count, 2);
        assert_eq!(wrap.days, vec![date(2025, 3, 7), date(2025, 3, 10)]);
    }

    #[test]
    fn reversed_range_is_rejected() {
        let err = working_days(date(2025, 3, 10), date(2025, 3, 7)).unwrap_err();
        assert!(matches!(err, AppError::InvalidRange { .. }));
    }

    #[test]
    fn ranges_longer_than_a_leap_year_are_rejected() {
        let full_leap_year = working_days(date(2024, 1, 1), date(2024, 12, 31)).unwrap();
        assert_eq!(full_leap_year.count, 262);

        let err = working_days(date(2024, 1, 1), date(2025, 1, 1)).unwrap_err();
        assert!(matches!(err, AppError::InvalidRange { .. }));

        let err = working_days(date(-200_000, 1, 1), date(200_000, 12, 31)).unwrap_err();
        assert!(matches!(err, AppError::InvalidRange { .. }));
    }

    #[test]
    fn single_day_range_is_inclusive() {
        assert_eq!(working_days(date(2025, 3, 5), date(2025, 3, 5)).unwrap().count, 1);
    }

    #[test]
    fn month_range_handles_february_and_december() {
        let feb = DateRange::month(2, 2024).unwrap();
        assert_eq!(feb.end(), date(2024, 2, 29));
        let dec = DateRange::month(12, 2025).unwrap();
        assert_eq!(dec.end(), date(2025, 12, 31));
        assert_eq!(working_days_in(&DateRange::month(3, 2025).unwrap()).count, 21);
        assert!(DateRange::month(13, 2025).is_err());
        assert!(DateRange::month(0, 2025).is_err());
    }

    #[test]
    fn intersection_clips_to_overlap() {
        let month = DateRange::month(3, 2025).unwrap();
        let leave = DateRange::new(date(2025, 2, 26), date(2025, 3, 4)).unwrap();
        let overlap = month.intersect(&leave).unwrap();
        assert_eq!(overlap.start(), date(2025, 3, 1));
        assert_eq!(overlap.end(), date(2025, 3, 4));

        let april = DateRange::month(4, 2025).unwrap();
        assert!(april.intersect(&leave).is_none());
    }

    #[test]
    fn ten_hour_day_splits_into_eight_and_two() {
        let split = split_hours(10.0);
        assert_eq!(split.regular, 8.0);
        assert_eq!(split.overtime, 2.0);
    }

    #[test]
    fn split_never_goes_negative_or_past_a_day() {
        for worked in [-3.0, 0.0, 4.5, 8.0, 8.01, 23.0, 30.0, f64::NAN] {
            let split = split_hours(worked);
            assert!(split.regular <= REGULAR_HOURS_PER_DAY);
            assert!(split.overtime >= 0.0);
            assert!(split.worked() <= MAX_HOURS_PER_DAY);
        }
        assert_eq!(split_hours(30.0).overtime, 16.0);
        assert_eq!(split_hours(-3.0), HourSplit::default());
    }

    #[test]
    fn utc_bounds_shift_with_reporting_offset() {
        let range = DateRange::new(date(2025, 3, 3), date(2025, 3, 3)).unwrap();
        let dhaka = FixedOffset::east_opt(6 * 3600).unwrap();
        let (from, to) = range.utc_bounds(dhaka);
        assert_eq!(from.to_rfc3339(), "2025-03-02T18:00:00+00:00");
        assert_eq!(to.to_rfc3339(), "2025-03-03T18:00:00+00:00");
    }
}
