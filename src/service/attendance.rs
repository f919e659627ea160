use std::collections::{BTreeMap, BTreeSet};

use chrono::{FixedOffset, NaiveDate};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::error::AppResult;
use crate::model::attendance::AttendanceEvent;
use crate::service::calculator::{DateRange, hours_between, round2, split_hours};
use crate::store::Store;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct DayHours {
    pub regular: f64,
    pub overtime: f64,
    /// False while the session has no check-out; such days count as present
    /// but contribute no hours.
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, ToSchema)]
pub struct AttendanceHours {
    #[schema(value_type = Object)]
    pub per_day: BTreeMap<NaiveDate, DayHours>,
    pub total_regular: f64,
    pub total_overtime: f64,
}

impl AttendanceHours {
    /// Every local day with an attendance event, complete or not.
    pub fn present_days(&self) -> BTreeSet<NaiveDate> {
        self.per_day.keys().copied().collect()
    }
}

/// Loads one employee's events for `range` and folds them into per-day hours.
pub async fn aggregate_attendance(
    store: &dyn Store,
    employee_id: u64,
    range: &DateRange,
    offset: FixedOffset,
) -> AppResult<AttendanceHours> {
    let (from, to) = range.utc_bounds(offset);
    let events = store.fetch_attendance(employee_id, from, to).await?;
    Ok(aggregate_events(employee_id, &events, range, offset))
}

/// Pure fold over already-loaded events.
///
/// Events are bucketed by the local date of `check_in_time`. When a day has
/// several events the one with the latest check-in wins and the rest are
/// dropped with a warning.
pub fn aggregate_events(
    employee_id: u64,
    events: &[AttendanceEvent],
    range: &DateRange,
    offset: FixedOffset,
) -> AttendanceHours {
    let mut by_day: BTreeMap<NaiveDate, &AttendanceEvent> = BTreeMap::new();

    for event in events.iter().filter(|e| e.employee_id == employee_id) {
        let day = event.check_in_time.with_timezone(&offset).date_naive();
        if !range.contains(day) {
            continue;
        }

        match by_day.get(&day).copied() {
            Some(kept) => {
                warn!(
                    employee_id,
                    %day,
                    kept_event = kept.id,
                    other_event = event.id,
                    "Multiple attendance events on one day, keeping the latest check-in"
                );
                if event.check_in_time > kept.check_in_time {
                    by_day.insert(day, event);
                }
            }
            None => {
                by_day.insert(day, event);
            }
        }
    }

    let mut out = AttendanceHours::default();

    for (day, event) in by_day {
        let hours = match event.check_out_time {
            Some(check_out) if check_out >= event.check_in_time => {
                let split = split_hours(hours_between(event.check_in_time, check_out));
                DayHours {
                    regular: split.regular,
                    overtime: split.overtime,
                    complete: true,
                }
            }
            Some(_) => {
                warn!(employee_id, %day, event = event.id, "Check-out before check-in, counting no hours");
                DayHours {
                    regular: 0.0,
                    overtime: 0.0,
                    complete: false,
                }
            }
            None => DayHours {
                regular: 0.0,
                overtime: 0.0,
                complete: false,
            },
        };

        out.total_regular += hours.regular;
        out.total_overtime += hours.overtime;
        out.per_day.insert(day, hours);
    }

    out.total_regular = round2(out.total_regular);
    out.total_overtime = round2(out.total_overtime);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn event(id: u64, check_in: &str, check_out: Option<&str>) -> AttendanceEvent {
        AttendanceEvent {
            id,
            employee_id: 7,
            check_in_time: utc(check_in),
            check_out_time: check_out.map(utc),
        }
    }

    fn march() -> DateRange {
        DateRange::month(3, 2025).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    #[test]
    fn nine_to_seven_is_eight_regular_two_overtime() {
        let events = [event(1, "2025-03-03T09:00:00Z", Some("2025-03-03T19:00:00Z"))];
        let hours = aggregate_events(7, &events, &march(), FixedOffset::east_opt(0).unwrap());

        let monday = hours.per_day[&day(3)];
        assert_eq!(monday.regular, 8.0);
        assert_eq!(monday.overtime, 2.0);
        assert!(monday.complete);
        assert_eq!(hours.total_regular, 8.0);
        assert_eq!(hours.total_overtime, 2.0);
    }

    #[test]
    fn open_session_is_present_without_hours() {
        let events = [event(1, "2025-03-04T08:00:00Z", None)];
        let hours = aggregate_events(7, &events, &march(), FixedOffset::east_opt(0).unwrap());

        let tuesday = hours.per_day[&day(4)];
        assert!(!tuesday.complete);
        assert_eq!(tuesday.regular + tuesday.overtime, 0.0);
        assert!(hours.present_days().contains(&day(4)));
    }

    #[test]
    fn latest_check_in_wins_on_duplicate_days() {
        let events = [
            event(1, "2025-03-05T13:00:00Z", Some("2025-03-05T15:00:00Z")),
            event(2, "2025-03-05T08:00:00Z", Some("2025-03-05T18:00:00Z")),
        ];
        let hours = aggregate_events(7, &events, &march(), FixedOffset::east_opt(0).unwrap());

        assert_eq!(hours.per_day.len(), 1);
        assert_eq!(hours.per_day[&day(5)].regular, 2.0);
        assert_eq!(hours.per_day[&day(5)].overtime, 0.0);
    }

    #[test]
    fn days_are_cut_in_reporting_timezone() {
        // 20:00 UTC on the 3rd is already the 4th at UTC+6
        let events = [event(1, "2025-03-03T20:00:00Z", Some("2025-03-04T04:00:00Z"))];
        let dhaka = FixedOffset::east_opt(6 * 3600).unwrap();
        let hours = aggregate_events(7, &events, &march(), dhaka);

        assert!(hours.per_day.contains_key(&day(4)));
        assert!(!hours.per_day.contains_key(&day(3)));
    }

    #[test]
    fn per_day_hours_respect_split_rules() {
        let events = [
            event(1, "2025-03-03T06:00:00Z", Some("2025-03-04T05:00:00Z")),
            event(2, "2025-03-05T09:00:00Z", Some("2025-03-05T12:30:00Z")),
            event(3, "2025-03-06T09:00:00Z", Some("2025-03-06T08:00:00Z")),
        ];
        let hours = aggregate_events(7, &events, &march(), FixedOffset::east_opt(0).unwrap());

        for day_hours in hours.per_day.values() {
            assert!(day_hours.regular <= 8.0);
            assert!(day_hours.overtime >= 0.0);
            assert!(day_hours.regular + day_hours.overtime <= 24.0);
        }
        assert_eq!(hours.per_day[&day(3)].overtime, 15.0);
        assert_eq!(hours.per_day[&day(5)].regular, 3.5);
        assert!(!hours.per_day[&day(6)].complete);
    }

    #[test]
    fn events_outside_range_or_for_others_are_ignored() {
        let mut other = event(2, "2025-03-10T09:00:00Z", Some("2025-03-10T17:00:00Z"));
        other.employee_id = 99;
        let events = [event(1, "2025-04-01T09:00:00Z", Some("2025-04-01T17:00:00Z")), other];
        let hours = aggregate_events(7, &events, &march(), FixedOffset::east_opt(0).unwrap());
        assert!(hours.per_day.is_empty());
    }
}
