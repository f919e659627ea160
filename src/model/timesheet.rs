use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
pub enum DayStatus {
    Present,
    Absent,
    #[serde(rename = "Half-Day")]
    #[strum(serialize = "Half-Day")]
    HalfDay,
}

impl DayStatus {
    /// Fraction of a day credited to the project.
    pub fn day_credit(self) -> f64 {
        match self {
            DayStatus::Present => 1.0,
            DayStatus::HalfDay => 0.5,
            DayStatus::Absent => 0.0,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString, AsRefStr,
)]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// One staff member's day on one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Timesheet {
    pub id: u64,
    pub staff_id: u64,
    pub project_id: u64,
    pub project_name: String,
    #[schema(example = "2025-03-03", format = "date", value_type = String)]
    pub work_date: NaiveDate,
    #[schema(example = "08:00:00", value_type = Option<String>)]
    pub check_in: Option<NaiveTime>,
    #[schema(example = "17:00:00", value_type = Option<String>)]
    pub check_out: Option<NaiveTime>,
    /// Includes `overtime_hours`
    pub total_hours: f64,
    pub overtime_hours: f64,
    pub status: DayStatus,
    pub approval_status: ApprovalStatus,
    /// Only set when the row carries overtime
    pub ot_approval_status: Option<ApprovalStatus>,
}

impl Timesheet {
    pub fn is_approved(&self) -> bool {
        self.approval_status == ApprovalStatus::Approved
    }

    /// Overtime that may be paid: zero unless the overtime itself was approved.
    pub fn payable_overtime(&self) -> f64 {
        if self.overtime_hours > 0.0 && self.ot_approval_status == Some(ApprovalStatus::Approved) {
            self.overtime_hours
        } else {
            0.0
        }
    }

    /// Hours that may be paid, dropping overtime that was never approved.
    pub fn payable_hours(&self) -> f64 {
        let unapproved_ot = self.overtime_hours.max(0.0) - self.payable_overtime();
        (self.total_hours - unapproved_ot).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn row(total: f64, ot: f64, ot_status: Option<ApprovalStatus>) -> Timesheet {
        Timesheet {
            id: 1,
            staff_id: 1,
            project_id: 10,
            project_name: "Tower A".into(),
            work_date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            check_in: None,
            check_out: None,
            total_hours: total,
            overtime_hours: ot,
            status: DayStatus::Present,
            approval_status: ApprovalStatus::Approved,
            ot_approval_status: ot_status,
        }
    }

    #[test]
    fn unapproved_overtime_is_not_payable() {
        let pending = row(10.0, 2.0, Some(ApprovalStatus::Pending));
        assert_eq!(pending.payable_overtime(), 0.0);
        assert_eq!(pending.payable_hours(), 8.0);

        let approved = row(10.0, 2.0, Some(ApprovalStatus::Approved));
        assert_eq!(approved.payable_overtime(), 2.0);
        assert_eq!(approved.payable_hours(), 10.0);
    }

    #[test]
    fn half_day_parses_with_hyphen() {
        assert_eq!(DayStatus::from_str("Half-Day").ok(), Some(DayStatus::HalfDay));
        assert_eq!(DayStatus::HalfDay.to_string(), "Half-Day");
        assert_eq!(DayStatus::HalfDay.day_credit(), 0.5);
    }
}
