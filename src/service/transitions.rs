//! Allowed status changes, one table per lifecycle.
//!
//! A status change that is not listed here cannot be expressed: callers ask
//! the table for the next state and get `None` for anything illegal.

use crate::model::leave_request::LeaveStatus;
use crate::model::summary::SummaryStatus;

pub trait Lifecycle: Copy + Eq + Sized + 'static {
    type Action: Copy + Eq + 'static;

    const TRANSITIONS: &'static [(Self, Self::Action, Self)];

    fn next(self, action: Self::Action) -> Option<Self> {
        Self::TRANSITIONS
            .iter()
            .find(|(from, on, _)| *from == self && *on == action)
            .map(|(_, _, to)| *to)
    }

    /// States from which `action` is legal.
    fn sources(action: Self::Action) -> Vec<Self> {
        Self::TRANSITIONS
            .iter()
            .filter(|(_, on, _)| *on == action)
            .map(|(from, _, _)| *from)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryAction {
    Sign,
    Approve,
    Reject,
    Regenerate,
}

impl Lifecycle for SummaryStatus {
    type Action = SummaryAction;

    const TRANSITIONS: &'static [(Self, SummaryAction, Self)] = &[
        (SummaryStatus::Draft, SummaryAction::Sign, SummaryStatus::SignedByStaff),
        (SummaryStatus::Rejected, SummaryAction::Sign, SummaryStatus::SignedByStaff),
        (SummaryStatus::SignedByStaff, SummaryAction::Approve, SummaryStatus::Approved),
        (SummaryStatus::SignedByStaff, SummaryAction::Reject, SummaryStatus::Rejected),
        (SummaryStatus::Draft, SummaryAction::Regenerate, SummaryStatus::Draft),
        (SummaryStatus::Rejected, SummaryAction::Regenerate, SummaryStatus::Draft),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveAction {
    Approve,
    Reject,
    Cancel,
}

impl Lifecycle for LeaveStatus {
    type Action = LeaveAction;

    const TRANSITIONS: &'static [(Self, LeaveAction, Self)] = &[
        (LeaveStatus::Pending, LeaveAction::Approve, LeaveStatus::Approved),
        (LeaveStatus::Pending, LeaveAction::Reject, LeaveStatus::Rejected),
        (LeaveStatus::Pending, LeaveAction::Cancel, LeaveStatus::Cancelled),
    ];
}
