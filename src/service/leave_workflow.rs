use std::sync::Arc;

use chrono::{Datelike, NaiveDate, Utc};
use tracing::{info, instrument, warn};

use crate::error::{AppError, AppResult};
use crate::model::leave_request::{LeaveBalanceView, LeaveRequest, LeaveStatus, LeaveTypeCode};
use crate::service::calculator::{WorkingDays, working_days};
use crate::service::transitions::{LeaveAction, Lifecycle};
use crate::store::{
    BalanceDebit, LeaveFilter, LeaveStatusUpdate, LeaveUpdateOutcome, NewLeaveRequest, Store,
};

/// Leave requests from submission to a terminal status.
///
/// Approval of a capped leave type flips the status and debits the yearly
/// balance in one transaction, so a retried approval finds the request no
/// longer pending and debits nothing.
pub struct LeaveWorkflow {
    store: Arc<dyn Store>,
}

impl LeaveWorkflow {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Same calculator the submission uses; exposed for client previews.
    pub fn preview(&self, start: NaiveDate, end: NaiveDate) -> AppResult<WorkingDays> {
        working_days(start, end)
    }

    #[instrument(skip(self))]
    pub async fn submit(
        &self,
        employee_id: u64,
        leave_type: LeaveTypeCode,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<LeaveRequest> {
        let days = working_days(start_date, end_date)?;
        if days.count == 0 {
            return Err(AppError::InvalidRange {
                start: start_date,
                end: end_date,
                reason: "range contains no working days",
            });
        }

        if leave_type.is_capped() {
            let year = start_date.year();
            let balances = self.store.fetch_leave_balance(employee_id, year).await?;
            let balance = balances
                .iter()
                .find(|b| b.leave_type == leave_type)
                .ok_or_else(|| {
                    AppError::validation("leave_type", format!("no {leave_type} balance for {year}"))
                })?;

            if !balance.covers(days.count) {
                return Err(AppError::validation(
                    "number_of_days",
                    format!(
                        "{} days requested but only {} remaining",
                        days.count,
                        balance.remaining_days().unwrap_or_default()
                    ),
                ));
            }
        }

        let new = NewLeaveRequest {
            employee_id,
            leave_type,
            start_date,
            end_date,
            number_of_days: days.count,
        };
        let id = self.store.insert_leave_request(&new).await?;
        info!(leave_id = id, employee_id, days = days.count, "Leave request submitted");

        Ok(LeaveRequest {
            id,
            employee_id,
            leave_type,
            start_date,
            end_date,
            number_of_days: days.count,
            status: LeaveStatus::Pending,
            rejection_reason: None,
            approved_by: None,
            approved_at: None,
            created_at: Some(Utc::now()),
        })
    }

    #[instrument(skip(self))]
    pub async fn approve(&self, id: u64, approver_id: u64) -> AppResult<LeaveRequest> {
        let request = self.get(id).await?;
        let debit = request.leave_type.is_capped().then(|| BalanceDebit {
            employee_id: request.employee_id,
            leave_type: request.leave_type,
            year: request.start_date.year(),
            days: request.number_of_days,
        });

        self.transition(request, LeaveAction::Approve, Some(approver_id), None, None, debit)
            .await
    }

    #[instrument(skip(self, reason))]
    pub async fn reject(&self, id: u64, approver_id: u64, reason: &str) -> AppResult<LeaveRequest> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("reason", "a rejection reason is required"));
        }

        let request = self.get(id).await?;
        self.transition(
            request,
            LeaveAction::Reject,
            Some(approver_id),
            Some(reason.to_string()),
            None,
            None,
        )
        .await
    }

    /// Only the employee who asked for the leave may withdraw it.
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: u64, requester_employee_id: u64) -> AppResult<LeaveRequest> {
        let request = self.get(id).await?;
        if request.employee_id != requester_employee_id {
            warn!(leave_id = id, requester_employee_id, "Cancel attempt on another employee's leave");
            return Err(AppError::Forbidden);
        }

        self.transition(
            request,
            LeaveAction::Cancel,
            None,
            None,
            Some(requester_employee_id),
            None,
        )
        .await
    }

    pub async fn get(&self, id: u64) -> AppResult<LeaveRequest> {
        self.store
            .get_leave_request(id)
            .await?
            .ok_or_else(|| AppError::not_found("leave request"))
    }

    pub async fn list(&self, filter: LeaveFilter) -> AppResult<(Vec<LeaveRequest>, i64)> {
        self.store.list_leave_requests(filter).await
    }

    pub async fn balances(&self, employee_id: u64, year: i32) -> AppResult<Vec<LeaveBalanceView>> {
        let balances = self.store.fetch_leave_balance(employee_id, year).await?;
        Ok(balances.iter().map(LeaveBalanceView::from).collect())
    }

    async fn transition(
        &self,
        request: LeaveRequest,
        action: LeaveAction,
        actor_id: Option<u64>,
        reason: Option<String>,
        requester: Option<u64>,
        debit: Option<BalanceDebit>,
    ) -> AppResult<LeaveRequest> {
        let conflict = || AppError::StateConflict {
            entity: "leave request",
            id: request.id,
            expected: LeaveStatus::Pending.to_string(),
        };

        let next = request.status.next(action).ok_or_else(conflict)?;
        let update = LeaveStatusUpdate {
            to: next,
            actor_id,
            reason,
            at: Utc::now(),
            requester,
            debit,
        };

        match self.store.update_leave_request_status(request.id, &update).await? {
            LeaveUpdateOutcome::Applied => {}
            LeaveUpdateOutcome::NotPending => return Err(conflict()),
            LeaveUpdateOutcome::MissingBalance => {
                return Err(AppError::validation(
                    "leave_type",
                    format!("no {} balance for {}", request.leave_type, request.start_date.year()),
                ));
            }
            LeaveUpdateOutcome::InsufficientBalance => {
                return Err(AppError::validation(
                    "number_of_days",
                    "leave balance no longer covers this request",
                ));
            }
        }

        info!(leave_id = request.id, from = %request.status, to = %next, "Leave request status changed");

        let mut updated = request;
        updated.status = next;
        match next {
            LeaveStatus::Approved => {
                updated.approved_by = update.actor_id;
                updated.approved_at = Some(update.at);
            }
            LeaveStatus::Rejected => {
                updated.approved_by = update.actor_id;
                updated.rejection_reason = update.reason;
            }
            LeaveStatus::Pending | LeaveStatus::Cancelled => {}
        }
        Ok(updated)
    }
}
