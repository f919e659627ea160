use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::error::{AppError, AppResult};
use crate::model::summary::{MonthlySummary, SummaryStatus};
use crate::service::signature::validate_signature;
use crate::service::summary::load_for_period;
use crate::service::transitions::{Lifecycle, SummaryAction};
use crate::store::{Store, SummaryFilter};

/// Staff signing and admin approval of monthly summaries.
///
/// Each operation reads the summary, computes the next state from the
/// transition table and writes the status and signatures back conditioned
/// on the status it read. Figures written by a concurrent regeneration are
/// never overwritten.
/// If another caller got there first the write matches no row and the
/// caller receives `StateConflict`.
pub struct SummaryApproval {
    store: Arc<dyn Store>,
}

impl SummaryApproval {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: u64) -> AppResult<MonthlySummary> {
        self.store
            .get_summary(id)
            .await?
            .ok_or_else(|| AppError::not_found("summary"))
    }

    pub async fn for_period(
        &self,
        employee_id: u64,
        month: u32,
        year: i32,
    ) -> AppResult<MonthlySummary> {
        load_for_period(self.store.as_ref(), employee_id, month, year).await
    }

    pub async fn list(&self, filter: SummaryFilter) -> AppResult<(Vec<MonthlySummary>, i64)> {
        self.store.list_summaries(filter).await
    }

    #[instrument(skip(self, signature))]
    pub async fn sign(
        &self,
        id: u64,
        signer_employee_id: u64,
        signature: &str,
    ) -> AppResult<MonthlySummary> {
        validate_signature("signature", signature)?;

        let current = self.get(id).await?;
        if current.employee_id != signer_employee_id {
            warn!(summary_id = id, signer_employee_id, "Sign attempt on another employee's summary");
            return Err(AppError::Forbidden);
        }

        let signature = signature.trim().to_string();
        self.apply(current, SummaryAction::Sign, move |summary| {
            summary.clear_signatures();
            summary.staff_signature = Some(signature);
            summary.staff_signed_at = Some(Utc::now());
        })
        .await
    }

    #[instrument(skip(self, admin_signature))]
    pub async fn approve(&self, id: u64, admin_signature: &str) -> AppResult<MonthlySummary> {
        validate_signature("signature", admin_signature)?;

        let current = self.get(id).await?;
        let signature = admin_signature.trim().to_string();
        self.apply(current, SummaryAction::Approve, move |summary| {
            summary.admin_signature = Some(signature);
            summary.admin_approved_at = Some(Utc::now());
            summary.admin_remarks = None;
        })
        .await
    }

    /// The staff signature stays on the record until the next `sign`.
    #[instrument(skip(self, remarks))]
    pub async fn reject(&self, id: u64, remarks: &str) -> AppResult<MonthlySummary> {
        let remarks = remarks.trim();
        if remarks.is_empty() {
            return Err(AppError::validation("remarks", "remarks are required when rejecting"));
        }

        let current = self.get(id).await?;
        let remarks = remarks.to_string();
        self.apply(current, SummaryAction::Reject, move |summary| {
            summary.admin_remarks = Some(remarks);
        })
        .await
    }

    async fn apply(
        &self,
        current: MonthlySummary,
        action: SummaryAction,
        mutate: impl FnOnce(&mut MonthlySummary),
    ) -> AppResult<MonthlySummary> {
        let Some(next) = current.status.next(action) else {
            return Err(refusal(&current, action));
        };

        let mut updated = current.clone();
        mutate(&mut updated);
        updated.status = next;

        if !self
            .store
            .update_summary_signatures_if(&updated, current.status)
            .await?
        {
            warn!(summary_id = current.id, ?action, "Summary changed underneath a transition");
            return Err(AppError::StateConflict {
                entity: "summary",
                id: current.id,
                expected: current.status.to_string(),
            });
        }

        info!(
            summary_id = updated.id,
            from = %current.status,
            to = %updated.status,
            "Summary status changed"
        );
        self.get(updated.id).await
    }
}

fn refusal(current: &MonthlySummary, action: SummaryAction) -> AppError {
    if action == SummaryAction::Sign && current.status == SummaryStatus::SignedByStaff {
        return AppError::AlreadySigned { id: current.id };
    }
    let expected = SummaryStatus::sources(action)
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" or ");
    AppError::StateConflict {
        entity: "summary",
        id: current.id,
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::employee::HoursSource;
    use crate::service::signature::sample_signature;
    use crate::service::summary::SummaryBuilder;
    use crate::store::MockStore;
    use crate::store::memory::MemoryStore;
    use chrono::FixedOffset;

    async fn draft_for(store: &Arc<MemoryStore>, employee_id: u64) -> MonthlySummary {
        store.add_employee(employee_id, HoursSource::Attendance);
        SummaryBuilder::new(store.clone(), FixedOffset::east_opt(0).unwrap(), 1)
            .generate_or_refresh(employee_id, 3, 2025)
            .await
            .unwrap()
            .summary
    }

    fn bare_summary(status: SummaryStatus) -> MonthlySummary {
        MonthlySummary {
            id: 5,
            employee_id: 1,
            month: 3,
            year: 2025,
            status,
            total_working_days: 21,
            total_worked_hours: 160.0,
            total_ot_hours: 0.0,
            approved_leaves: 0,
            absent_days: 1,
            project_breakdown: Vec::new(),
            staff_signature: None,
            staff_signed_at: None,
            admin_signature: None,
            admin_approved_at: None,
            admin_remarks: None,
        }
    }

    #[actix_web::test]
    async fn sign_then_approve_reaches_approved() {
        let store = Arc::new(MemoryStore::new());
        let draft = draft_for(&store, 1).await;
        let approval = SummaryApproval::new(store.clone());

        let signed = approval.sign(draft.id, 1, &sample_signature()).await.unwrap();
        assert_eq!(signed.status, SummaryStatus::SignedByStaff);
        assert!(signed.staff_signed_at.is_some());

        let approved = approval.approve(draft.id, &sample_signature()).await.unwrap();
        assert_eq!(approved.status, SummaryStatus::Approved);
        assert!(approved.admin_approved_at.is_some());
        assert_eq!(approval.get(draft.id).await.unwrap(), approved);
    }

    #[actix_web::test]
    async fn signing_twice_is_already_signed() {
        let store = Arc::new(MemoryStore::new());
        let draft = draft_for(&store, 1).await;
        let approval = SummaryApproval::new(store.clone());

        approval.sign(draft.id, 1, &sample_signature()).await.unwrap();
        let err = approval.sign(draft.id, 1, &sample_signature()).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadySigned { id } if id == draft.id));
    }

    #[actix_web::test]
    async fn approving_a_draft_is_a_state_conflict() {
        let store = Arc::new(MemoryStore::new());
        let draft = draft_for(&store, 1).await;

        let err = SummaryApproval::new(store.clone())
            .approve(draft.id, &sample_signature())
            .await
            .unwrap_err();
        match err {
            AppError::StateConflict { expected, .. } => assert_eq!(expected, "SIGNED_BY_STAFF"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[actix_web::test]
    async fn reject_requires_remarks_and_keeps_staff_signature() {
        let store = Arc::new(MemoryStore::new());
        let draft = draft_for(&store, 1).await;
        let approval = SummaryApproval::new(store.clone());
        approval.sign(draft.id, 1, &sample_signature()).await.unwrap();

        let err = approval.reject(draft.id, "   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "remarks", .. }));

        let rejected = approval.reject(draft.id, "missing overtime").await.unwrap();
        assert_eq!(rejected.status, SummaryStatus::Rejected);
        assert!(rejected.staff_signature.is_some());
        assert_eq!(rejected.admin_remarks.as_deref(), Some("missing overtime"));
    }

    #[actix_web::test]
    async fn re_signing_after_rejection_clears_the_previous_cycle() {
        let store = Arc::new(MemoryStore::new());
        let draft = draft_for(&store, 1).await;
        let approval = SummaryApproval::new(store.clone());
        approval.sign(draft.id, 1, &sample_signature()).await.unwrap();
        approval.reject(draft.id, "missing overtime").await.unwrap();

        let resigned = approval.sign(draft.id, 1, &sample_signature()).await.unwrap();
        assert_eq!(resigned.status, SummaryStatus::SignedByStaff);
        assert!(resigned.admin_remarks.is_none());
        assert!(resigned.admin_signature.is_none());
    }

    #[actix_web::test]
    async fn only_the_owner_may_sign_and_payload_must_be_png() {
        let store = Arc::new(MemoryStore::new());
        let draft = draft_for(&store, 1).await;
        let approval = SummaryApproval::new(store.clone());

        let err = approval.sign(draft.id, 2, &sample_signature()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let err = approval.sign(draft.id, 1, "").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { field: "signature", .. }));
        assert_eq!(approval.get(draft.id).await.unwrap().status, SummaryStatus::Draft);
    }

    #[actix_web::test]
    async fn losing_the_conditional_update_is_a_state_conflict() {
        let mut store = MockStore::new();
        store
            .expect_get_summary()
            .returning(|_| Ok(Some(bare_summary(SummaryStatus::Draft))));
        store
            .expect_update_summary_signatures_if()
            .withf(|summary, expected| {
                summary.status == SummaryStatus::SignedByStaff && *expected == SummaryStatus::Draft
            })
            .times(1)
            .returning(|_, _| Ok(false));

        let err = SummaryApproval::new(Arc::new(store))
            .sign(5, 1, &sample_signature())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StateConflict { id: 5, .. }));
    }

    #[actix_web::test]
    async fn signing_a_stale_read_keeps_regenerated_figures() {
        let store = Arc::new(MemoryStore::new());
        let draft = draft_for(&store, 1).await;
        let approval = SummaryApproval::new(store.clone());
        let stale = approval.get(draft.id).await.unwrap();
        assert_eq!(stale.total_worked_hours, 0.0);

        // regeneration lands between the signer's read and write
        store.add_attendance(1, "2025-03-03T08:00:00Z", Some("2025-03-03T18:00:00Z"));
        let regenerated = SummaryBuilder::new(store.clone(), FixedOffset::east_opt(0).unwrap(), 1)
            .generate_or_refresh(1, 3, 2025)
            .await
            .unwrap()
            .summary;
        assert_eq!(regenerated.total_worked_hours, 10.0);

        let signature = sample_signature();
        let signed = approval
            .apply(stale, SummaryAction::Sign, move |summary| {
                summary.staff_signature = Some(signature);
                summary.staff_signed_at = Some(Utc::now());
            })
            .await
            .unwrap();

        assert_eq!(signed.status, SummaryStatus::SignedByStaff);
        assert_eq!(signed.total_worked_hours, 10.0);
        assert_eq!(signed.total_ot_hours, 2.0);
        assert_eq!(approval.get(draft.id).await.unwrap(), signed);
    }
}
