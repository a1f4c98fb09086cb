//! Category eligibility operations.
//!
//! Proof and approval writes only announce that an input changed; the
//! allowed set itself is rebuilt by a recompute, either called directly or
//! driven by the eligibility handler.

use market_telemetry::metric_inc;
use market_telemetry::metrics::ELIGIBILITY_RECOMPUTES;
use shared_bus::MarketEvent;
use shared_types::{AuthenticatedCall, BasicApproval, CategoryProof, ServiceError};
use tm_05_category_eligibility::RecomputeOutcome;
use uuid::Uuid;

use super::{BasicApprovalRequest, MarketplaceService, ProofReview, ProofSubmission, RecomputeRequest};

impl MarketplaceService {
    /// Caller submits (or resubmits) proof for a category.
    pub async fn submit_category_proof(
        &self,
        call: AuthenticatedCall<ProofSubmission>,
    ) -> Result<CategoryProof, ServiceError> {
        let proof = self.observe("submit_category_proof", || {
            let caller = call.require_caller()?;
            let request = &call.payload;
            Ok(self.container.eligibility.submit_proof(
                &caller.uid,
                &request.category_id,
                request.mode,
                request.notes.clone(),
            )?)
        })?;
        self.emit_input_changed(call.correlation_id, &proof.uid).await;
        Ok(proof)
    }

    pub async fn review_category_proof(
        &self,
        call: AuthenticatedCall<ProofReview>,
    ) -> Result<CategoryProof, ServiceError> {
        let proof = self.observe("review_category_proof", || {
            let admin = call.require_admin()?;
            let review = &call.payload;
            Ok(self.container.eligibility.review_proof(
                &admin.uid,
                &review.uid,
                &review.category_id,
                review.status,
                review.notes.clone(),
            )?)
        })?;
        self.emit_input_changed(call.correlation_id, &proof.uid).await;
        Ok(proof)
    }

    pub async fn set_basic_approval(
        &self,
        call: AuthenticatedCall<BasicApprovalRequest>,
    ) -> Result<BasicApproval, ServiceError> {
        let basic = self.observe("set_basic_approval", || {
            let admin = call.require_admin()?;
            let request = &call.payload;
            Ok(self
                .container
                .eligibility
                .set_basic_approval(&admin.uid, &request.uid, request.status)?)
        })?;
        self.emit_input_changed(call.correlation_id, &basic.uid).await;
        Ok(basic)
    }

    /// Rebuilds a user's allowed categories. Users may recompute their own
    /// set; any other target needs an admin.
    pub async fn recompute_allowed_for_user(
        &self,
        call: AuthenticatedCall<RecomputeRequest>,
    ) -> Result<RecomputeOutcome, ServiceError> {
        let outcome = self.observe("recompute_allowed_for_user", || {
            let caller = call.require_caller()?;
            let target = match call.payload.uid.as_deref() {
                Some(uid) if uid != caller.uid => {
                    call.require_admin()?;
                    uid
                }
                _ => caller.uid.as_str(),
            };
            Ok(self.container.eligibility.recompute(target)?)
        })?;
        self.publish_recompute(call.correlation_id, &outcome).await;
        Ok(outcome)
    }

    /// Counts a recompute and announces the new set when it changed.
    pub(crate) async fn publish_recompute(&self, correlation_id: Uuid, outcome: &RecomputeOutcome) {
        if !outcome.changed {
            metric_inc!(ELIGIBILITY_RECOMPUTES, &["unchanged"]);
            return;
        }
        metric_inc!(ELIGIBILITY_RECOMPUTES, &["changed"]);
        self.emit(
            correlation_id,
            MarketEvent::AllowedCategoriesUpdated {
                uid: outcome.uid.clone(),
                allowed: outcome.allowed.iter().cloned().collect(),
            },
        )
        .await;
    }

    async fn emit_input_changed(&self, correlation_id: Uuid, uid: &str) {
        self.emit(
            correlation_id,
            MarketEvent::EligibilityInputChanged {
                uid: uid.to_string(),
            },
        )
        .await;
    }
}
