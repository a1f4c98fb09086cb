//! Eligibility operations, each one transaction.

use crate::domain::category::normalize_category_id;
use crate::domain::{compute_allowed, EligibilityError};
use shared_types::{BasicApproval, CategoryProof, ProofMode, ProofStatus, UserDoc};
use std::collections::BTreeSet;
use tm_01_document_store::{StoreClient, Transaction};
use tracing::{debug, info};

/// Result of one recompute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecomputeOutcome {
    pub uid: String,
    pub allowed: BTreeSet<String>,
    pub basic_approved: bool,
    /// Whether the derived fields differ from what was stored.
    pub changed: bool,
}

/// Recomputes `uid`'s allowed set inside `tx` and writes it to the user.
pub fn recompute_in(tx: &mut Transaction<'_>, uid: &str) -> Result<RecomputeOutcome, EligibilityError> {
    let mut user: UserDoc = tx
        .get(uid)?
        .ok_or_else(|| EligibilityError::UserNotFound(uid.to_string()))?;
    let basic_approved = tx
        .get::<BasicApproval>(uid)?
        .is_some_and(|basic| basic.status.is_approved());
    let proofs: Vec<CategoryProof> = tx.query(&CategoryProof::prefix_for(uid))?;

    let allowed = compute_allowed(&proofs, basic_approved);
    let changed = user.allowed_category_ids != allowed || user.basic_approved != basic_approved;

    user.allowed_category_ids = allowed.clone();
    user.basic_approved = basic_approved;
    user.allowed_updated_at = Some(tx.now());
    tx.set(&user)?;

    Ok(RecomputeOutcome {
        uid: uid.to_string(),
        allowed,
        basic_approved,
        changed,
    })
}

#[derive(Clone)]
pub struct CategoryEligibility {
    client: StoreClient,
}

impl CategoryEligibility {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    /// Recomputes and stores `uid`'s allowed categories.
    ///
    /// Idempotent: running it twice without input changes yields the same set.
    pub fn recompute(&self, uid: &str) -> Result<RecomputeOutcome, EligibilityError> {
        let outcome = self.client.run_transaction(|tx| recompute_in(tx, uid))?;
        if outcome.changed {
            info!(uid, allowed = ?outcome.allowed, basic_approved = outcome.basic_approved, "Allowed categories updated");
        } else {
            debug!(uid, "Allowed categories unchanged");
        }
        Ok(outcome)
    }

    /// Records (or resubmits) a proof for review.
    ///
    /// An already approved proof is left as is.
    pub fn submit_proof(
        &self,
        uid: &str,
        raw_category: &str,
        mode: ProofMode,
        notes: Option<String>,
    ) -> Result<CategoryProof, EligibilityError> {
        let category_id = canonical(raw_category)?;
        let proof_id = CategoryProof::proof_id(uid, &category_id);

        self.client.run_transaction(|tx| {
            if !tx.exists::<UserDoc>(uid)? {
                return Err(EligibilityError::UserNotFound(uid.to_string()));
            }
            if let Some(existing) = tx.get::<CategoryProof>(&proof_id)? {
                if existing.status.is_approved() {
                    return Ok(existing);
                }
            }
            let proof = CategoryProof {
                uid: uid.to_string(),
                category_id: category_id.clone(),
                status: ProofStatus::Pending,
                mode,
                notes: notes.clone(),
                reviewed_by: None,
                updated_at: tx.now(),
            };
            tx.set(&proof)?;
            Ok(proof)
        })
    }

    /// Admin review of a proof.
    pub fn review_proof(
        &self,
        reviewer: &str,
        uid: &str,
        raw_category: &str,
        status: ProofStatus,
        notes: Option<String>,
    ) -> Result<CategoryProof, EligibilityError> {
        let category_id = canonical(raw_category)?;
        let proof_id = CategoryProof::proof_id(uid, &category_id);

        let proof = self.client.run_transaction(|tx| {
            let mut proof = tx
                .get::<CategoryProof>(&proof_id)?
                .ok_or_else(|| EligibilityError::ProofNotFound(proof_id.clone()))?;
            proof.status = status;
            proof.reviewed_by = Some(reviewer.to_string());
            if notes.is_some() {
                proof.notes = notes.clone();
            }
            proof.updated_at = tx.now();
            tx.set(&proof)?;
            Ok::<_, EligibilityError>(proof)
        })?;
        info!(reviewer, uid, category = %category_id, status = %status, "Category proof reviewed");
        Ok(proof)
    }

    /// Admin decision on a user's basic verification documents.
    pub fn set_basic_approval(
        &self,
        reviewer: &str,
        uid: &str,
        status: ProofStatus,
    ) -> Result<BasicApproval, EligibilityError> {
        let basic = self.client.run_transaction(|tx| {
            if !tx.exists::<UserDoc>(uid)? {
                return Err(EligibilityError::UserNotFound(uid.to_string()));
            }
            let basic = BasicApproval {
                uid: uid.to_string(),
                status,
                reviewed_by: Some(reviewer.to_string()),
                updated_at: tx.now(),
            };
            tx.set(&basic)?;
            Ok(basic)
        })?;
        info!(reviewer, uid, status = %status, "Basic approval set");
        Ok(basic)
    }

    /// Stored allowed set of `uid`.
    pub fn allowed(&self, uid: &str) -> Result<BTreeSet<String>, EligibilityError> {
        self.client
            .get::<UserDoc>(uid)?
            .map(|user| user.allowed_category_ids)
            .ok_or_else(|| EligibilityError::UserNotFound(uid.to_string()))
    }

    /// Every registered user id, in id order.
    pub fn users(&self) -> Result<Vec<String>, EligibilityError> {
        Ok(self
            .client
            .query::<UserDoc>("")?
            .into_iter()
            .map(|user| user.uid)
            .collect())
    }
}

fn canonical(raw: &str) -> Result<String, EligibilityError> {
    let id = normalize_category_id(raw);
    if id.is_empty() {
        Err(EligibilityError::InvalidCategory(raw.to_string()))
    } else {
        Ok(id)
    }
}
