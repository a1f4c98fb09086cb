//! The recompute function.

use super::category::normalize_category_id;
use shared_types::{CategoryProof, ProofMode};
use std::collections::BTreeSet;

/// Allowed category set for one user's proofs.
///
/// Physical-mode proofs count only when `basic_approved`.
#[must_use]
pub fn compute_allowed(proofs: &[CategoryProof], basic_approved: bool) -> BTreeSet<String> {
    proofs
        .iter()
        .filter(|p| p.status.is_approved())
        .filter(|p| p.mode == ProofMode::Online || basic_approved)
        .map(|p| normalize_category_id(&p.category_id))
        .filter(|id| !id.is_empty())
        .collect()
}
