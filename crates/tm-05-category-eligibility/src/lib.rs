//! # Category Eligibility Engine
//!
//! **Subsystem ID:** 5
//!
//! ## Purpose
//!
//! Owns `users/{uid}.allowed_category_ids`. The set is a pure function of the
//! user's current category proofs and basic approval:
//!
//! ```text
//! allowed(uid) = { p.category_id | p ∈ proofs(uid), p.status = approved,
//!                  p.mode = online ∨ basic_approved(uid) }
//! ```
//!
//! Recompute is triggered reactively whenever an input changes. Triggers may
//! fire in any order and any number of times; because recompute reads all
//! inputs inside one transaction and overwrites the derived fields, the
//! result converges to the function of the latest committed inputs.

pub mod domain;
pub mod service;

pub use domain::category::{normalize_category_id, slugify};
pub use domain::{compute_allowed, EligibilityError};
pub use service::{recompute_in, CategoryEligibility, RecomputeOutcome};
