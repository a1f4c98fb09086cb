//! # Dispute Resolver
//!
//! **Subsystem ID:** 6
//!
//! Admin compensating transaction: moves coins between the two parties of a
//! dispute and records who did it.
//!
//! | Step | Effect |
//! |------|--------|
//! | Read dispute | Must be open; an identical replay of a resolution is a no-op |
//! | Poster delta | `adjust_in` keyed `dispute:{dispute_id}:{poster_id}` |
//! | Helper delta | `adjust_in` keyed `dispute:{dispute_id}:{helper_id}` |
//! | Close | Dispute resolved, audit record written |
//!
//! All four steps commit together. A negative delta larger than the party's
//! balance fails the whole resolution with `insufficient_funds`.

pub mod domain;
pub mod service;

pub use domain::{DisputeError, OpenDispute, Resolution, ResolveOutcome};
pub use service::DisputeResolver;
