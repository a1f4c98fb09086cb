//! Domain layer for dispute resolution.

pub mod errors;
pub mod resolution;

pub use errors::DisputeError;
pub use resolution::{OpenDispute, Resolution, ResolveOutcome};
