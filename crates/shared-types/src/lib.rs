//! # Shared Types Crate
//!
//! This crate contains all marketplace documents, the identity envelope and
//! the caller-facing error taxonomy shared by every subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-subsystem types are defined here.
//! - **Validated Records**: Every stored document implements [`Document`] and
//!   is validated at the transaction boundary; nothing is silently defaulted.
//! - **Envelope Authority**: Request payloads MUST NOT contain acting-user
//!   fields; the identity claims on [`AuthenticatedCall`] are authoritative.

pub mod entities;
pub mod envelope;
pub mod errors;
pub mod paths;
pub mod time;

pub use entities::*;
pub use envelope::{AuthenticatedCall, IdentityClaims, Role};
pub use errors::*;
pub use paths::{Collection, DocPath};
pub use time::{MockTimeSource, SystemTimeSource, TimeSource, Timestamp};
