//! # Offer Negotiation State Machine
//!
//! **Subsystem ID:** 4
//!
//! ## Purpose
//!
//! Owns offer status and the bilateral counter fields. Acceptance is the one
//! cross-entity transaction of the marketplace:
//!
//! ```text
//! accept_offer(poster, offer)
//!     │
//!     ├── offer + parent task re-read
//!     ├── actor checked against the task's poster
//!     ├── edge checked (terminal offers always fail)
//!     ├── task must still be listed
//!     ├── helper must be allowed in the task category
//!     ├── acceptance fee charged to the helper (public offers only)
//!     └── task assigned + offer accepted
//!                ↓
//!          one commit or nothing
//! ```
//!
//! Two accepts racing on different offers of one task both read a listed
//! task; the store rejects the second commit and its retry sees the task
//! assigned, failing `task_not_open`.

pub mod config;
pub mod domain;
pub mod service;

pub use config::{InsufficientFundsPolicy, OfferConfig};
pub use domain::{
    effective_status, next_status, AcceptOutcome, InviteOutcome, OfferError, OfferSubmission,
    OfferTransition,
};
pub use service::OfferNegotiation;
