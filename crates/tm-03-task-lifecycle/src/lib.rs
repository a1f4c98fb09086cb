//! # Task Lifecycle Manager
//!
//! **Subsystem ID:** 3
//!
//! ## Purpose
//!
//! Owns task status and the posting fee.
//!
//! ```text
//! [DRAFT] ──publish──→ [LISTED] ──assign_in──→ [ASSIGNED] ──start──→ [IN_PROGRESS] ──complete──→ [COMPLETED]
//!                        │  ↑                       │                      │
//!             moderation │  │ reinstate             └──────── cancel ──────┴──→ [CANCELLED]
//!                        ↓  │
//!                   [UNDER_REVIEW] ──reject──→ [CANCELLED]
//! ```
//!
//! | Stage | Method | Effect |
//! |-------|--------|--------|
//! | Publish | `publish()` | Balance gate, task listed, post fee charged once |
//! | Direct listing | `create_listed()` + `settle_post_fee()` | Fee charged after the fact; an unpaid task still on the board is removed |
//! | Assign | `assign_in()` | Called inside the offer-acceptance transaction |
//! | Moderate | `moderate()` / `resolve_review()` | Flag to review, then reinstate or cancel |
//!
//! The post-fee ledger key `post_fee:{task_id}` is the only idempotency marker
//! for the fee; `post_fee_txn_id` on the task mirrors it.

pub mod config;
pub mod domain;
pub mod service;

pub use config::{TaskLifecycleConfig, HARD_MIN_POST_BALANCE};
pub use domain::{
    assign_in, ModerationOutcome, ModerationVerdict, PublishOutcome, SettleOutcome, TaskError,
    TaskPayload, TaskTransition,
};
pub use service::TaskLifecycle;
