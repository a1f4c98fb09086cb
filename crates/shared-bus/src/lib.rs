//! # Shared Bus - Event Bus for Post-Commit Side Effects
//!
//! Every lifecycle operation commits one atomic transaction and then publishes
//! an immutable [`EventRecord`] describing what changed. Reactive consumers
//! (eligibility recompute, post-fee safety net, moderation, notifications,
//! chat mirroring) subscribe here.
//!
//! ```text
//! ┌──────────────┐   commit    ┌───────────┐   publish()   ┌───────────┐
//! │  Operation   │ ──────────▶ │   Store   │               │ Event Bus │
//! │              │ ──────────────────────────────────────▶ │           │
//! └──────────────┘                                         └─────┬─────┘
//!                                                    subscribe() │
//!                                        ┌───────────────┬───────┴──────┐
//!                                        ▼               ▼              ▼
//!                                   eligibility      post fee     notifications
//! ```
//!
//! ## Delivery Contract
//!
//! - **At-least-once, unordered:** consumers must be idempotent.
//! - **Deduplicated by event id:** [`ProcessedEventCache`] lets a consumer
//!   skip redeliveries of the same record.
//! - **Best-effort:** a dropped or failed delivery never rolls back the
//!   transaction that produced it.
//! - **Lag is visible:** a subscriber that falls behind the channel capacity
//!   gets a [`Delivery::Lagged`] notice in place of the lost records, so it
//!   can rebuild its reactions from the store.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod dedup_cache;
pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use dedup_cache::ProcessedEventCache;
pub use events::{EventFilter, EventRecord, EventTopic, ListingPath, MarketEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Delivery, EventStream, EventSubscriber, Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
