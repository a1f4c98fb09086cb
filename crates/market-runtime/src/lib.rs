//! # Market Runtime Library
//!
//! Hosts the marketplace transactional core: the component container, the
//! authenticated [`service::MarketplaceService`] facade and the reactive
//! event handlers. The `market-runtime` binary wraps [`MarketRuntime`].
//!
//! ## Architectural Patterns
//!
//! - **Hexagonal**: components own their domain logic behind the store port;
//!   external collaborators sit behind the ports in [`adapters`]
//! - **Event-driven side effects**: every operation commits one transaction,
//!   then publishes; handlers react at-least-once and idempotently

#![allow(clippy::module_name_repetitions)]

pub mod adapters;
pub mod container;
pub mod handlers;
pub mod runtime;
pub mod service;

pub use container::{MarketConfig, MarketContainer};
pub use runtime::{Collaborators, MarketRuntime};
pub use service::MarketplaceService;
