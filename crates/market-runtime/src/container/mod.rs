//! # Component Container
//!
//! Central container holding all component instances with proper lifetime
//! management and dependency injection.

pub mod components;
pub mod config;

pub use components::MarketContainer;
pub use config::{BusConfig, ConfigError, MarketConfig};
