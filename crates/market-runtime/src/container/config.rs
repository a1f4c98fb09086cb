//! # Market Configuration
//!
//! Unified configuration for every component and runtime parameter.
//!
//! ## Requirements
//!
//! - Fees and floors have sane defaults with environment overrides
//! - The post-fee floor can only be raised, never lowered below the hard floor

use std::env;
use std::str::FromStr;

use tm_01_document_store::StoreConfig;
use tm_03_task_lifecycle::{TaskLifecycleConfig, HARD_MIN_POST_BALANCE};
use tm_04_offer_negotiation::{InsufficientFundsPolicy, OfferConfig};
use tracing::warn;

/// Complete marketplace configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarketConfig {
    /// Document store / transaction configuration.
    pub store: StoreConfig,
    /// Task lifecycle economics.
    pub tasks: TaskLifecycleConfig,
    /// Offer economics and insufficient-funds policy.
    pub offers: OfferConfig,
    /// Event bus configuration.
    pub bus: BusConfig,
}

/// Event bus configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Records buffered per subscriber before it lags.
    pub capacity: usize,
    /// How long handlers remember processed event ids (ms).
    pub dedup_retention_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
            dedup_retention_ms: shared_bus::ProcessedEventCache::DEFAULT_RETENTION_MS,
        }
    }
}

impl MarketConfig {
    /// Load configuration from environment variables on top of the defaults.
    ///
    /// # Environment Variables
    ///
    /// - `TM_POST_FEE`, `TM_MIN_POST_BALANCE`
    /// - `TM_ACCEPT_FEE`, `TM_DIRECT_CONTACT_FEE`
    /// - `TM_TOPUP_GRACE_SECS`, `TM_INSUFFICIENT_FUNDS_POLICY` (`reject` | `hold`)
    /// - `TM_TX_MAX_ATTEMPTS`
    /// - `TM_BUS_CAPACITY`
    ///
    /// Unparseable values are logged and ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        override_from_env("TM_POST_FEE", &mut config.tasks.post_fee);
        override_from_env("TM_MIN_POST_BALANCE", &mut config.tasks.min_post_balance);
        override_from_env("TM_ACCEPT_FEE", &mut config.offers.accept_fee);
        override_from_env("TM_DIRECT_CONTACT_FEE", &mut config.offers.direct_contact_fee);
        override_from_env(
            "TM_INSUFFICIENT_FUNDS_POLICY",
            &mut config.offers.insufficient_funds,
        );
        override_from_env("TM_TX_MAX_ATTEMPTS", &mut config.store.max_attempts);
        override_from_env("TM_BUS_CAPACITY", &mut config.bus.capacity);

        let mut grace_secs = config.offers.top_up_grace_ms / 1000;
        override_from_env("TM_TOPUP_GRACE_SECS", &mut grace_secs);
        config.offers.top_up_grace_ms = grace_secs.saturating_mul(1000);

        config
    }

    /// Validate configuration before the runtime starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tasks.min_post_balance < HARD_MIN_POST_BALANCE {
            return Err(ConfigError::MinBalanceBelowFloor(self.tasks.min_post_balance));
        }
        if self.store.max_attempts == 0 {
            return Err(ConfigError::Invalid("TM_TX_MAX_ATTEMPTS must be at least 1"));
        }
        if self.bus.capacity == 0 {
            return Err(ConfigError::Invalid("TM_BUS_CAPACITY must be at least 1"));
        }
        if self.offers.insufficient_funds == InsufficientFundsPolicy::HoldForTopUp
            && self.offers.top_up_grace_ms == 0
        {
            return Err(ConfigError::Invalid(
                "TM_TOPUP_GRACE_SECS must be positive when holding for top-up",
            ));
        }
        Ok(())
    }
}

fn override_from_env<T: FromStr>(key: &str, slot: &mut T) {
    let Ok(raw) = env::var(key) else {
        return;
    };
    match raw.parse() {
        Ok(value) => *slot = value,
        Err(_) => warn!(key, value = %raw, "Ignoring unparseable configuration value"),
    }
}

/// Configuration errors.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Configured posting floor is below the hard floor.
    MinBalanceBelowFloor(u64),
    /// Any other out-of-range value.
    Invalid(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::MinBalanceBelowFloor(value) => write!(
                f,
                "TM_MIN_POST_BALANCE={value} is below the hard floor of {HARD_MIN_POST_BALANCE}"
            ),
            ConfigError::Invalid(reason) => f.write_str(reason),
        }
    }
}

impl std::error::Error for ConfigError {}
