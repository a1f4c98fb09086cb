//! Posting fee configuration.

use shared_types::PlatformSettings;

/// Minimum balance a poster must keep above the fee, whatever the settings say.
pub const HARD_MIN_POST_BALANCE: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLifecycleConfig {
    /// Coins charged once per published task.
    pub post_fee: u64,
    /// Balance required on top of the fee to publish.
    pub min_post_balance: u64,
}

impl Default for TaskLifecycleConfig {
    fn default() -> Self {
        Self {
            post_fee: 20,
            min_post_balance: HARD_MIN_POST_BALANCE,
        }
    }
}

impl TaskLifecycleConfig {
    /// `(min_balance, post_fee)` after applying operator overrides.
    #[must_use]
    pub fn effective(&self, settings: &PlatformSettings) -> (u64, u64) {
        let min_balance = settings
            .min_post_balance
            .unwrap_or(self.min_post_balance)
            .max(HARD_MIN_POST_BALANCE);
        let post_fee = settings.post_fee.unwrap_or(self.post_fee);
        (min_balance, post_fee)
    }
}
