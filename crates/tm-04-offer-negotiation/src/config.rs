//! Offer economics and the insufficient-funds policy.

use std::fmt;
use std::str::FromStr;

/// What `accept_offer` does when the helper cannot pay the acceptance fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsufficientFundsPolicy {
    /// Fail with `insufficient_funds`; nothing is written.
    #[default]
    Reject,
    /// Park the offer in `awaiting_topup` until the grace deadline.
    HoldForTopUp,
}

impl FromStr for InsufficientFundsPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "hold" | "hold_for_top_up" | "hold_for_topup" => Ok(Self::HoldForTopUp),
            other => Err(format!("unknown insufficient funds policy: {other}")),
        }
    }
}

impl fmt::Display for InsufficientFundsPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => f.write_str("reject"),
            Self::HoldForTopUp => f.write_str("hold_for_top_up"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfferConfig {
    /// Flat fee charged to the helper on acceptance of a public offer.
    pub accept_fee: u64,
    /// Fee charged to the poster for inviting a helper directly.
    pub direct_contact_fee: u64,
    /// How long an offer stays in `awaiting_topup`.
    pub top_up_grace_ms: u64,
    pub insufficient_funds: InsufficientFundsPolicy,
}

impl Default for OfferConfig {
    fn default() -> Self {
        Self {
            accept_fee: 25,
            direct_contact_fee: 50,
            top_up_grace_ms: 15 * 60 * 1000,
            insufficient_funds: InsufficientFundsPolicy::Reject,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_parsing() {
        assert_eq!("reject".parse(), Ok(InsufficientFundsPolicy::Reject));
        assert_eq!(" HOLD ".parse(), Ok(InsufficientFundsPolicy::HoldForTopUp));
        assert_eq!(
            "hold_for_top_up".parse::<InsufficientFundsPolicy>().map(|p| p.to_string()),
            Ok("hold_for_top_up".to_string())
        );
        assert!("refund".parse::<InsufficientFundsPolicy>().is_err());
    }
}
