//! Domain layer for the wallet ledger.

pub mod errors;
pub mod keys;
pub mod posting;

pub use errors::LedgerError;
pub use posting::{adjust_in, charge_in, credit_in, EntryRefs, LedgerReceipt, Posting};
