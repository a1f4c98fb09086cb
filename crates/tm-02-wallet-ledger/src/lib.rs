//! # Wallet Ledger
//!
//! **Subsystem ID:** 2
//!
//! ## Purpose
//!
//! The only writer of `users/{uid}.wallet_balance`. Every balance mutation is
//! paired with a write-once [`LedgerEntry`](shared_types::LedgerEntry) stored
//! under a caller-supplied idempotency key, in the same transaction.
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | Balance never negative | `u64` balance; `charge_in` fails before any write |
//! | One mutation per key | `apply` returns the stored entry's result when the key exists |
//! | Entry and balance move together | both written in the caller's transaction |
//!
//! ## Composition
//!
//! `charge_in` / `credit_in` / `adjust_in` run inside a caller's
//! [`Transaction`](tm_01_document_store::Transaction) so that other subsystems
//! can couple a charge with their own state change. [`WalletLedger`] wraps them
//! in standalone transactions.

pub mod domain;
pub mod service;

pub use domain::keys;
pub use domain::{adjust_in, charge_in, credit_in, EntryRefs, LedgerError, LedgerReceipt, Posting};
pub use service::WalletLedger;
