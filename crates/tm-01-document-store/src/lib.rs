//! # Document Store
//!
//! **Subsystem ID:** 1
//!
//! ## Purpose
//!
//! Keyed JSON documents with a single correctness primitive: an atomic
//! multi-document read-modify-write transaction with optimistic conflict
//! detection. Every other subsystem builds its guarantees on it.
//!
//! ## Guarantees
//!
//! | Guarantee | Enforcement |
//! |-----------|-------------|
//! | Serializable commits | `DocumentStore::commit` validates every observed version under one lock |
//! | No partial writes | the write set is applied only after validation succeeds |
//! | Read-your-writes | `Transaction` overlays its buffered writes on reads and queries |
//! | Bounded retry | `StoreClient::run_transaction` re-runs the body on conflict up to `max_attempts` |
//!
//! ```text
//! body(tx) ──reads──→ [store]   (record first-observed versions)
//!    │
//!    └──writes──→ buffer ──commit(batch)──→ OK ─→ return value
//!                                   │
//!                                   └─ Conflict ─→ re-run body (fresh tx)
//! ```
//!
//! A body MUST NOT perform non-idempotent external calls: it may run more than
//! once.

pub mod adapters;
pub mod client;
pub mod domain;
pub mod ports;

pub use adapters::InMemoryDocumentStore;
pub use client::{StoreClient, StoreConfig, StoreStats};
pub use domain::{StoreError, Transaction};
pub use ports::{CommitBatch, DocumentStore, ScanResult, Version, VersionedDoc, WriteOp};
