//! # Store Client
//!
//! The injected handle every component uses to reach the store. There is no
//! global store instance.

use crate::adapters::InMemoryDocumentStore;
use crate::domain::{StoreError, Transaction};
use crate::ports::DocumentStore;
use shared_types::{Document, SystemTimeSource, TimeSource, Timestamp};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Configuration for transaction execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Attempts per transaction before giving up on conflicts.
    pub max_attempts: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { max_attempts: 5 }
    }
}

/// Counters kept across all transactions run by a client (and its clones).
#[derive(Debug, Default)]
pub struct StoreStats {
    commits: AtomicU64,
    conflicts: AtomicU64,
    exhausted: AtomicU64,
}

impl StoreStats {
    #[must_use]
    pub fn commits(&self) -> u64 {
        self.commits.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn conflicts(&self) -> u64 {
        self.conflicts.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn exhausted(&self) -> u64 {
        self.exhausted.load(Ordering::Relaxed)
    }
}

#[derive(Clone)]
pub struct StoreClient {
    store: Arc<dyn DocumentStore>,
    time: Arc<dyn TimeSource>,
    config: StoreConfig,
    stats: Arc<StoreStats>,
}

impl StoreClient {
    pub fn new(store: Arc<dyn DocumentStore>, time: Arc<dyn TimeSource>, config: StoreConfig) -> Self {
        Self {
            store,
            time,
            config,
            stats: Arc::new(StoreStats::default()),
        }
    }

    /// Client over a fresh in-memory store on the system clock.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryDocumentStore::new()),
            Arc::new(SystemTimeSource),
            StoreConfig::default(),
        )
    }

    /// Runs `body` as one atomic transaction.
    ///
    /// The body is re-executed from scratch against a fresh snapshot whenever
    /// commit reports a conflict, up to `max_attempts` times. An error from
    /// the body aborts the transaction with nothing written.
    pub fn run_transaction<T, E, F>(&self, mut body: F) -> Result<T, E>
    where
        F: FnMut(&mut Transaction<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            let mut tx = Transaction::new(self.store.as_ref(), self.time.now(), attempt);
            let value = body(&mut tx)?;
            match self.store.commit(tx.into_batch()) {
                Ok(()) => {
                    self.stats.commits.fetch_add(1, Ordering::Relaxed);
                    return Ok(value);
                }
                Err(StoreError::Conflict(on)) => {
                    self.stats.conflicts.fetch_add(1, Ordering::Relaxed);
                    debug!(attempt, max_attempts, conflict = %on, "Transaction conflict, retrying");
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.stats.exhausted.fetch_add(1, Ordering::Relaxed);
        warn!(attempts = max_attempts, "Transaction retries exhausted");
        Err(StoreError::RetriesExhausted {
            attempts: max_attempts,
        }
        .into())
    }

    /// Single-document read outside any transaction.
    pub fn get<D: Document>(&self, id: &str) -> Result<Option<D>, StoreError> {
        let mut tx = Transaction::new(self.store.as_ref(), self.time.now(), 1);
        tx.get(id)
    }

    /// Prefix query outside any transaction.
    pub fn query<D: Document>(&self, id_prefix: &str) -> Result<Vec<D>, StoreError> {
        let mut tx = Transaction::new(self.store.as_ref(), self.time.now(), 1);
        tx.query(id_prefix)
    }

    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.time.now()
    }

    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }
}
