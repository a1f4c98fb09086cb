//! # Processed Event Cache
//!
//! Delivery is at-least-once. Consumers record the ids of records they have
//! handled and skip redeliveries seen within the retention window. Handlers are
//! idempotent regardless; the cache only saves redundant transactions.

use shared_types::Timestamp;
use std::collections::HashMap;
use uuid::Uuid;

/// Time-bounded set of processed event ids.
pub struct ProcessedEventCache {
    /// Event id -> time first processed (ms).
    seen: HashMap<Uuid, Timestamp>,

    retention_ms: u64,

    last_gc: Timestamp,

    gc_interval_ms: u64,
}

impl ProcessedEventCache {
    /// Default retention: 10 minutes.
    pub const DEFAULT_RETENTION_MS: u64 = 10 * 60 * 1000;

    /// Default garbage collection interval.
    pub const DEFAULT_GC_INTERVAL_MS: u64 = 10 * 1000;

    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Self::DEFAULT_RETENTION_MS, Self::DEFAULT_GC_INTERVAL_MS)
    }

    #[must_use]
    pub fn with_config(retention_ms: u64, gc_interval_ms: u64) -> Self {
        Self {
            seen: HashMap::new(),
            retention_ms,
            last_gc: 0,
            gc_interval_ms,
        }
    }

    /// Records `event_id` as processed at `now`.
    ///
    /// Returns `false` when the id was already recorded, in which case the
    /// caller should skip the record.
    pub fn first_delivery(&mut self, event_id: Uuid, now: Timestamp) -> bool {
        if now.saturating_sub(self.last_gc) > self.gc_interval_ms {
            self.garbage_collect(now);
            self.last_gc = now;
        }

        if self.seen.contains_key(&event_id) {
            return false;
        }
        self.seen.insert(event_id, now);
        true
    }

    #[must_use]
    pub fn contains(&self, event_id: &Uuid) -> bool {
        self.seen.contains_key(event_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn garbage_collect(&mut self, now: Timestamp) {
        let threshold = now.saturating_sub(self.retention_ms);
        self.seen.retain(|_, &mut ts| ts > threshold);
    }
}

impl Default for ProcessedEventCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redelivery_is_skipped() {
        let mut cache = ProcessedEventCache::new();
        let id = Uuid::new_v4();

        assert!(cache.first_delivery(id, 1_000));
        assert!(!cache.first_delivery(id, 2_000));
        assert!(cache.contains(&id));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_ids_are_collected() {
        let mut cache = ProcessedEventCache::with_config(1_000, 100);
        let old = Uuid::new_v4();
        assert!(cache.first_delivery(old, 1_000));

        // Past retention; the next insert triggers collection.
        assert!(cache.first_delivery(Uuid::new_v4(), 5_000));
        assert!(!cache.contains(&old));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_empty_cache() {
        let cache = ProcessedEventCache::default();
        assert!(cache.is_empty());
    }
}
