//! In-memory implementation of [`DocumentStore`] for tests and single-node runs.

use crate::domain::StoreError;
use crate::ports::{CommitBatch, DocumentStore, ScanResult, Version, VersionedDoc, WriteOp};
use parking_lot::RwLock;
use serde_json::Value;
use shared_types::{Collection, DocPath};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicU32, Ordering};

/// Deleted documents keep their slot so versions never go backwards.
#[derive(Debug, Clone)]
struct Slot {
    version: Version,
    data: Option<Value>,
}

#[derive(Debug, Default)]
struct Inner {
    docs: BTreeMap<DocPath, Slot>,
    generations: HashMap<Collection, u64>,
}

#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    inner: RwLock<Inner>,
    /// Commits to fail with `Conflict` before validating.
    injected_conflicts: AtomicU32,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` commits fail with a conflict.
    pub fn inject_conflicts(&self, count: u32) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }

    /// Writes a raw value, bypassing validation.
    pub fn insert_raw(&self, path: DocPath, data: Value) {
        let mut inner = self.inner.write();
        let collection = path.collection;
        let slot = inner.docs.entry(path).or_insert(Slot {
            version: 0,
            data: None,
        });
        slot.version += 1;
        slot.data = Some(data);
        *inner.generations.entry(collection).or_insert(0) += 1;
    }

    /// Number of existing documents in a collection.
    pub fn count(&self, collection: Collection) -> usize {
        self.inner
            .read()
            .docs
            .iter()
            .filter(|(path, slot)| path.collection == collection && slot.data.is_some())
            .count()
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn read(&self, path: &DocPath) -> Result<VersionedDoc, StoreError> {
        let inner = self.inner.read();
        Ok(match inner.docs.get(path) {
            Some(slot) => VersionedDoc {
                version: slot.version,
                data: slot.data.clone(),
            },
            None => VersionedDoc::absent(),
        })
    }

    fn scan(&self, collection: Collection, id_prefix: &str) -> Result<ScanResult, StoreError> {
        let inner = self.inner.read();
        let start = DocPath::new(collection, id_prefix);
        let docs = inner
            .docs
            .range((Bound::Included(start), Bound::Unbounded))
            .take_while(|(path, _)| path.collection == collection && path.id.starts_with(id_prefix))
            .filter_map(|(path, slot)| slot.data.clone().map(|data| (path.id.clone(), data)))
            .collect();
        Ok(ScanResult {
            generation: inner.generations.get(&collection).copied().unwrap_or(0),
            docs,
        })
    }

    fn commit(&self, batch: CommitBatch) -> Result<(), StoreError> {
        if self.take_injected_conflict() {
            return Err(StoreError::Conflict("injected".into()));
        }

        let mut inner = self.inner.write();

        for (path, expected) in &batch.reads {
            let current = inner.docs.get(path).map_or(0, |slot| slot.version);
            if current != *expected {
                return Err(StoreError::Conflict(path.to_string()));
            }
        }
        for (collection, expected) in &batch.scans {
            let current = inner.generations.get(collection).copied().unwrap_or(0);
            if current != *expected {
                return Err(StoreError::Conflict(format!("{collection}/*")));
            }
        }

        let mut touched = BTreeSet::new();
        for op in batch.writes {
            let (path, data) = match op {
                WriteOp::Set { path, data } => (path, Some(data)),
                WriteOp::Delete { path } => (path, None),
            };
            touched.insert(path.collection);
            let slot = inner.docs.entry(path).or_insert(Slot {
                version: 0,
                data: None,
            });
            slot.version += 1;
            slot.data = data;
        }
        for collection in touched {
            *inner.generations.entry(collection).or_insert(0) += 1;
        }
        Ok(())
    }
}
