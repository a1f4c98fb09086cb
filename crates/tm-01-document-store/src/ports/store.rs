//! # Document Store Port
//!
//! Outbound interface to the backing store. The store is an external
//! collaborator; [`InMemoryDocumentStore`](crate::InMemoryDocumentStore) is the
//! in-process adapter.

use crate::domain::StoreError;
use serde_json::Value;
use shared_types::{Collection, DocPath};

/// Per-document version. Absent, never-written documents have version 0.
pub type Version = u64;

/// A document as observed at one version.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedDoc {
    pub version: Version,
    /// `None` when the document does not exist (never written or deleted).
    pub data: Option<Value>,
}

impl VersionedDoc {
    #[must_use]
    pub fn absent() -> Self {
        Self {
            version: 0,
            data: None,
        }
    }
}

/// Result of a prefix scan over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanResult {
    /// Collection generation at scan time; bumped by every write to it.
    pub generation: u64,
    /// Existing documents whose id starts with the prefix, ordered by id.
    pub docs: Vec<(String, Value)>,
}

/// A single buffered write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set { path: DocPath, data: Value },
    Delete { path: DocPath },
}

impl WriteOp {
    #[must_use]
    pub fn path(&self) -> &DocPath {
        match self {
            Self::Set { path, .. } | Self::Delete { path } => path,
        }
    }
}

/// Everything a transaction observed plus what it wants to write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommitBatch {
    /// First-observed version of every document read.
    pub reads: Vec<(DocPath, Version)>,
    /// First-observed generation of every collection scanned.
    pub scans: Vec<(Collection, u64)>,
    pub writes: Vec<WriteOp>,
}

impl CommitBatch {
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Abstract interface for the backing store.
///
/// ## Atomicity Guarantee
///
/// `commit` either validates every recorded version and generation and applies
/// ALL writes, or applies NONE and returns [`StoreError::Conflict`].
pub trait DocumentStore: Send + Sync {
    /// Read one document with its current version.
    fn read(&self, path: &DocPath) -> Result<VersionedDoc, StoreError>;

    /// Read every existing document in `collection` whose id starts with
    /// `id_prefix`.
    fn scan(&self, collection: Collection, id_prefix: &str) -> Result<ScanResult, StoreError>;

    /// Validate and apply a batch atomically.
    fn commit(&self, batch: CommitBatch) -> Result<(), StoreError>;
}
