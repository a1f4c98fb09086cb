//! # Transaction
//!
//! Typed view over one attempt of a read-modify-write transaction.
//!
//! Reads go to the store once per path; the first-observed version is what
//! commit validates. Writes are buffered and overlaid on later reads and
//! queries inside the same attempt.

use crate::domain::StoreError;
use crate::ports::{CommitBatch, DocumentStore, VersionedDoc, WriteOp};
use serde_json::Value;
use shared_types::{Collection, DocPath, Document, Timestamp};
use std::collections::BTreeMap;

pub struct Transaction<'a> {
    store: &'a dyn DocumentStore,
    now: Timestamp,
    attempt: u32,
    observed: BTreeMap<DocPath, VersionedDoc>,
    scanned: BTreeMap<Collection, u64>,
    /// `None` marks a delete.
    writes: BTreeMap<DocPath, Option<Value>>,
}

impl<'a> Transaction<'a> {
    pub fn new(store: &'a dyn DocumentStore, now: Timestamp, attempt: u32) -> Self {
        Self {
            store,
            now,
            attempt,
            observed: BTreeMap::new(),
            scanned: BTreeMap::new(),
            writes: BTreeMap::new(),
        }
    }

    /// Clock reading taken when this attempt started.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// 1-based attempt number.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Reads a document, or `None` if it does not exist.
    pub fn get<D: Document>(&mut self, id: &str) -> Result<Option<D>, StoreError> {
        let path = DocPath::new(D::COLLECTION, id);
        match self.observe(&path)? {
            Some(value) => decode(&path, value).map(Some),
            None => Ok(None),
        }
    }

    /// Reads a document that must exist.
    pub fn require<D: Document>(&mut self, id: &str) -> Result<D, StoreError> {
        self.get(id)?
            .ok_or_else(|| StoreError::NotFound(DocPath::new(D::COLLECTION, id)))
    }

    /// Existence check; records the observed version like any read.
    pub fn exists<D: Document>(&mut self, id: &str) -> Result<bool, StoreError> {
        let path = DocPath::new(D::COLLECTION, id);
        Ok(self.observe(&path)?.is_some())
    }

    /// All documents of type `D` whose id starts with `id_prefix`, ordered by
    /// id. Any later write to the collection by another transaction makes this
    /// transaction conflict at commit.
    pub fn query<D: Document>(&mut self, id_prefix: &str) -> Result<Vec<D>, StoreError> {
        let scan = self.store.scan(D::COLLECTION, id_prefix)?;
        self.scanned.entry(D::COLLECTION).or_insert(scan.generation);

        let mut merged: BTreeMap<String, Value> = scan.docs.into_iter().collect();
        for (path, data) in &self.writes {
            if path.collection != D::COLLECTION || !path.id.starts_with(id_prefix) {
                continue;
            }
            match data {
                Some(value) => {
                    merged.insert(path.id.clone(), value.clone());
                }
                None => {
                    merged.remove(&path.id);
                }
            }
        }

        merged
            .into_iter()
            .map(|(id, value)| decode(&DocPath::new(D::COLLECTION, id), value))
            .collect()
    }

    /// Buffers a full overwrite of the document at `doc.doc_id()`.
    pub fn set<D: Document>(&mut self, doc: &D) -> Result<(), StoreError> {
        let path = DocPath::new(D::COLLECTION, doc.doc_id());
        doc.validate().map_err(|e| StoreError::InvalidDocument {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let value =
            serde_json::to_value(doc).map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.writes.insert(path, Some(value));
        Ok(())
    }

    /// Buffers a delete.
    pub fn delete<D: Document>(&mut self, id: &str) {
        self.writes.insert(DocPath::new(D::COLLECTION, id), None);
    }

    #[must_use]
    pub fn has_writes(&self) -> bool {
        !self.writes.is_empty()
    }

    /// Consumes the attempt into the batch handed to `DocumentStore::commit`.
    #[must_use]
    pub fn into_batch(self) -> CommitBatch {
        CommitBatch {
            reads: self
                .observed
                .into_iter()
                .map(|(path, doc)| (path, doc.version))
                .collect(),
            scans: self.scanned.into_iter().collect(),
            writes: self
                .writes
                .into_iter()
                .map(|(path, data)| match data {
                    Some(data) => WriteOp::Set { path, data },
                    None => WriteOp::Delete { path },
                })
                .collect(),
        }
    }

    fn observe(&mut self, path: &DocPath) -> Result<Option<Value>, StoreError> {
        if let Some(buffered) = self.writes.get(path) {
            return Ok(buffered.clone());
        }
        if let Some(seen) = self.observed.get(path) {
            return Ok(seen.data.clone());
        }
        let doc = self.store.read(path)?;
        let data = doc.data.clone();
        self.observed.insert(path.clone(), doc);
        Ok(data)
    }
}

fn decode<D: Document>(path: &DocPath, value: Value) -> Result<D, StoreError> {
    let doc: D = serde_json::from_value(value).map_err(|e| StoreError::CorruptDocument {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    doc.validate().map_err(|e| StoreError::CorruptDocument {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    Ok(doc)
}
