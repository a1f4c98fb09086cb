//! # Document Paths
//!
//! Every document lives at `collection/id`. Offers live in a single top-level
//! collection parented to their task by the `task_id` field; there is no
//! mirrored sub-collection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Collections known to the marketplace store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Users,
    Tasks,
    Offers,
    WalletLedger,
    CategoryProofs,
    BasicDocs,
    Disputes,
    AdminAudit,
    Reports,
    Invites,
    Settings,
}

impl Collection {
    /// Stable name used in paths and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Tasks => "tasks",
            Self::Offers => "offers",
            Self::WalletLedger => "wallet_ledger",
            Self::CategoryProofs => "category_proofs",
            Self::BasicDocs => "basic_docs",
            Self::Disputes => "disputes",
            Self::AdminAudit => "admin_audit",
            Self::Reports => "reports",
            Self::Invites => "invites",
            Self::Settings => "settings",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully qualified document address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocPath {
    pub collection: Collection,
    pub id: String,
}

impl DocPath {
    pub fn new(collection: Collection, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}
