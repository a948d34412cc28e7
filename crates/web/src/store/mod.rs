//! Record store boundary.
//!
//! Passports live in a document store addressed by
//! `{namespace}/users/{identity}/{collection}/{document_id}`. A backend offers
//! two operations: subscribe to a collection (full snapshot first, then one
//! full snapshot per change) and merge-write a document (top-level fields in
//! the write replace stored ones, everything else is kept).
//!
//! # Backends
//!
//! - [`MemoryRecordStore`] - process-local, used in development and tests
//! - [`PostgresRecordStore`] - `PostgreSQL` JSONB rows with `LISTEN`/`NOTIFY`

pub mod memory;
pub mod postgres;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::{Map, Value};
use thiserror::Error;

use sake_passport_core::{Identity, ItemId};

pub use memory::MemoryRecordStore;
pub use postgres::PostgresRecordStore;

/// Collection holding one document per ranked catalog item.
pub const RANKINGS_COLLECTION: &str = "sakeRankings";

/// A stored document: a JSON object of fields.
pub type Document = Map<String, Value>;

/// Every document of a collection, keyed by document id.
pub type CollectionSnapshot = BTreeMap<String, Document>;

/// Live feed of collection snapshots.
pub type SnapshotStream = BoxStream<'static, Result<CollectionSnapshot, StoreError>>;

/// Errors raised by record store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored fields could not be read back as a JSON object.
    #[error("corrupt document at {path}: {message}")]
    Corrupt { path: String, message: String },

    /// The backend cannot serve requests.
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Address of one identity's collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    namespace: String,
    identity: Identity,
    collection: String,
}

impl CollectionPath {
    /// Address an arbitrary collection.
    #[must_use]
    pub fn new(
        namespace: impl Into<String>,
        identity: Identity,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            identity,
            collection: collection.into(),
        }
    }

    /// Address an identity's rankings collection.
    #[must_use]
    pub fn rankings(namespace: impl Into<String>, identity: Identity) -> Self {
        Self::new(namespace, identity, RANKINGS_COLLECTION)
    }

    /// Address one document in this collection.
    #[must_use]
    pub fn document(&self, item_id: &ItemId) -> DocumentPath {
        DocumentPath {
            collection: self.clone(),
            document_id: item_id.to_string(),
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/users/{}/{}",
            self.namespace, self.identity, self.collection
        )
    }
}

/// Address of one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    collection: CollectionPath,
    document_id: String,
}

impl DocumentPath {
    /// The collection this document belongs to.
    #[must_use]
    pub const fn collection(&self) -> &CollectionPath {
        &self.collection
    }

    #[must_use]
    pub fn document_id(&self) -> &str {
        &self.document_id
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.document_id)
    }
}

/// A document store with live collection subscriptions.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Subscribe to a collection.
    ///
    /// The stream yields the current snapshot first, then a full snapshot
    /// after every change to the collection. It ends after yielding an error.
    async fn subscribe(&self, path: &CollectionPath) -> Result<SnapshotStream, StoreError>;

    /// Read the current snapshot of a collection once.
    async fn snapshot(&self, path: &CollectionPath) -> Result<CollectionSnapshot, StoreError>;

    /// Merge `fields` into a document, creating it if missing.
    ///
    /// Top-level keys present in `fields` replace stored values; other stored
    /// keys are kept.
    async fn merge_write(&self, path: &DocumentPath, fields: Document) -> Result<(), StoreError>;

    /// Check the backend can serve requests.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_store_convention() {
        let collection = CollectionPath::rankings("sake-8a8e4", Identity::new("u1"));
        assert_eq!(collection.to_string(), "sake-8a8e4/users/u1/sakeRankings");

        let document = collection.document(&ItemId::new("sake-3"));
        assert_eq!(
            document.to_string(),
            "sake-8a8e4/users/u1/sakeRankings/sake-3"
        );
        assert_eq!(document.document_id(), "sake-3");
        assert_eq!(document.collection(), &collection);
    }
}
