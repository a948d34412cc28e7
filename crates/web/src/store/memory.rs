//! Process-local record store.

use std::collections::HashMap;
use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use tokio::sync::{RwLock, broadcast};
use tokio::sync::broadcast::error::RecvError;

use super::{
    CollectionPath, CollectionSnapshot, Document, DocumentPath, RecordStore, SnapshotStream,
    StoreError,
};

/// Buffered change notifications per subscriber before it counts as lagging.
const CHANGE_BUFFER: usize = 256;

/// In-memory record store.
///
/// Clones share the same data. Subscribers are notified through a broadcast
/// channel carrying the path of each changed collection.
#[derive(Clone)]
pub struct MemoryRecordStore {
    inner: Arc<Inner>,
}

struct Inner {
    collections: RwLock<HashMap<CollectionPath, CollectionSnapshot>>,
    changes: broadcast::Sender<CollectionPath>,
}

impl Inner {
    async fn read(&self, path: &CollectionPath) -> CollectionSnapshot {
        self.collections
            .read()
            .await
            .get(path)
            .cloned()
            .unwrap_or_default()
    }
}

impl MemoryRecordStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            inner: Arc::new(Inner {
                collections: RwLock::new(HashMap::new()),
                changes,
            }),
        }
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRecordStore")
            .field("subscribers", &self.inner.changes.receiver_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn subscribe(&self, path: &CollectionPath) -> Result<SnapshotStream, StoreError> {
        // Subscribe before the first read so no change slips in between.
        let mut changes = self.inner.changes.subscribe();
        let inner = Arc::clone(&self.inner);
        let path = path.clone();

        let snapshots = stream! {
            yield Ok(inner.read(&path).await);
            loop {
                match changes.recv().await {
                    Ok(changed) if changed == path => yield Ok(inner.read(&path).await),
                    Ok(_) => {}
                    // Missed notifications; a fresh full snapshot covers them.
                    Err(RecvError::Lagged(_)) => yield Ok(inner.read(&path).await),
                    Err(RecvError::Closed) => break,
                }
            }
        };

        Ok(Box::pin(snapshots))
    }

    async fn snapshot(&self, path: &CollectionPath) -> Result<CollectionSnapshot, StoreError> {
        Ok(self.inner.read(path).await)
    }

    async fn merge_write(&self, path: &DocumentPath, fields: Document) -> Result<(), StoreError> {
        {
            let mut collections = self.inner.collections.write().await;
            let document = collections
                .entry(path.collection().clone())
                .or_default()
                .entry(path.document_id().to_owned())
                .or_default();
            document.extend(fields);
        }

        // No receivers is fine: nobody is watching this collection.
        let _ = self.inner.changes.send(path.collection().clone());
        tracing::debug!(path = %path, "document merged");
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
