//! Ranking state manager.
//!
//! Owns one identity's live view of its rankings. A producer task consumes
//! the record store subscription and publishes every decoded snapshot into a
//! `watch` channel, so readers always see the latest full snapshot and never a
//! stale intermediate one. Writes go straight to the store; the read model
//! changes only when the store reports the change back.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_stream::stream;
use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::instrument;

use sake_passport_core::{Identity, ItemId, RankingRecord, RankingUpdate, ReadModel};

use crate::store::{CollectionPath, CollectionSnapshot, RecordStore, StoreError};

/// Shown when the live subscription fails.
pub const SUBSCRIPTION_FAILED_MESSAGE: &str = "Real-time connection failed. Check your network.";

/// Shown when a snapshot contains a document that cannot be decoded.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load your tasting passport data.";

/// Shown when a ranking write fails.
pub const SAVE_FAILED_MESSAGE: &str = "Could not save your ranking. Please try again.";

/// Sync status of a passport's read model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    /// No snapshot delivered yet.
    Loading,
    /// The latest snapshot.
    Ready(Arc<ReadModel>),
    /// The subscription ended. Persistent until the session is rebuilt.
    Failed(String),
}

impl SyncState {
    /// Short machine-readable name.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready(_) => "ready",
            Self::Failed(_) => "failed",
        }
    }
}

/// Errors returned by [`RankingStateManager::update_ranking`].
#[derive(Debug, Error)]
pub enum RankingError {
    #[error("failed to save ranking for {item_id}: {source}")]
    Write {
        item_id: ItemId,
        #[source]
        source: StoreError,
    },
}

impl RankingError {
    /// Message to show the attendee.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        SAVE_FAILED_MESSAGE
    }
}

/// Live rankings of one identity.
pub struct RankingStateManager {
    path: CollectionPath,
    store: Option<Arc<dyn RecordStore>>,
    state: watch::Receiver<SyncState>,
    producer: Option<JoinHandle<()>>,
    last_timestamp: AtomicI64,
}

impl RankingStateManager {
    /// Start following an identity's rankings.
    ///
    /// Without a store the manager stays in [`SyncState::Loading`] and writes
    /// are dropped. Must be called inside a tokio runtime.
    #[must_use]
    pub fn start(
        store: Option<Arc<dyn RecordStore>>,
        namespace: &str,
        identity: Identity,
    ) -> Self {
        let path = CollectionPath::rankings(namespace, identity);
        let (tx, rx) = watch::channel(SyncState::Loading);

        let producer = store.as_ref().map(|store| {
            tokio::spawn(follow_snapshots(Arc::clone(store), path.clone(), tx))
        });

        Self {
            path,
            store,
            state: rx,
            producer,
            last_timestamp: AtomicI64::new(0),
        }
    }

    /// The identity these rankings belong to.
    #[must_use]
    pub const fn identity(&self) -> &Identity {
        self.path.identity()
    }

    /// Current sync state.
    #[must_use]
    pub fn current(&self) -> SyncState {
        self.state.borrow().clone()
    }

    /// Latest read model, empty until the first snapshot arrives.
    #[must_use]
    pub fn read_model(&self) -> Arc<ReadModel> {
        self.loaded().unwrap_or_default()
    }

    /// Latest read model, `None` until the first snapshot arrives.
    #[must_use]
    pub fn loaded(&self) -> Option<Arc<ReadModel>> {
        match &*self.state.borrow() {
            SyncState::Ready(model) => Some(Arc::clone(model)),
            SyncState::Loading | SyncState::Failed(_) => None,
        }
    }

    /// A receiver for sync state changes.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<SyncState> {
        self.state.clone()
    }

    /// Stream of sync states: the current one, then each change.
    ///
    /// States published while the consumer is busy are coalesced; only the
    /// latest is delivered. Ends after a [`SyncState::Failed`] or when the
    /// manager is dropped.
    pub fn updates(&self) -> impl Stream<Item = SyncState> + Send + use<> {
        let mut rx = self.state.clone();
        stream! {
            loop {
                let state = rx.borrow_and_update().clone();
                let failed = matches!(state, SyncState::Failed(_));
                yield state;
                if failed || rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    /// Merge a partial update into an item's record and write it.
    ///
    /// The merge starts from the latest snapshot (or the default record) and
    /// writes the whole merged record. The read model is not touched; the
    /// change shows up with the next snapshot.
    ///
    /// Until the store is connected and the first snapshot has arrived there
    /// is nothing to merge onto, and the update is logged and dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RankingError::Write`] if the store rejects the write.
    #[instrument(skip(self, update), fields(identity = %self.path.identity()))]
    pub async fn update_ranking(
        &self,
        item_id: &ItemId,
        update: RankingUpdate,
    ) -> Result<(), RankingError> {
        let Some(store) = &self.store else {
            tracing::warn!("record store not connected; ranking update dropped");
            return Ok(());
        };
        let Some(model) = self.loaded() else {
            tracing::warn!("rankings not loaded; ranking update dropped");
            return Ok(());
        };

        let merged = model
            .effective(item_id)
            .merged(&update, self.next_timestamp());

        store
            .merge_write(&self.path.document(item_id), merged.to_document())
            .await
            .map_err(|source| {
                tracing::warn!(error = %source, "ranking write failed");
                RankingError::Write {
                    item_id: item_id.clone(),
                    source,
                }
            })?;

        tracing::debug!(
            rating = merged.rating.value(),
            tasted = merged.tasted,
            "ranking saved"
        );
        Ok(())
    }

    /// Wall-clock milliseconds, forced strictly increasing per manager so
    /// consecutive writes from this session are ordered.
    fn next_timestamp(&self) -> i64 {
        let now = chrono::Utc::now().timestamp_millis();
        let previous = self
            .last_timestamp
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}

impl Drop for RankingStateManager {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

impl std::fmt::Debug for RankingStateManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankingStateManager")
            .field("path", &self.path)
            .field("state", &self.state.borrow().label())
            .field("connected", &self.store.is_some())
            .finish_non_exhaustive()
    }
}

/// Decode a collection snapshot into a read model.
///
/// # Errors
///
/// Fails on the first document that does not decode as a ranking record.
pub fn decode_snapshot(snapshot: CollectionSnapshot) -> Result<ReadModel, serde_json::Error> {
    let records = snapshot
        .into_iter()
        .map(|(document_id, fields)| RankingRecord::from_document(&document_id, fields))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ReadModel::from_records(records))
}

/// Producer task: publish each snapshot until the subscription ends.
#[instrument(skip_all, fields(path = %path))]
async fn follow_snapshots(
    store: Arc<dyn RecordStore>,
    path: CollectionPath,
    tx: watch::Sender<SyncState>,
) {
    let mut snapshots = match store.subscribe(&path).await {
        Ok(snapshots) => snapshots,
        Err(e) => {
            tracing::error!(error = %e, "failed to subscribe to rankings");
            tx.send_replace(SyncState::Failed(SUBSCRIPTION_FAILED_MESSAGE.to_owned()));
            return;
        }
    };

    while let Some(delivery) = snapshots.next().await {
        let next = match delivery.map(decode_snapshot) {
            Ok(Ok(model)) => SyncState::Ready(Arc::new(model)),
            Ok(Err(e)) => {
                tracing::error!(error = %e, "undecodable ranking document");
                SyncState::Failed(LOAD_FAILED_MESSAGE.to_owned())
            }
            Err(e) => {
                tracing::error!(error = %e, "rankings subscription failed");
                SyncState::Failed(SUBSCRIPTION_FAILED_MESSAGE.to_owned())
            }
        };

        let failed = matches!(next, SyncState::Failed(_));
        tx.send_replace(next);
        if failed {
            return;
        }
    }

    tracing::warn!("rankings subscription closed by the store");
    tx.send_replace(SyncState::Failed(SUBSCRIPTION_FAILED_MESSAGE.to_owned()));
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use sake_passport_core::Rating;
    use serde_json::json;

    use super::*;
    use crate::store::MemoryRecordStore;

    async fn ready(manager: &RankingStateManager) -> Arc<ReadModel> {
        let mut rx = manager.watch();
        let state = rx
            .wait_for(|s| matches!(s, SyncState::Ready(_)))
            .await
            .unwrap()
            .clone();
        match state {
            SyncState::Ready(model) => model,
            _ => unreachable!(),
        }
    }

    async fn wait_for_record(
        manager: &RankingStateManager,
        item: &str,
        check: impl Fn(&RankingRecord) -> bool,
    ) -> RankingRecord {
        let mut rx = manager.watch();
        let state = rx
            .wait_for(|s| match s {
                SyncState::Ready(model) => model.get(item).is_some_and(&check),
                _ => false,
            })
            .await
            .unwrap()
            .clone();
        match state {
            SyncState::Ready(model) => model.get(item).cloned().unwrap(),
            _ => unreachable!(),
        }
    }

    fn manager(store: &MemoryRecordStore, identity: &str) -> RankingStateManager {
        RankingStateManager::start(
            Some(Arc::new(store.clone())),
            "test-ns",
            Identity::new(identity),
        )
    }

    #[tokio::test]
    async fn test_first_snapshot_of_new_identity_is_empty() {
        let store = MemoryRecordStore::new();
        let manager = manager(&store, "u1");
        assert!(ready(&manager).await.is_empty());
    }

    #[tokio::test]
    async fn test_update_round_trips_through_store() {
        let store = MemoryRecordStore::new();
        let manager = manager(&store, "u1");
        ready(&manager).await;

        manager
            .update_ranking(
                &ItemId::new("sake-2"),
                RankingUpdate::rate(Rating::new(4).unwrap()),
            )
            .await
            .unwrap();

        let record = wait_for_record(&manager, "sake-2", |r| r.tasted).await;
        assert_eq!(record.rating.value(), 4);
        assert!(record.timestamp > 0);
    }

    #[tokio::test]
    async fn test_notes_merge_keeps_rating() {
        let store = MemoryRecordStore::new();
        let manager = manager(&store, "u1");
        ready(&manager).await;
        let item = ItemId::new("sake-1");

        manager
            .update_ranking(&item, RankingUpdate::rate(Rating::new(5).unwrap()))
            .await
            .unwrap();
        wait_for_record(&manager, "sake-1", |r| r.rating.value() == 5).await;

        manager
            .update_ranking(&item, RankingUpdate::notes("pear"))
            .await
            .unwrap();
        let record = wait_for_record(&manager, "sake-1", |r| r.notes == "pear").await;
        assert_eq!(record.rating.value(), 5);
        assert!(record.tasted);
    }

    #[tokio::test]
    async fn test_undecodable_document_fails_load() {
        let store = MemoryRecordStore::new();
        let path = CollectionPath::rankings("test-ns", Identity::new("u1"));
        let mut bad = serde_json::Map::new();
        bad.insert("rating".to_owned(), json!("five"));
        store
            .merge_write(&path.document(&ItemId::new("sake-1")), bad)
            .await
            .unwrap();

        let manager = manager(&store, "u1");
        let mut rx = manager.watch();
        let state = rx
            .wait_for(|s| matches!(s, SyncState::Failed(_)))
            .await
            .unwrap()
            .clone();
        assert_eq!(state, SyncState::Failed(LOAD_FAILED_MESSAGE.to_owned()));
    }

    #[tokio::test]
    async fn test_without_store_stays_loading_and_drops_writes() {
        let manager = RankingStateManager::start(None, "test-ns", Identity::new("u1"));
        manager
            .update_ranking(&ItemId::new("sake-1"), RankingUpdate::toggle_stamp(false))
            .await
            .unwrap();
        assert_eq!(manager.current(), SyncState::Loading);
        assert!(manager.read_model().is_empty());
    }

    #[tokio::test]
    async fn test_update_before_first_snapshot_is_dropped() {
        let store = MemoryRecordStore::new();
        let manager = RankingStateManager::start(
            Some(Arc::new(store.clone())),
            "test-ns",
            Identity::new("u1"),
        );
        // The producer has not run yet on this single-threaded runtime.
        assert_eq!(manager.current(), SyncState::Loading);
        manager
            .update_ranking(&ItemId::new("sake-1"), RankingUpdate::toggle_stamp(false))
            .await
            .unwrap();

        let path = CollectionPath::rankings("test-ns", Identity::new("u1"));
        assert!(store.snapshot(&path).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_timestamps_strictly_increase() {
        let manager = RankingStateManager::start(None, "test-ns", Identity::new("u1"));
        let first = manager.next_timestamp();
        let second = manager.next_timestamp();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_updates_stream_starts_with_current_state() {
        let store = MemoryRecordStore::new();
        let manager = manager(&store, "u1");
        ready(&manager).await;

        let mut updates = Box::pin(manager.updates());
        let first = updates.next().await.unwrap();
        assert_eq!(first.label(), "ready");
    }

    #[tokio::test]
    async fn test_updates_outlive_manager_and_end_on_drop() {
        let store = MemoryRecordStore::new();
        let manager = manager(&store, "u1");
        ready(&manager).await;

        let mut updates = Box::pin(manager.updates());
        drop(manager);

        assert_eq!(updates.next().await.unwrap().label(), "ready");
        assert!(updates.next().await.is_none());
    }

    #[test]
    fn test_decode_snapshot_keys_by_document_id() {
        let mut snapshot = CollectionSnapshot::new();
        let mut fields = serde_json::Map::new();
        fields.insert("tasted".to_owned(), json!(true));
        snapshot.insert("sake-6".to_owned(), fields);

        let model = decode_snapshot(snapshot).unwrap();
        assert!(model.is_tasted("sake-6"));
    }
}
