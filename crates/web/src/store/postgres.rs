//! `PostgreSQL` record store.
//!
//! # Table: `passport.documents`
//!
//! One row per document, fields in a JSONB object. Merge-writes use the JSONB
//! `||` operator, which replaces top-level keys and keeps the rest.
//!
//! # Change feed
//!
//! Every write sends `NOTIFY passport_documents, '<namespace>/<identity>/<collection>'`
//! in the same transaction. One `LISTEN` connection per store forwards the
//! payloads into a broadcast channel; each subscription reloads its
//! collection when a payload matches. Subscriptions hold no connection of
//! their own between reloads.

use std::sync::Arc;

use async_stream::stream;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use sqlx::types::Json;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tracing::instrument;

use super::{
    CollectionPath, CollectionSnapshot, Document, DocumentPath, RecordStore, SnapshotStream,
    StoreError,
};

/// Notification channel for document changes.
pub const CHANGE_CHANNEL: &str = "passport_documents";

/// Buffered change notifications per subscriber before it counts as lagging.
const CHANGE_BUFFER: usize = 1024;

/// An event on the shared change feed.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Change {
    /// A `NOTIFY` payload.
    Collection(String),
    /// The `LISTEN` connection failed and was not re-established.
    ListenerFailed(String),
}

/// Record store backed by the `passport.documents` table.
///
/// Clones share the pool and the change listener.
#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    pool: PgPool,
    changes: broadcast::Sender<Change>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get_mut().take() {
            listener.abort();
        }
    }
}

impl PostgresRecordStore {
    /// Create a store over an existing pool. Migrations must already be applied.
    ///
    /// The change listener connects on the first subscription.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            inner: Arc::new(Inner {
                pool,
                changes,
                listener: Mutex::new(None),
            }),
        }
    }

    /// The underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Join the change feed, starting the listener if it is not running.
    ///
    /// The receiver is created after `LISTEN` is active, so a load issued
    /// afterwards cannot miss a change.
    async fn changes(&self) -> Result<broadcast::Receiver<Change>, StoreError> {
        let mut listener = self.inner.listener.lock().await;
        if listener.as_ref().is_none_or(JoinHandle::is_finished) {
            let mut connection = PgListener::connect_with(&self.inner.pool).await?;
            connection.listen(CHANGE_CHANNEL).await?;
            tracing::info!(channel = CHANGE_CHANNEL, "change listener started");
            *listener = Some(tokio::spawn(forward_notifications(
                connection,
                self.inner.changes.clone(),
            )));
        }
        Ok(self.inner.changes.subscribe())
    }
}

/// Forward every notification into the change feed until the listener fails.
///
/// `PgListener` reconnects on its own; an error means reconnecting failed.
async fn forward_notifications(mut listener: PgListener, changes: broadcast::Sender<Change>) {
    loop {
        match listener.recv().await {
            Ok(notification) => {
                // No receivers is fine: nobody is subscribed right now.
                let _ = changes.send(Change::Collection(notification.payload().to_owned()));
            }
            Err(e) => {
                tracing::error!(error = %e, "change listener failed");
                let _ = changes.send(Change::ListenerFailed(e.to_string()));
                break;
            }
        }
    }
}

/// Snapshot stream for one collection: `initial`, then a reload for every
/// matching change. Ends after yielding an error.
fn follow_changes<F, Fut>(
    initial: CollectionSnapshot,
    mut changes: broadcast::Receiver<Change>,
    key: String,
    reload: F,
) -> SnapshotStream
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<CollectionSnapshot, StoreError>> + Send + 'static,
{
    Box::pin(stream! {
        yield Ok(initial);
        loop {
            let stale = match changes.recv().await {
                Ok(Change::Collection(payload)) => payload == key,
                Ok(Change::ListenerFailed(message)) => {
                    yield Err(StoreError::Unavailable(message));
                    break;
                }
                // Missed notifications; a fresh full snapshot covers them.
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "change feed lagged");
                    true
                }
                Err(RecvError::Closed) => {
                    yield Err(StoreError::Unavailable("change feed closed".to_string()));
                    break;
                }
            };
            if stale {
                match reload().await {
                    Ok(snapshot) => yield Ok(snapshot),
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        }
    })
}

/// `NOTIFY` payload identifying a collection.
fn notify_key(path: &CollectionPath) -> String {
    format!(
        "{}/{}/{}",
        path.namespace(),
        path.identity(),
        path.collection()
    )
}

/// Load every document of a collection.
async fn load(pool: &PgPool, path: &CollectionPath) -> Result<CollectionSnapshot, StoreError> {
    let rows: Vec<(String, Json<Value>)> = sqlx::query_as(
        r"
        SELECT document_id, fields
        FROM passport.documents
        WHERE namespace = $1 AND identity = $2 AND collection = $3
        ORDER BY document_id
        ",
    )
    .bind(path.namespace())
    .bind(path.identity().clone())
    .bind(path.collection())
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|(document_id, Json(fields))| match fields {
            Value::Object(document) => Ok((document_id, document)),
            other => Err(StoreError::Corrupt {
                path: format!("{path}/{document_id}"),
                message: format!("expected an object, found {other}"),
            }),
        })
        .collect()
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    #[instrument(skip(self), fields(path = %path))]
    async fn subscribe(&self, path: &CollectionPath) -> Result<SnapshotStream, StoreError> {
        let changes = self.changes().await?;
        let initial = load(&self.inner.pool, path).await?;

        let pool = self.inner.pool.clone();
        let path = path.clone();
        let key = notify_key(&path);

        Ok(follow_changes(initial, changes, key, move || {
            let pool = pool.clone();
            let path = path.clone();
            async move { load(&pool, &path).await }
        }))
    }

    async fn snapshot(&self, path: &CollectionPath) -> Result<CollectionSnapshot, StoreError> {
        load(&self.inner.pool, path).await
    }

    #[instrument(skip(self, fields), fields(path = %path))]
    async fn merge_write(&self, path: &DocumentPath, fields: Document) -> Result<(), StoreError> {
        let collection = path.collection();
        let mut tx = self.inner.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO passport.documents (namespace, identity, collection, document_id, fields)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (namespace, identity, collection, document_id)
            DO UPDATE SET fields = passport.documents.fields || EXCLUDED.fields,
                          updated_at = now()
            ",
        )
        .bind(collection.namespace())
        .bind(collection.identity().clone())
        .bind(collection.collection())
        .bind(path.document_id())
        .bind(Json(&fields))
        .execute(&mut *tx)
        .await?;

        // Delivered on commit.
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(CHANGE_CHANNEL)
            .bind(notify_key(collection))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::debug!("document merged");
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.inner.pool).await?;
        Ok(())
    }
}
