//! Booth code scanner.
//!
//! Two states: `Scanning` accepts codes, `Cooldown` ignores them. Every
//! handled code enters `Cooldown` and shows a message; a timer returns to
//! `Scanning` and clears the message after [`SCAN_COOLDOWN`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use sake_passport_core::scan::{CAMERA_ERROR_MESSAGE, SCAN_COOLDOWN};
use sake_passport_core::{Catalog, ScanDecision};

use crate::services::rankings::RankingStateManager;

/// Whether the scanner accepts codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanPhase {
    Scanning,
    Cooldown,
}

/// What the scanner view shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanStatus {
    pub phase: ScanPhase,
    pub message: Option<String>,
    pub success: bool,
}

impl ScanStatus {
    const fn idle() -> Self {
        Self {
            phase: ScanPhase::Scanning,
            message: None,
            success: false,
        }
    }
}

struct Inner {
    status: ScanStatus,
    /// Bumped on every cooldown so a stale timer cannot end a newer one.
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

/// Scan state machine for one passport.
pub struct ScanHandler {
    inner: Arc<Mutex<Inner>>,
    cooldown: Duration,
}

impl ScanHandler {
    /// A scanner with the standard cooldown.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cooldown(SCAN_COOLDOWN)
    }

    /// A scanner with a custom cooldown.
    #[must_use]
    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                status: ScanStatus::idle(),
                generation: 0,
                timer: None,
            })),
            cooldown,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current scanner status.
    #[must_use]
    pub fn status(&self) -> ScanStatus {
        self.lock().status.clone()
    }

    /// Handle decoded text from the camera or the manual entry form.
    ///
    /// Returns `None` when the text is ignored: it is empty, the scanner is
    /// cooling down, or the rankings have not loaded yet. Otherwise the
    /// scanner enters `Cooldown` before any write is issued, so a second scan
    /// cannot race the first.
    pub async fn handle(
        &self,
        catalog: &Catalog,
        rankings: &RankingStateManager,
        raw: &str,
    ) -> Option<ScanStatus> {
        if raw.is_empty() {
            return None;
        }

        let (decision, generation) = {
            let mut inner = self.lock();
            if inner.status.phase == ScanPhase::Cooldown {
                tracing::debug!("scan ignored during cooldown");
                return None;
            }

            let Some(model) = rankings.loaded() else {
                tracing::debug!("scan ignored until rankings are loaded");
                return None;
            };

            let decision = ScanDecision::decide(catalog, &model, raw);
            inner.status = ScanStatus {
                phase: ScanPhase::Cooldown,
                message: Some(decision.message()),
                success: decision.is_success(),
            };
            self.start_cooldown(&mut inner);
            (decision, inner.generation)
        };

        match decision {
            ScanDecision::Stamp { item, update } => {
                tracing::info!(item = %item.id, "booth stamped by scan");
                if let Err(e) = rankings.update_ranking(&item.id, update).await {
                    let mut inner = self.lock();
                    // A write outlasting the cooldown must not revive the message.
                    let current = inner.generation == generation
                        && inner.status.phase == ScanPhase::Cooldown;
                    if current {
                        inner.status.message = Some(e.user_message().to_owned());
                        inner.status.success = false;
                    }
                }
            }
            ScanDecision::AlreadyStamped { item } => {
                tracing::debug!(item = %item.id, "booth already stamped");
            }
            ScanDecision::Unrecognized { code } => {
                tracing::info!(code = %code, "unrecognized booth code");
            }
        }

        Some(self.status())
    }

    /// Record a camera or decoder failure. The phase is left as is.
    pub fn report_decode_error(&self) -> ScanStatus {
        let mut inner = self.lock();
        inner.status.message = Some(CAMERA_ERROR_MESSAGE.to_owned());
        inner.status.success = false;
        inner.status.clone()
    }

    fn start_cooldown(&self, inner: &mut Inner) {
        inner.generation += 1;
        let generation = inner.generation;
        let shared: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        let cooldown = self.cooldown;

        if let Some(previous) = inner.timer.take() {
            previous.abort();
        }
        inner.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(cooldown).await;
            let Some(shared) = shared.upgrade() else {
                return;
            };
            let mut inner = shared.lock().unwrap_or_else(PoisonError::into_inner);
            if inner.generation == generation {
                inner.status = ScanStatus::idle();
                inner.timer = None;
            }
        }));
    }
}

impl Default for ScanHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScanHandler {
    fn drop(&mut self) {
        if let Some(timer) = self.lock().timer.take() {
            timer.abort();
        }
    }
}

impl std::fmt::Debug for ScanHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanHandler")
            .field("status", &self.status())
            .field("cooldown", &self.cooldown)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use async_trait::async_trait;
    use futures::StreamExt;
    use futures::stream;
    use sake_passport_core::Identity;

    use super::*;
    use crate::services::rankings::{SAVE_FAILED_MESSAGE, SyncState};
    use crate::store::{
        CollectionPath, CollectionSnapshot, Document, DocumentPath, MemoryRecordStore,
        RecordStore, SnapshotStream, StoreError,
    };

    const NAMESPACE: &str = "test-ns";

    fn rankings_over(store: Arc<dyn RecordStore>) -> RankingStateManager {
        RankingStateManager::start(Some(store), NAMESPACE, Identity::new("scanner"))
    }

    fn rankings() -> RankingStateManager {
        rankings_over(Arc::new(MemoryRecordStore::new()))
    }

    /// Loads an empty passport; every write fails after `delay`.
    struct SlowFailingStore {
        delay: Duration,
    }

    #[async_trait]
    impl RecordStore for SlowFailingStore {
        async fn subscribe(&self, _path: &CollectionPath) -> Result<SnapshotStream, StoreError> {
            Ok(stream::once(async { Ok(CollectionSnapshot::new()) })
                .chain(stream::pending())
                .boxed())
        }

        async fn snapshot(
            &self,
            _path: &CollectionPath,
        ) -> Result<CollectionSnapshot, StoreError> {
            Ok(CollectionSnapshot::new())
        }

        async fn merge_write(
            &self,
            _path: &DocumentPath,
            _fields: Document,
        ) -> Result<(), StoreError> {
            tokio::time::sleep(self.delay).await;
            Err(StoreError::Unavailable("timed out".to_string()))
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    async fn ready(manager: &RankingStateManager) {
        manager
            .watch()
            .wait_for(|s| matches!(s, SyncState::Ready(_)))
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_input_is_ignored() {
        let scanner = ScanHandler::new();
        let rankings = rankings();
        assert_eq!(scanner.handle(&Catalog::bundled(), &rankings, "").await, None);
        assert_eq!(scanner.status().phase, ScanPhase::Scanning);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_code_enters_cooldown_without_write() {
        let scanner = ScanHandler::new();
        let store = MemoryRecordStore::new();
        let rankings = rankings_over(Arc::new(store.clone()));
        ready(&rankings).await;

        let status = scanner
            .handle(&Catalog::bundled(), &rankings, "beer-1")
            .await
            .unwrap();
        assert_eq!(status.phase, ScanPhase::Cooldown);
        assert!(!status.success);
        assert_eq!(
            status.message.as_deref(),
            Some("Error: Code \"beer-1\" not recognized.")
        );
        let path = CollectionPath::rankings(NAMESPACE, Identity::new("scanner"));
        assert!(store.snapshot(&path).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_within_cooldown_reports_save_error() {
        let scanner = ScanHandler::new();
        let rankings = rankings_over(Arc::new(SlowFailingStore {
            delay: Duration::from_secs(1),
        }));
        ready(&rankings).await;

        let status = scanner
            .handle(&Catalog::bundled(), &rankings, "sake-2")
            .await
            .unwrap();
        assert_eq!(status.phase, ScanPhase::Cooldown);
        assert!(!status.success);
        assert_eq!(status.message.as_deref(), Some(SAVE_FAILED_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_write_after_cooldown_keeps_scanner_idle() {
        let scanner = ScanHandler::new();
        let rankings = rankings_over(Arc::new(SlowFailingStore {
            delay: Duration::from_secs(5),
        }));
        ready(&rankings).await;

        let status = scanner
            .handle(&Catalog::bundled(), &rankings, "sake-2")
            .await
            .unwrap();
        assert_eq!(status.phase, ScanPhase::Scanning);
        assert_eq!(status.message, None);
        assert_eq!(scanner.status(), status);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scans_ignored_until_cooldown_ends() {
        let scanner = ScanHandler::new();
        let rankings = rankings();
        ready(&rankings).await;
        let catalog = Catalog::bundled();

        assert!(scanner.handle(&catalog, &rankings, "beer-1").await.is_some());

        tokio::time::sleep(Duration::from_millis(2_900)).await;
        assert_eq!(scanner.handle(&catalog, &rankings, "sake-1").await, None);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let status = scanner.status();
        assert_eq!(status.phase, ScanPhase::Scanning);
        assert_eq!(status.message, None);
        assert!(scanner.handle(&catalog, &rankings, "sake-1").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_decode_error_keeps_phase() {
        let scanner = ScanHandler::new();
        let status = scanner.report_decode_error();
        assert_eq!(status.phase, ScanPhase::Scanning);
        assert_eq!(status.message.as_deref(), Some(CAMERA_ERROR_MESSAGE));
    }
}
