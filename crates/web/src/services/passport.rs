//! Session context for one identity.

use std::sync::Arc;

use sake_passport_core::{Catalog, Identity};

use crate::services::rankings::RankingStateManager;
use crate::services::scanner::{ScanHandler, ScanStatus};
use crate::store::RecordStore;

/// Everything the server keeps per identity: the live rankings subscription
/// and the scanner state. Dropping it tears the subscription down.
#[derive(Debug)]
pub struct Passport {
    rankings: RankingStateManager,
    scanner: ScanHandler,
}

impl Passport {
    /// Start a passport session for an identity.
    #[must_use]
    pub fn start(
        store: Option<Arc<dyn RecordStore>>,
        namespace: &str,
        identity: Identity,
    ) -> Self {
        tracing::info!(identity = %identity, "passport session started");
        Self {
            rankings: RankingStateManager::start(store, namespace, identity),
            scanner: ScanHandler::new(),
        }
    }

    #[must_use]
    pub const fn identity(&self) -> &Identity {
        self.rankings.identity()
    }

    #[must_use]
    pub const fn rankings(&self) -> &RankingStateManager {
        &self.rankings
    }

    #[must_use]
    pub const fn scanner(&self) -> &ScanHandler {
        &self.scanner
    }

    /// Feed decoded text to this passport's scanner.
    pub async fn scan(&self, catalog: &Catalog, raw: &str) -> Option<ScanStatus> {
        self.scanner.handle(catalog, &self.rankings, raw).await
    }
}

impl Drop for Passport {
    fn drop(&mut self) {
        tracing::debug!(identity = %self.identity(), "passport session closed");
    }
}
