//! Application state shared across handlers.

use std::sync::Arc;

use moka::future::Cache;

use sake_passport_core::{Catalog, Identity};

use crate::config::PassportConfig;
use crate::services::Passport;
use crate::store::RecordStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and owns the catalog, the
/// record store handle and one [`Passport`] per active identity.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: PassportConfig,
    catalog: Catalog,
    store: Option<Arc<dyn RecordStore>>,
    passports: Cache<Identity, Arc<Passport>>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// `store` is `None` when the record store could not be reached at
    /// startup; pages then stay on the connecting screen.
    #[must_use]
    pub fn new(
        config: PassportConfig,
        catalog: Catalog,
        store: Option<Arc<dyn RecordStore>>,
    ) -> Self {
        let passports = Cache::builder()
            .max_capacity(config.max_sessions)
            .time_to_idle(config.session_idle)
            .build();

        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                store,
                passports,
            }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &PassportConfig {
        &self.inner.config
    }

    /// Get a reference to the bundled catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get the record store, if connected.
    #[must_use]
    pub fn store(&self) -> Option<&Arc<dyn RecordStore>> {
        self.inner.store.as_ref()
    }

    /// Get or start the passport session for an identity.
    pub async fn passport(&self, identity: &Identity) -> Arc<Passport> {
        let store = self.inner.store.clone();
        let namespace = self.inner.config.app_namespace.clone();
        let owner = identity.clone();
        self.inner
            .passports
            .get_with(identity.clone(), async move {
                Arc::new(Passport::start(store, &namespace, owner))
            })
            .await
    }

    /// Close every passport session.
    pub async fn shutdown(&self) {
        self.inner.passports.invalidate_all();
        self.inner.passports.run_pending_tasks().await;
        tracing::info!("passport sessions closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryRecordStore;

    fn state(max_sessions: u64) -> AppState {
        let config = PassportConfig {
            max_sessions,
            ..PassportConfig::in_memory()
        };
        AppState::new(
            config,
            Catalog::bundled(),
            Some(Arc::new(MemoryRecordStore::new())),
        )
    }

    #[tokio::test]
    async fn test_passport_is_reused_per_identity() {
        let state = state(10);
        let identity = Identity::new("guest");
        let first = state.passport(&identity).await;
        let second = state.passport(&identity).await;
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_session_count_is_bounded() {
        let state = state(2);
        for i in 0..20 {
            let _ = state.passport(&Identity::new(format!("visitor-{i}"))).await;
        }
        state.inner.passports.run_pending_tasks().await;
        assert!(state.inner.passports.entry_count() <= 2);
    }

    #[tokio::test]
    async fn test_shutdown_closes_sessions() {
        let state = state(10);
        let _ = state.passport(&Identity::new("guest")).await;
        state.shutdown().await;
        assert_eq!(state.inner.passports.entry_count(), 0);
    }
}
