//! Integration test helpers for Sake Passport.
//!
//! The tests drive the real router and passport services in-process over the
//! memory record store, or over [`FailingStore`] to exercise error paths.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p sake-passport-integration-tests
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use futures::stream::{self, StreamExt};
use tower::ServiceExt;
use tower_sessions::MemoryStore;

use sake_passport_core::Catalog;
use sake_passport_web::config::PassportConfig;
use sake_passport_web::routes;
use sake_passport_web::state::AppState;
use sake_passport_web::store::{
    CollectionPath, CollectionSnapshot, Document, DocumentPath, MemoryRecordStore, RecordStore,
    SnapshotStream, StoreError,
};

/// An application wired to in-memory backends.
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    /// App over a fresh memory record store.
    #[must_use]
    pub fn memory() -> Self {
        Self::with_store(Some(Arc::new(MemoryRecordStore::new())))
    }

    /// App over the given store, or with no store connected.
    #[must_use]
    pub fn with_store(store: Option<Arc<dyn RecordStore>>) -> Self {
        let state = AppState::new(PassportConfig::in_memory(), Catalog::bundled(), store);
        let router = routes::app(state.clone(), MemoryStore::default());
        Self { state, router }
    }

    /// Send one request through the router.
    ///
    /// # Panics
    ///
    /// Panics if the router fails, which it never does for valid requests.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|e| match e {})
    }
}

/// `GET` request, optionally carrying a session cookie.
///
/// # Panics
///
/// Panics on an invalid URI or cookie.
#[must_use]
pub fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("valid request")
}

/// Form `POST` request, optionally carrying a session cookie.
///
/// # Panics
///
/// Panics on an invalid URI or cookie.
#[must_use]
pub fn post_form(uri: &str, form: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(uri).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder
        .body(Body::from(form.to_owned()))
        .expect("valid request")
}

/// The `name=value` pair of the session cookie set by a response.
#[must_use]
pub fn session_cookie<B>(response: &Response<B>) -> Option<String> {
    let set_cookie = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    set_cookie.split(';').next().map(str::to_owned)
}

/// Collect a response body as text.
///
/// # Panics
///
/// Panics if the body cannot be read.
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    String::from_utf8_lossy(&bytes).into_owned()
}

/// A record store whose writes always fail.
///
/// Subscriptions either fail outright or yield one empty snapshot and then
/// stay open.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStore {
    pub fail_subscribe: bool,
}

impl FailingStore {
    /// Subscriptions succeed, writes fail.
    #[must_use]
    pub const fn read_only() -> Self {
        Self {
            fail_subscribe: false,
        }
    }

    /// Subscriptions fail.
    #[must_use]
    pub const fn unreachable() -> Self {
        Self {
            fail_subscribe: true,
        }
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn subscribe(&self, path: &CollectionPath) -> Result<SnapshotStream, StoreError> {
        if self.fail_subscribe {
            return Err(StoreError::Unavailable(format!("cannot listen on {path}")));
        }
        Ok(stream::once(async { Ok(CollectionSnapshot::new()) })
            .chain(stream::pending())
            .boxed())
    }

    async fn snapshot(&self, _path: &CollectionPath) -> Result<CollectionSnapshot, StoreError> {
        Ok(CollectionSnapshot::new())
    }

    async fn merge_write(&self, path: &DocumentPath, _fields: Document) -> Result<(), StoreError> {
        Err(StoreError::Unavailable(format!("write to {path} rejected")))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("offline".to_string()))
    }
}
