//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                           - Redirect to /sakes
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (record store ping)
//!
//! # Views
//! GET  /sakes                      - Catalog with ratings, stamps and notes
//! GET  /map                        - Venue map and stamp progress
//! GET  /scan                       - Booth code scanner
//! GET  /passport                   - Passport history and statistics
//! GET  /fragments/{view}           - View body fragment (HTMX)
//!
//! # Rankings (HTMX, 204 on success)
//! POST /rankings/{item_id}/rating  - Give stars (form: rating)
//! POST /rankings/{item_id}/stamp   - Toggle stamp
//! POST /rankings/{item_id}/notes   - Save notes (form: notes)
//!
//! # Scanner (HTMX fragments)
//! POST /scan                       - Handle a booth code (form: code)
//! POST /scan/error                 - Report a camera failure
//! GET  /scan/status                - Scanner status
//!
//! # Live updates
//! GET  /events                     - Server-sent events
//! GET  /api/rankings               - Read model as JSON
//! ```

pub mod api;
pub mod events;
pub mod rankings;
pub mod scan;
pub mod views;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post},
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::middleware::{create_session_layer, request_id_middleware};
use crate::state::AppState;

/// Static assets directory, relative to the workspace root.
pub const STATIC_DIR: &str = "crates/web/static";

/// Create the ranking routes router.
pub fn ranking_routes() -> Router<AppState> {
    Router::new()
        .route("/{item_id}/rating", post(rankings::rate))
        .route("/{item_id}/stamp", post(rankings::toggle_stamp))
        .route("/{item_id}/notes", post(rankings::notes))
}

/// Create the scanner routes router.
pub fn scan_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(views::scan).post(scan::submit))
        .route("/error", post(scan::decode_error))
        .route("/status", get(scan::status))
}

/// Create all application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(views::index))
        .route("/sakes", get(views::sakes))
        .route("/map", get(views::map))
        .route("/passport", get(views::passport))
        .route("/fragments/{view}", get(views::fragment))
        .nest("/rankings", ranking_routes())
        .nest("/scan", scan_routes())
        .route("/events", get(events::stream))
        .route("/api/rankings", get(api::rankings))
}

/// Build the application router with health checks, static assets, sessions,
/// request IDs and request tracing.
///
/// Sentry layers are added by the binary.
pub fn app<S>(state: AppState, sessions: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = create_session_layer(sessions, state.config());

    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .merge(routes())
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(session_layer)
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the record store is not connected or
/// not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    let Some(store) = state.store() else {
        return StatusCode::SERVICE_UNAVAILABLE;
    };
    match store.ping().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
