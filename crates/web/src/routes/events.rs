//! Server-sent events for live passport updates.
//!
//! Emits a `snapshot` event carrying the read model as JSON each time a new
//! snapshot is delivered, and a `status` event while loading or after the
//! subscription failed. Pages listen for both and re-fetch their view body.

use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};

use crate::middleware::PassportIdentity;
use crate::services::SyncState;
use crate::state::AppState;

fn to_event(state: &SyncState) -> Event {
    match state {
        SyncState::Ready(model) => {
            let json = serde_json::to_string(model.as_ref()).unwrap_or_else(|e| {
                tracing::error!("Failed to serialize snapshot: {e}");
                "{}".to_string()
            });
            Event::default().event("snapshot").data(json)
        }
        SyncState::Loading => Event::default().event("status").data("loading"),
        SyncState::Failed(message) => Event::default().event("status").data(message),
    }
}

/// Live update stream for the caller's passport.
pub async fn stream(
    State(state): State<AppState>,
    PassportIdentity(identity): PassportIdentity,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let passport = state.passport(&identity).await;
    let events = passport
        .rankings()
        .updates()
        .map(|sync| Ok(to_event(&sync)));

    Sse::new(events).keep_alive(KeepAlive::default())
}
