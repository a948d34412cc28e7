//! JSON API.

use axum::{Json, extract::State};
use serde::Serialize;

use sake_passport_core::{Identity, ReadModel};

use crate::middleware::PassportIdentity;
use crate::services::SyncState;
use crate::state::AppState;

/// The caller's passport with its sync status.
#[derive(Debug, Serialize)]
pub struct RankingsResponse {
    pub identity: Identity,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub rankings: ReadModel,
}

/// Current read model of the caller's passport.
pub async fn rankings(
    State(state): State<AppState>,
    PassportIdentity(identity): PassportIdentity,
) -> Json<RankingsResponse> {
    let passport = state.passport(&identity).await;
    let sync = passport.rankings().current();

    let (error, rankings) = match &sync {
        SyncState::Ready(model) => (None, model.as_ref().clone()),
        SyncState::Loading => (None, ReadModel::default()),
        SyncState::Failed(message) => (Some(message.clone()), ReadModel::default()),
    };

    Json(RankingsResponse {
        identity,
        status: sync.label(),
        error,
        rankings,
    })
}
