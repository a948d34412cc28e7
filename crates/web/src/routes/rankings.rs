//! Ranking write handlers (HTMX).
//!
//! Successful writes return `204 No Content`; the page picks the change up
//! from the next snapshot. A failed write returns a dismissable flash message
//! retargeted at `#flash`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use sake_passport_core::{CatalogItem, RankingUpdate, Rating};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::PassportIdentity;
use crate::services::Passport;
use crate::state::AppState;

/// Rating form data.
#[derive(Debug, Deserialize)]
pub struct RatingForm {
    pub rating: u8,
}

/// Notes form data.
#[derive(Debug, Deserialize)]
pub struct NotesForm {
    #[serde(default)]
    pub notes: String,
}

/// Transient error message fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/flash.html")]
pub struct FlashTemplate {
    pub message: String,
}

fn find_item(state: &AppState, item_id: &str) -> Result<CatalogItem> {
    state
        .catalog()
        .find(item_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("sake '{item_id}'")))
}

/// Write an update and turn the outcome into an HTMX response.
async fn save(passport: &Passport, item: &CatalogItem, update: RankingUpdate) -> Response {
    match passport.rankings().update_ranking(&item.id, update).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => (
            AppendHeaders([("HX-Retarget", "#flash"), ("HX-Reswap", "innerHTML")]),
            FlashTemplate {
                message: e.user_message().to_string(),
            },
        )
            .into_response(),
    }
}

/// Give an item stars. Also stamps it.
#[instrument(skip(state))]
pub async fn rate(
    State(state): State<AppState>,
    PassportIdentity(identity): PassportIdentity,
    Path(item_id): Path<String>,
    Form(form): Form<RatingForm>,
) -> Result<Response> {
    let item = find_item(&state, &item_id)?;
    let rating = Rating::new(form.rating).map_err(|e| AppError::BadRequest(e.to_string()))?;
    if !rating.is_rated() {
        return Err(AppError::BadRequest(
            "rating must be between 1 and 5".to_string(),
        ));
    }

    add_breadcrumb("ranking", "Rated sake", Some(&[("item", item.id.as_str())]));
    let passport = state.passport(&identity).await;
    Ok(save(&passport, &item, RankingUpdate::rate(rating)).await)
}

/// Flip an item's stamp.
#[instrument(skip(state))]
pub async fn toggle_stamp(
    State(state): State<AppState>,
    PassportIdentity(identity): PassportIdentity,
    Path(item_id): Path<String>,
) -> Result<Response> {
    let item = find_item(&state, &item_id)?;
    let passport = state.passport(&identity).await;
    let tasted = passport.rankings().read_model().is_tasted(item.id.as_str());

    add_breadcrumb("ranking", "Toggled stamp", Some(&[("item", item.id.as_str())]));
    Ok(save(&passport, &item, RankingUpdate::toggle_stamp(tasted)).await)
}

/// Save tasting notes. Also stamps the item.
#[instrument(skip(state, form))]
pub async fn notes(
    State(state): State<AppState>,
    PassportIdentity(identity): PassportIdentity,
    Path(item_id): Path<String>,
    Form(form): Form<NotesForm>,
) -> Result<Response> {
    let item = find_item(&state, &item_id)?;
    let passport = state.passport(&identity).await;
    Ok(save(&passport, &item, RankingUpdate::notes(form.notes)).await)
}
