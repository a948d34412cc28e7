//! Page and fragment handlers for the four passport views.
//!
//! Each view body is rendered from the latest snapshot only. Pages wrap the
//! body in the site chrome; `/fragments/{view}` returns the bare body so HTMX
//! can swap it in when a new snapshot arrives.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
};
use serde::Deserialize;
use tracing::instrument;

use sake_passport_core::views::{
    BoothMarker, CatalogEntry, MapProgress, PassportSummary, catalog_entries,
};
use sake_passport_core::{Catalog, Identity, ReadModel};

use crate::error::Result;
use crate::filters;
use crate::middleware::PassportIdentity;
use crate::services::{Passport, ScanPhase, ScanStatus, SyncState};
use crate::state::AppState;

/// Shown while the record store is not connected.
pub const CONNECTING_MESSAGE: &str = "Connecting to Sake Passport System...";

/// Shown until the first snapshot arrives.
pub const LOADING_MESSAGE: &str = "Loading your tasting history...";

/// The navigable views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Sakes,
    Map,
    Scan,
    Passport,
}

impl View {
    /// Views in navigation order.
    pub const ALL: [Self; 4] = [Self::Sakes, Self::Map, Self::Scan, Self::Passport];

    /// URL path segment.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Sakes => "sakes",
            Self::Map => "map",
            Self::Scan => "scan",
            Self::Passport => "passport",
        }
    }

    /// Navigation label.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Sakes => "Sake List",
            Self::Map => "Venue Map",
            Self::Scan => "Scan Stamp",
            Self::Passport => "My Passport",
        }
    }

    /// Whether the body is re-fetched on every snapshot. The scanner keeps
    /// its camera running, so it is only refreshed until it first renders.
    #[must_use]
    pub const fn refreshes_on_snapshot(self) -> bool {
        !matches!(self, Self::Scan)
    }
}

// =============================================================================
// View Models
// =============================================================================

/// One star of a rating control.
#[derive(Debug, Clone)]
pub struct Star {
    pub value: u8,
    pub filled: bool,
}

fn stars(rating: u8) -> Vec<Star> {
    (1..=sake_passport_core::Rating::MAX)
        .map(|value| Star {
            value,
            filled: value <= rating,
        })
        .collect()
}

/// Catalog item with the attendee's record, flattened for templates.
#[derive(Debug, Clone)]
pub struct SakeCard {
    pub id: String,
    pub name: String,
    pub brewery: String,
    pub region: String,
    pub style: String,
    pub location: String,
    pub flavor: String,
    pub rating: u8,
    pub stars: Vec<Star>,
    pub tasted: bool,
    pub notes: String,
    pub notes_enabled: bool,
}

impl From<&CatalogEntry> for SakeCard {
    fn from(entry: &CatalogEntry) -> Self {
        let item = &entry.item;
        let rating = entry.record.rating.value();
        Self {
            id: item.id.to_string(),
            name: item.name.clone(),
            brewery: item.brewery.clone(),
            region: item.region.clone(),
            style: item.style.clone(),
            location: item.location.clone(),
            flavor: item.flavor.clone(),
            rating,
            stars: stars(rating),
            tasted: entry.record.tasted,
            notes: entry.record.notes.clone(),
            notes_enabled: entry.notes_enabled(),
        }
    }
}

/// Scanner status flattened for templates.
#[derive(Debug, Clone)]
pub struct ScanStatusView {
    pub phase: &'static str,
    pub cooling: bool,
    pub message: Option<String>,
    pub success: bool,
}

impl From<ScanStatus> for ScanStatusView {
    fn from(status: ScanStatus) -> Self {
        Self {
            phase: match status.phase {
                ScanPhase::Scanning => "scanning",
                ScanPhase::Cooldown => "cooldown",
            },
            cooling: status.phase == ScanPhase::Cooldown,
            message: status.message,
            success: status.success,
        }
    }
}

/// Navigation tab.
#[derive(Debug, Clone)]
pub struct NavLink {
    pub slug: &'static str,
    pub title: &'static str,
    pub active: bool,
}

// =============================================================================
// Templates
// =============================================================================

/// Full page template.
#[derive(Template, WebTemplate)]
#[template(path = "page.html")]
pub struct PageTemplate {
    pub title: &'static str,
    pub view: &'static str,
    pub live: bool,
    pub identity: String,
    pub nav: Vec<NavLink>,
    pub body: String,
}

/// Loader or persistent error shown in place of a view body.
#[derive(Template)]
#[template(path = "views/status.html")]
pub struct StatusTemplate {
    pub message: String,
    pub failed: bool,
}

/// Catalog view body.
#[derive(Template)]
#[template(path = "views/sakes.html")]
pub struct SakesTemplate {
    pub cards: Vec<SakeCard>,
}

/// Venue map view body.
#[derive(Template)]
#[template(path = "views/map.html")]
pub struct MapTemplate {
    pub tasted_count: usize,
    pub total_count: usize,
    pub percent: u32,
    pub booths: Vec<BoothMarker>,
}

/// Scanner view body.
#[derive(Template)]
#[template(path = "views/scan.html")]
pub struct ScanTemplate {
    pub status: ScanStatusView,
}

/// Passport history view body.
#[derive(Template)]
#[template(path = "views/passport.html")]
pub struct PassportTemplate {
    pub identity: String,
    pub stamped_count: usize,
    pub total_count: usize,
    pub average: String,
    pub rated_count: usize,
    pub entries: Vec<SakeCard>,
}

impl SakesTemplate {
    fn build(catalog: &Catalog, model: &ReadModel) -> Self {
        Self {
            cards: catalog_entries(catalog, model)
                .iter()
                .map(SakeCard::from)
                .collect(),
        }
    }
}

impl MapTemplate {
    fn build(catalog: &Catalog, model: &ReadModel) -> Self {
        let progress = MapProgress::compute(catalog, model);
        Self {
            tasted_count: progress.tasted_count,
            total_count: progress.total_count,
            percent: progress.rounded_percent(),
            booths: progress.booths,
        }
    }
}

impl PassportTemplate {
    fn build(identity: &Identity, catalog: &Catalog, model: &ReadModel) -> Self {
        let summary = PassportSummary::compute(catalog, model);
        Self {
            identity: identity.to_string(),
            stamped_count: summary.stamped_count(),
            total_count: summary.total_count,
            average: summary.average_display(),
            rated_count: summary.rated_count,
            entries: summary.entries.iter().map(SakeCard::from).collect(),
        }
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// Render a view body for a passport's current state.
///
/// Returns the HTML and whether the view is showing real data yet.
///
/// # Errors
///
/// Returns an error if a template fails to render.
pub fn render_body(state: &AppState, passport: &Passport, view: View) -> Result<(String, bool)> {
    if state.store().is_none() {
        let html = StatusTemplate {
            message: CONNECTING_MESSAGE.to_string(),
            failed: false,
        }
        .render()?;
        return Ok((html, false));
    }

    let model = match passport.rankings().current() {
        SyncState::Ready(model) => model,
        SyncState::Loading => {
            let html = StatusTemplate {
                message: LOADING_MESSAGE.to_string(),
                failed: false,
            }
            .render()?;
            return Ok((html, false));
        }
        SyncState::Failed(message) => {
            let html = StatusTemplate {
                message,
                failed: true,
            }
            .render()?;
            return Ok((html, false));
        }
    };

    let catalog = state.catalog();
    let html = match view {
        View::Sakes => SakesTemplate::build(catalog, &model).render()?,
        View::Map => MapTemplate::build(catalog, &model).render()?,
        View::Scan => ScanTemplate {
            status: passport.scanner().status().into(),
        }
        .render()?,
        View::Passport => PassportTemplate::build(passport.identity(), catalog, &model).render()?,
    };
    Ok((html, true))
}

async fn page(state: &AppState, identity: &Identity, view: View) -> Result<PageTemplate> {
    let passport = state.passport(identity).await;
    let (body, ready) = render_body(state, &passport, view)?;

    Ok(PageTemplate {
        title: view.title(),
        view: view.slug(),
        live: view.refreshes_on_snapshot() || !ready,
        identity: identity.to_string(),
        nav: View::ALL
            .iter()
            .map(|v| NavLink {
                slug: v.slug(),
                title: v.title(),
                active: *v == view,
            })
            .collect(),
        body,
    })
}

// =============================================================================
// Handlers
// =============================================================================

/// Landing redirect.
pub async fn index() -> Redirect {
    Redirect::to("/sakes")
}

/// Catalog page.
#[instrument(skip(state))]
pub async fn sakes(
    State(state): State<AppState>,
    PassportIdentity(identity): PassportIdentity,
) -> Result<PageTemplate> {
    page(&state, &identity, View::Sakes).await
}

/// Venue map page.
#[instrument(skip(state))]
pub async fn map(
    State(state): State<AppState>,
    PassportIdentity(identity): PassportIdentity,
) -> Result<PageTemplate> {
    page(&state, &identity, View::Map).await
}

/// Scanner page.
#[instrument(skip(state))]
pub async fn scan(
    State(state): State<AppState>,
    PassportIdentity(identity): PassportIdentity,
) -> Result<PageTemplate> {
    page(&state, &identity, View::Scan).await
}

/// Passport history page.
#[instrument(skip(state))]
pub async fn passport(
    State(state): State<AppState>,
    PassportIdentity(identity): PassportIdentity,
) -> Result<PageTemplate> {
    page(&state, &identity, View::Passport).await
}

/// View body fragment (HTMX).
#[instrument(skip(state))]
pub async fn fragment(
    State(state): State<AppState>,
    PassportIdentity(identity): PassportIdentity,
    Path(view): Path<View>,
) -> Result<Html<String>> {
    let passport = state.passport(&identity).await;
    let (body, _) = render_body(&state, &passport, view)?;
    Ok(Html(body))
}
