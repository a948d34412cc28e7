//! Scanner handlers (HTMX).
//!
//! The browser decodes QR codes and posts the text here. Every response is
//! the scan status fragment, which polls itself while the scanner cools down.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State};
use serde::Deserialize;
use tracing::instrument;

use crate::middleware::PassportIdentity;
use crate::routes::views::ScanStatusView;
use crate::state::AppState;

/// Scan form data.
#[derive(Debug, Deserialize)]
pub struct ScanForm {
    #[serde(default)]
    pub code: String,
}

/// Scan status fragment.
#[derive(Template, WebTemplate)]
#[template(path = "partials/scan_status.html")]
pub struct ScanStatusTemplate {
    pub status: ScanStatusView,
}

/// Handle a decoded or manually entered booth code.
#[instrument(skip(state))]
pub async fn submit(
    State(state): State<AppState>,
    PassportIdentity(identity): PassportIdentity,
    Form(form): Form<ScanForm>,
) -> ScanStatusTemplate {
    let passport = state.passport(&identity).await;
    let status = match passport.scan(state.catalog(), &form.code).await {
        Some(status) => status,
        None => passport.scanner().status(),
    };
    ScanStatusTemplate {
        status: status.into(),
    }
}

/// Report that the camera or decoder failed.
#[instrument(skip(state))]
pub async fn decode_error(
    State(state): State<AppState>,
    PassportIdentity(identity): PassportIdentity,
) -> ScanStatusTemplate {
    tracing::info!("camera unavailable");
    let passport = state.passport(&identity).await;
    ScanStatusTemplate {
        status: passport.scanner().report_decode_error().into(),
    }
}

/// Current scanner status.
pub async fn status(
    State(state): State<AppState>,
    PassportIdentity(identity): PassportIdentity,
) -> ScanStatusTemplate {
    let passport = state.passport(&identity).await;
    ScanStatusTemplate {
        status: passport.scanner().status().into(),
    }
}
