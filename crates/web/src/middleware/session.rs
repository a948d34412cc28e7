//! Session middleware configuration.
//!
//! The session only carries the anonymous passport identity. It is stored in
//! memory or in `PostgreSQL`, matching the record store backend.

use tower_sessions::{Expiry, SessionManagerLayer, SessionStore};

use crate::config::PassportConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "sake_passport";

/// Session expiry after inactivity, in seconds (30 days).
const SESSION_EXPIRY_SECONDS: i64 = 30 * 24 * 60 * 60;

/// Create the session layer over the given store.
#[must_use]
pub fn create_session_layer<S>(store: S, config: &PassportConfig) -> SessionManagerLayer<S>
where
    S: SessionStore + Clone,
{
    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
