//! Anonymous passport identity.
//!
//! Every visitor is signed in anonymously: the first request stores a fresh
//! identity in the session and later requests read it back. If the session
//! cannot be read or written the request still gets a usable identity, it just
//! won't survive to the next request.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use sake_passport_core::Identity;

/// Session key holding the passport identity.
pub const IDENTITY_KEY: &str = "passport_identity";

/// Extractor yielding the caller's passport identity. Never rejects.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(PassportIdentity(identity): PassportIdentity) -> String {
///     identity.to_string()
/// }
/// ```
#[derive(Debug, Clone)]
pub struct PassportIdentity(pub Identity);

impl<S> FromRequestParts<S> for PassportIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>().cloned() else {
            tracing::warn!("no session layer; using a fallback identity");
            return Ok(Self(Identity::generate()));
        };

        let identity = resolve_identity(&session).await;
        crate::error::set_sentry_identity(&identity);
        Ok(Self(identity))
    }
}

/// Read the session's identity, signing in anonymously if there is none.
pub async fn resolve_identity(session: &Session) -> Identity {
    match session.get::<Identity>(IDENTITY_KEY).await {
        Ok(Some(identity)) => return identity,
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(error = %e, "failed to read identity from session");
        }
    }

    let identity = Identity::generate();
    match session.insert(IDENTITY_KEY, &identity).await {
        Ok(()) => tracing::info!(identity = %identity, "anonymous sign-in"),
        Err(e) => tracing::warn!(
            error = %e,
            identity = %identity,
            "anonymous sign-in not persisted; using a fallback identity"
        ),
    }
    identity
}
