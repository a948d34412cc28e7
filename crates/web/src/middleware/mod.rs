//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors, added in `main`)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions, memory or `PostgreSQL` store)

pub mod identity;
pub mod request_id;
pub mod session;

pub use identity::{PassportIdentity, resolve_identity};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
