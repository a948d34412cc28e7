//! Sake Passport web server library.
//!
//! The attendee-facing side of the passport: anonymous identities, the live
//! ranking read model, the booth scanner and the server-rendered views. Exposed
//! as a library so the binary, the CLI and the integration tests share it.
//!
//! # Architecture
//!
//! - Axum web framework with HTMX (and its SSE extension) for interactivity
//! - Askama templates for server-side rendering
//! - A [`store::RecordStore`] per deployment: in-memory or `PostgreSQL`
//! - One [`services::Passport`] per active identity, cached in `AppState`

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
