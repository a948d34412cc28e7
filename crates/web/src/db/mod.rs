//! `PostgreSQL` connection and schema management.
//!
//! # Tables
//!
//! - `passport.documents` - Record store documents (see [`crate::store::postgres`])
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p sake-passport-cli -- migrate
//! ```

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::PgPool;
use sqlx::migrate::MigrateError;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;
use tower_sessions_sqlx_store::PostgresStore;

/// Errors raised while preparing the database schema.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("record store migration failed: {0}")]
    Documents(#[from] MigrateError),
    #[error("session store migration failed: {0}")]
    Sessions(#[source] sqlx::Error),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Apply record store migrations and the session store schema.
///
/// # Errors
///
/// Returns `MigrationError` naming the step that failed.
pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrationError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    PostgresStore::new(pool.clone())
        .migrate()
        .await
        .map_err(MigrationError::Sessions)?;
    Ok(())
}
