//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! passport-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `PASSPORT_DATABASE_URL` (or `DATABASE_URL`) - `PostgreSQL` connection string
//!
//! # Migration Files
//!
//! Record store migrations live in `crates/web/migrations/`. The session
//! table is created by `tower-sessions-sqlx-store`.

use sake_passport_web::db;

use super::{CommandError, database_url};

/// Run all migrations.
pub async fn run() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running migrations...");
    db::run_migrations(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
