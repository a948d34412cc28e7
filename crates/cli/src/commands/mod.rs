//! CLI command implementations.

pub mod export;
pub mod migrate;

use secrecy::SecretString;
use thiserror::Error;

use sake_passport_web::db::MigrationError;
use sake_passport_web::store::StoreError;

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error("Record store error: {0}")]
    Store(#[from] StoreError),

    #[error("Stored passport is unreadable: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Database URL from `PASSPORT_DATABASE_URL`, falling back to `DATABASE_URL`.
pub fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("PASSPORT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("PASSPORT_DATABASE_URL"))
}
