//! Sake Passport CLI - Database migrations and export tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply record store and session migrations
//! passport-cli migrate
//!
//! # Print the bundled catalog as YAML
//! passport-cli catalog
//!
//! # Print one attendee's passport as YAML
//! passport-cli export --identity 4f1c2a9e-...
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `catalog` - Print the bundled catalog
//! - `export` - Export a passport from the `PostgreSQL` record store

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use sake_passport_web::config::DEFAULT_APP_NAMESPACE;

mod commands;

#[derive(Parser)]
#[command(name = "passport-cli")]
#[command(author, version, about = "Sake Passport CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Print the bundled catalog as YAML
    Catalog,
    /// Print a passport as YAML
    Export {
        /// Passport identity (shown on the passport page)
        #[arg(short, long)]
        identity: String,

        /// Record store namespace
        #[arg(short, long, default_value = DEFAULT_APP_NAMESPACE)]
        namespace: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Catalog => commands::export::catalog()?,
        Commands::Export {
            identity,
            namespace,
        } => commands::export::passport(&namespace, &identity).await?,
    }
    Ok(())
}
