//! Sake Passport web server.
//!
//! Serves the tasting passport on port 3000 by default. The record store
//! backend is chosen by `PASSPORT_STORE`; see [`sake_passport_web::config`].

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;
use std::sync::Arc;

use sake_passport_core::Catalog;
use sake_passport_web::config::{PassportConfig, StoreBackend};
use sake_passport_web::db;
use sake_passport_web::routes;
use sake_passport_web::state::AppState;
use sake_passport_web::store::{MemoryRecordStore, PostgresRecordStore, RecordStore};
use sentry::integrations::tracing as sentry_tracing;
use tower_sessions::MemoryStore;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &PassportConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match PassportConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Failed to load configuration: {e}");
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sake_passport_web=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let catalog = Catalog::bundled();
    tracing::info!(items = catalog.len(), store = ?config.store, "starting sake passport");

    match run(config, catalog).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "server error");
            ExitCode::FAILURE
        }
    }
}

/// Pick the backend, then serve until shutdown.
async fn run(config: PassportConfig, catalog: Catalog) -> std::io::Result<()> {
    match (config.store, config.database_url.clone()) {
        (StoreBackend::Postgres, Some(database_url)) => {
            match db::create_pool(&database_url).await {
                Ok(pool) => {
                    tracing::info!("Database pool created");
                    // NOTE: Migrations are NOT run automatically on startup.
                    // Run them explicitly via: cargo run -p sake-passport-cli -- migrate
                    let store: Arc<dyn RecordStore> =
                        Arc::new(PostgresRecordStore::new(pool.clone()));
                    let state = AppState::new(config, catalog, Some(store));
                    serve(state, PostgresStore::new(pool)).await
                }
                Err(e) => {
                    // Serve anyway; pages stay on the connecting screen and
                    // readiness reports 503.
                    tracing::error!(error = %e, "record store unavailable");
                    let state = AppState::new(config, catalog, None);
                    serve(state, MemoryStore::default()).await
                }
            }
        }
        _ => {
            tracing::warn!("using in-memory record store; passports are lost on restart");
            let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
            let state = AppState::new(config, catalog, Some(store));
            serve(state, MemoryStore::default()).await
        }
    }
}

async fn serve<S>(state: AppState, sessions: S) -> std::io::Result<()>
where
    S: tower_sessions::SessionStore + Clone,
{
    let addr = state.config().socket_addr();
    let app = routes::app(state.clone(), sessions)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("sake passport listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.shutdown().await;
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
