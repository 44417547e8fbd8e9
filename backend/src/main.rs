//! Session Auth Backend
//!
//! Registers users, verifies passwords, issues short-lived signed tokens and
//! tracks one server-side session per user so tokens can be refreshed and
//! revoked.
//!
//! ## Architecture
//!
//! - Routes: HTTP request handling and routing
//! - Services: auth orchestration and the session cleaner
//! - Repositories: credential and session stores (PostgreSQL or in-memory)

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use session_auth_backend::{
    auth::SigningSecret,
    config::{self, StorageBackend},
    db,
    repositories::{
        CredentialStore, InMemoryCredentialStore, InMemorySessionStore, PgCredentialStore,
        PgSessionStore, SessionStore,
    },
    routes,
    services::SessionCleaner,
    state::AppState,
};
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    let config = config::AppConfig::load()?;
    if let Err(e) = config.validate() {
        error!("Configuration error: {:#}", e);
        return Err(e);
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        env = if config::AppConfig::is_production() { "production" } else { "development" },
        storage = ?config.storage.backend,
        "Starting Session Auth Backend"
    );

    let (credentials, sessions) = open_stores(&config).await?;

    // Lives only in this process; a restart invalidates every issued token
    let secret = SigningSecret::generate();
    let mut state = AppState::new(config.clone(), credentials, sessions.clone(), &secret)?;
    drop(secret);

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => state = state.with_metrics(handle),
        Err(e) => warn!("Metrics recorder not installed: {}", e),
    }

    let cancel = CancellationToken::new();
    let cleaner = SessionCleaner::from_config(sessions, &config.session).spawn(cancel.clone());

    let app = routes::create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!(address = %addr, "Server listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel.cancel();
    if let Err(e) = cleaner.await {
        warn!("Session cleaner did not stop cleanly: {}", e);
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Build the credential and session stores for the configured backend
async fn open_stores(
    config: &config::AppConfig,
) -> Result<(Arc<dyn CredentialStore>, Arc<dyn SessionStore>)> {
    match config.storage.backend {
        StorageBackend::Postgres => {
            info!("Connecting to database...");
            let pool = db::connect(&config.database).await?;

            // Production runs migrations as a separate job
            if !config::AppConfig::is_production() {
                db::run_migrations(&pool).await?;
            }

            Ok((
                Arc::new(PgCredentialStore::new(pool.clone())),
                Arc::new(PgSessionStore::new(pool)),
            ))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; credentials and sessions are lost on restart");
            Ok((
                Arc::new(InMemoryCredentialStore::new()),
                Arc::new(InMemorySessionStore::new()),
            ))
        }
    }
}

/// Initialize tracing/logging
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if config::AppConfig::is_production() {
            "session_auth_backend=info,tower_http=info".into()
        } else {
            "session_auth_backend=debug,tower_http=debug,sqlx=warn".into()
        }
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config::AppConfig::is_production() {
        // JSON logging for production (better for log aggregation)
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
