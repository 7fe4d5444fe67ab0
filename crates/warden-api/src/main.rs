//! Warden API Server
//!
//! REST API server for user management and JWT authentication.
//!
//! Author: hephaex@gmail.com

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use warden_api::{create_router, state::AppState};
use warden_core::config::AppConfig;
use warden_core::PgUserStore;

#[derive(Parser)]
#[command(name = "warden-api")]
#[command(about = "User management API with JWT authentication")]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

fn init_tracing(config: &AppConfig) {
    let level = if config.server.environment.eq_ignore_ascii_case("development") {
        "debug"
    } else {
        config.logging.level.as_str()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("warden_api={level},warden_core={level},tower_http={level}").into()
    });

    if config.logging.json_format {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load(&cli.config)
        .with_context(|| format!("failed to load configuration from {}", cli.config.display()))?;

    init_tracing(&config);

    // Connect and migrate the user store
    let store = PgUserStore::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    store.migrate().await.context("failed to run migrations")?;
    tracing::info!(
        host = %config.database.host,
        dbname = %config.database.dbname,
        "database ready"
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let environment = config.server.environment.clone();

    // Create application state
    let state = Arc::new(AppState::new(config, Arc::new(store)));

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%environment, "Warden API Server starting on http://{}", addr);
    tracing::info!("OpenAPI document at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}
