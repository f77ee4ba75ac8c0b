//! hgd-server - Henderson Geocode Dashboard backend
//!
//! Serves the locations document (geocoded facilities), the contact
//! directory and their uploaded images over a JSON HTTP API.
//!
//! Startup order:
//! 1. Parse CLI arguments and load the TOML config (silently)
//! 2. Initialize tracing, then report where the config came from
//! 3. Resolve and create the root folder
//! 4. Build the geocoding and enrichment clients
//! 5. Serve until Ctrl+C / SIGTERM

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use hgd_common::config::{
    resolve_geocoding_api_key, RootFolderInitializer, RootFolderResolver, TomlConfig,
    DEFAULT_BIND_ADDRESS, DEFAULT_PORT,
};
use hgd_server::clients::{GoogleGeocodingClient, WikipediaClient};
use hgd_server::AppState;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for hgd-server
#[derive(Parser, Debug)]
#[command(name = "hgd-server")]
#[command(about = "Henderson Geocode Dashboard backend")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "HGD_PORT")]
    port: Option<u16>,

    /// Interface to bind
    #[arg(short, long, env = "HGD_BIND_ADDRESS")]
    bind: Option<String>,

    /// Folder holding locations.json, contacts and image assets
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// TOML config file (defaults to <config dir>/hgd/hgd-server.toml)
    #[arg(short, long, env = "HGD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, origin) = TomlConfig::load_or_default(args.config.as_deref());

    // RUST_LOG wins over the configured level
    let default_filter = format!("hgd_server={0},hgd_common={0},tower_http={0}", config.logging.level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting hgd-server v{}", env!("CARGO_PKG_VERSION"));
    origin.log();

    // Root folder: CLI → HGD_ROOT_FOLDER → TOML → platform default
    let root_folder = RootFolderResolver::new()
        .with_cli_arg(args.root_folder)
        .with_toml(&config)
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let geocoder = GoogleGeocodingClient::new(
        config.geocoding.base_url.clone(),
        resolve_geocoding_api_key(&config),
        Duration::from_millis(config.geocoding.timeout_ms),
    )
    .context("Failed to build geocoding client")?;

    if !config.enrichment.enabled {
        info!("Enrichment disabled; locations will carry the placeholder summary");
    }
    let enricher = WikipediaClient::new(
        config.enrichment.base_url.clone(),
        Duration::from_millis(config.enrichment.timeout_ms),
        config.enrichment.enabled,
    )
    .context("Failed to build enrichment client")?;

    let state = AppState::new(&initializer, Arc::new(geocoder), Arc::new(enricher));
    let app = hgd_server::build_router(state);

    let port = args.port.or(config.port).unwrap_or(DEFAULT_PORT);
    let bind = args
        .bind
        .or(config.bind_address)
        .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
    let addr: SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
