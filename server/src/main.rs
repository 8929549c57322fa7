//! CropGuard HTTP Server
//!
//! Thin HTTP adapter over the CropGuard inference boundary: health, class
//! listing and image upload prediction. The checkpoint is loaded before the
//! listener binds; a missing or corrupt checkpoint stops the process.

mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use cropguard::backend::{backend_name, default_device, InferenceBackend};
use cropguard::config::AppConfig;
use cropguard::inference::{ImageClassifier, LeafClassifier};

use crate::state::AppState;

/// CropGuard HTTP Server
#[derive(Parser, Debug)]
#[command(name = "cropguard-server")]
#[command(version)]
#[command(about = "HTTP API for plant-leaf disease prediction")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "CROPGUARD_PORT")]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long, env = "CROPGUARD_HOST")]
    host: Option<String>,

    /// Checkpoint file
    #[arg(long, env = "CROPGUARD_CHECKPOINT")]
    checkpoint: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, env = "CROPGUARD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    // Build configuration
    let mut config =
        AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(port) = cli.port {
        config.server.port = port;
    }

    if let Some(host) = cli.host {
        config.server.host = host;
    }

    if let Some(checkpoint) = cli.checkpoint {
        config.checkpoint = checkpoint;
    }

    info!("CropGuard Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Checkpoint: {:?}", config.checkpoint);
    info!("  Backend:    {}", backend_name());

    // Load model before accepting connections
    let classifier =
        match LeafClassifier::<InferenceBackend>::load(&config.checkpoint, &default_device()) {
            Ok(classifier) => classifier,
            Err(e) => {
                error!("Failed to load model: {}", e);
                return Err(e).context("Refusing to start without a model");
            }
        };
    info!(
        "Model loaded with {} classes",
        classifier.vocabulary().len()
    );

    // Create shared state
    let state = Arc::new(AppState::new(
        Arc::new(classifier),
        config.checkpoint.clone(),
    ));

    let app = routes::router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
