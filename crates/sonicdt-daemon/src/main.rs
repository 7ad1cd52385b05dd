//! sonicdt daemon
//!
//! Loads the DT model once at startup and serves the prediction form and API.

use anyhow::{Context, Result};
use clap::Parser;
use sonicdt_api::create_router;
use sonicdt_core::{ModelSource, ServiceConfig};
use sonicdt_runtime::ModelGateway;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;

/// sonicdtd - well log DT prediction service
#[derive(Parser, Debug)]
#[command(name = "sonicdtd")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override bind address
    #[arg(long)]
    address: Option<String>,

    /// Override HTTP port
    #[arg(long)]
    port: Option<u16>,

    /// Load the model from this local file
    #[arg(long, conflicts_with = "model_url")]
    model_path: Option<PathBuf>,

    /// Download the model from this URL
    #[arg(long, requires = "destination")]
    model_url: Option<String>,

    /// Where a downloaded model is cached
    #[arg(long)]
    destination: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Log format (text or json)
    #[arg(long)]
    log_format: Option<String>,
}

impl Args {
    fn apply(&self, config: &mut ServiceConfig) {
        if let Some(address) = &self.address {
            config.server.address = address.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(path) = &self.model_path {
            config.model.source = ModelSource::Local { path: path.clone() };
        }
        if let (Some(url), Some(destination)) = (&self.model_url, &self.destination) {
            config.model.source = ModelSource::Remote {
                url: url.clone(),
                destination: destination.clone(),
            };
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if let Some(format) = &self.log_format {
            config.logging.format = format.clone();
        }
    }
}

fn init_logging(config: &ServiceConfig) {
    match config.logging.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(config.logging.level.as_str())
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(config.logging.level.as_str())
                .with_target(false)
                .init();
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ServiceConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    init_logging(&config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        source = %config.model.source,
        fetch_timeout_secs = config.model.fetch_timeout_secs,
        "Starting sonicdt daemon"
    );

    let gateway = Arc::new(ModelGateway::from_config(&config.model)?);

    // A failed load is cached; the server still starts and reports it on every request
    match gateway.load().await {
        Ok(loaded) => tracing::info!(
            model = %loaded.describe(),
            format = loaded.format,
            fetched = loaded.fetched,
            "Model ready"
        ),
        Err(e) => tracing::error!(
            error = %e,
            "Model unavailable, predictions are halted"
        ),
    }

    let router = create_router(gateway);

    let addr: SocketAddr = format!("{}:{}", config.server.address, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.address, config.server.port
            )
        })?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("sonicdt daemon stopped");
    Ok(())
}
