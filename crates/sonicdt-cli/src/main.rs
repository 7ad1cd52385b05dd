//! sonicdt CLI
//!
//! Command-line interface for the sonicdt prediction service.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// sonicdt - predict the DT sonic log from RHOB, GR, NPHI and PEF
#[derive(Parser, Debug)]
#[command(name = "sonicdt")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Daemon address
    #[arg(long, default_value = "http://localhost:8501", global = true)]
    api: String,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Well log measurements; omitted values use the form defaults
#[derive(clap::Args, Debug)]
struct FeatureArgs {
    /// Bulk density, g/cm³
    #[arg(long)]
    rhob: Option<f64>,

    /// Gamma ray, API
    #[arg(long)]
    gr: Option<f64>,

    /// Neutron porosity, v/v
    #[arg(long)]
    nphi: Option<f64>,

    /// Photoelectric factor, b/e
    #[arg(long)]
    pef: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ask the daemon for a DT prediction
    Predict {
        #[command(flatten)]
        features: FeatureArgs,
    },

    /// Show daemon and model status
    Status,

    /// Load a model artifact locally and run one prediction
    Check {
        /// Local artifact path
        #[arg(long, conflicts_with = "model_url")]
        model_path: Option<PathBuf>,

        /// Remote artifact URL
        #[arg(long, requires = "destination")]
        model_url: Option<String>,

        /// Cache location for a remote artifact
        #[arg(long)]
        destination: Option<PathBuf>,

        /// Fetch timeout in seconds
        #[arg(long, default_value_t = 300)]
        timeout: u64,

        #[command(flatten)]
        features: FeatureArgs,
    },
}

impl FeatureArgs {
    fn into_features(self) -> sonicdt_core::FeatureVector {
        let defaults = sonicdt_core::FeatureVector::default();
        sonicdt_core::FeatureVector::new(
            self.rhob.unwrap_or(defaults.rhob),
            self.gr.unwrap_or(defaults.gr),
            self.nphi.unwrap_or(defaults.nphi),
            self.pef.unwrap_or(defaults.pef),
        )
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let client = commands::ApiClient::new(&cli.api);

    match cli.command {
        Commands::Predict { features } => {
            commands::predict(&client, features.into_features()).await?;
        }
        Commands::Status => {
            commands::status(&client).await?;
        }
        Commands::Check {
            model_path,
            model_url,
            destination,
            timeout,
            features,
        } => {
            let source = commands::check_source(model_path, model_url, destination);
            commands::check(source, timeout, features.into_features()).await?;
        }
    }

    Ok(())
}
