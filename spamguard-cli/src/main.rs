//! SpamGuard CLI: runs the standalone server, the serverless functions
//! host, or retraining cycles from the command line.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// SpamGuard: spam classification as a service
#[derive(Parser, Debug)]
#[command(name = "spamguard", version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Train on a local dataset, then serve /predict and /metrics
    Serve {
        /// Dataset file (defaults to dataset.local_path)
        #[arg(short, long)]
        dataset: Option<PathBuf>,
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Disable the permissive CORS layer
        #[arg(long)]
        no_cors: bool,
    },
    /// Run the Azure Functions custom handler (predict + retrain triggers)
    Functions {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (FUNCTIONS_CUSTOMHANDLER_PORT takes precedence)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run one retraining cycle, or keep retraining on a cron schedule
    Retrain {
        /// Retrain on a schedule; without a value uses functions.retrain_schedule
        #[arg(long, value_name = "CRON", num_args = 0..=1)]
        schedule: Option<Option<String>>,
    },
    /// Classify one message with the model currently in blob storage
    Predict {
        /// Message text
        message: String,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Show the effective configuration (secrets redacted)
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    let log_dir = directories::ProjectDirs::from("dev", "spamguard", "spamguard")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "spamguard.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let config = spamguard_core::load_config(cli.config.as_deref())
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    commands::handle_command(cli.command, config).await
}
