//! Subcommand handlers.

use std::sync::Arc;

use spamguard_core::api::validate_message;
use spamguard_core::config::CUSTOM_HANDLER_PORT_ENV;
use spamguard_core::{PredictionResponse, SpamGuardConfig, build_blob_store};
use spamguard_functions::{FunctionsState, Predictor, RetrainOutcome, RetrainSchedule, Retrainer};
use spamguard_server::AppState;

use crate::{Commands, ConfigAction};

pub async fn handle_command(command: Commands, config: SpamGuardConfig) -> anyhow::Result<()> {
    match command {
        Commands::Serve {
            dataset,
            host,
            port,
            no_cors,
        } => {
            let mut config = config;
            if let Some(dataset) = dataset {
                config.dataset.local_path = dataset;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if no_cors {
                config.server.cors = false;
            }
            handle_serve(config).await
        }
        Commands::Functions { host, port } => {
            let mut config = config;
            if let Some(host) = host {
                config.functions.host = host;
            }
            if let Some(port) = port {
                if std::env::var_os(CUSTOM_HANDLER_PORT_ENV).is_some() {
                    tracing::warn!(port, "Ignoring --port; {} is set", CUSTOM_HANDLER_PORT_ENV);
                } else {
                    config.functions.port = port;
                }
            }
            handle_functions(config).await
        }
        Commands::Retrain { schedule } => handle_retrain(config, schedule).await,
        Commands::Predict { message } => handle_predict(config, message).await,
        Commands::Config { action } => handle_config(action, &config),
    }
}

async fn handle_serve(config: SpamGuardConfig) -> anyhow::Result<()> {
    tracing::info!(dataset = %config.dataset.local_path.display(), "Training standalone model");
    let training_config = config.clone();
    // Training finishes before the listener is bound.
    let state = tokio::task::spawn_blocking(move || AppState::train(&training_config))
        .await?
        .map_err(|e| anyhow::anyhow!("Startup training failed: {}", e))?;
    spamguard_server::run(Arc::new(state), &config.server).await?;
    Ok(())
}

async fn handle_functions(config: SpamGuardConfig) -> anyhow::Result<()> {
    let state = FunctionsState::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize functions: {}", e))?;
    tracing::info!(?state, "Starting functions host");
    spamguard_functions::run(state, &config.functions.host, config.functions.port).await?;
    Ok(())
}

async fn handle_retrain(
    config: SpamGuardConfig,
    schedule: Option<Option<String>>,
) -> anyhow::Result<()> {
    let store = build_blob_store(&config.storage)?;
    let retrainer = Retrainer::from_config(&config, store);

    let Some(expression) = schedule else {
        match retrainer.run().await? {
            RetrainOutcome::DatasetMissing => println!("Dataset missing; nothing trained."),
            RetrainOutcome::Uploaded { rows, bytes } => println!(
                "Uploaded {} ({} bytes, trained on {} rows)",
                config.storage.model, bytes, rows
            ),
        }
        return Ok(());
    };

    let expression = expression.unwrap_or_else(|| config.functions.retrain_schedule.clone());
    let schedule = RetrainSchedule::parse(&expression)?;
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let cycles = spamguard_functions::run_scheduled(&retrainer, &schedule, shutdown).await;
    println!("Stopped after {} retraining cycle(s).", cycles);
    Ok(())
}

async fn handle_predict(config: SpamGuardConfig, message: String) -> anyhow::Result<()> {
    let message = validate_message(message)?;
    let store = build_blob_store(&config.storage)?;
    let predictor = Predictor::from_config(&config, store);
    let prediction = predictor.predict(message).await?;
    println!("{}", serde_json::to_string(&PredictionResponse { prediction })?);
    Ok(())
}

fn handle_config(action: ConfigAction, config: &SpamGuardConfig) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(&config.redacted())?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}
