//! Configuration system for SpamGuard.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/spamguard/config.toml`, `./spamguard.toml`
//! and an optional explicit file, then `SPAMGUARD_*` environment variables.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::model::{ClassifierKind, TrainingParams};
use crate::storage::BlobRef;

/// Environment variable the Azure Functions host uses for the storage account.
pub const AZURE_STORAGE_ENV: &str = "AzureWebJobsStorage";

/// Environment variable carrying the port a custom handler must listen on.
pub const CUSTOM_HANDLER_PORT_ENV: &str = "FUNCTIONS_CUSTOMHANDLER_PORT";

/// Top-level configuration for SpamGuard.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpamGuardConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub functions: FunctionsConfig,
}

/// Which blob store implementation to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    #[default]
    Azure,
    Local,
}

/// Blob storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Blob store implementation.
    #[serde(default)]
    pub backend: StorageBackend,
    /// Azure storage connection string (falls back to `AzureWebJobsStorage`).
    #[serde(default)]
    pub connection_string: Option<String>,
    /// Root directory for the `local` backend.
    #[serde(default = "default_local_root")]
    pub local_root: PathBuf,
    /// HTTP timeout for blob requests in seconds.
    #[serde(default = "default_storage_timeout")]
    pub timeout_secs: u64,
    /// Location of the labeled dataset.
    #[serde(default = "default_dataset_blob")]
    pub dataset: BlobRef,
    /// Location of the model artifact.
    #[serde(default = "default_model_blob")]
    pub model: BlobRef,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            connection_string: None,
            local_root: default_local_root(),
            timeout_secs: default_storage_timeout(),
            dataset: default_dataset_blob(),
            model: default_model_blob(),
        }
    }
}

fn default_local_root() -> PathBuf {
    PathBuf::from(".spamguard/blobs")
}

fn default_storage_timeout() -> u64 {
    60
}

fn default_dataset_blob() -> BlobRef {
    BlobRef::new("dataset", "spam.csv")
}

fn default_model_blob() -> BlobRef {
    BlobRef::new("models", "model.json")
}

/// Fixed local scratch paths used by the serverless functions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Where the Predictor/Retrainer keep the local model copy.
    #[serde(default = "default_model_file")]
    pub model_file: PathBuf,
    /// Where the Retrainer keeps the local dataset copy.
    #[serde(default = "default_dataset_file")]
    pub dataset_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            model_file: default_model_file(),
            dataset_file: default_dataset_file(),
        }
    }
}

fn default_model_file() -> PathBuf {
    std::env::temp_dir().join("model.json")
}

fn default_dataset_file() -> PathBuf {
    std::env::temp_dir().join("spam.csv")
}

/// Dataset layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Dataset file used by the standalone server.
    #[serde(default = "default_dataset_path")]
    pub local_path: PathBuf,
    /// Header name of the label column.
    #[serde(default = "default_label_column")]
    pub label_column: String,
    /// Header name of the message column.
    #[serde(default = "default_text_column")]
    pub text_column: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            local_path: default_dataset_path(),
            label_column: default_label_column(),
            text_column: default_text_column(),
        }
    }
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("spam.csv")
}

fn default_label_column() -> String {
    "v1".to_string()
}

fn default_text_column() -> String {
    "v2".to_string()
}

/// Training hyperparameters shared by both deployment shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of rows held out by the standalone server.
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    /// Shuffle seed for the train/test split.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Vocabulary cap for the count vectorizer (`None` keeps every term).
    #[serde(default = "default_max_features")]
    pub max_features: Option<usize>,
    /// Additive smoothing for multinomial Naive Bayes.
    #[serde(default = "default_nb_alpha")]
    pub nb_alpha: f64,
    /// L2 regularization strength for logistic regression.
    #[serde(default = "default_lr_alpha")]
    pub lr_alpha: f64,
    /// Iteration limit for the logistic regression solver.
    #[serde(default = "default_lr_max_iterations")]
    pub lr_max_iterations: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: default_test_size(),
            seed: default_seed(),
            max_features: default_max_features(),
            nb_alpha: default_nb_alpha(),
            lr_alpha: default_lr_alpha(),
            lr_max_iterations: default_lr_max_iterations(),
        }
    }
}

impl TrainingConfig {
    /// Pipeline parameters for the given classifier kind.
    pub fn params(&self, kind: ClassifierKind) -> TrainingParams {
        TrainingParams {
            kind,
            max_features: self.max_features,
            nb_alpha: self.nb_alpha,
            lr_alpha: self.lr_alpha,
            lr_max_iterations: self.lr_max_iterations,
        }
    }
}

fn default_test_size() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_max_features() -> Option<usize> {
    Some(3000)
}

fn default_nb_alpha() -> f64 {
    1.0
}

fn default_lr_alpha() -> f64 {
    1.0
}

fn default_lr_max_iterations() -> u64 {
    100
}

/// Standalone server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_server_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// Allow cross-origin requests from any origin.
    #[serde(default = "default_true")]
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            cors: true,
        }
    }
}

fn default_server_host() -> String {
    "0.0.0.0".to_string()
}

fn default_server_port() -> u16 {
    5001
}

/// Serverless function host configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionsConfig {
    /// Host to bind the custom handler to.
    #[serde(default = "default_functions_host")]
    pub host: String,
    /// Port to listen on (overridden by `FUNCTIONS_CUSTOMHANDLER_PORT`).
    #[serde(default = "default_functions_port")]
    pub port: u16,
    /// Cron expression for local retraining (`cron` crate syntax, UTC).
    #[serde(default = "default_retrain_schedule")]
    pub retrain_schedule: String,
}

impl Default for FunctionsConfig {
    fn default() -> Self {
        Self {
            host: default_functions_host(),
            port: default_functions_port(),
            retrain_schedule: default_retrain_schedule(),
        }
    }
}

fn default_functions_host() -> String {
    "127.0.0.1".to_string()
}

fn default_functions_port() -> u16 {
    7071
}

fn default_retrain_schedule() -> String {
    "0 0 0 * * * *".to_string()
}

fn default_true() -> bool {
    true
}

impl SpamGuardConfig {
    /// Copy of this config that is safe to print or log.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if let Some(conn) = &config.storage.connection_string {
            config.storage.connection_string = Some(redact_connection_string(conn));
        }
        config
    }
}

/// Replace secret values in an Azure connection string.
pub fn redact_connection_string(conn: &str) -> String {
    conn.split(';')
        .filter(|part| !part.trim().is_empty())
        .map(|part| match part.split_once('=') {
            Some((key, _)) if key.eq_ignore_ascii_case("AccountKey") => format!("{key}=***"),
            Some((key, _)) if key.eq_ignore_ascii_case("SharedAccessSignature") => {
                format!("{key}=***")
            }
            _ => part.to_string(),
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with `SPAMGUARD_`)
/// 2. Explicit config file
/// 3. Working-directory config (`./spamguard.toml`)
/// 4. User config (`~/.config/spamguard/config.toml`)
/// 5. Built-in defaults
///
/// Host-provided variables (`AzureWebJobsStorage`, `FUNCTIONS_CUSTOMHANDLER_PORT`)
/// fill in the connection string and function port afterwards. Command-line
/// flags are applied by the caller on the returned value.
pub fn load_config(config_file: Option<&Path>) -> Result<SpamGuardConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(SpamGuardConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "spamguard", "spamguard") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    let local_config = PathBuf::from("spamguard.toml");
    if local_config.exists() {
        figment = figment.merge(Toml::file(&local_config));
    }

    if let Some(path) = config_file {
        figment = figment.merge(Toml::file(path));
    }

    // Environment variables (SPAMGUARD_STORAGE__BACKEND, SPAMGUARD_SERVER__PORT, etc.)
    figment = figment.merge(Env::prefixed("SPAMGUARD_").split("__"));

    let mut config: SpamGuardConfig = figment.extract().map_err(Box::new)?;
    apply_host_environment(&mut config);
    Ok(config)
}

/// Fill in values the serverless host injects through its own variables.
fn apply_host_environment(config: &mut SpamGuardConfig) {
    if config.storage.connection_string.is_none() {
        if let Ok(conn) = std::env::var(AZURE_STORAGE_ENV) {
            if !conn.trim().is_empty() {
                config.storage.connection_string = Some(conn);
            }
        }
    }
    if let Ok(port) = std::env::var(CUSTOM_HANDLER_PORT_ENV) {
        match port.trim().parse::<u16>() {
            Ok(port) => config.functions.port = port,
            Err(_) => tracing::warn!(value = %port, "Ignoring invalid {}", CUSTOM_HANDLER_PORT_ENV),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = SpamGuardConfig::default();
        assert_eq!(config.storage.backend, StorageBackend::Azure);
        assert_eq!(config.storage.dataset, BlobRef::new("dataset", "spam.csv"));
        assert_eq!(config.storage.model, BlobRef::new("models", "model.json"));
        assert_eq!(config.dataset.label_column, "v1");
        assert_eq!(config.dataset.text_column, "v2");
        assert_eq!(config.training.test_size, 0.2);
        assert_eq!(config.training.seed, 42);
        assert_eq!(config.server.port, 5001);
        assert!(config.server.cors);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = SpamGuardConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: SpamGuardConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.training.max_features, config.training.max_features);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: SpamGuardConfig = toml::from_str("[server]\nport = 9000\n").unwrap();
        assert_eq!(parsed.server.port, 9000);
        assert_eq!(parsed.server.host, "0.0.0.0");
        assert_eq!(parsed.functions.retrain_schedule, "0 0 0 * * * *");
    }

    #[test]
    fn test_redact_connection_string() {
        let conn = "DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=c2VjcmV0;EndpointSuffix=core.windows.net";
        let redacted = redact_connection_string(conn);
        assert!(redacted.contains("AccountName=acct"));
        assert!(redacted.contains("AccountKey=***"));
        assert!(!redacted.contains("c2VjcmV0"));
    }

    #[test]
    fn test_load_config_layers_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "custom.toml",
                r#"
                [storage]
                backend = "local"
                local_root = "blobs"

                [server]
                port = 8000
                "#,
            )?;
            jail.set_env("SPAMGUARD_SERVER__PORT", "8100");
            jail.set_env("SPAMGUARD_TRAINING__SEED", "7");

            let config = load_config(Some(Path::new("custom.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config.storage.backend, StorageBackend::Local);
            assert_eq!(config.storage.local_root, PathBuf::from("blobs"));
            assert_eq!(config.server.port, 8100);
            assert_eq!(config.training.seed, 7);
            Ok(())
        });
    }

    #[test]
    fn test_load_config_host_environment() {
        Jail::expect_with(|jail| {
            jail.set_env(AZURE_STORAGE_ENV, "AccountName=a;AccountKey=Yg==");
            jail.set_env(CUSTOM_HANDLER_PORT_ENV, "4321");

            let config = load_config(None).map_err(|e| e.to_string())?;
            assert_eq!(
                config.storage.connection_string.as_deref(),
                Some("AccountName=a;AccountKey=Yg==")
            );
            assert_eq!(config.functions.port, 4321);
            Ok(())
        });
    }

    #[test]
    fn test_spamguard_connection_string_wins_over_host() {
        Jail::expect_with(|jail| {
            jail.set_env(AZURE_STORAGE_ENV, "AccountName=host;AccountKey=Yg==");
            jail.set_env(
                "SPAMGUARD_STORAGE__CONNECTION_STRING",
                "AccountName=mine;AccountKey=Yg==",
            );
            let config = load_config(None).map_err(|e| e.to_string())?;
            assert_eq!(
                config.storage.connection_string.as_deref(),
                Some("AccountName=mine;AccountKey=Yg==")
            );
            Ok(())
        });
    }
}
