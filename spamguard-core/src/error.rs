//! Error types for SpamGuard.
//!
//! Uses `thiserror` for structured variants covering datasets, training,
//! model artifacts, blob storage, and configuration. Every error maps to an
//! [`ErrorKind`] whose public message is safe to return to HTTP callers;
//! the full `Display` text is meant for server-side logs only.

/// Top-level error type for the SpamGuard core library.
#[derive(Debug, thiserror::Error)]
pub enum SpamError {
    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Errors from loading or validating a serialized model artifact.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Unsupported artifact format version {found} (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("Artifact label vocabulary {found:?} does not match {expected:?}")]
    LabelMismatch {
        found: Vec<String>,
        expected: Vec<String>,
    },

    #[error("Malformed artifact: {message}")]
    Malformed { message: String },
}

/// Errors from blob storage interactions.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Blob not found: {container}/{blob}")]
    NotFound { container: String, blob: String },

    #[error("Blob already exists: {container}/{blob}")]
    AlreadyExists { container: String, blob: String },

    #[error("Storage request failed: {message}")]
    Request { message: String },

    #[error("Storage service returned {status} for {container}/{blob}")]
    Status {
        status: u16,
        container: String,
        blob: String,
    },

    #[error("Invalid connection string: {reason}")]
    InvalidConnectionString { reason: String },
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request {
            message: e.to_string(),
        }
    }
}

impl From<reqwest::Error> for SpamError {
    fn from(e: reqwest::Error) -> Self {
        Self::Storage(e.into())
    }
}

/// Coarse classification of failures, used to pick a fixed public message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    ModelRetrieval,
    ModelLoad,
    Inference,
    Dataset,
    Training,
    Configuration,
    Internal,
}

impl ErrorKind {
    /// Non-sensitive description suitable for HTTP response bodies.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid request",
            Self::ModelRetrieval => "model retrieval failed",
            Self::ModelLoad => "model could not be loaded",
            Self::Inference => "prediction failed",
            Self::Dataset => "dataset could not be loaded",
            Self::Training => "model training failed",
            Self::Configuration => "service is misconfigured",
            Self::Internal => "internal error",
        }
    }
}

impl SpamError {
    pub fn dataset(msg: impl Into<String>) -> Self {
        Self::Dataset(msg.into())
    }

    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Classify this error for public reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Dataset(_) | Self::Csv(_) => ErrorKind::Dataset,
            Self::Training(_) => ErrorKind::Training,
            Self::Model(_) => ErrorKind::Inference,
            Self::Artifact(_) | Self::Serde(_) => ErrorKind::ModelLoad,
            Self::Storage(StorageError::InvalidConnectionString { .. }) | Self::Config(_) => {
                ErrorKind::Configuration
            }
            Self::Storage(_) => ErrorKind::ModelRetrieval,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Io(_) => ErrorKind::Internal,
        }
    }
}

/// Convenience result alias for the core library.
pub type Result<T> = std::result::Result<T, SpamError>;
