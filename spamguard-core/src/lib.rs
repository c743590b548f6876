//! # SpamGuard Core
//!
//! Core library for the SpamGuard spam classifier.
//! Provides layered configuration, blob storage clients, dataset loading,
//! the count-vectorizer + classifier text pipeline, the serialized model
//! artifact, and held-out evaluation metrics.

pub mod api;
pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod model;
pub mod persistence;
pub mod storage;

// Re-export commonly used types at the crate root.
pub use api::{NO_MESSAGE_PROVIDED, PredictionRequest, PredictionResponse};
pub use config::{SpamGuardConfig, load_config};
pub use data::{Label, LabeledMessage, TrainingDataset};
pub use error::{ArtifactError, ErrorKind, Result, SpamError, StorageError};
pub use eval::{ClassificationReport, EvaluationReport, TrainTestSplit};
pub use model::{ClassifierKind, ModelArtifact, TextPipeline, TrainingParams};
pub use storage::{BlobRef, BlobStore, build_blob_store};
