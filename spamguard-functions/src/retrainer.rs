//! Timer-triggered retraining.
//!
//! One cycle: fetch the dataset blob to disk, fit count vectorizer + Naive
//! Bayes on every row, write the artifact locally and upload it over the
//! previous one. A failed cycle never touches the stored artifact.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use spamguard_core::data::ColumnSelection;
use spamguard_core::persistence;
use spamguard_core::{
    BlobRef, BlobStore, ClassifierKind, ModelArtifact, Result, SpamError, SpamGuardConfig,
    TextPipeline, TrainingDataset, TrainingParams,
};

/// Rows shown in the dataset preview log line.
const PREVIEW_ROWS: usize = 5;

/// Result of a completed retraining cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RetrainOutcome {
    /// The dataset file was absent after the fetch; nothing was trained.
    DatasetMissing,
    /// A new artifact was uploaded.
    Uploaded { rows: usize, bytes: u64 },
}

/// Refits the pipeline from the stored dataset and publishes the artifact.
pub struct Retrainer {
    store: Arc<dyn BlobStore>,
    dataset_blob: BlobRef,
    dataset_path: PathBuf,
    model_blob: BlobRef,
    model_path: PathBuf,
    columns: ColumnSelection,
    params: TrainingParams,
}

impl std::fmt::Debug for Retrainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retrainer")
            .field("store", &self.store.describe())
            .field("dataset_blob", &self.dataset_blob)
            .field("model_blob", &self.model_blob)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl Retrainer {
    pub fn from_config(config: &SpamGuardConfig, store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            dataset_blob: config.storage.dataset.clone(),
            dataset_path: config.paths.dataset_file.clone(),
            model_blob: config.storage.model.clone(),
            model_path: config.paths.model_file.clone(),
            columns: ColumnSelection::from(&config.dataset),
            params: config.training.params(ClassifierKind::NaiveBayes),
        }
    }

    /// Run one retraining cycle. Failures are logged here once, then returned.
    pub async fn run(&self) -> Result<RetrainOutcome> {
        tracing::info!(store = %self.store.describe(), "Retraining triggered");
        let outcome = self.run_cycle().await.inspect_err(|e| {
            tracing::error!(error = %e, "Retraining failed");
        })?;
        match &outcome {
            RetrainOutcome::DatasetMissing => {}
            RetrainOutcome::Uploaded { rows, bytes } => tracing::info!(
                rows,
                bytes,
                blob = %self.model_blob,
                "Retraining complete"
            ),
        }
        Ok(outcome)
    }

    async fn run_cycle(&self) -> Result<RetrainOutcome> {
        self.store
            .download_to_file(&self.dataset_blob, &self.dataset_path)
            .await?;

        let size = match tokio::fs::metadata(&self.dataset_path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::error!(path = %self.dataset_path.display(), "Dataset not found after download");
                return Ok(RetrainOutcome::DatasetMissing);
            }
            Err(e) => return Err(e.into()),
        };
        tracing::info!(path = %self.dataset_path.display(), bytes = size, "Dataset present");

        let dataset_path = self.dataset_path.clone();
        let model_path = self.model_path.clone();
        let columns = self.columns.clone();
        let params = self.params.clone();
        let (rows, artifact) = tokio::task::spawn_blocking(move || -> Result<(usize, Vec<u8>)> {
            let dataset = TrainingDataset::load(&dataset_path, &columns)?;
            tracing::info!(
                columns = ?[columns.label.as_str(), columns.text.as_str()],
                "Dataset preview:\n{}",
                dataset.preview(PREVIEW_ROWS)
            );
            let pipeline = TextPipeline::fit(&dataset, &params)?;
            let bytes = ModelArtifact::new(pipeline, &dataset).to_bytes()?;
            persistence::atomic_write(&model_path, &bytes)?;
            tracing::info!(path = %model_path.display(), bytes = bytes.len(), "Model retrained and saved locally");
            Ok((dataset.len(), bytes))
        })
        .await
        .map_err(|e| SpamError::training(format!("training task failed: {e}")))??;

        // The local copy is shared with the predictor, which overwrites it on
        // every request, so the upload uses the bytes produced above.
        let bytes = artifact.len() as u64;
        self.store.upload(&self.model_blob, artifact, true).await?;

        Ok(RetrainOutcome::Uploaded { rows, bytes })
    }
}
