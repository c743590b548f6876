//! Serialized model artifact.
//!
//! The artifact is a JSON envelope around a fitted [`TextPipeline`]. The
//! envelope carries a format version and the label vocabulary the pipeline
//! was trained with; both are checked before the pipeline itself is
//! deserialized, so an artifact written by an incompatible build is
//! rejected with a clear error instead of producing meaningless predictions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{ClassifierKind, TextPipeline};
use crate::data::{Label, TrainingDataset};
use crate::error::{ArtifactError, Result, SpamError};
use crate::persistence;

/// Bump whenever the serialized pipeline layout changes.
pub const ARTIFACT_FORMAT_VERSION: u32 = 2;

/// A fitted pipeline plus the metadata needed to trust it.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub created_at: DateTime<Utc>,
    pub classifier_kind: ClassifierKind,
    pub labels: Vec<String>,
    pub training_rows: usize,
    pub dataset_sha256: String,
    pipeline: TextPipeline,
}

/// Just enough of the envelope to validate compatibility.
#[derive(Deserialize)]
struct ArtifactHeader {
    format_version: u32,
    #[serde(default)]
    labels: Vec<String>,
}

impl ModelArtifact {
    /// Wrap a pipeline fitted on `dataset`.
    pub fn new(pipeline: TextPipeline, dataset: &TrainingDataset) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            created_at: Utc::now(),
            classifier_kind: pipeline.kind(),
            labels: Label::vocabulary(),
            training_rows: dataset.len(),
            dataset_sha256: dataset.digest().to_string(),
            pipeline,
        }
    }

    pub fn pipeline(&self) -> &TextPipeline {
        &self.pipeline
    }

    pub fn into_pipeline(self) -> TextPipeline {
        self.pipeline
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse and validate an artifact.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let header: ArtifactHeader =
            serde_json::from_slice(bytes).map_err(|e| ArtifactError::Malformed {
                message: e.to_string(),
            })?;
        if header.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(ArtifactError::VersionMismatch {
                found: header.format_version,
                expected: ARTIFACT_FORMAT_VERSION,
            }
            .into());
        }
        let expected = Label::vocabulary();
        if header.labels != expected {
            return Err(ArtifactError::LabelMismatch {
                found: header.labels,
                expected,
            }
            .into());
        }

        let artifact: Self = serde_json::from_slice(bytes).map_err(|e| ArtifactError::Malformed {
            message: e.to_string(),
        })?;
        if artifact.classifier_kind != artifact.pipeline.kind() {
            return Err(ArtifactError::Malformed {
                message: format!(
                    "envelope declares {} but pipeline holds {}",
                    artifact.classifier_kind,
                    artifact.pipeline.kind()
                ),
            }
            .into());
        }
        Ok(artifact)
    }

    /// Atomically write the artifact to `path`. Returns the byte count.
    pub fn save(&self, path: &Path) -> Result<u64> {
        let bytes = self.to_bytes()?;
        persistence::atomic_write(path, &bytes)?;
        Ok(bytes.len() as u64)
    }

    /// Read and validate an artifact file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            SpamError::Artifact(ArtifactError::Malformed {
                message: format!("failed to read {}: {e}", path.display()),
            })
        })?;
        Self::from_bytes(&bytes)
    }
}
