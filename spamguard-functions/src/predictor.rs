//! HTTP-triggered prediction against the artifact in blob storage.
//!
//! Every call re-downloads the artifact; there is no in-process cache. A
//! request therefore observes whichever artifact the store returns at
//! download time, which may lag a concurrent retrain.

use std::path::PathBuf;
use std::sync::Arc;

use spamguard_core::api::{error_body, extract_message};
use spamguard_core::{
    BlobRef, BlobStore, ErrorKind, Label, ModelArtifact, NO_MESSAGE_PROVIDED, SpamError,
    SpamGuardConfig,
};

/// Why a prediction request did not produce a label.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    #[error("No message provided.")]
    NoMessage,

    #[error(transparent)]
    Failed(SpamError),
}

impl PredictError {
    /// Whether the caller is at fault (400) rather than the service (500).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::NoMessage)
    }

    /// Response body safe to return to the caller.
    pub fn public_body(&self) -> String {
        match self {
            Self::NoMessage => NO_MESSAGE_PROVIDED.to_string(),
            Self::Failed(e) => error_body(e.kind()),
        }
    }
}

impl From<SpamError> for PredictError {
    fn from(e: SpamError) -> Self {
        match e.kind() {
            ErrorKind::InvalidInput => Self::NoMessage,
            _ => Self::Failed(e),
        }
    }
}

/// Classifies single messages with the most recently uploaded model.
pub struct Predictor {
    store: Arc<dyn BlobStore>,
    model_blob: BlobRef,
    model_path: PathBuf,
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("store", &self.store.describe())
            .field("model_blob", &self.model_blob)
            .field("model_path", &self.model_path)
            .finish()
    }
}

impl Predictor {
    pub fn new(store: Arc<dyn BlobStore>, model_blob: BlobRef, model_path: PathBuf) -> Self {
        Self {
            store,
            model_blob,
            model_path,
        }
    }

    pub fn from_config(config: &SpamGuardConfig, store: Arc<dyn BlobStore>) -> Self {
        Self::new(
            store,
            config.storage.model.clone(),
            config.paths.model_file.clone(),
        )
    }

    /// Validate a raw request body, then fetch the model and classify.
    ///
    /// The blob store is only contacted once the body is known to be valid.
    pub async fn handle(&self, body: &[u8]) -> Result<Label, PredictError> {
        let message = extract_message(body)?;
        self.predict(message).await.map_err(|e| {
            tracing::error!(error = %e, blob = %self.model_blob, "Prediction failed");
            PredictError::Failed(e)
        })
    }

    /// Fetch the current artifact and classify one message.
    pub async fn predict(&self, message: String) -> spamguard_core::Result<Label> {
        self.store
            .download_to_file(&self.model_blob, &self.model_path)
            .await?;

        let path = self.model_path.clone();
        let label = tokio::task::spawn_blocking(move || {
            let artifact = ModelArtifact::load(&path)?;
            tracing::debug!(
                path = %path.display(),
                kind = %artifact.classifier_kind,
                created_at = %artifact.created_at,
                "Loaded model artifact"
            );
            artifact.pipeline().predict_one(&message)
        })
        .await
        .map_err(|e| SpamError::model(format!("prediction task failed: {e}")))??;

        tracing::info!(prediction = %label, "Classified message");
        Ok(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spamguard_core::StorageError;

    #[test]
    fn test_invalid_input_maps_to_no_message() {
        let err: PredictError = SpamError::invalid_input("x").into();
        assert!(err.is_client_error());
        assert_eq!(err.public_body(), "No message provided.");
    }

    #[test]
    fn test_failure_body_hides_detail() {
        let err: PredictError = SpamError::Storage(StorageError::Request {
            message: "error sending request for url (http://10.0.0.4/models/model.json)".into(),
        })
        .into();
        assert!(!err.is_client_error());
        let body = err.public_body();
        assert_eq!(body, "Error: model retrieval failed");
        assert!(!body.contains("10.0.0.4"));
    }
}
