//! Custom-handler HTTP host for the Azure Functions runtime.
//!
//! The runtime forwards the HTTP trigger as a plain request to
//! `/api/predict` and invokes the timer trigger by posting its invocation
//! envelope to `/RetrainFunction`.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use spamguard_core::api::error_body;
use spamguard_core::{PredictionResponse, SpamGuardConfig, build_blob_store};

use crate::predictor::Predictor;
use crate::retrainer::{RetrainOutcome, Retrainer};

/// Shared handler state. Both members are stateless between calls.
#[derive(Debug, Clone)]
pub struct FunctionsState {
    pub predictor: Arc<Predictor>,
    pub retrainer: Arc<Retrainer>,
}

impl FunctionsState {
    pub fn new(predictor: Predictor, retrainer: Retrainer) -> Self {
        Self {
            predictor: Arc::new(predictor),
            retrainer: Arc::new(retrainer),
        }
    }

    /// Build both functions over the configured blob store.
    pub fn from_config(config: &SpamGuardConfig) -> spamguard_core::Result<Self> {
        let store = build_blob_store(&config.storage)?;
        Ok(Self::new(
            Predictor::from_config(config, store.clone()),
            Retrainer::from_config(config, store),
        ))
    }
}

/// Build the custom-handler router.
pub fn router(state: FunctionsState) -> Router {
    Router::new()
        .route("/api/predict", post(predict_handler))
        .route("/RetrainFunction", post(retrain_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn predict_handler(State(state): State<FunctionsState>, body: Bytes) -> Response {
    match state.predictor.handle(&body).await {
        Ok(prediction) => Json(PredictionResponse { prediction }).into_response(),
        Err(e) if e.is_client_error() => (StatusCode::BAD_REQUEST, e.public_body()).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.public_body()).into_response(),
    }
}

/// Timer invocation. The request body (timer schedule status) is ignored.
async fn retrain_handler(State(state): State<FunctionsState>) -> Response {
    match state.retrainer.run().await {
        Ok(outcome) => {
            let body = json!({
                "Outputs": {},
                "Logs": [format!("RetrainFunction finished: {}", outcome_summary(&outcome))],
                "ReturnValue": outcome,
            });
            Json(body).into_response()
        }
        Err(e) => {
            let body = json!({
                "Outputs": {},
                "Logs": [error_body(e.kind())],
                "ReturnValue": null,
            });
            (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
        }
    }
}

fn outcome_summary(outcome: &RetrainOutcome) -> String {
    match outcome {
        RetrainOutcome::DatasetMissing => "dataset missing".to_string(),
        RetrainOutcome::Uploaded { rows, bytes } => {
            format!("uploaded {bytes} bytes trained on {rows} rows")
        }
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Serve the functions host until the process is stopped.
pub async fn run(state: FunctionsState, host: &str, port: u16) -> Result<(), std::io::Error> {
    let app = router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Functions host listening");
    axum::serve(listener, app).await?;
    Ok(())
}
