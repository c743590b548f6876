//! HTTP routes for the standalone server.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use spamguard_core::api::{error_body, extract_message};
use spamguard_core::config::ServerConfig;
use spamguard_core::{ErrorKind, PredictionResponse, SpamError};

use crate::state::AppState;

/// Build the router over a trained state.
pub fn router(state: Arc<AppState>, cors: bool) -> Router {
    let app = Router::new()
        .route("/predict", post(predict_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    if cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

fn error_response(e: SpamError) -> Response {
    match e.kind() {
        ErrorKind::InvalidInput => {
            (StatusCode::BAD_REQUEST, spamguard_core::NO_MESSAGE_PROVIDED).into_response()
        }
        kind => {
            tracing::error!(error = %e, "Request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(kind)).into_response()
        }
    }
}

async fn predict_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let result = extract_message(&body).and_then(|message| state.predict(&message));
    match result {
        Ok(prediction) => Json(PredictionResponse { prediction }).into_response(),
        Err(e) => error_response(e),
    }
}

async fn metrics_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.evaluate() {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(e),
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "train_rows": state.train_rows(),
        "test_rows": state.test_rows(),
        "vocabulary_size": state.pipeline().vectorizer().vocabulary_size(),
        "trained_at": state.trained_at(),
    }))
}

/// Serve until the process is stopped. Training must already be complete.
pub async fn run(state: Arc<AppState>, config: &ServerConfig) -> Result<(), std::io::Error> {
    let app = router(state, config.cors);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Standalone server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
