//! Integration tests for the standalone server endpoints.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;
use tower::ServiceExt;

use spamguard_core::config::TrainingConfig;
use spamguard_core::data::ColumnSelection;
use spamguard_core::{SpamGuardConfig, TrainingDataset};
use spamguard_server::{AppState, router};

const DATASET: &[u8] = include_bytes!("../../testdata/spam.csv");

fn dataset() -> TrainingDataset {
    TrainingDataset::from_csv_bytes(DATASET, &ColumnSelection::default()).unwrap()
}

/// Training is deterministic, so one state serves every test.
fn shared_state() -> Arc<AppState> {
    static STATE: OnceLock<Arc<AppState>> = OnceLock::new();
    STATE
        .get_or_init(|| Arc::new(AppState::from_dataset(&dataset(), &TrainingConfig::default()).unwrap()))
        .clone()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(req: Request<Body>) -> (StatusCode, String) {
    let app = router(shared_state(), true);
    let resp = ServiceExt::<Request<Body>>::oneshot(app, req).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), 1_000_000)
        .await
        .unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

// --- /predict ---

#[tokio::test]
async fn test_predict_spam() {
    let (status, body) = send(post(
        "/predict",
        r#"{"message": "Claim your free cash prize now! Text WIN"}"#,
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"prediction":"spam"}"#);
}

#[tokio::test]
async fn test_predict_ham() {
    let (status, body) = send(post(
        "/predict",
        r#"{"message": "Can you pick me up from the station after work?"}"#,
    ))
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"prediction":"ham"}"#);
}

#[tokio::test]
async fn test_predict_label_is_text() {
    let (status, body) = send(post("/predict", r#"{"message": "hello"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let label = json["prediction"].as_str().unwrap();
    assert!(label == "spam" || label == "ham");
}

#[tokio::test]
async fn test_predict_missing_message() {
    for body in ["{}", r#"{"message": ""}"#, r#"{"text": "hi"}"#] {
        let (status, text) = send(post("/predict", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(text, "No message provided.");
    }
}

// --- /metrics ---

#[tokio::test]
async fn test_metrics_shape() {
    let (status, body) = send(get("/metrics")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();

    let accuracy = json["accuracy"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&accuracy));

    let matrix = json["confusion_matrix"].as_array().unwrap();
    assert_eq!(matrix.len(), 2);
    let total: u64 = matrix
        .iter()
        .map(|row| {
            let row = row.as_array().unwrap();
            assert_eq!(row.len(), 2);
            row.iter().map(|v| v.as_u64().unwrap()).sum::<u64>()
        })
        .sum();
    // ceil(60 * 0.2)
    assert_eq!(total, 12);

    let report = &json["classification_report"];
    for key in ["ham", "spam", "macro avg", "weighted avg"] {
        for field in ["precision", "recall", "f1-score", "support"] {
            assert!(report[key][field].is_number(), "{key}.{field}");
        }
    }
    assert_eq!(report["accuracy"].as_f64().unwrap(), accuracy);
    assert_eq!(report["weighted avg"]["support"], 12);
}

#[tokio::test]
async fn test_metrics_reproducible_across_restarts() {
    let first = AppState::from_dataset(&dataset(), &TrainingConfig::default()).unwrap();
    let second = AppState::from_dataset(&dataset(), &TrainingConfig::default()).unwrap();
    assert_eq!(first.evaluate().unwrap(), second.evaluate().unwrap());
}

#[tokio::test]
async fn test_metrics_stable_between_calls() {
    let (_, a) = send(get("/metrics")).await;
    let (_, b) = send(get("/metrics")).await;
    assert_eq!(a, b);
}

// --- /health and startup ---

#[tokio::test]
async fn test_health() {
    let (status, body) = send(get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["train_rows"], 48);
    assert_eq!(json["test_rows"], 12);
    assert!(json["vocabulary_size"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_cors_preflight_allowed() {
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/predict")
        .header("origin", "http://localhost:3000")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let resp = ServiceExt::<Request<Body>>::oneshot(router(shared_state(), true), req)
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert!(resp.headers().contains_key("access-control-allow-origin"));
}

#[test]
fn test_train_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("spam.csv");
    std::fs::write(&path, DATASET).unwrap();

    let mut config = SpamGuardConfig::default();
    config.dataset.local_path = path;
    let state = AppState::train(&config).unwrap();
    assert_eq!(state.train_rows() + state.test_rows(), 60);
}

#[test]
fn test_unknown_label_fails_startup() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("spam.csv");
    std::fs::write(&path, "v1,v2\nham,hello there\nmaybe,what is this\nspam,win cash\n").unwrap();

    let mut config = SpamGuardConfig::default();
    config.dataset.local_path = path;
    let err = AppState::train(&config).unwrap_err();
    assert!(err.to_string().contains("unknown label 'maybe'"));
}

#[test]
fn test_missing_dataset_fails_startup() {
    let mut config = SpamGuardConfig::default();
    config.dataset.local_path = "/nonexistent/spam.csv".into();
    assert!(AppState::train(&config).is_err());
}
