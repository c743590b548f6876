//! # SpamGuard Functions
//!
//! The serverless shape of SpamGuard: a [`Predictor`] that pulls the latest
//! model artifact from blob storage on every request, a [`Retrainer`] that
//! refits the pipeline from the stored dataset and pushes a new artifact, and
//! an axum host speaking the Azure Functions custom-handler protocol.

pub mod host;
pub mod predictor;
pub mod retrainer;
pub mod schedule;

pub use host::{FunctionsState, router, run};
pub use predictor::{PredictError, Predictor};
pub use retrainer::{RetrainOutcome, Retrainer};
pub use schedule::{RetrainSchedule, run_scheduled};
