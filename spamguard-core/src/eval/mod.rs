//! Held-out evaluation: a seeded train/test split and classification metrics.

pub mod metrics;
pub mod split;

pub use metrics::{ClassScores, ClassificationReport, ConfusionMatrix, EvaluationReport, evaluate};
pub use split::TrainTestSplit;
