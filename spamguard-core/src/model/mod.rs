//! Text classification pipeline: count vectorizer, classifiers and the artifact.
//!
//! Classification itself is delegated to `linfa`: multinomial Naive Bayes
//! from `linfa-bayes` and binary logistic regression from `linfa-logistic`.
//! This module owns tokenization, the fitted vocabulary, and the JSON
//! artifact envelope that carries a fitted pipeline between processes.

pub mod artifact;
pub mod classifier;
pub mod pipeline;
pub mod vectorizer;

pub use artifact::{ARTIFACT_FORMAT_VERSION, ModelArtifact};
pub use classifier::{Classifier, NaiveBayesModel};
pub use pipeline::TextPipeline;
pub use vectorizer::CountVectorizer;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classifier families the pipeline can be fitted with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// Multinomial Naive Bayes over raw term counts.
    NaiveBayes,
    /// L2-regularized binary logistic regression.
    LogisticRegression,
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NaiveBayes => f.write_str("naive_bayes"),
            Self::LogisticRegression => f.write_str("logistic_regression"),
        }
    }
}

/// Hyperparameters for fitting a [`TextPipeline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub kind: ClassifierKind,
    /// Vocabulary cap; `None` keeps every term seen during fitting.
    pub max_features: Option<usize>,
    pub nb_alpha: f64,
    pub lr_alpha: f64,
    pub lr_max_iterations: u64,
}

impl TrainingParams {
    pub fn naive_bayes() -> Self {
        Self {
            kind: ClassifierKind::NaiveBayes,
            ..Self::default()
        }
    }

    pub fn logistic_regression() -> Self {
        Self {
            kind: ClassifierKind::LogisticRegression,
            ..Self::default()
        }
    }
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::NaiveBayes,
            max_features: Some(3000),
            nb_alpha: 1.0,
            lr_alpha: 1.0,
            lr_max_iterations: 100,
        }
    }
}
