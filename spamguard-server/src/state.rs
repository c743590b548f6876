//! Startup training and the immutable state handlers read from.

use chrono::{DateTime, Utc};
use ndarray::{Array2, Axis};

use spamguard_core::config::TrainingConfig;
use spamguard_core::data::ColumnSelection;
use spamguard_core::eval::{EvaluationReport, evaluate};
use spamguard_core::model::{Classifier, CountVectorizer};
use spamguard_core::{
    ClassifierKind, Label, Result, SpamGuardConfig, TextPipeline, TrainTestSplit, TrainingDataset,
};

/// Everything fitted at startup. Never mutated afterwards.
#[derive(Debug)]
pub struct AppState {
    pipeline: TextPipeline,
    held_out_features: Array2<f64>,
    held_out_labels: Vec<Label>,
    train_rows: usize,
    trained_at: DateTime<Utc>,
}

impl AppState {
    /// Load the configured dataset file and train on it.
    pub fn train(config: &SpamGuardConfig) -> Result<Self> {
        let columns = ColumnSelection::from(&config.dataset);
        let dataset = TrainingDataset::load(&config.dataset.local_path, &columns)?;
        Self::from_dataset(&dataset, &config.training)
    }

    /// Vectorize every message, hold out a seeded split and fit logistic
    /// regression on the rest.
    pub fn from_dataset(dataset: &TrainingDataset, training: &TrainingConfig) -> Result<Self> {
        let params = training.params(ClassifierKind::LogisticRegression);
        let texts = dataset.texts();
        let labels = dataset.labels();

        // The vocabulary is learned from all rows before splitting.
        let (vectorizer, features) = CountVectorizer::fit_transform(&texts, params.max_features)?;
        let split = TrainTestSplit::new(dataset.len(), training.test_size, training.seed)?;

        let train_features = features.select(Axis(0), &split.train);
        let train_labels: Vec<Label> = split.train.iter().map(|&i| labels[i]).collect();
        let held_out_features = features.select(Axis(0), &split.test);
        let held_out_labels: Vec<Label> = split.test.iter().map(|&i| labels[i]).collect();

        let classifier = Classifier::fit(train_features, &train_labels, &params)?;
        let pipeline = TextPipeline::from_parts(vectorizer, classifier);

        tracing::info!(
            train_rows = split.train.len(),
            test_rows = split.test.len(),
            vocabulary = pipeline.vectorizer().vocabulary_size(),
            seed = training.seed,
            "Trained standalone model"
        );

        Ok(Self {
            pipeline,
            held_out_features,
            held_out_labels,
            train_rows: split.train.len(),
            trained_at: Utc::now(),
        })
    }

    pub fn predict(&self, message: &str) -> Result<Label> {
        self.pipeline.predict_one(message)
    }

    /// Score the classifier on the held-out rows.
    pub fn evaluate(&self) -> Result<EvaluationReport> {
        let predicted = self.pipeline.predict_features(&self.held_out_features)?;
        evaluate(&self.held_out_labels, &predicted)
    }

    pub fn pipeline(&self) -> &TextPipeline {
        &self.pipeline
    }

    pub fn train_rows(&self) -> usize {
        self.train_rows
    }

    pub fn test_rows(&self) -> usize {
        self.held_out_labels.len()
    }

    pub fn trained_at(&self) -> DateTime<Utc> {
        self.trained_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spamguard_core::LabeledMessage;

    fn dataset() -> TrainingDataset {
        let mut rows = Vec::new();
        for i in 0..10 {
            rows.push(LabeledMessage::new(
                Label::Spam,
                format!("win free cash prize now claim {i}"),
            ));
            rows.push(LabeledMessage::new(
                Label::Ham,
                format!("see you at lunch tomorrow friend {i}"),
            ));
        }
        TrainingDataset::from_rows(rows).unwrap()
    }

    #[test]
    fn test_split_sizes() {
        let state = AppState::from_dataset(&dataset(), &TrainingConfig::default()).unwrap();
        assert_eq!(state.test_rows(), 4);
        assert_eq!(state.train_rows(), 16);
        assert_eq!(state.pipeline().kind(), ClassifierKind::LogisticRegression);
    }

    #[test]
    fn test_separable_data_scores_perfectly() {
        let state = AppState::from_dataset(&dataset(), &TrainingConfig::default()).unwrap();
        let report = state.evaluate().unwrap();
        assert_eq!(report.confusion_matrix.total(), 4);
        assert_eq!(report.accuracy, 1.0);
        assert_eq!(state.predict("claim your free prize").unwrap(), Label::Spam);
    }
}
