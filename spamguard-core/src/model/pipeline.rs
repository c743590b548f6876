//! Vectorizer + classifier, fitted and invoked as one unit.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::{Classifier, ClassifierKind, CountVectorizer, TrainingParams};
use crate::data::{Label, TrainingDataset};
use crate::error::{Result, SpamError};

/// A fitted text classification pipeline.
#[derive(Debug, Serialize, Deserialize)]
pub struct TextPipeline {
    vectorizer: CountVectorizer,
    classifier: Classifier,
}

impl TextPipeline {
    /// Fit vectorizer and classifier on every row of `dataset`.
    pub fn fit(dataset: &TrainingDataset, params: &TrainingParams) -> Result<Self> {
        let texts = dataset.texts();
        let (vectorizer, features) = CountVectorizer::fit_transform(&texts, params.max_features)?;
        tracing::debug!(
            rows = features.nrows(),
            vocabulary = vectorizer.vocabulary_size(),
            kind = %params.kind,
            "Fitting classifier"
        );
        let classifier = Classifier::fit(features, &dataset.labels(), params)?;
        Ok(Self {
            vectorizer,
            classifier,
        })
    }

    /// Assemble a pipeline from parts fitted separately.
    pub fn from_parts(vectorizer: CountVectorizer, classifier: Classifier) -> Self {
        Self {
            vectorizer,
            classifier,
        }
    }

    /// Classify a batch of texts.
    pub fn predict<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<Label>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let features = self.vectorizer.transform(texts);
        self.classifier.predict(&features)
    }

    /// Classify a single text as a one-element batch.
    pub fn predict_one(&self, text: &str) -> Result<Label> {
        self.predict(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| SpamError::model("classifier returned no prediction"))
    }

    /// Classify rows that were already vectorized with this pipeline's vectorizer.
    pub fn predict_features(&self, features: &Array2<f64>) -> Result<Vec<Label>> {
        if features.ncols() != self.vectorizer.vocabulary_size() {
            return Err(SpamError::model(format!(
                "feature width {} does not match vocabulary size {}",
                features.ncols(),
                self.vectorizer.vocabulary_size()
            )));
        }
        self.classifier.predict(features)
    }

    pub fn vectorizer(&self) -> &CountVectorizer {
        &self.vectorizer
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn kind(&self) -> ClassifierKind {
        self.classifier.kind()
    }
}
