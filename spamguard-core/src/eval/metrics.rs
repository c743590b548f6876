//! Binary classification metrics over [`Label`] predictions.
//!
//! The serialized shape mirrors the familiar `classification_report` layout:
//! one entry per label, `"macro avg"`, `"weighted avg"` and `"accuracy"`.
//! Any ratio whose denominator is zero is reported as `0.0`.

use serde::{Deserialize, Serialize};

use crate::data::Label;
use crate::error::{Result, SpamError};

/// 2×2 counts indexed `[actual][predicted]`, i.e. `[[tn, fp], [fn, tp]]`
/// with `spam` as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfusionMatrix(pub [[usize; 2]; 2]);

impl ConfusionMatrix {
    pub fn from_labels(actual: &[Label], predicted: &[Label]) -> Self {
        let mut counts = [[0usize; 2]; 2];
        for (a, p) in actual.iter().zip(predicted) {
            counts[a.index()][p.index()] += 1;
        }
        Self(counts)
    }

    pub fn count(&self, actual: Label, predicted: Label) -> usize {
        self.0[actual.index()][predicted.index()]
    }

    pub fn total(&self) -> usize {
        self.0.iter().flatten().sum()
    }

    pub fn correct(&self) -> usize {
        Label::ALL.iter().map(|&l| self.count(l, l)).sum()
    }

    /// Rows whose actual label is `label`.
    pub fn support(&self, label: Label) -> usize {
        self.0[label.index()].iter().sum()
    }

    /// Rows predicted as `label`.
    pub fn predicted(&self, label: Label) -> usize {
        Label::ALL.iter().map(|&a| self.count(a, label)).sum()
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.correct(), self.total())
    }

    /// Precision, recall and F1 for a single label.
    pub fn scores(&self, label: Label) -> ClassScores {
        let tp = self.count(label, label);
        let precision = ratio(tp, self.predicted(label));
        let recall = ratio(tp, self.support(label));
        let denom = precision + recall;
        let f1_score = if denom > 0.0 {
            2.0 * precision * recall / denom
        } else {
            0.0
        };
        ClassScores {
            precision,
            recall,
            f1_score,
            support: self.support(label),
        }
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    #[serde(rename = "f1-score")]
    pub f1_score: f64,
    pub support: usize,
}

/// Per-label scores plus their macro and support-weighted averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub ham: ClassScores,
    pub spam: ClassScores,
    pub accuracy: f64,
    #[serde(rename = "macro avg")]
    pub macro_avg: ClassScores,
    #[serde(rename = "weighted avg")]
    pub weighted_avg: ClassScores,
}

impl ClassificationReport {
    pub fn from_matrix(matrix: &ConfusionMatrix) -> Self {
        let ham = matrix.scores(Label::Ham);
        let spam = matrix.scores(Label::Spam);
        let per_class = [ham, spam];
        let total = matrix.total();

        let n = per_class.len() as f64;
        let macro_avg = ClassScores {
            precision: per_class.iter().map(|s| s.precision).sum::<f64>() / n,
            recall: per_class.iter().map(|s| s.recall).sum::<f64>() / n,
            f1_score: per_class.iter().map(|s| s.f1_score).sum::<f64>() / n,
            support: total,
        };

        let weighted = |pick: fn(&ClassScores) -> f64| -> f64 {
            if total == 0 {
                return 0.0;
            }
            per_class
                .iter()
                .map(|s| pick(s) * s.support as f64)
                .sum::<f64>()
                / total as f64
        };
        let weighted_avg = ClassScores {
            precision: weighted(|s| s.precision),
            recall: weighted(|s| s.recall),
            f1_score: weighted(|s| s.f1_score),
            support: total,
        };

        Self {
            ham,
            spam,
            accuracy: matrix.accuracy(),
            macro_avg,
            weighted_avg,
        }
    }
}

/// Body of the held-out metrics response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub confusion_matrix: ConfusionMatrix,
    pub classification_report: ClassificationReport,
}

/// Score `predicted` against `actual`.
pub fn evaluate(actual: &[Label], predicted: &[Label]) -> Result<EvaluationReport> {
    if actual.len() != predicted.len() {
        return Err(SpamError::model(format!(
            "cannot evaluate {} predictions against {} labels",
            predicted.len(),
            actual.len()
        )));
    }
    let matrix = ConfusionMatrix::from_labels(actual, predicted);
    Ok(EvaluationReport {
        accuracy: matrix.accuracy(),
        confusion_matrix: matrix,
        classification_report: ClassificationReport::from_matrix(&matrix),
    })
}
