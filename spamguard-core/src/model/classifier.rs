//! Fitted classifiers backed by `linfa`.

use linfa::prelude::*;
use linfa_bayes::MultinomialNb;
use linfa_logistic::{FittedLogisticRegression, LogisticRegression};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::{ClassifierKind, TrainingParams};
use crate::data::Label;
use crate::error::{Result, SpamError};

/// A fitted classifier over count features. Targets are [`Label`] class indices.
#[derive(Serialize, Deserialize)]
#[serde(tag = "kind", content = "model", rename_all = "snake_case")]
pub enum Classifier {
    NaiveBayes(NaiveBayesModel),
    LogisticRegression(FittedLogisticRegression<f64, usize>),
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Classifier").field(&self.kind()).finish()
    }
}

impl Classifier {
    /// Fit a classifier of `params.kind` on a feature matrix and its labels.
    pub fn fit(features: Array2<f64>, labels: &[Label], params: &TrainingParams) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(SpamError::training(format!(
                "feature rows ({}) and labels ({}) differ",
                features.nrows(),
                labels.len()
            )));
        }
        for label in Label::ALL {
            if !labels.contains(&label) {
                return Err(SpamError::training(format!(
                    "training data has no '{label}' examples; both classes are required"
                )));
            }
        }

        let targets: Array1<usize> = labels.iter().map(Label::index).collect();
        let dataset = Dataset::new(features, targets);

        match params.kind {
            ClassifierKind::NaiveBayes => {
                let model = MultinomialNb::<f64, usize>::params()
                    .alpha(params.nb_alpha)
                    .fit(&dataset)
                    .map_err(|e| SpamError::training(format!("naive bayes fit failed: {e}")))?;
                Ok(Self::NaiveBayes(NaiveBayesModel::from_fitted(&model)?))
            }
            ClassifierKind::LogisticRegression => {
                let model = LogisticRegression::default()
                    .alpha(params.lr_alpha)
                    .max_iterations(params.lr_max_iterations)
                    .fit(&dataset)
                    .map_err(|e| {
                        SpamError::training(format!("logistic regression fit failed: {e}"))
                    })?;
                Ok(Self::LogisticRegression(model))
            }
        }
    }

    /// Predict one label per feature row.
    pub fn predict(&self, features: &Array2<f64>) -> Result<Vec<Label>> {
        let indices: Array1<usize> = match self {
            Self::NaiveBayes(model) => model.predict(features)?,
            Self::LogisticRegression(model) => model.predict(features),
        };
        indices
            .iter()
            .map(|&idx| {
                Label::from_index(idx)
                    .ok_or_else(|| SpamError::model(format!("classifier produced class {idx}")))
            })
            .collect()
    }

    pub fn kind(&self) -> ClassifierKind {
        match self {
            Self::NaiveBayes(_) => ClassifierKind::NaiveBayes,
            Self::LogisticRegression(_) => ClassifierKind::LogisticRegression,
        }
    }
}

/// Multinomial Naive Bayes parameters, one row per class in [`Label::index`] order.
///
/// `linfa-bayes` keeps its fitted classes in a `HashMap` and predicts with an
/// argmax over that map, so tied scores resolve differently after every
/// deserialization. The parameters are copied out once after fitting and
/// scored here with ties going to the lowest class index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NaiveBayesModel {
    class_log_prior: Array1<f64>,
    feature_log_prob: Array2<f64>,
}

/// Serialized layout of a fitted `MultinomialNb`.
#[derive(Deserialize)]
struct FittedNb {
    class_info: BTreeMap<usize, FittedNbClass>,
}

#[derive(Deserialize)]
struct FittedNbClass {
    prior: f64,
    feature_log_prob: Array1<f64>,
}

impl NaiveBayesModel {
    fn from_fitted(model: &MultinomialNb<f64, usize>) -> Result<Self> {
        // The fitted parameters are only reachable through serde.
        let fitted: FittedNb = serde_json::to_vec(model)
            .and_then(|bytes| serde_json::from_slice(&bytes))
            .map_err(|e| SpamError::training(format!("naive bayes parameters unreadable: {e}")))?;
        let n_features = fitted
            .class_info
            .values()
            .next()
            .map(|class| class.feature_log_prob.len())
            .unwrap_or(0);

        let mut class_log_prior = Array1::<f64>::zeros(Label::ALL.len());
        let mut feature_log_prob = Array2::<f64>::zeros((Label::ALL.len(), n_features));
        for label in Label::ALL {
            let class = fitted.class_info.get(&label.index()).ok_or_else(|| {
                SpamError::training(format!("naive bayes fit produced no '{label}' class"))
            })?;
            if class.feature_log_prob.len() != n_features {
                return Err(SpamError::training("naive bayes classes differ in feature width"));
            }
            class_log_prior[label.index()] = class.prior.ln();
            feature_log_prob
                .row_mut(label.index())
                .assign(&class.feature_log_prob);
        }
        Ok(Self {
            class_log_prior,
            feature_log_prob,
        })
    }

    /// Joint log-likelihood of every class, `rows × classes`.
    pub fn joint_log_likelihood(&self, features: &Array2<f64>) -> Result<Array2<f64>> {
        if features.ncols() != self.feature_log_prob.ncols() {
            return Err(SpamError::model(format!(
                "feature width {} does not match model width {}",
                features.ncols(),
                self.feature_log_prob.ncols()
            )));
        }
        Ok(features.dot(&self.feature_log_prob.t()) + &self.class_log_prior)
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Array1<usize>> {
        let jll = self.joint_log_likelihood(features)?;
        Ok(jll.map_axis(Axis(1), |scores| {
            let mut best = 0;
            for (idx, &score) in scores.iter().enumerate().skip(1) {
                if score > scores[best] {
                    best = idx;
                }
            }
            best
        }))
    }
}
