//! Bag-of-words count vectorizer.

use ndarray::Array2;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use crate::error::{Result, SpamError};

/// Word tokens of two or more word characters.
static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"));

/// Lowercase `text` and split it into word tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    TOKEN_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Maps texts to term-count vectors over a vocabulary fixed at fit time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountVectorizer {
    /// Term -> column index. Columns are assigned in lexicographic term order.
    vocabulary: BTreeMap<String, usize>,
}

impl CountVectorizer {
    /// Learn the vocabulary of a corpus.
    ///
    /// With `max_features`, only the most frequent terms across the corpus are
    /// kept (ties broken lexicographically).
    pub fn fit<S: AsRef<str>>(texts: &[S], max_features: Option<usize>) -> Result<Self> {
        if texts.is_empty() {
            return Err(SpamError::training("cannot fit vectorizer on an empty corpus"));
        }
        if max_features == Some(0) {
            return Err(SpamError::training("max_features must be at least 1"));
        }

        let mut frequencies: HashMap<String, usize> = HashMap::new();
        for text in texts {
            for token in tokenize(text.as_ref()) {
                *frequencies.entry(token).or_insert(0) += 1;
            }
        }
        if frequencies.is_empty() {
            return Err(SpamError::training(
                "corpus contains no tokens; every message is empty or punctuation",
            ));
        }

        let mut terms: Vec<(String, usize)> = frequencies.into_iter().collect();
        if let Some(limit) = max_features {
            terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            terms.truncate(limit);
        }
        let mut terms: Vec<String> = terms.into_iter().map(|(term, _)| term).collect();
        terms.sort();

        let vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(idx, term)| (term, idx))
            .collect();
        Ok(Self { vocabulary })
    }

    /// Dense `texts.len() × vocabulary_size` matrix of term counts.
    /// Terms outside the vocabulary are ignored.
    pub fn transform<S: AsRef<str>>(&self, texts: &[S]) -> Array2<f64> {
        let mut counts = Array2::<f64>::zeros((texts.len(), self.vocabulary.len()));
        for (row, text) in texts.iter().enumerate() {
            for token in tokenize(text.as_ref()) {
                if let Some(&col) = self.vocabulary.get(&token) {
                    counts[[row, col]] += 1.0;
                }
            }
        }
        counts
    }

    /// Fit the vocabulary and transform the same corpus.
    pub fn fit_transform<S: AsRef<str>>(
        texts: &[S],
        max_features: Option<usize>,
    ) -> Result<(Self, Array2<f64>)> {
        let vectorizer = Self::fit(texts, max_features)?;
        let features = vectorizer.transform(texts);
        Ok((vectorizer, features))
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn column_of(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }
}
