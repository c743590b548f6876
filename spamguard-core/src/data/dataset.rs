//! In-memory labeled dataset loaded from comma-separated text.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::path::Path;

use super::label::Label;
use crate::config::DatasetConfig;
use crate::error::{Result, SpamError};
use crate::persistence::hash_bytes;

/// One labeled training example.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledMessage {
    pub label: Label,
    pub text: String,
}

impl LabeledMessage {
    pub fn new(label: Label, text: impl Into<String>) -> Self {
        Self {
            label,
            text: text.into(),
        }
    }
}

/// Header names of the two columns a dataset is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    pub label: String,
    pub text: String,
}

impl ColumnSelection {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }
}

impl Default for ColumnSelection {
    fn default() -> Self {
        Self::new("v1", "v2")
    }
}

impl From<&DatasetConfig> for ColumnSelection {
    fn from(config: &DatasetConfig) -> Self {
        Self::new(&config.label_column, &config.text_column)
    }
}

/// A fully loaded, non-empty sequence of labeled messages.
#[derive(Debug, Clone)]
pub struct TrainingDataset {
    rows: Vec<LabeledMessage>,
    digest: String,
}

impl TrainingDataset {
    /// Build a dataset from already-labeled rows.
    pub fn from_rows(rows: Vec<LabeledMessage>) -> Result<Self> {
        if rows.is_empty() {
            return Err(SpamError::dataset("dataset contains no rows"));
        }
        let mut canonical = Vec::new();
        for row in &rows {
            canonical.extend_from_slice(row.label.as_str().as_bytes());
            canonical.push(b'\t');
            canonical.extend_from_slice(row.text.as_bytes());
            canonical.push(b'\n');
        }
        Ok(Self {
            digest: hash_bytes(&canonical),
            rows,
        })
    }

    /// Parse comma-separated bytes, keeping only the selected columns.
    ///
    /// Bytes that are not valid UTF-8 are decoded as ISO-8859-1. Extra columns
    /// and ragged trailing fields are ignored.
    pub fn from_csv_bytes(bytes: &[u8], columns: &ColumnSelection) -> Result<Self> {
        let decoded = decode_text(bytes);
        let text: &str = decoded
            .strip_prefix('\u{feff}')
            .unwrap_or(decoded.as_ref());

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| {
                    SpamError::dataset(format!(
                        "column '{}' not found (available: {})",
                        name,
                        headers.iter().collect::<Vec<_>>().join(", ")
                    ))
                })
        };
        let label_idx = find(columns.label.as_str())?;
        let text_idx = find(columns.text.as_str())?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            if record.iter().all(|field| field.trim().is_empty()) {
                continue;
            }
            let raw_label = record.get(label_idx).ok_or_else(|| {
                SpamError::dataset(format!("line {line}: missing '{}' field", columns.label))
            })?;
            let label: Label = raw_label.parse().map_err(|_| {
                SpamError::dataset(format!(
                    "line {line}: unknown label '{}' (expected 'ham' or 'spam')",
                    raw_label.trim()
                ))
            })?;
            let message = record.get(text_idx).ok_or_else(|| {
                SpamError::dataset(format!("line {line}: missing '{}' field", columns.text))
            })?;
            rows.push(LabeledMessage::new(label, message));
        }

        let dataset = Self::from_rows(rows)?;
        Ok(Self {
            digest: hash_bytes(bytes),
            ..dataset
        })
    }

    /// Read and parse a dataset file.
    pub fn load(path: &Path, columns: &ColumnSelection) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            SpamError::dataset(format!("failed to read {}: {e}", path.display()))
        })?;
        let dataset = Self::from_csv_bytes(&bytes, columns)?;
        tracing::info!(
            path = %path.display(),
            rows = dataset.len(),
            spam = dataset.count(Label::Spam),
            ham = dataset.count(Label::Ham),
            "Loaded dataset"
        );
        Ok(dataset)
    }

    pub fn rows(&self) -> &[LabeledMessage] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.rows.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn labels(&self) -> Vec<Label> {
        self.rows.iter().map(|r| r.label).collect()
    }

    pub fn count(&self, label: Label) -> usize {
        self.rows.iter().filter(|r| r.label == label).count()
    }

    /// SHA-256 of the source bytes (or of the canonical rows when built in memory).
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Tabular preview of the first `n` rows, for logs.
    pub fn preview(&self, n: usize) -> String {
        let mut out = String::from("label\tmessage\n");
        for row in self.rows.iter().take(n) {
            let text: String = row.text.chars().take(60).collect();
            out.push_str(&format!("{}\t{}\n", row.label, text));
        }
        out
    }
}

fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| b as char).collect()),
    }
}
