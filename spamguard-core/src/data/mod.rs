//! Labeled message datasets: label vocabulary, CSV loading and column selection.

pub mod dataset;
pub mod label;

pub use dataset::{ColumnSelection, LabeledMessage, TrainingDataset};
pub use label::Label;
