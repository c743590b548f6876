//! The two-valued label vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SpamError;

/// Message category. Class index 0 is `Ham`, 1 is `Spam`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Ham,
    Spam,
}

impl Label {
    /// Every label, in class-index order.
    pub const ALL: [Label; 2] = [Label::Ham, Label::Spam];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ham => "ham",
            Self::Spam => "spam",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Self::Ham => 0,
            Self::Spam => 1,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Label vocabulary as strings, in class-index order.
    pub fn vocabulary() -> Vec<String> {
        Self::ALL.iter().map(|l| l.as_str().to_string()).collect()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = SpamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ham" => Ok(Self::Ham),
            "spam" => Ok(Self::Spam),
            other => Err(SpamError::dataset(format!(
                "unknown label '{other}' (expected 'ham' or 'spam')"
            ))),
        }
    }
}
