//! Data types shared by the context assembler and the ordering preprocessor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Plain-text excerpt produced by the extraction service for one uploaded document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Excerpt {
    /// Display name of the source document.
    pub name: String,
    /// Extracted text, arbitrary length.
    pub text: String,
    /// Ordering applied by the preprocessor, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_order: Option<DerivedOrder>,
}

impl Excerpt {
    /// Build an excerpt without ordering metadata.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            derived_order: None,
        }
    }
}

/// Requested row ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Lowest value first.
    Ascending,
    /// Highest value first.
    Descending,
}

impl SortDirection {
    /// Lowercase label used in prompt headers and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata describing a deterministic sort applied to a tabular excerpt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedOrder {
    /// Header text of the column the rows were sorted by.
    pub column: String,
    /// Direction of the sort.
    pub direction: SortDirection,
    /// Number of rows with a parseable value that took part in the sort.
    pub row_count: usize,
}
