//! Error taxonomy shared by every analysis operation.
//!
//! Operations never panic on data paths; they return [`AnalystError`] and the
//! boundary (the CLI or [`crate::executor::respond`]) turns it into a
//! client-visible `{"error": ...}` envelope.

use thiserror::Error;

pub type AnalystResult<T> = std::result::Result<T, AnalystError>;

#[derive(Debug, Error)]
pub enum AnalystError {
    #[error("No spreadsheet loaded")]
    NoSheetLoaded,
    #[error("Sheet \"{0}\" not found")]
    SheetNotFound(String),
    #[error("Column \"{0}\" not found")]
    ColumnNotFound(String),
    #[error("No numeric columns found for aggregation")]
    NoNumericColumns,
    #[error("No grouping columns found")]
    NoGroupingColumns,
    #[error("Column \"{0}\" is not numeric")]
    ColumnNotNumeric(String),
    #[error("Unsupported {kind}: {value}")]
    Unsupported { kind: &'static str, value: String },
    #[error("Invalid filter expression '{0}'")]
    InvalidFilter(String),
    #[error("Invalid validation rule for column \"{column}\": {reason}")]
    InvalidRule { column: String, reason: String },
    #[error("Row has {found} cell(s) but table has {expected} column(s)")]
    RowWidth { expected: usize, found: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Failed to decode text with encoding {0}")]
    Decode(&'static str),
}

impl AnalystError {
    pub fn unsupported(kind: &'static str, value: impl Into<String>) -> Self {
        AnalystError::Unsupported {
            kind,
            value: value.into(),
        }
    }
}
