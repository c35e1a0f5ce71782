//! Column kinds and type inference.
//!
//! Inference looks at every non-empty, non-placeholder cell of a column and
//! settles on the narrowest kind all of them fit: integer, then float, then
//! datetime, falling back to text.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::{parse_number, parse_temporal};

const PLACEHOLDER_TOKENS: &[&str] = &["na", "n/a", "null", "none", "nan", "#n/a"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Integer,
    Float,
    DateTime,
    Text,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Float => "float",
            ColumnKind::DateTime => "datetime",
            ColumnKind::Text => "text",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_placeholder_token(value: &str) -> bool {
    let lowered = value.trim().to_ascii_lowercase();
    PLACEHOLDER_TOKENS.contains(&lowered.as_str())
}

#[derive(Debug, Clone)]
struct TypeCandidate {
    non_empty: usize,
    possible_integer: bool,
    possible_float: bool,
    possible_datetime: bool,
}

impl TypeCandidate {
    fn new() -> Self {
        Self {
            non_empty: 0,
            possible_integer: true,
            possible_float: true,
            possible_datetime: true,
        }
    }

    fn update(&mut self, value: &str) {
        let trimmed = value.trim();
        if trimmed.is_empty() || is_placeholder_token(trimmed) {
            return;
        }
        self.non_empty += 1;
        if self.possible_integer && trimmed.parse::<i64>().is_err() {
            self.possible_integer = false;
        }
        if self.possible_float && parse_number(trimmed).is_none() {
            self.possible_float = false;
        }
        if self.possible_datetime && parse_temporal(trimmed).is_none() {
            self.possible_datetime = false;
        }
    }

    fn decide(&self) -> ColumnKind {
        if self.non_empty == 0 {
            ColumnKind::Text
        } else if self.possible_integer {
            ColumnKind::Integer
        } else if self.possible_float {
            ColumnKind::Float
        } else if self.possible_datetime {
            ColumnKind::DateTime
        } else {
            ColumnKind::Text
        }
    }
}

/// Infers the kind of a column from its raw cell text. `sample_rows == 0`
/// means every cell is inspected.
pub fn infer_kind<'a, I>(values: I, sample_rows: usize) -> ColumnKind
where
    I: IntoIterator<Item = &'a str>,
{
    let mut candidate = TypeCandidate::new();
    for (idx, value) in values.into_iter().enumerate() {
        if sample_rows > 0 && idx >= sample_rows {
            break;
        }
        candidate.update(value);
    }
    candidate.decide()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_narrowest_kind() {
        assert_eq!(infer_kind(["1", "2", ""], 0), ColumnKind::Integer);
        assert_eq!(infer_kind(["1", "2.5"], 0), ColumnKind::Float);
        assert_eq!(
            infer_kind(["2024-01-01", "2024-02-03 10:00:00"], 0),
            ColumnKind::DateTime
        );
        assert_eq!(infer_kind(["East", "12"], 0), ColumnKind::Text);
    }

    #[test]
    fn placeholders_and_empty_columns() {
        assert_eq!(infer_kind(["NA", "3", "n/a"], 0), ColumnKind::Integer);
        assert_eq!(infer_kind(["", ""], 0), ColumnKind::Text);
    }

    #[test]
    fn sampling_limits_inspected_rows() {
        assert_eq!(infer_kind(["1", "2", "x"], 2), ColumnKind::Integer);
    }
}
