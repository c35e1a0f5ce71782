//! Rule-based column validation.
//!
//! Rules are a YAML mapping from column name to checks, applied in file order:
//!
//! ```yaml
//! Revenue:
//!   required: true
//!   min: 0
//!   in_range: [0, 10000]
//! Region:
//!   pattern: "[A-Z]"
//!   unique: false
//! ```

use std::{collections::HashSet, fs, path::Path};

use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    data::format_float,
    error::{AnalystError, AnalystResult},
    schema::ColumnKind,
    table::{Column, Table},
    workspace::Workspace,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnRules {
    pub required: bool,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub pattern: Option<String>,
    pub unique: bool,
    pub in_range: Option<[f64; 2]>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationRules {
    pub columns: Vec<(String, ColumnRules)>,
}

impl ValidationRules {
    pub fn load(path: &Path) -> AnalystResult<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> AnalystResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let mapping: serde_yaml::Mapping = serde_yaml::from_str(raw)?;
        let mut columns = Vec::with_capacity(mapping.len());
        for (key, value) in mapping {
            let name = match key {
                serde_yaml::Value::String(name) => name,
                other => serde_yaml::to_string(&other)?.trim().to_string(),
            };
            let rules = if value.is_null() {
                ColumnRules::default()
            } else {
                serde_yaml::from_value(value)?
            };
            columns.push((name, rules));
        }
        Ok(Self { columns })
    }

    pub fn push(&mut self, column: impl Into<String>, rules: ColumnRules) {
        self.columns.push((column.into(), rules));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnValidation {
    pub column: String,
    pub total_rows: usize,
    pub valid_rows: usize,
    pub invalid_rows: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub passed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub summary: Vec<ColumnValidation>,
}

impl ValidationReport {
    pub fn column(&self, name: &str) -> Option<&ColumnValidation> {
        self.summary.iter().find(|c| c.column == name)
    }
}

fn compile_pattern(column: &str, pattern: &str) -> AnalystResult<Regex> {
    Regex::new(&format!("^(?:{pattern})")).map_err(|err| AnalystError::InvalidRule {
        column: column.to_string(),
        reason: err.to_string(),
    })
}

fn count_numeric(column: &Column, predicate: impl Fn(f64) -> bool) -> usize {
    column
        .cells
        .iter()
        .filter_map(|cell| cell.as_ref().and_then(|v| v.as_f64()))
        .filter(|v| predicate(*v))
        .count()
}

/// Range checks apply to numeric columns only; patterns to text columns only.
fn validate_column(column: &Column, rules: &ColumnRules) -> AnalystResult<ColumnValidation> {
    let total_rows = column.len();
    let mut invalid_rows = 0;
    let mut errors = Vec::new();
    let mut flag = |count: usize, message: String| {
        if count > 0 {
            invalid_rows += count;
            errors.push(message);
        }
    };

    if rules.required {
        let nulls = column.missing_count();
        flag(nulls, format!("{nulls} null values found"));
    }
    if column.is_numeric() {
        if let Some(min) = rules.min {
            let below = count_numeric(column, |v| v < min);
            flag(below, format!("{below} values below minimum {}", format_float(min)));
        }
        if let Some(max) = rules.max {
            let above = count_numeric(column, |v| v > max);
            flag(above, format!("{above} values above maximum {}", format_float(max)));
        }
    }
    if let Some(pattern) = &rules.pattern {
        let regex = compile_pattern(&column.name, pattern)?;
        if column.kind == ColumnKind::Text {
            let mismatched = column
                .cells
                .iter()
                .flatten()
                .filter(|value| !regex.is_match(&value.as_display()))
                .count();
            flag(
                mismatched,
                format!("{mismatched} values don't match pattern {pattern}"),
            );
        }
    }
    if rules.unique {
        let distinct = column.cells.iter().collect::<HashSet<_>>().len();
        let duplicates = total_rows - distinct;
        flag(duplicates, format!("{duplicates} duplicate values found"));
    }
    if let Some([low, high]) = rules.in_range {
        if column.is_numeric() {
            let outside = count_numeric(column, |v| v < low || v > high);
            flag(
                outside,
                format!(
                    "{outside} values out of range [{}, {}]",
                    format_float(low),
                    format_float(high)
                ),
            );
        }
    }

    Ok(ColumnValidation {
        column: column.name.clone(),
        total_rows,
        valid_rows: total_rows.saturating_sub(invalid_rows),
        invalid_rows,
        errors,
    })
}

/// A missing column is reported and fails the run; later columns are still
/// checked.
pub fn validate_table(table: &Table, rules: &ValidationRules) -> AnalystResult<ValidationReport> {
    let mut report = ValidationReport {
        passed: true,
        ..ValidationReport::default()
    };
    for (name, column_rules) in &rules.columns {
        let Some(column) = table.column(name) else {
            report.errors.push(format!("Column \"{name}\" not found"));
            report.passed = false;
            continue;
        };
        let result = validate_column(column, column_rules)?;
        debug!(
            "Validated column '{}': {} invalid row(s)",
            name, result.invalid_rows
        );
        if !result.errors.is_empty() {
            report.errors.extend(result.errors.iter().cloned());
            report.passed = false;
        }
        report.summary.push(result);
    }
    Ok(report)
}

pub fn validate_sheet(
    workspace: &Workspace,
    sheet: Option<&str>,
    rules: &ValidationRules,
) -> AnalystResult<ValidationReport> {
    let sheet = workspace.resolve_sheet(sheet)?;
    let report = validate_table(&sheet.table, rules)?;
    info!(
        "Validation of sheet '{}' {} with {} error(s)",
        sheet.name,
        if report.passed { "passed" } else { "failed" },
        report.errors.len()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_keep_file_order() {
        let rules = ValidationRules::from_yaml("b:\n  required: true\na:\n  min: 1\nc:\n").unwrap();
        let names = rules.columns.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["b", "a", "c"]);
        assert!(rules.columns[0].1.required);
        assert_eq!(rules.columns[1].1.min, Some(1.0));
        assert_eq!(rules.columns[2].1, ColumnRules::default());
    }

    #[test]
    fn invalid_pattern_is_a_rule_error() {
        let err = compile_pattern("code", "(").unwrap_err();
        assert!(matches!(err, AnalystError::InvalidRule { column, .. } if column == "code"));
    }

    #[test]
    fn pattern_is_anchored_at_start() {
        let regex = compile_pattern("code", "[A-Z]{2}").unwrap();
        assert!(regex.is_match("AB12"));
        assert!(!regex.is_match("1AB"));
    }
}
