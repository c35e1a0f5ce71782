use std::cmp::Ordering;

use chrono::Datelike;
use log::warn;
use serde::{Serialize, Serializer};

use crate::{
    data::{Value, parse_cell},
    error::{AnalystError, AnalystResult},
    plan::{Condition, TimeFilter},
    table::Table,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Eq,
    NotEq,
    Gt,
    Ge,
    Lt,
    Le,
    Contains,
    StartsWith,
    EndsWith,
}

impl ComparisonOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "=",
            ComparisonOperator::NotEq => "!=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Ge => ">=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Le => "<=",
            ComparisonOperator::Contains => "contains",
            ComparisonOperator::StartsWith => "startswith",
            ComparisonOperator::EndsWith => "endswith",
        }
    }

    pub fn compare_numbers(&self, left: f64, right: f64) -> bool {
        self.matches_ordering(left.partial_cmp(&right))
    }

    fn matches_ordering(&self, ordering: Option<Ordering>) -> bool {
        use ComparisonOperator::*;
        match (self, ordering) {
            (Eq, Some(Ordering::Equal)) => true,
            (NotEq, Some(ord)) => ord != Ordering::Equal,
            (Gt, Some(Ordering::Greater)) => true,
            (Ge, Some(Ordering::Greater | Ordering::Equal)) => true,
            (Lt, Some(Ordering::Less)) => true,
            (Le, Some(Ordering::Less | Ordering::Equal)) => true,
            _ => false,
        }
    }
}

impl Serialize for ComparisonOperator {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.symbol())
    }
}

/// An explicit `column<op>value` filter, as accepted by pivot and export.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    pub column: String,
    pub operator: ComparisonOperator,
    pub raw_value: String,
}

pub fn parse_filters(filters: &[String]) -> AnalystResult<Vec<FilterCondition>> {
    filters.iter().map(|f| parse_filter(f)).collect()
}

pub fn parse_filter(filter: &str) -> AnalystResult<FilterCondition> {
    let trimmed = filter.trim();
    if trimmed.is_empty() {
        return Err(AnalystError::InvalidFilter(filter.to_string()));
    }

    let lowered = trimmed.to_ascii_lowercase();
    for (needle, op) in [
        (" contains ", ComparisonOperator::Contains),
        (" startswith ", ComparisonOperator::StartsWith),
        (" endswith ", ComparisonOperator::EndsWith),
    ] {
        if let Some(idx) = lowered.find(needle) {
            let (left, right_with_space) = trimmed.split_at(idx);
            let right = right_with_space[needle.len()..].trim();
            return Ok(FilterCondition {
                column: left.trim().to_string(),
                operator: op,
                raw_value: unquote(right).to_string(),
            });
        }
    }

    for needle in ["!=", ">=", "<=", "=", ">", "<"] {
        if let Some(idx) = trimmed.find(needle) {
            let op = match needle {
                "=" => ComparisonOperator::Eq,
                "!=" => ComparisonOperator::NotEq,
                ">" => ComparisonOperator::Gt,
                ">=" => ComparisonOperator::Ge,
                "<" => ComparisonOperator::Lt,
                _ => ComparisonOperator::Le,
            };
            let left = trimmed[..idx].trim();
            let right = trimmed[idx + needle.len()..].trim();
            if left.is_empty() {
                break;
            }
            return Ok(FilterCondition {
                column: left.to_string(),
                operator: op,
                raw_value: unquote(right).to_string(),
            });
        }
    }

    Err(AnalystError::InvalidFilter(trimmed.to_string()))
}

fn unquote(value: &str) -> &str {
    if value.len() >= 2 {
        let bytes = value.as_bytes();
        if (bytes[0] == b'"' && bytes[value.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[value.len() - 1] == b'\'')
        {
            return &value[1..value.len() - 1];
        }
    }
    value
}

fn evaluate_condition(
    condition: &FilterCondition,
    cell: Option<&Value>,
    rhs: Option<&Value>,
) -> bool {
    use ComparisonOperator::*;
    match condition.operator {
        Contains | StartsWith | EndsWith => {
            let raw = cell.map(Value::as_display).unwrap_or_default();
            let needle = condition.raw_value.as_str();
            match condition.operator {
                Contains => raw.contains(needle),
                StartsWith => raw.starts_with(needle),
                _ => raw.ends_with(needle),
            }
        }
        Eq | NotEq | Gt | Ge | Lt | Le => match (cell, rhs) {
            (Some(left), Some(right)) => {
                condition.operator.matches_ordering(Some(left.cmp(right)))
            }
            (None, None) => matches!(condition.operator, Eq | Ge | Le),
            (None, Some(_)) | (Some(_), None) => matches!(condition.operator, NotEq),
        },
    }
}

/// Applies explicit filters (AND). Every referenced column must exist.
pub fn apply_filters(table: &Table, filters: &[FilterCondition]) -> AnalystResult<Table> {
    let mut keep = vec![true; table.row_count()];
    for filter in filters {
        let column = table.require_column(&filter.column)?;
        let rhs = parse_cell(&filter.raw_value, column.kind);
        for (row, flag) in keep.iter_mut().enumerate() {
            if *flag {
                *flag = evaluate_condition(filter, column.cells[row].as_ref(), rhs.as_ref());
            }
        }
    }
    Ok(select_flagged(table, &keep))
}

/// Applies query conditions to each referenced column in turn (AND).
/// Conditions against non-numeric or unknown columns are skipped; null
/// cells never satisfy a comparison.
pub fn apply_conditions(table: &Table, columns: &[String], conditions: &[Condition]) -> Table {
    let mut keep = vec![true; table.row_count()];
    for condition in conditions {
        for name in columns {
            let Some(column) = table.column(name) else {
                continue;
            };
            if !column.is_numeric() {
                warn!(
                    "Skipping condition {} {} on non-numeric column '{}'",
                    condition.operator.symbol(),
                    condition.value,
                    name
                );
                continue;
            }
            for (row, flag) in keep.iter_mut().enumerate() {
                if *flag {
                    *flag = column
                        .numeric_at(row)
                        .is_some_and(|value| condition.matches(value));
                }
            }
        }
    }
    select_flagged(table, &keep)
}

/// Keeps rows whose first datetime column falls in the requested quarter
/// and/or month. Tables without a datetime column pass through unchanged.
pub fn apply_time_filter(table: &Table, filter: &TimeFilter) -> Table {
    if filter.is_empty() {
        return table.clone();
    }
    let Some(column) = table.first_datetime_column() else {
        return table.clone();
    };
    let keep = column
        .cells
        .iter()
        .map(|cell| {
            let Some(dt) = cell.as_ref().and_then(Value::as_datetime) else {
                return false;
            };
            let quarter = ((dt.month() - 1) / 3 + 1) as u8;
            filter.quarter.is_none_or(|q| q == quarter)
                && filter.month.is_none_or(|m| u32::from(m) == dt.month())
        })
        .collect::<Vec<_>>();
    select_flagged(table, &keep)
}

fn select_flagged(table: &Table, keep: &[bool]) -> Table {
    let indices = keep
        .iter()
        .enumerate()
        .filter_map(|(idx, flag)| flag.then_some(idx))
        .collect::<Vec<_>>();
    table.select_rows(&indices)
}
