//! Cleaning pipeline. Operations run in the order given against a working
//! copy of the sheet; the copy replaces the sheet only after every operation
//! has succeeded.

use std::{fmt, str::FromStr, sync::OnceLock};

use log::{debug, info};
use regex::{Captures, Regex};
use serde::Serialize;

use crate::{
    config::AnalystConfig,
    data::{Value, format_thousands, parse_cell, parse_number},
    error::{AnalystError, AnalystResult},
    frequency::FrequencyAccumulator,
    schema::{ColumnKind, infer_kind},
    stats::{ColumnStats, iqr_bounds},
    table::{Column, RecordSet, Table},
    workspace::Workspace,
};

const CLEAN_PREVIEW_ROWS: usize = 10;
const UNKNOWN_FILL: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningOperation {
    RemoveDuplicates,
    FillMissingValues,
    ConvertDataTypes,
    NormalizeText,
    RemoveOutliers,
    StandardizeFormat,
}

impl CleaningOperation {
    pub const ALL: [CleaningOperation; 6] = [
        CleaningOperation::RemoveDuplicates,
        CleaningOperation::FillMissingValues,
        CleaningOperation::ConvertDataTypes,
        CleaningOperation::NormalizeText,
        CleaningOperation::RemoveOutliers,
        CleaningOperation::StandardizeFormat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CleaningOperation::RemoveDuplicates => "remove_duplicates",
            CleaningOperation::FillMissingValues => "fill_missing_values",
            CleaningOperation::ConvertDataTypes => "convert_data_types",
            CleaningOperation::NormalizeText => "normalize_text",
            CleaningOperation::RemoveOutliers => "remove_outliers",
            CleaningOperation::StandardizeFormat => "standardize_format",
        }
    }
}

impl fmt::Display for CleaningOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CleaningOperation {
    type Err = AnalystError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        CleaningOperation::ALL
            .into_iter()
            .find(|op| op.as_str() == normalized)
            .ok_or_else(|| AnalystError::unsupported("cleaning operation", value.trim()))
    }
}

/// Parses every name before anything runs, so an unknown name leaves the
/// sheet untouched.
pub fn parse_operations<S: AsRef<str>>(names: &[S]) -> AnalystResult<Vec<CleaningOperation>> {
    names.iter().map(|name| name.as_ref().parse()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Shape {
    pub rows: usize,
    pub columns: usize,
}

impl Shape {
    fn of(table: &Table) -> Self {
        Self {
            rows: table.row_count(),
            columns: table.column_count(),
        }
    }
}

/// Per-operation effect counts; only operations that ran are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicates_removed: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_values_filled: Option<usize>,
    /// Columns whose kind changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_types_converted: Option<usize>,
    /// Text columns normalized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_normalized: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outliers_removed: Option<usize>,
    /// Cells rewritten.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_standardized: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningReport {
    pub operations_performed: Vec<CleaningOperation>,
    pub changes_made: CleaningChanges,
    pub original_shape: Shape,
    pub final_shape: Shape,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleaningOutcome {
    pub sheet: String,
    pub cleaning_report: CleaningReport,
    pub data_preview: RecordSet,
    pub summary: String,
}

pub fn clean_sheet(
    workspace: &mut Workspace,
    sheet: Option<&str>,
    operations: &[CleaningOperation],
    config: &AnalystConfig,
) -> AnalystResult<CleaningOutcome> {
    let target = workspace.resolve_sheet_mut(sheet)?;
    let mut working = target.table.clone();
    let report = clean_table(&mut working, operations, config)?;
    target.table = working;

    info!(
        "Cleaned sheet '{}': {:?} -> {:?}",
        target.name, report.original_shape, report.final_shape
    );
    let performed = report
        .operations_performed
        .iter()
        .map(CleaningOperation::as_str)
        .collect::<Vec<_>>();
    Ok(CleaningOutcome {
        sheet: target.name.clone(),
        data_preview: target.table.records(Some(CLEAN_PREVIEW_ROWS)),
        summary: format!("Cleaned data: {}", performed.join(", ")),
        cleaning_report: report,
    })
}

/// Runs the operations in order against `table`, in place.
pub fn clean_table(
    table: &mut Table,
    operations: &[CleaningOperation],
    config: &AnalystConfig,
) -> AnalystResult<CleaningReport> {
    let original_shape = Shape::of(table);
    let mut changes = CleaningChanges::default();

    for operation in operations {
        match operation {
            CleaningOperation::RemoveDuplicates => {
                let before = table.row_count();
                let keep = table
                    .duplicate_row_flags()
                    .into_iter()
                    .map(|duplicate| !duplicate)
                    .collect::<Vec<_>>();
                table.retain_rows(&keep);
                changes.duplicates_removed = Some(before - table.row_count());
            }
            CleaningOperation::FillMissingValues => {
                changes.missing_values_filled = Some(fill_missing_values(table)?);
            }
            CleaningOperation::ConvertDataTypes => {
                changes.data_types_converted = Some(convert_data_types(table, config)?);
            }
            CleaningOperation::NormalizeText => {
                changes.text_normalized = Some(normalize_text(table)?);
            }
            CleaningOperation::RemoveOutliers => {
                changes.outliers_removed = Some(remove_outliers(table, config));
            }
            CleaningOperation::StandardizeFormat => {
                changes.format_standardized = Some(standardize_format(table)?);
            }
        }
        debug!("Applied {} ({} row(s) remain)", operation, table.row_count());
    }

    Ok(CleaningReport {
        operations_performed: operations.to_vec(),
        changes_made: changes,
        original_shape,
        final_shape: Shape::of(table),
    })
}

/// Numeric nulls take the column mean, text nulls the column mode (or
/// `Unknown` when the column has no values). Integer columns whose mean is
/// fractional become Float. Datetime columns are left alone.
fn fill_missing_values(table: &mut Table) -> AnalystResult<usize> {
    let before = table.missing_count();
    for idx in 0..table.column_count() {
        let column = &table.columns()[idx];
        if column.missing_count() == 0 {
            continue;
        }
        let filled = match column.kind {
            ColumnKind::Integer | ColumnKind::Float => {
                let Some(mean) = ColumnStats::from_values(&column.numeric_values()).mean() else {
                    continue;
                };
                if column.kind == ColumnKind::Integer && mean.fract() == 0.0 {
                    fill_column(column, ColumnKind::Integer, Value::Integer(mean as i64))
                } else {
                    let promoted = Column::new(
                        column.name.clone(),
                        ColumnKind::Float,
                        column
                            .cells
                            .iter()
                            .map(|cell| cell.as_ref().and_then(Value::as_f64).map(Value::Float))
                            .collect(),
                    );
                    fill_column(&promoted, ColumnKind::Float, Value::Float(mean))
                }
            }
            ColumnKind::Text => {
                let mode = FrequencyAccumulator::from_column(column)
                    .mode()
                    .unwrap_or_else(|| UNKNOWN_FILL.to_string());
                fill_column(column, ColumnKind::Text, Value::Text(mode))
            }
            ColumnKind::DateTime => continue,
        };
        table.replace_column(idx, filled)?;
    }
    Ok(before - table.missing_count())
}

fn fill_column(column: &Column, kind: ColumnKind, fill: Value) -> Column {
    Column::new(
        column.name.clone(),
        kind,
        column
            .cells
            .iter()
            .map(|cell| Some(cell.clone().unwrap_or_else(|| fill.clone())))
            .collect(),
    )
}

/// Re-infers every column from its displayed values. Float columns are never
/// narrowed back to Integer.
fn convert_data_types(table: &mut Table, config: &AnalystConfig) -> AnalystResult<usize> {
    let mut converted = 0;
    for idx in 0..table.column_count() {
        let column = &table.columns()[idx];
        let raw = column
            .cells
            .iter()
            .map(|cell| cell.as_ref().map(Value::as_display).unwrap_or_default())
            .collect::<Vec<_>>();
        let mut kind = infer_kind(raw.iter().map(String::as_str), config.sample_rows);
        if column.kind == ColumnKind::Float && kind == ColumnKind::Integer {
            kind = ColumnKind::Float;
        }
        if kind == column.kind {
            continue;
        }
        let cells = raw.iter().map(|text| parse_cell(text, kind)).collect();
        let rebuilt = Column::new(column.name.clone(), kind, cells);
        debug!("Column '{}' converted {} -> {}", rebuilt.name, column.kind, kind);
        table.replace_column(idx, rebuilt)?;
        converted += 1;
    }
    Ok(converted)
}

/// Capitalizes the first letter of every run of letters and lowercases the
/// rest, so `o'neil` becomes `O'Neil`.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut previous_is_letter = false;
    for ch in value.chars() {
        if ch.is_alphabetic() {
            if previous_is_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            out.push(ch);
            previous_is_letter = false;
        }
    }
    out
}

fn normalize_text(table: &mut Table) -> AnalystResult<usize> {
    let mut normalized = 0;
    for idx in 0..table.column_count() {
        let column = &table.columns()[idx];
        if column.kind != ColumnKind::Text {
            continue;
        }
        let cells = column
            .cells
            .iter()
            .map(|cell| match cell {
                Some(Value::Text(text)) => Some(Value::Text(title_case(text.trim()))),
                other => other.clone(),
            })
            .collect();
        let rebuilt = Column::new(column.name.clone(), column.kind, cells);
        table.replace_column(idx, rebuilt)?;
        normalized += 1;
    }
    Ok(normalized)
}

/// Drops rows outside each numeric column's IQR bounds, one column after
/// another; bounds are computed on the rows that survived earlier columns.
/// Rows with a null in the column are kept.
fn remove_outliers(table: &mut Table, config: &AnalystConfig) -> usize {
    let before = table.row_count();
    let numeric = table
        .numeric_columns()
        .map(|c| c.name.clone())
        .collect::<Vec<_>>();
    for name in numeric {
        let Some(column) = table.column(&name) else {
            continue;
        };
        let Some(bounds) = iqr_bounds(&column.numeric_values(), config.outlier_iqr_multiplier)
        else {
            continue;
        };
        let keep = (0..column.len())
            .map(|row| column.numeric_at(row).is_none_or(|v| bounds.contains(v)))
            .collect::<Vec<_>>();
        table.retain_rows(&keep);
    }
    before - table.row_count()
}

fn currency_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$[\d,]+\.?\d*").expect("valid currency pattern"))
}

/// Rewrites every `$1234.5`-style amount in `value` as `$1,234.50`.
pub fn standardize_currency(value: &str) -> String {
    currency_pattern()
        .replace_all(value, |caps: &Captures| {
            let amount = caps[0].trim_start_matches('$').replace(',', "");
            match parse_number(&amount) {
                Some(number) => format!("${}", format_thousands(number)),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Datetime columns become `YYYY-MM-DD` text; currency amounts inside text
/// cells are reformatted. Returns the number of cells rewritten.
fn standardize_format(table: &mut Table) -> AnalystResult<usize> {
    let mut rewritten = 0;
    for idx in 0..table.column_count() {
        let column = &table.columns()[idx];
        let rebuilt = match column.kind {
            ColumnKind::DateTime => {
                let cells = column
                    .cells
                    .iter()
                    .map(|cell| {
                        cell.as_ref().and_then(Value::as_datetime).map(|dt| {
                            rewritten += 1;
                            Value::Text(dt.format("%Y-%m-%d").to_string())
                        })
                    })
                    .collect();
                Column::new(column.name.clone(), ColumnKind::Text, cells)
            }
            ColumnKind::Text => {
                let cells = column
                    .cells
                    .iter()
                    .map(|cell| match cell {
                        Some(Value::Text(text)) => {
                            let standardized = standardize_currency(text);
                            if standardized != *text {
                                rewritten += 1;
                            }
                            Some(Value::Text(standardized))
                        }
                        other => other.clone(),
                    })
                    .collect();
                Column::new(column.name.clone(), ColumnKind::Text, cells)
            }
            ColumnKind::Integer | ColumnKind::Float => continue,
        };
        table.replace_column(idx, rebuilt)?;
    }
    Ok(rewritten)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> Option<Value> {
        Some(Value::Integer(v))
    }

    fn text(s: &str) -> Option<Value> {
        Some(Value::Text(s.to_string()))
    }

    #[test]
    fn title_case_restarts_after_non_letters() {
        assert_eq!(title_case("hello WORLD"), "Hello World");
        assert_eq!(title_case("o'neil"), "O'Neil");
        assert_eq!(title_case("abc1def"), "Abc1Def");
    }

    #[test]
    fn currency_amounts_get_separators() {
        assert_eq!(standardize_currency("paid $1234.5 today"), "paid $1,234.50 today");
        assert_eq!(standardize_currency("$1,000"), "$1,000.00");
        assert_eq!(standardize_currency("no money"), "no money");
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let err = parse_operations(&["remove_duplicates", "shuffle"]).unwrap_err();
        assert!(matches!(err, AnalystError::Unsupported { kind: "cleaning operation", .. }));
        assert_eq!(
            parse_operations(&["Fill-Missing-Values"]).unwrap(),
            vec![CleaningOperation::FillMissingValues]
        );
    }

    #[test]
    fn fill_promotes_integer_columns_with_fractional_mean() {
        let mut table = Table::from_rows(
            &[("n", ColumnKind::Integer), ("t", ColumnKind::Text)],
            vec![
                vec![int(1), text("a")],
                vec![None, None],
                vec![int(2), text("a")],
            ],
        )
        .unwrap();
        let filled = fill_missing_values(&mut table).unwrap();
        assert_eq!(filled, 2);
        let n = table.column("n").unwrap();
        assert_eq!(n.kind, ColumnKind::Float);
        assert_eq!(n.cells[1], Some(Value::Float(1.5)));
        assert_eq!(table.column("t").unwrap().cells[1], text("a"));
    }

    #[test]
    fn all_null_text_column_fills_with_unknown() {
        let mut table =
            Table::from_rows(&[("t", ColumnKind::Text)], vec![vec![None], vec![None]]).unwrap();
        fill_missing_values(&mut table).unwrap();
        assert_eq!(table.column("t").unwrap().cells[0], text("Unknown"));
    }

    #[test]
    fn remove_outliers_keeps_null_rows() {
        let mut rows = (0..8).map(|v| vec![int(10 + v)]).collect::<Vec<_>>();
        rows.push(vec![int(1000)]);
        rows.push(vec![None]);
        let mut table = Table::from_rows(&[("n", ColumnKind::Integer)], rows).unwrap();
        let removed = remove_outliers(&mut table, &AnalystConfig::default());
        assert_eq!(removed, 1);
        assert_eq!(table.row_count(), 9);
    }
}
