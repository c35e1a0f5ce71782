//! Profiling reports: per-column statistics, data quality, mixed-type
//! consistency checks, trend and correlation patterns, and the
//! recommendation list built on top of them.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use itertools::Itertools;
use log::debug;
use serde::Serialize;

use crate::{
    config::AnalystConfig,
    data::{Value, parse_number},
    error::{AnalystError, AnalystResult},
    frequency::{FrequencyAccumulator, ValueCount},
    schema::ColumnKind,
    stats::{self, ColumnStats, NumericSummary, OutlierReport},
    table::{Column, Table},
    workspace::Workspace,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasicStats {
    pub rows: usize,
    pub columns: usize,
    pub missing_values: usize,
    pub duplicate_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnProfile {
    Numeric {
        #[serde(flatten)]
        summary: NumericSummary,
        outliers: OutlierReport,
    },
    Text {
        avg_length: Option<f64>,
        max_length: Option<usize>,
        common_values: Vec<ValueCount>,
    },
    DateTime {
        min_date: Option<NaiveDateTime>,
        max_date: Option<NaiveDateTime>,
        date_range_days: Option<i64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnAnalysis {
    pub name: String,
    pub kind: ColumnKind,
    pub missing_count: usize,
    pub missing_percentage: f64,
    pub unique_values: usize,
    /// Rows repeating an earlier value of this column; nulls count as a value.
    pub duplicate_values: usize,
    #[serde(flatten)]
    pub profile: ColumnProfile,
}

impl ColumnAnalysis {
    pub fn outliers(&self) -> Option<&OutlierReport> {
        match &self.profile {
            ColumnProfile::Numeric { outliers, .. } => Some(outliers),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConsistencyReport {
    pub issues: Vec<String>,
    pub issue_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataQuality {
    pub quality_score: f64,
    pub missing_percentage: f64,
    pub duplicate_percentage: f64,
    pub completeness: f64,
    pub consistency: ConsistencyReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trend {
    pub column: String,
    pub slope: f64,
    pub trend: TrendDirection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correlation {
    pub col1: String,
    pub col2: String,
    pub correlation: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Patterns {
    pub trends: Vec<Trend>,
    pub correlations: Vec<Correlation>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetAnalysis {
    pub basic_stats: BasicStats,
    pub column_analysis: Vec<ColumnAnalysis>,
    pub data_quality: DataQuality,
    pub patterns: Patterns,
}

impl SheetAnalysis {
    pub fn column(&self, name: &str) -> Option<&ColumnAnalysis> {
        self.column_analysis.iter().find(|c| c.name == name)
    }
}

pub fn analyze_table(table: &Table, config: &AnalystConfig) -> SheetAnalysis {
    let rows = table.row_count();
    let basic_stats = BasicStats {
        rows,
        columns: table.column_count(),
        missing_values: table.missing_count(),
        duplicate_rows: table.duplicate_row_count(),
    };
    let column_analysis = table
        .columns()
        .iter()
        .map(|column| analyze_column(column, config))
        .collect();
    SheetAnalysis {
        data_quality: assess_quality(table),
        patterns: detect_patterns(table, config),
        basic_stats,
        column_analysis,
    }
}

pub fn analyze_column(column: &Column, config: &AnalystConfig) -> ColumnAnalysis {
    let rows = column.len();
    let missing = column.missing_count();
    let distinct_cells = column.cells.iter().collect::<HashSet<_>>().len();
    let unique_values = column.cells.iter().flatten().collect::<HashSet<_>>().len();

    let profile = match column.kind {
        ColumnKind::Integer | ColumnKind::Float => {
            let values = column.numeric_values();
            ColumnProfile::Numeric {
                summary: ColumnStats::from_values(&values).summary(),
                outliers: stats::detect_outliers(&values, rows, config.outlier_iqr_multiplier),
            }
        }
        ColumnKind::Text => {
            let lengths = column
                .cells
                .iter()
                .flatten()
                .map(|value| value.as_display().chars().count())
                .collect::<Vec<_>>();
            let avg_length = if lengths.is_empty() {
                None
            } else {
                Some(lengths.iter().sum::<usize>() as f64 / lengths.len() as f64)
            };
            ColumnProfile::Text {
                avg_length,
                max_length: lengths.iter().copied().max(),
                common_values: FrequencyAccumulator::from_column(column)
                    .most_common(config.common_values),
            }
        }
        ColumnKind::DateTime => {
            let dates = column.cells.iter().flatten().filter_map(Value::as_datetime);
            let (min_date, max_date) = match dates.minmax().into_option() {
                Some((min, max)) => (Some(min), Some(max)),
                None => (None, None),
            };
            ColumnProfile::DateTime {
                min_date,
                max_date,
                date_range_days: min_date
                    .zip(max_date)
                    .map(|(min, max)| (max - min).num_days()),
            }
        }
    };

    ColumnAnalysis {
        name: column.name.clone(),
        kind: column.kind,
        missing_count: missing,
        missing_percentage: stats::percentage(missing, rows),
        unique_values,
        duplicate_values: rows - distinct_cells,
        profile,
    }
}

/// Text cells that parse as a number.
fn numeric_like_count(column: &Column) -> usize {
    column
        .cells
        .iter()
        .flatten()
        .filter_map(Value::as_text)
        .filter(|text| parse_number(text).is_some())
        .count()
}

pub fn assess_quality(table: &Table) -> DataQuality {
    let cells = table.cell_count();
    let missing = table.missing_count();
    let duplicates = table.duplicate_row_count();
    let quality_score = if cells == 0 {
        0.0
    } else {
        (cells as f64 - missing as f64 - duplicates as f64) / cells as f64 * 100.0
    };
    let missing_percentage = stats::percentage(missing, cells);
    DataQuality {
        quality_score,
        missing_percentage,
        duplicate_percentage: stats::percentage(duplicates, table.row_count()),
        completeness: if cells == 0 {
            0.0
        } else {
            100.0 - missing_percentage
        },
        consistency: check_consistency(table),
    }
}

/// Flags text columns where some, but not all, rows hold a numeric value.
pub fn check_consistency(table: &Table) -> ConsistencyReport {
    let issues = table
        .columns()
        .iter()
        .filter(|column| column.kind == ColumnKind::Text)
        .filter(|column| {
            let numeric = numeric_like_count(column);
            numeric > 0 && numeric < table.row_count()
        })
        .map(|column| format!("Mixed data types in column '{}'", column.name))
        .collect::<Vec<_>>();
    ConsistencyReport {
        issue_count: issues.len(),
        issues,
    }
}

pub fn detect_patterns(table: &Table, config: &AnalystConfig) -> Patterns {
    let numeric = table.numeric_columns().collect::<Vec<_>>();

    let mut trends = Vec::new();
    if table.row_count() > config.trend_min_rows {
        for column in &numeric {
            let Some(mean) = ColumnStats::from_values(&column.numeric_values()).mean() else {
                continue;
            };
            let filled = (0..column.len())
                .map(|row| column.numeric_at(row).unwrap_or(mean))
                .collect::<Vec<_>>();
            let Some(slope) = stats::linear_slope(&filled) else {
                continue;
            };
            let trend = if slope > 0.0 {
                TrendDirection::Increasing
            } else if slope < 0.0 {
                TrendDirection::Decreasing
            } else {
                TrendDirection::Stable
            };
            trends.push(Trend {
                column: column.name.clone(),
                slope,
                trend,
            });
        }
    }

    let series = numeric
        .iter()
        .map(|column| (0..column.len()).map(|row| column.numeric_at(row)).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    let correlations = (0..numeric.len())
        .tuple_combinations()
        .filter_map(|(i, j)| {
            let r = stats::pearson(&series[i], &series[j])?;
            (r.abs() > config.correlation_threshold).then(|| Correlation {
                col1: numeric[i].name.clone(),
                col2: numeric[j].name.clone(),
                correlation: r,
            })
        })
        .collect();

    Patterns {
        trends,
        correlations,
    }
}

/// Recommendations for one sheet, in rule order: missing values, numeric-looking
/// text columns, outliers, strong correlations.
pub fn sheet_recommendations(
    sheet: &str,
    table: &Table,
    analysis: &SheetAnalysis,
    config: &AnalystConfig,
) -> Vec<String> {
    let mut out = Vec::new();

    let missing = table
        .columns()
        .iter()
        .filter(|c| c.missing_count() > 0)
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        out.push(format!(
            "Sheet '{sheet}': Consider handling missing values in columns: {}",
            missing.join(", ")
        ));
    }

    for column in table.columns().iter().filter(|c| c.kind == ColumnKind::Text) {
        if numeric_like_count(column) as f64 > table.row_count() as f64 * config.numeric_hint_ratio
        {
            out.push(format!(
                "Sheet '{sheet}': Column '{}' appears to be numeric - consider converting data type",
                column.name
            ));
        }
    }

    for column in &analysis.column_analysis {
        if let Some(outliers) = column.outliers().filter(|o| o.count > 0) {
            out.push(format!(
                "Sheet '{sheet}': Column '{}' has {} outliers - consider investigation",
                column.name, outliers.count
            ));
        }
    }

    if !analysis.patterns.correlations.is_empty() {
        out.push(format!(
            "Sheet '{sheet}': Strong correlations detected - consider visualization"
        ));
    }
    out
}

pub fn recommendations(workspace: &Workspace, config: &AnalystConfig) -> Vec<String> {
    workspace
        .sheets()
        .iter()
        .flat_map(|sheet| {
            let analysis = analyze_table(&sheet.table, config);
            sheet_recommendations(&sheet.name, &sheet.table, &analysis, config)
        })
        .take(config.max_recommendations)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallSummary {
    pub total_sheets: usize,
    pub total_rows: usize,
    pub total_columns: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnType {
    pub name: String,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetSummary {
    pub name: String,
    pub rows: usize,
    pub columns: usize,
    pub column_names: Vec<String>,
    pub data_types: Vec<ColumnType>,
    pub numeric_columns: Vec<String>,
    pub text_columns: Vec<String>,
    pub date_columns: Vec<String>,
    pub quality_score: f64,
    pub analysis: SheetAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceSummary {
    pub overall: OverallSummary,
    pub sheets: Vec<SheetSummary>,
    pub recommendations: Vec<String>,
}

fn names_of_kind(table: &Table, kinds: &[ColumnKind]) -> Vec<String> {
    table
        .columns()
        .iter()
        .filter(|c| kinds.contains(&c.kind))
        .map(|c| c.name.clone())
        .collect()
}

pub fn summarize_workspace(
    workspace: &Workspace,
    config: &AnalystConfig,
) -> AnalystResult<WorkspaceSummary> {
    if workspace.is_empty() {
        return Err(AnalystError::NoSheetLoaded);
    }

    let mut sheets = Vec::new();
    let mut recommendations = Vec::new();
    for sheet in workspace.sheets() {
        let table = &sheet.table;
        let analysis = analyze_table(table, config);
        debug!(
            "Analyzed sheet '{}': quality score {:.2}",
            sheet.name, analysis.data_quality.quality_score
        );
        recommendations.extend(sheet_recommendations(&sheet.name, table, &analysis, config));
        sheets.push(SheetSummary {
            name: sheet.name.clone(),
            rows: table.row_count(),
            columns: table.column_count(),
            column_names: table.column_names(),
            data_types: table
                .columns()
                .iter()
                .map(|c| ColumnType {
                    name: c.name.clone(),
                    kind: c.kind,
                })
                .collect(),
            numeric_columns: names_of_kind(table, &[ColumnKind::Integer, ColumnKind::Float]),
            text_columns: names_of_kind(table, &[ColumnKind::Text]),
            date_columns: names_of_kind(table, &[ColumnKind::DateTime]),
            quality_score: analysis.data_quality.quality_score,
            analysis,
        });
    }
    recommendations.truncate(config.max_recommendations);

    Ok(WorkspaceSummary {
        overall: OverallSummary {
            total_sheets: sheets.len(),
            total_rows: sheets.iter().map(|s| s.rows).sum(),
            total_columns: sheets.iter().map(|s| s.columns).sum(),
        },
        sheets,
        recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Option<Value> {
        Some(Value::Text(s.to_string()))
    }

    #[test]
    fn duplicate_values_count_nulls_as_a_value() {
        let column = Column::new(
            "c",
            ColumnKind::Text,
            vec![text("a"), None, text("a"), None, text("b")],
        );
        let analysis = analyze_column(&column, &AnalystConfig::default());
        assert_eq!(analysis.missing_count, 2);
        assert_eq!(analysis.unique_values, 2);
        assert_eq!(analysis.duplicate_values, 2);
        assert!((analysis.missing_percentage - 40.0).abs() < 1e-9);
    }

    #[test]
    fn consistency_flags_partially_numeric_text() {
        let table = Table::from_rows(
            &[("code", ColumnKind::Text)],
            vec![vec![text("12")], vec![text("x")]],
        )
        .unwrap();
        let report = check_consistency(&table);
        assert_eq!(report.issues, vec!["Mixed data types in column 'code'"]);
    }

    #[test]
    fn quality_of_empty_table_is_zero() {
        let quality = assess_quality(&Table::new());
        assert_eq!(quality.quality_score, 0.0);
        assert_eq!(quality.consistency.issue_count, 0);
    }

    #[test]
    fn date_range_spans_days() {
        let day = |d: u32| {
            chrono::NaiveDate::from_ymd_opt(2024, 1, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .map(Value::DateTime)
        };
        let column = Column::new("d", ColumnKind::DateTime, vec![day(10), None, day(3)]);
        let analysis = analyze_column(&column, &AnalystConfig::default());
        match analysis.profile {
            ColumnProfile::DateTime {
                date_range_days, ..
            } => assert_eq!(date_range_days, Some(7)),
            other => panic!("unexpected profile {other:?}"),
        }
    }
}
