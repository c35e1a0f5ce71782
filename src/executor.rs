//! Query execution.
//!
//! [`execute`] resolves the sheet, builds a [`QueryPlan`] and dispatches on
//! its intent. Each intent has one step; the table is only read. Failures
//! come back as [`AnalystError`] and [`respond`] maps them into the
//! `{"error": ...}` envelope clients see.

use std::collections::BTreeMap;

use log::{debug, info};
use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::json;

use crate::{
    config::AnalystConfig,
    data::{Value, format_thousands},
    error::{AnalystError, AnalystResult},
    filter,
    intent::Intent,
    plan::{AggregationKind, QueryPlan},
    schema::ColumnKind,
    stats::percentage,
    table::{Column, RecordSet, Table},
    workspace::Workspace,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryResult {
    Aggregation(AggregationResult),
    Filter(FilterResult),
    #[serde(rename = "groupby")]
    GroupBy(GroupByResult),
    TopN(TopNResult),
    Comparison(PendingResult),
    Trend(PendingResult),
    General(GeneralResult),
}

impl QueryResult {
    pub fn intent(&self) -> Intent {
        match self {
            QueryResult::Aggregation(_) => Intent::Aggregation,
            QueryResult::Filter(_) => Intent::Filter,
            QueryResult::GroupBy(_) => Intent::GroupBy,
            QueryResult::TopN(_) => Intent::TopN,
            QueryResult::Comparison(_) => Intent::Comparison,
            QueryResult::Trend(_) => Intent::Trend,
            QueryResult::General(_) => Intent::General,
        }
    }
}

/// Column → aggregate, in the order the columns were referenced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateValues(pub Vec<(String, Option<Value>)>);

impl AggregateValues {
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, value)| value.as_ref())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for AggregateValues {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub operation: AggregationKind,
    pub columns: Vec<String>,
    pub results: AggregateValues,
    pub filtered_rows: usize,
    pub total_rows: usize,
    pub formatted_results: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterResult {
    pub filtered_rows: usize,
    pub total_rows: usize,
    pub columns: Vec<String>,
    pub data: RecordSet,
    pub percentage_of_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupAggregate {
    pub column: String,
    pub sum: f64,
    pub mean: Option<f64>,
    pub count: usize,
}

/// One group: its key values and the aggregates of every target column.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRow {
    pub keys: Vec<(String, Value)>,
    pub aggregates: Vec<GroupAggregate>,
}

impl GroupRow {
    pub fn key(&self, column: &str) -> Option<&Value> {
        self.keys
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn aggregate(&self, column: &str) -> Option<&GroupAggregate> {
        self.aggregates.iter().find(|agg| agg.column == column)
    }
}

impl Serialize for GroupRow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.keys.len() + self.aggregates.len() * 3))?;
        for (name, value) in &self.keys {
            map.serialize_entry(name, value)?;
        }
        for agg in &self.aggregates {
            map.serialize_entry(&format!("{}_sum", agg.column), &agg.sum)?;
            map.serialize_entry(&format!("{}_mean", agg.column), &agg.mean)?;
            map.serialize_entry(&format!("{}_count", agg.column), &agg.count)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupByResult {
    pub grouping_columns: Vec<String>,
    pub aggregation_columns: Vec<String>,
    pub data: Vec<GroupRow>,
    pub total_groups: usize,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopNResult {
    pub n: usize,
    pub sort_column: String,
    pub data: RecordSet,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingResult {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneralResult {
    pub message: String,
    pub data_preview: RecordSet,
    pub total_rows: usize,
    pub total_columns: usize,
    pub columns: Vec<String>,
}

pub fn execute(
    workspace: &Workspace,
    query: &str,
    sheet: Option<&str>,
    config: &AnalystConfig,
) -> AnalystResult<QueryResult> {
    let sheet = workspace.resolve_sheet(sheet)?;
    let plan = QueryPlan::build(query, &sheet.table);
    let result = execute_plan(&sheet.table, &plan, config)?;
    info!("Answered '{}' on sheet '{}' as {}", query, sheet.name, result.intent());
    Ok(result)
}

pub fn execute_plan(
    table: &Table,
    plan: &QueryPlan,
    config: &AnalystConfig,
) -> AnalystResult<QueryResult> {
    match plan.intent {
        Intent::Aggregation => run_aggregation(table, plan).map(QueryResult::Aggregation),
        Intent::Filter => Ok(QueryResult::Filter(run_filter(table, plan, config))),
        Intent::GroupBy => run_groupby(table, plan, config).map(QueryResult::GroupBy),
        Intent::TopN => run_top_n(table, plan, config).map(QueryResult::TopN),
        Intent::Comparison => Ok(QueryResult::Comparison(PendingResult {
            message: "Comparison queries not yet implemented".to_string(),
        })),
        Intent::Trend => Ok(QueryResult::Trend(PendingResult {
            message: "Trend analysis not yet implemented".to_string(),
        })),
        Intent::General => Ok(QueryResult::General(run_general(table, plan, config))),
    }
}

fn first_numeric_name(table: &Table) -> AnalystResult<String> {
    table
        .first_numeric_column()
        .map(|c| c.name.clone())
        .ok_or(AnalystError::NoNumericColumns)
}

fn run_aggregation(table: &Table, plan: &QueryPlan) -> AnalystResult<AggregationResult> {
    let columns = if plan.columns.is_empty() {
        vec![first_numeric_name(table)?]
    } else {
        plan.columns.clone()
    };

    let timed = filter::apply_time_filter(table, &plan.time_filter);
    let filtered = filter::apply_conditions(&timed, &columns, &plan.conditions);
    debug!(
        "Aggregating {:?} over {} of {} row(s)",
        columns,
        filtered.row_count(),
        table.row_count()
    );

    let mut results = Vec::new();
    for name in &columns {
        let Some(column) = filtered.column(name) else {
            continue;
        };
        if let Some(value) = aggregate_column(column, plan.aggregation) {
            results.push((name.clone(), value));
        }
    }
    let results = AggregateValues(results);

    Ok(AggregationResult {
        operation: plan.aggregation,
        formatted_results: format_aggregation_results(&results, plan.aggregation),
        columns,
        results,
        filtered_rows: filtered.row_count(),
        total_rows: table.row_count(),
    })
}

/// `None` when the aggregation does not apply to the column's kind
/// (sum/mean of text or datetime). Empty numeric input gives `Some(None)`
/// for mean/max/min and zero for sum/count.
pub fn aggregate_column(column: &Column, kind: AggregationKind) -> Option<Option<Value>> {
    let present = column.cells.iter().flatten();
    match kind {
        AggregationKind::Count => Some(Some(Value::Integer(present.count() as i64))),
        AggregationKind::Max => Some(present.max().cloned()),
        AggregationKind::Min => Some(present.min().cloned()),
        AggregationKind::Sum => match column.kind {
            ColumnKind::Integer => {
                let total = present
                    .filter_map(|v| match v {
                        Value::Integer(i) => Some(*i),
                        _ => None,
                    })
                    .try_fold(0i64, |acc, i| acc.checked_add(i));
                Some(Some(match total {
                    Some(total) => Value::Integer(total),
                    None => Value::Float(column.numeric_values().iter().sum()),
                }))
            }
            ColumnKind::Float => Some(Some(Value::Float(column.numeric_values().iter().sum()))),
            ColumnKind::DateTime | ColumnKind::Text => None,
        },
        AggregationKind::Mean => {
            if !column.is_numeric() {
                return None;
            }
            let values = column.numeric_values();
            if values.is_empty() {
                Some(None)
            } else {
                Some(Some(Value::Float(
                    values.iter().sum::<f64>() / values.len() as f64,
                )))
            }
        }
    }
}

pub fn format_aggregation_results(results: &AggregateValues, kind: AggregationKind) -> String {
    results
        .0
        .iter()
        .map(|(column, value)| {
            let rendered = match (value, kind) {
                (Some(v), AggregationKind::Sum | AggregationKind::Mean) => v
                    .as_f64()
                    .map(format_thousands)
                    .unwrap_or_else(|| v.as_display()),
                (Some(v), _) => v.as_display(),
                (None, _) => "n/a".to_string(),
            };
            format!("{} of {}: {}", kind.title(), column, rendered)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn run_filter(table: &Table, plan: &QueryPlan, config: &AnalystConfig) -> FilterResult {
    let filtered = filter::apply_conditions(table, &plan.columns, &plan.conditions);
    FilterResult {
        filtered_rows: filtered.row_count(),
        total_rows: table.row_count(),
        columns: filtered.column_names(),
        data: filtered.records(Some(config.filter_preview_rows)),
        percentage_of_total: percentage(filtered.row_count(), table.row_count()),
    }
}

fn run_groupby(
    table: &Table,
    plan: &QueryPlan,
    config: &AnalystConfig,
) -> AnalystResult<GroupByResult> {
    let mut grouping = Vec::new();
    let mut targets = Vec::new();
    for name in &plan.columns {
        let Some(column) = table.column(name) else {
            continue;
        };
        match column.kind {
            ColumnKind::Text => grouping.push(column),
            ColumnKind::Integer | ColumnKind::Float => targets.push(column),
            ColumnKind::DateTime => {}
        }
    }
    if grouping.is_empty() {
        return Err(AnalystError::NoGroupingColumns);
    }
    if targets.is_empty() {
        targets.push(
            table
                .first_numeric_column()
                .ok_or(AnalystError::NoNumericColumns)?,
        );
    }

    let mut groups: BTreeMap<Vec<Value>, Vec<usize>> = BTreeMap::new();
    for row in 0..table.row_count() {
        let key = grouping
            .iter()
            .map(|column| column.cells[row].clone())
            .collect::<Option<Vec<_>>>();
        if let Some(key) = key {
            groups.entry(key).or_default().push(row);
        }
    }

    let total_groups = groups.len();
    let data = groups
        .into_iter()
        .take(config.group_preview_rows)
        .map(|(key, rows)| GroupRow {
            keys: grouping
                .iter()
                .map(|c| c.name.clone())
                .zip(key)
                .collect(),
            aggregates: targets
                .iter()
                .map(|column| {
                    let values = rows
                        .iter()
                        .filter_map(|&row| column.numeric_at(row))
                        .collect::<Vec<_>>();
                    let sum = values.iter().sum::<f64>();
                    GroupAggregate {
                        column: column.name.clone(),
                        sum,
                        mean: (!values.is_empty()).then(|| sum / values.len() as f64),
                        count: values.len(),
                    }
                })
                .collect(),
        })
        .collect();

    let grouping_columns = grouping.iter().map(|c| c.name.clone()).collect::<Vec<_>>();
    let aggregation_columns = targets.iter().map(|c| c.name.clone()).collect::<Vec<_>>();
    Ok(GroupByResult {
        summary: format!(
            "Grouped by {} with aggregations on {}",
            grouping_columns.join(", "),
            aggregation_columns.join(", ")
        ),
        grouping_columns,
        aggregation_columns,
        data,
        total_groups,
    })
}

fn run_top_n(table: &Table, plan: &QueryPlan, config: &AnalystConfig) -> AnalystResult<TopNResult> {
    let n = plan
        .literals
        .iter()
        .filter_map(|literal| literal.as_integer())
        .find(|value| *value >= 1 && *value as u64 <= config.top_n_max as u64)
        .map(|value| value as usize)
        .unwrap_or(config.top_n_default);

    let sort_column = match plan
        .columns
        .iter()
        .filter_map(|name| table.column(name))
        .find(|c| c.is_numeric())
    {
        Some(column) => column,
        None => table
            .first_numeric_column()
            .ok_or(AnalystError::NoNumericColumns)?,
    };

    let mut ranked = (0..table.row_count())
        .filter_map(|row| sort_column.numeric_at(row).map(|value| (row, value)))
        .collect::<Vec<_>>();
    // Stable: equal values keep their original row order.
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    let indices = ranked
        .into_iter()
        .take(n)
        .map(|(row, _)| row)
        .collect::<Vec<_>>();

    Ok(TopNResult {
        n,
        sort_column: sort_column.name.clone(),
        data: table.select_rows(&indices).records(None),
        summary: format!("Top {} records by {}", n, sort_column.name),
    })
}

fn run_general(table: &Table, plan: &QueryPlan, config: &AnalystConfig) -> GeneralResult {
    GeneralResult {
        message: format!("Processed query: {}", plan.query),
        data_preview: table.records(Some(config.general_preview_rows)),
        total_rows: table.row_count(),
        total_columns: table.column_count(),
        columns: table.column_names(),
    }
}

/// The response envelope: the tagged result, or `{"error": message}`.
pub fn respond(result: &AnalystResult<QueryResult>) -> serde_json::Value {
    match result {
        Ok(result) => serde_json::to_value(result)
            .unwrap_or_else(|err| json!({ "error": err.to_string() })),
        Err(err) => json!({ "error": err.to_string() }),
    }
}

/// A one-line plain-text answer for chat-style callers.
pub fn answer_text(result: &AnalystResult<QueryResult>, config: &AnalystConfig) -> String {
    match result {
        Err(err) => format!("Error: {err}"),
        Ok(QueryResult::Aggregation(agg)) => agg.formatted_results.clone(),
        Ok(QueryResult::Filter(filtered)) => format!(
            "Found {} rows matching your criteria. Showing first {} results.",
            filtered.filtered_rows, config.filter_preview_rows
        ),
        Ok(QueryResult::GroupBy(grouped)) => grouped.summary.clone(),
        Ok(QueryResult::TopN(top)) => top.summary.clone(),
        Ok(QueryResult::Comparison(pending) | QueryResult::Trend(pending)) => {
            pending.message.clone()
        }
        Ok(QueryResult::General(general)) => general.message.clone(),
    }
}
