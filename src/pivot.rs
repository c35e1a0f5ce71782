use std::collections::BTreeMap;

use chrono::{Local, NaiveDateTime};
use log::info;
use serde::{Serialize, Serializer, ser::SerializeMap};
use uuid::Uuid;

use crate::{
    data::Value,
    error::{AnalystError, AnalystResult},
    executor::aggregate_column,
    filter::{self, FilterCondition},
    plan::AggregationKind,
    table::{Column, Table},
    workspace::Workspace,
};

const PIVOT_PREVIEW_ROWS: usize = 10;

/// One pivot row: the index key followed by one aggregate per value column.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotRow {
    pub keys: Vec<(String, Value)>,
    pub values: Vec<(String, Value)>,
}

impl PivotRow {
    pub fn value(&self, column: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn key(&self, column: &str) -> Option<&Value> {
        self.keys
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

impl Serialize for PivotRow {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.keys.len() + self.values.len()))?;
        for (name, value) in self.keys.iter().chain(&self.values) {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PivotSummary {
    pub index_columns: Vec<String>,
    pub value_columns: Vec<String>,
    pub aggregation: AggregationKind,
    pub total_rows: usize,
    pub total_columns: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PivotRecord {
    pub id: Uuid,
    pub sheet: String,
    pub filters: Vec<String>,
    pub summary: PivotSummary,
    pub rows: Vec<PivotRow>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct PivotResult {
    pub pivot_id: Uuid,
    pub summary: PivotSummary,
    pub data_preview: Vec<PivotRow>,
}

/// Groups `table` by the index columns and aggregates every value column.
/// Keys come out sorted; rows with a null key are dropped; groups with no
/// values to aggregate get 0.
pub fn pivot_table(
    table: &Table,
    index_columns: &[String],
    value_columns: &[String],
    aggregation: AggregationKind,
) -> AnalystResult<Vec<PivotRow>> {
    if index_columns.is_empty() {
        return Err(AnalystError::unsupported("pivot layout", "no index columns"));
    }
    if value_columns.is_empty() {
        return Err(AnalystError::unsupported("pivot layout", "no value columns"));
    }
    let index = index_columns
        .iter()
        .map(|name| table.require_column(name))
        .collect::<AnalystResult<Vec<_>>>()?;
    let values = value_columns
        .iter()
        .map(|name| table.require_column(name))
        .collect::<AnalystResult<Vec<_>>>()?;
    if aggregation != AggregationKind::Count {
        if let Some(bad) = values.iter().find(|c| !c.is_numeric()) {
            return Err(AnalystError::ColumnNotNumeric(bad.name.clone()));
        }
    }

    let mut groups: BTreeMap<Vec<Value>, Vec<usize>> = BTreeMap::new();
    for row in 0..table.row_count() {
        let key = index
            .iter()
            .map(|column| column.cells[row].clone())
            .collect::<Option<Vec<_>>>();
        if let Some(key) = key {
            groups.entry(key).or_default().push(row);
        }
    }

    let rows = groups
        .into_iter()
        .map(|(key, rows)| PivotRow {
            keys: index_columns.iter().cloned().zip(key).collect(),
            values: values
                .iter()
                .map(|column| {
                    let subset = Column::new(
                        column.name.clone(),
                        column.kind,
                        rows.iter().map(|&row| column.cells[row].clone()).collect(),
                    );
                    let value = aggregate_column(&subset, aggregation)
                        .flatten()
                        .unwrap_or(Value::Integer(0));
                    (column.name.clone(), value)
                })
                .collect(),
        })
        .collect();
    Ok(rows)
}

pub fn create_pivot(
    workspace: &mut Workspace,
    sheet: Option<&str>,
    index_columns: &[String],
    value_columns: &[String],
    aggregation: AggregationKind,
    filters: &[FilterCondition],
) -> AnalystResult<PivotResult> {
    let source = workspace.resolve_sheet(sheet)?;
    let sheet_name = source.name.clone();
    let filtered = filter::apply_filters(&source.table, filters)?;
    let rows = pivot_table(&filtered, index_columns, value_columns, aggregation)?;

    let summary = PivotSummary {
        index_columns: index_columns.to_vec(),
        value_columns: value_columns.to_vec(),
        aggregation,
        total_rows: rows.len(),
        total_columns: value_columns.len(),
    };
    let record = PivotRecord {
        id: Uuid::new_v4(),
        sheet: sheet_name,
        filters: filters
            .iter()
            .map(|f| format!("{} {} {}", f.column, f.operator.symbol(), f.raw_value))
            .collect(),
        summary: summary.clone(),
        created_at: Local::now().naive_local(),
        rows,
    };
    info!(
        "Created pivot {} on sheet '{}' with {} row(s)",
        record.id, record.sheet, summary.total_rows
    );

    let result = PivotResult {
        pivot_id: record.id,
        summary,
        data_preview: record.rows.iter().take(PIVOT_PREVIEW_ROWS).cloned().collect(),
    };
    workspace.pivots.insert(record.id, record);
    Ok(result)
}
