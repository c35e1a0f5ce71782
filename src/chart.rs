//! Chart preparation.
//!
//! This module validates a chart request, extracts the data series, and hands
//! the finished [`ChartSpec`] to a [`ChartRenderer`]. Drawing pixels is the
//! renderer's job. The bundled [`JsonChartRenderer`] emits the spec as JSON
//! for a front end to draw.

use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{Local, NaiveDateTime};
use itertools::Itertools;
use log::info;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    data::Value,
    error::{AnalystError, AnalystResult},
    frequency::FrequencyAccumulator,
    table::{Column, Table},
    workspace::Workspace,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Scatter,
    Area,
    Histogram,
    Boxplot,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Scatter => "scatter",
            ChartKind::Area => "area",
            ChartKind::Histogram => "histogram",
            ChartKind::Boxplot => "boxplot",
        }
    }

    pub fn default_title(&self, x: &str, y: &str) -> String {
        match self {
            ChartKind::Bar => format!("Bar Chart: {y} by {x}"),
            ChartKind::Line => format!("Line Chart: {y} over {x}"),
            ChartKind::Pie => format!("Pie Chart: {x} Distribution"),
            ChartKind::Scatter => format!("Scatter Plot: {y} vs {x}"),
            ChartKind::Area => format!("Area Chart: {y} over {x}"),
            ChartKind::Histogram => format!("Histogram: {y} Distribution"),
            ChartKind::Boxplot => format!("Box Plot: {y} Distribution"),
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartKind {
    type Err = AnalystError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bar" => Ok(ChartKind::Bar),
            "line" => Ok(ChartKind::Line),
            "pie" => Ok(ChartKind::Pie),
            "scatter" => Ok(ChartKind::Scatter),
            "area" => Ok(ChartKind::Area),
            "histogram" => Ok(ChartKind::Histogram),
            "boxplot" => Ok(ChartKind::Boxplot),
            _ => Err(AnalystError::unsupported("chart type", value.trim())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub grid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub kind: ChartKind,
    pub x_column: String,
    pub y_column: String,
    pub title: Option<String>,
    pub options: ChartOptions,
}

impl ChartRequest {
    pub fn new(kind: ChartKind, x_column: impl Into<String>, y_column: impl Into<String>) -> Self {
        Self {
            kind,
            x_column: x_column.into(),
            y_column: y_column.into(),
            title: None,
            options: ChartOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub x: Option<Value>,
    pub y: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartSeries {
    /// Row-aligned x/y pairs (bar, line, scatter, area).
    Points(Vec<ChartPoint>),
    Slices(Vec<PieSlice>),
    /// Non-null y values (histogram, boxplot).
    Distribution(Vec<f64>),
}

impl ChartSeries {
    pub fn len(&self) -> usize {
        match self {
            ChartSeries::Points(points) => points.len(),
            ChartSeries::Slices(slices) => slices.len(),
            ChartSeries::Distribution(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub title: String,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
    pub series: ChartSeries,
    pub options: ChartOptions,
}

/// Turns a chart spec into an encoded image or document.
pub trait ChartRenderer: Send + Sync {
    fn render(&self, spec: &ChartSpec) -> AnalystResult<Vec<u8>>;
    fn media_type(&self) -> &'static str;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonChartRenderer;

impl ChartRenderer for JsonChartRenderer {
    fn render(&self, spec: &ChartSpec) -> AnalystResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(spec)?)
    }

    fn media_type(&self) -> &'static str {
        "application/json"
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartRecord {
    pub id: Uuid,
    pub sheet: String,
    pub spec: ChartSpec,
    pub media_type: &'static str,
    #[serde(skip)]
    pub image: Vec<u8>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: Option<Value>,
    pub max: Option<Value>,
}

impl ValueRange {
    fn of(column: &Column) -> Self {
        match column.cells.iter().flatten().minmax().into_option() {
            Some((min, max)) => Self {
                min: Some(min.clone()),
                max: Some(max.clone()),
            },
            None => Self {
                min: None,
                max: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataSummary {
    pub x_column: String,
    pub y_column: String,
    pub data_points: usize,
    pub x_range: ValueRange,
    pub y_range: ValueRange,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartResult {
    pub chart_id: Uuid,
    pub chart_type: ChartKind,
    pub title: String,
    pub media_type: &'static str,
    pub data_summary: DataSummary,
}

fn pie_slices(x: &Column, y: &Column) -> Vec<PieSlice> {
    if y.is_numeric() {
        let mut totals: BTreeMap<&Value, f64> = BTreeMap::new();
        for (label, value) in x.cells.iter().zip(&y.cells) {
            let Some(label) = label else {
                continue;
            };
            let amount = value.as_ref().and_then(Value::as_f64).unwrap_or(0.0);
            *totals.entry(label).or_insert(0.0) += amount;
        }
        totals
            .into_iter()
            .map(|(label, value)| PieSlice {
                label: label.as_display(),
                value,
            })
            .collect()
    } else {
        FrequencyAccumulator::from_column(x)
            .most_common(0)
            .into_iter()
            .map(|item| PieSlice {
                label: item.value,
                value: item.count as f64,
            })
            .collect()
    }
}

/// Validates the request against `table` and extracts the series.
pub fn build_spec(table: &Table, request: &ChartRequest) -> AnalystResult<ChartSpec> {
    let x = table.require_column(&request.x_column)?;
    let y = table.require_column(&request.y_column)?;
    let (x_name, y_name) = (request.x_column.as_str(), request.y_column.as_str());

    let (series, x_label, y_label) = match request.kind {
        ChartKind::Bar | ChartKind::Line | ChartKind::Scatter | ChartKind::Area => {
            let points = x
                .cells
                .iter()
                .zip(&y.cells)
                .map(|(x, y)| ChartPoint {
                    x: x.clone(),
                    y: y.clone(),
                })
                .collect();
            (
                ChartSeries::Points(points),
                Some(x_name.to_string()),
                Some(y_name.to_string()),
            )
        }
        ChartKind::Pie => (ChartSeries::Slices(pie_slices(x, y)), None, None),
        ChartKind::Histogram | ChartKind::Boxplot => {
            if !y.is_numeric() {
                return Err(AnalystError::ColumnNotNumeric(y.name.clone()));
            }
            let series = ChartSeries::Distribution(y.numeric_values());
            if request.kind == ChartKind::Histogram {
                (series, Some(y_name.to_string()), Some("Frequency".to_string()))
            } else {
                (series, None, Some(y_name.to_string()))
            }
        }
    };

    Ok(ChartSpec {
        kind: request.kind,
        title: request
            .title
            .clone()
            .unwrap_or_else(|| request.kind.default_title(x_name, y_name)),
        x_label,
        y_label,
        series,
        options: request.options.clone(),
    })
}

pub fn create_chart(
    workspace: &mut Workspace,
    sheet: Option<&str>,
    request: &ChartRequest,
    renderer: &dyn ChartRenderer,
) -> AnalystResult<ChartResult> {
    let source = workspace.resolve_sheet(sheet)?;
    let spec = build_spec(&source.table, request)?;
    let image = renderer.render(&spec)?;
    let data_summary = DataSummary {
        x_column: request.x_column.clone(),
        y_column: request.y_column.clone(),
        data_points: source.table.row_count(),
        x_range: ValueRange::of(source.table.require_column(&request.x_column)?),
        y_range: ValueRange::of(source.table.require_column(&request.y_column)?),
    };

    let record = ChartRecord {
        id: Uuid::new_v4(),
        sheet: source.name.clone(),
        media_type: renderer.media_type(),
        image,
        created_at: Local::now().naive_local(),
        spec,
    };
    info!(
        "Created {} chart {} on sheet '{}' ({} byte(s))",
        request.kind,
        record.id,
        record.sheet,
        record.image.len()
    );

    let result = ChartResult {
        chart_id: record.id,
        chart_type: request.kind,
        title: record.spec.title.clone(),
        media_type: record.media_type,
        data_summary,
    };
    workspace.charts.insert(record.id, record);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnKind;

    #[test]
    fn kind_parsing_is_case_insensitive() {
        assert_eq!("BoxPlot".parse::<ChartKind>().unwrap(), ChartKind::Boxplot);
        let err = "radar".parse::<ChartKind>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported chart type: radar");
    }

    #[test]
    fn pie_over_text_counts_labels() {
        let text = |s: &str| Some(Value::Text(s.to_string()));
        let x = Column::new("k", ColumnKind::Text, vec![text("b"), text("a"), text("b")]);
        let slices = pie_slices(&x, &x);
        assert_eq!(slices[0].label, "b");
        assert_eq!(slices[0].value, 2.0);
        assert_eq!(slices[1].label, "a");
    }
}
