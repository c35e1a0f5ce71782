mod common;

use common::fixture_path;
use sheet_analyst::{
    chart::{
        ChartKind, ChartRenderer, ChartRequest, ChartSeries, ChartSpec, JsonChartRenderer,
        build_spec, create_chart,
    },
    data::Value,
    error::{AnalystError, AnalystResult},
    io_utils::LoadOptions,
    workspace::Workspace,
};

fn sales_workspace() -> Workspace {
    let mut workspace = Workspace::new();
    workspace
        .load_csv(&fixture_path("sales.csv"), &LoadOptions::default())
        .expect("load sales fixture");
    workspace
}

/// Renders the title only, to check the renderer seam.
struct TitleRenderer;

impl ChartRenderer for TitleRenderer {
    fn render(&self, spec: &ChartSpec) -> AnalystResult<Vec<u8>> {
        Ok(spec.title.clone().into_bytes())
    }

    fn media_type(&self) -> &'static str {
        "text/plain"
    }
}

#[test]
fn bar_chart_is_registered_with_a_summary() {
    let mut workspace = sales_workspace();
    let request = ChartRequest::new(ChartKind::Bar, "Region", "Revenue");
    let result = create_chart(&mut workspace, None, &request, &JsonChartRenderer).unwrap();

    assert_eq!(result.title, "Bar Chart: Revenue by Region");
    assert_eq!(result.media_type, "application/json");
    assert_eq!(result.data_summary.data_points, 6);
    assert_eq!(result.data_summary.y_range.min, Some(Value::Float(100.5)));
    assert_eq!(result.data_summary.y_range.max, Some(Value::Float(300.75)));

    let record = workspace.charts.get(&result.chart_id).unwrap();
    let rendered: serde_json::Value = serde_json::from_slice(&record.image).unwrap();
    assert_eq!(rendered["kind"], "bar");
    assert_eq!(rendered["series"]["points"].as_array().unwrap().len(), 6);
}

#[test]
fn custom_renderer_and_title() {
    let mut workspace = sales_workspace();
    let mut request = ChartRequest::new(ChartKind::Line, "Date", "Units");
    request.title = Some("Units over time".to_string());
    let result = create_chart(&mut workspace, Some("sales"), &request, &TitleRenderer).unwrap();
    let record = workspace.charts.get(&result.chart_id).unwrap();
    assert_eq!(record.image, b"Units over time");
    assert_eq!(record.media_type, "text/plain");
}

#[test]
fn pie_sums_numeric_values_per_label() {
    let workspace = sales_workspace();
    let table = &workspace.sheet("sales").unwrap().table;
    let spec = build_spec(table, &ChartRequest::new(ChartKind::Pie, "Region", "Units")).unwrap();
    let ChartSeries::Slices(slices) = spec.series else {
        panic!("expected slices");
    };
    let pairs = slices
        .iter()
        .map(|s| (s.label.as_str(), s.value))
        .collect::<Vec<_>>();
    assert_eq!(pairs, vec![("East", 13.0), ("North", 4.0), ("West", 7.0)]);
    assert_eq!(spec.title, "Pie Chart: Region Distribution");
}

#[test]
fn histogram_needs_a_numeric_column() {
    let workspace = sales_workspace();
    let table = &workspace.sheet("sales").unwrap().table;
    let spec =
        build_spec(table, &ChartRequest::new(ChartKind::Histogram, "Region", "Revenue")).unwrap();
    assert_eq!(spec.series.len(), 5);
    assert_eq!(spec.y_label.as_deref(), Some("Frequency"));

    let err = build_spec(table, &ChartRequest::new(ChartKind::Boxplot, "Units", "Region"))
        .unwrap_err();
    assert!(matches!(err, AnalystError::ColumnNotNumeric(ref c) if c == "Region"));
}

#[test]
fn missing_columns_fail() {
    let mut workspace = sales_workspace();
    let request = ChartRequest::new(ChartKind::Scatter, "Ghost", "Revenue");
    let err = create_chart(&mut workspace, None, &request, &JsonChartRenderer).unwrap_err();
    assert!(matches!(err, AnalystError::ColumnNotFound(_)));
    assert!(workspace.charts.is_empty());
}
