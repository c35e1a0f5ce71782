mod common;

use common::{fixture_path, text, workspace_with};
use sheet_analyst::{
    error::AnalystError,
    export::{ExportFormat, export_sheet},
    filter::parse_filters,
    io_utils::LoadOptions,
    schema::ColumnKind,
    table::Table,
    workspace::Workspace,
};

fn sales_workspace() -> Workspace {
    let mut workspace = Workspace::new();
    workspace
        .load_csv(&fixture_path("sales.csv"), &LoadOptions::default())
        .expect("load sales fixture");
    workspace
}

#[test]
fn filtered_csv_export() {
    let filters = parse_filters(&["Region = East".to_string()]).unwrap();
    let result = export_sheet(
        &sales_workspace(),
        ExportFormat::Csv,
        None,
        &filters,
        Some("east"),
    )
    .unwrap();

    assert_eq!(result.filename, "east.csv");
    assert_eq!(result.rows_exported, 3);
    assert_eq!(result.columns_exported, 5);
    assert!(result.filters_applied);
    let lines = result.content.lines().collect::<Vec<_>>();
    assert_eq!(
        lines,
        vec![
            "Region,Product,Revenue,Units,Date",
            "East,Widget,100.5,3,2024-01-15",
            "East,Gizmo,300.75,7,2024-04-05",
            "East,Widget,100.5,3,2024-01-15",
        ]
    );
}

#[test]
fn json_export_keeps_nulls() {
    let result =
        export_sheet(&sales_workspace(), ExportFormat::Json, None, &[], None).unwrap();
    assert!(result.filename.starts_with("export_sales_"));
    assert!(result.filename.ends_with(".json"));
    assert!(!result.filters_applied);

    let records: serde_json::Value = serde_json::from_str(&result.content).unwrap();
    let records = records.as_array().unwrap();
    assert_eq!(records.len(), 6);
    assert_eq!(records[4]["Region"], "North");
    assert!(records[4]["Revenue"].is_null());
    assert_eq!(records[0]["Units"], 3);
}

#[test]
fn html_export_escapes_cells() {
    let table = Table::from_rows(
        &[("Note", ColumnKind::Text)],
        vec![vec![text("<b>bold</b> & co")], vec![None]],
    )
    .unwrap();
    let workspace = workspace_with("notes", table);
    let result =
        export_sheet(&workspace, ExportFormat::Html, None, &[], Some("notes")).unwrap();
    assert_eq!(result.filename, "notes.html");
    assert!(result.content.starts_with("<table class=\"table table-striped\">"));
    assert!(result.content.contains("<th>Note</th>"));
    assert!(
        result
            .content
            .contains("<td>&lt;b&gt;bold&lt;/b&gt; &amp; co</td>")
    );
    assert!(result.content.contains("<tr><td></td></tr>"));
}

#[test]
fn unknown_filter_column_fails() {
    let filters = parse_filters(&["Ghost > 1".to_string()]).unwrap();
    let err = export_sheet(&sales_workspace(), ExportFormat::Csv, None, &filters, None)
        .unwrap_err();
    assert!(matches!(err, AnalystError::ColumnNotFound(ref c) if c == "Ghost"));
}

#[test]
fn binary_formats_are_rejected() {
    for name in ["excel", "pdf"] {
        let err = name.parse::<ExportFormat>().unwrap_err();
        assert_eq!(err.to_string(), format!("Unsupported export format: {name}"));
    }
}
