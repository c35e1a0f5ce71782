mod common;

use common::{fixture_path, float, int, text, workspace_with};
use sheet_analyst::{
    clean::{
        CleaningOperation, clean_sheet, clean_table, parse_operations, standardize_currency,
        title_case,
    },
    config::AnalystConfig,
    data::Value,
    error::AnalystError,
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
fn remove_duplicates_drops_the_repeated_row() {
    let mut workspace = sales_workspace();
    let outcome = clean_sheet(
        &mut workspace,
        None,
        &[CleaningOperation::RemoveDuplicates],
        &AnalystConfig::default(),
    )
    .unwrap();

    let report = &outcome.cleaning_report;
    assert_eq!(report.changes_made.duplicates_removed, Some(1));
    assert_eq!(report.changes_made.missing_values_filled, None);
    assert_eq!(report.original_shape.rows, 6);
    assert_eq!(report.final_shape.rows, 5);
    assert_eq!(outcome.summary, "Cleaned data: remove_duplicates");
    assert_eq!(workspace.sheet("sales").unwrap().table.row_count(), 5);
}

#[test]
fn unknown_operation_is_rejected_before_anything_runs() {
    let err = parse_operations(&["remove_duplicates", "explode"]).unwrap_err();
    assert!(matches!(err, AnalystError::Unsupported { .. }));
    assert_eq!(err.to_string(), "Unsupported cleaning operation: explode");
    assert_eq!(
        parse_operations(&["Fill-Missing-Values"]).unwrap(),
        vec![CleaningOperation::FillMissingValues]
    );
}

#[test]
fn fill_missing_uses_mean_and_mode() {
    let mut workspace = sales_workspace();
    let outcome = clean_sheet(
        &mut workspace,
        Some("sales"),
        &[CleaningOperation::FillMissingValues],
        &AnalystConfig::default(),
    )
    .unwrap();
    assert_eq!(outcome.cleaning_report.changes_made.missing_values_filled, Some(1));

    let table = &workspace.sheet("sales").unwrap().table;
    let revenue = table.column("Revenue").unwrap();
    let filled = revenue.numeric_at(4).unwrap();
    assert!((filled - 170.4).abs() < 1e-9);
    assert_eq!(table.missing_count(), 0);
}

#[test]
fn fractional_mean_promotes_integer_column() {
    let mut table = Table::from_rows(
        &[("Units", ColumnKind::Integer), ("Label", ColumnKind::Text)],
        vec![
            vec![int(1), text("a")],
            vec![None, None],
            vec![int(2), text("a")],
            vec![int(3), text("b")],
        ],
    )
    .unwrap();
    let mut empty_text = Table::from_rows(&[("Note", ColumnKind::Text)], vec![vec![None]]).unwrap();
    let config = AnalystConfig::default();

    let report = clean_table(&mut table, &[CleaningOperation::FillMissingValues], &config).unwrap();
    assert_eq!(report.changes_made.missing_values_filled, Some(2));
    let units = table.column("Units").unwrap();
    assert_eq!(units.kind, ColumnKind::Integer);
    assert_eq!(units.cells[1], int(2));
    assert_eq!(table.column("Label").unwrap().cells[1], text("a"));

    let mut fractional =
        Table::from_rows(&[("Units", ColumnKind::Integer)], vec![vec![int(1)], vec![None], vec![int(2)]])
            .unwrap();
    clean_table(&mut fractional, &[CleaningOperation::FillMissingValues], &config).unwrap();
    let units = fractional.column("Units").unwrap();
    assert_eq!(units.kind, ColumnKind::Float);
    assert_eq!(units.cells, vec![float(1.0), float(1.5), float(2.0)]);

    clean_table(&mut empty_text, &[CleaningOperation::FillMissingValues], &config).unwrap();
    assert_eq!(empty_text.column("Note").unwrap().cells[0], text("Unknown"));
}

#[test]
fn convert_data_types_reinfers_text_columns() {
    let mut table = Table::from_rows(
        &[("Code", ColumnKind::Text), ("Price", ColumnKind::Float)],
        vec![vec![text("1"), float(1.0)], vec![text("2"), float(2.0)]],
    )
    .unwrap();
    let report = clean_table(
        &mut table,
        &[CleaningOperation::ConvertDataTypes],
        &AnalystConfig::default(),
    )
    .unwrap();
    assert_eq!(report.changes_made.data_types_converted, Some(1));
    assert_eq!(table.column("Code").unwrap().kind, ColumnKind::Integer);
    assert_eq!(table.column("Code").unwrap().cells[1], int(2));
    assert_eq!(table.column("Price").unwrap().kind, ColumnKind::Float);
}

#[test]
fn normalize_text_trims_and_title_cases() {
    let mut workspace = workspace_with(
        "people",
        Table::from_rows(
            &[("Name", ColumnKind::Text), ("Age", ColumnKind::Integer)],
            vec![vec![text("  ada LOVELACE "), int(36)], vec![None, int(41)]],
        )
        .unwrap(),
    );
    let outcome = clean_sheet(
        &mut workspace,
        None,
        &[CleaningOperation::NormalizeText],
        &AnalystConfig::default(),
    )
    .unwrap();
    assert_eq!(outcome.cleaning_report.changes_made.text_normalized, Some(1));
    let table = &workspace.sheet("people").unwrap().table;
    assert_eq!(table.column("Name").unwrap().cells, vec![text("Ada Lovelace"), None]);
    assert_eq!(title_case("o'neil"), "O'Neil");
}

#[test]
fn standardize_format_rewrites_dates_and_currency() {
    let mut workspace = sales_workspace();
    let outcome = clean_sheet(
        &mut workspace,
        None,
        &[CleaningOperation::StandardizeFormat],
        &AnalystConfig::default(),
    )
    .unwrap();
    assert_eq!(outcome.cleaning_report.changes_made.format_standardized, Some(6));
    let date = workspace.sheet("sales").unwrap().table.column("Date").unwrap();
    assert_eq!(date.kind, ColumnKind::Text);
    assert_eq!(date.cells[0], Some(Value::Text("2024-01-15".into())));

    assert_eq!(standardize_currency("paid $1234.5 today"), "paid $1,234.50 today");
    assert_eq!(standardize_currency("no money"), "no money");
}

#[test]
fn operations_run_in_the_requested_order() {
    let mut workspace = sales_workspace();
    let operations = parse_operations(&["remove_duplicates", "fill_missing_values"]).unwrap();
    let outcome =
        clean_sheet(&mut workspace, None, &operations, &AnalystConfig::default()).unwrap();
    let changes = &outcome.cleaning_report.changes_made;
    assert_eq!(changes.duplicates_removed, Some(1));
    assert_eq!(changes.missing_values_filled, Some(1));
    assert_eq!(
        outcome.summary,
        "Cleaned data: remove_duplicates, fill_missing_values"
    );
    assert_eq!(outcome.data_preview.len(), 5);
}

#[test]
fn cleaning_an_unknown_sheet_fails() {
    let mut workspace = sales_workspace();
    let err = clean_sheet(
        &mut workspace,
        Some("missing"),
        &[CleaningOperation::RemoveDuplicates],
        &AnalystConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, AnalystError::SheetNotFound(_)));
    assert_eq!(workspace.sheet("sales").unwrap().table.row_count(), 6);
}

#[test]
fn remove_outliers_compounds_across_numeric_columns() {
    let rows = (0..10)
        .map(|row| {
            let a = if row == 0 { 1000 } else { 10 + row };
            let b = if row == 9 { 5000 } else { 20 + row };
            vec![int(a), int(b)]
        })
        .collect::<Vec<_>>();
    let mut table =
        Table::from_rows(&[("a", ColumnKind::Integer), ("b", ColumnKind::Integer)], rows).unwrap();

    let report = clean_table(
        &mut table,
        &[CleaningOperation::RemoveOutliers],
        &AnalystConfig::default(),
    )
    .unwrap();

    assert_eq!(report.changes_made.outliers_removed, Some(2));
    assert_eq!(report.final_shape.rows, 8);
    assert_eq!(
        table.column("a").unwrap().cells,
        (11..=18).map(int).collect::<Vec<_>>()
    );
    assert_eq!(
        table.column("b").unwrap().cells,
        (21..=28).map(int).collect::<Vec<_>>()
    );
}
