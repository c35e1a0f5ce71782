mod common;

use std::fs;

use assert_cmd::Command;
use common::{TestWorkspace, fixture_path};
use predicates::{prelude::*, str::contains};

fn analyst() -> Command {
    Command::cargo_bin("sheet-analyst").expect("binary exists")
}

fn sales() -> String {
    fixture_path("sales.csv").to_string_lossy().into_owned()
}

#[test]
fn query_prints_tagged_json() {
    analyst()
        .args(["query", "-i", &sales(), "-q", "total revenue"])
        .assert()
        .success()
        .stdout(contains("\"type\": \"aggregation\""))
        .stdout(contains("\"Revenue\": 852.0"))
        .stdout(contains("\"operation\": \"sum\""));
}

#[test]
fn query_text_answer() {
    analyst()
        .args(["query", "-i", &sales(), "-q", "revenue > 150", "--text"])
        .assert()
        .success()
        .stdout(contains(
            "Found 2 rows matching your criteria. Showing first 20 results.",
        ));
}

#[test]
fn query_table_output() {
    analyst()
        .args(["query", "-i", &sales(), "-q", "top 2 units", "--table"])
        .assert()
        .success()
        .stdout(contains("Gizmo"))
        .stdout(contains("Gadget"))
        .stdout(contains("Region"));
}

#[test]
fn query_against_unknown_sheet_reports_error_envelope() {
    analyst()
        .args(["query", "-i", &sales(), "--sheet", "nope", "-q", "total revenue"])
        .assert()
        .failure()
        .stdout(contains("\"error\": \"Sheet \\\"nope\\\" not found\""))
        .stderr(contains("error: Sheet \"nope\" not found"));
}

#[test]
fn missing_input_file_fails_with_context() {
    analyst()
        .args(["analyze", "-i", "does/not/exist.csv"])
        .assert()
        .failure()
        .stderr(contains("error: Loading"));
}

#[test]
fn analyze_prints_workspace_summary() {
    analyst()
        .args(["analyze", "-i", &sales()])
        .assert()
        .success()
        .stdout(contains("\"total_sheets\": 1"))
        .stdout(contains("Consider handling missing values in columns: Revenue"));
}

#[test]
fn clean_writes_cleaned_csv() {
    let scratch = TestWorkspace::new();
    let output = scratch.path().join("clean.csv");
    analyst()
        .args([
            "clean",
            "-i",
            &sales(),
            "--op",
            "remove_duplicates,fill_missing_values",
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("\"duplicates_removed\": 1"))
        .stdout(contains("\"missing_values_filled\": 1"));

    let written = fs::read_to_string(&output).unwrap();
    let lines = written.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "Region,Product,Revenue,Units,Date");
    assert_eq!(lines[5], "North,Gadget,187.875,4,2024-07-11");
}

#[test]
fn clean_rejects_unknown_operation() {
    analyst()
        .args(["clean", "-i", &sales(), "--op", "explode"])
        .assert()
        .failure()
        .stderr(contains("Unsupported cleaning operation: explode"));
}

#[test]
fn pivot_with_filter() {
    analyst()
        .args([
            "pivot",
            "-i",
            &sales(),
            "--index",
            "Region",
            "--values",
            "Units",
            "--agg",
            "max",
            "--filter",
            "Product != Gizmo",
        ])
        .assert()
        .success()
        .stdout(contains("\"total_rows\": 3"))
        .stdout(contains("\"aggregation\": \"max\""));
}

#[test]
fn validate_reports_failures() {
    let scratch = TestWorkspace::new();
    let rules = scratch.write("rules.yaml", "Revenue:\n  required: true\n");
    analyst()
        .args([
            "validate",
            "-i",
            &sales(),
            "--rules",
            rules.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("\"passed\": false"))
        .stdout(contains("1 null values found"));
}

#[test]
fn export_html_to_file() {
    let scratch = TestWorkspace::new();
    let output = scratch.path().join("sales.html");
    analyst()
        .args([
            "export",
            "-i",
            &sales(),
            "--format",
            "html",
            "--filter",
            "Region = West",
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();
    let html = fs::read_to_string(&output).unwrap();
    assert!(html.contains("<td>West</td>"));
    assert!(!html.contains("<td>East</td>"));
}

#[test]
fn export_rejects_excel() {
    analyst()
        .args(["export", "-i", &sales(), "--format", "excel"])
        .assert()
        .failure()
        .stderr(contains("Unsupported export format: excel"));
}

#[test]
fn chart_writes_rendered_spec() {
    let scratch = TestWorkspace::new();
    let output = scratch.path().join("chart.json");
    analyst()
        .args([
            "chart",
            "-i",
            &sales(),
            "--kind",
            "pie",
            "-x",
            "Product",
            "-y",
            "Units",
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("\"chart_type\": \"pie\""));
    let rendered: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(rendered["series"]["slices"].as_array().unwrap().len(), 3);
}

#[test]
fn preview_limits_rows() {
    analyst()
        .args(["preview", "-i", &sales(), "--rows", "2"])
        .assert()
        .success()
        .stdout(contains("Widget"))
        .stdout(contains("Gadget"))
        .stdout(contains("Gizmo").not());
}

#[test]
fn semicolon_delimited_input() {
    let scratch = TestWorkspace::new();
    let path = scratch.write("orders.csv", "Item;Qty\nPen;4\nInk;6\n");
    analyst()
        .args([
            "query",
            "-i",
            path.to_str().unwrap(),
            "--delimiter",
            ";",
            "-q",
            "sum qty",
            "--text",
        ])
        .assert()
        .success()
        .stdout(contains("Sum of Qty: 10.00"));
}

#[test]
fn formula_suggestion() {
    analyst()
        .args(["formula", "-r", "sum sales if region is east"])
        .assert()
        .success()
        .stdout(contains("=SUMIF(range, criteria, sum_range)"))
        .stdout(contains("\"category\": \"sum\""));
}
