//! Elastic plain-text tables for terminal previews.

use std::fmt::Write as _;

use crate::{data::Value, table::RecordSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

/// Renders typed records as aligned columns. Columns holding only numbers
/// are right-aligned and null cells print as blanks.
pub fn render_records(records: &RecordSet) -> String {
    let aligns = column_alignments(records);
    let body = records
        .rows
        .iter()
        .map(|row| row.iter().map(|cell| cell_text(cell.as_ref())).collect())
        .collect::<Vec<Vec<String>>>();

    let mut widths = records
        .columns
        .iter()
        .map(|name| display_width(name).max(1))
        .collect::<Vec<_>>();
    for row in &body {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(display_width(cell));
        }
    }

    let headers = records
        .columns
        .iter()
        .map(|name| flatten_whitespace(name))
        .collect::<Vec<_>>();
    let rule = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(&headers, &widths, &aligns));
    let _ = writeln!(output, "{}", format_row(&rule, &widths, &aligns));
    for row in &body {
        let _ = writeln!(output, "{}", format_row(row, &widths, &aligns));
    }
    output
}

fn column_alignments(records: &RecordSet) -> Vec<Align> {
    (0..records.columns.len())
        .map(|idx| {
            let mut present = records
                .rows
                .iter()
                .filter_map(|row| row.get(idx).and_then(Option::as_ref))
                .peekable();
            let has_values = present.peek().is_some();
            if has_values && present.all(|value| value.kind().is_numeric()) {
                Align::Right
            } else {
                Align::Left
            }
        })
        .collect()
}

fn cell_text(cell: Option<&Value>) -> String {
    match cell {
        None => String::new(),
        Some(Value::Text(text)) => flatten_whitespace(text),
        Some(value) => value.as_display(),
    }
}

/// Line breaks and tabs would break the grid; they print as spaces.
fn flatten_whitespace(value: &str) -> String {
    value
        .chars()
        .map(|ch| if matches!(ch, '\n' | '\r' | '\t') { ' ' } else { ch })
        .collect()
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn format_row(cells: &[String], widths: &[usize], aligns: &[Align]) -> String {
    let line = cells
        .iter()
        .zip(widths)
        .zip(aligns)
        .map(|((cell, width), align)| {
            let padding = " ".repeat(width.saturating_sub(display_width(cell)));
            match align {
                Align::Left => format!("{cell}{padding}"),
                Align::Right => format!("{padding}{cell}"),
            }
        })
        .collect::<Vec<_>>()
        .join("  ");
    line.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(columns: &[&str], rows: Vec<Vec<Option<Value>>>) -> RecordSet {
        RecordSet {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    #[test]
    fn numbers_align_right_and_nulls_are_blank() {
        let rendered = render_records(&records(
            &["region", "revenue"],
            vec![
                vec![Some(Value::Text("East".into())), Some(Value::Float(100.0))],
                vec![Some(Value::Text("West".into())), None],
                vec![Some(Value::Text("North".into())), Some(Value::Integer(12345678))],
            ],
        ));
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "region   revenue");
        assert_eq!(lines[1], "------  --------");
        assert_eq!(lines[2], "East         100");
        assert_eq!(lines[3], "West");
        assert_eq!(lines[4], "North   12345678");
    }

    #[test]
    fn mixed_and_empty_columns_align_left() {
        let rendered = render_records(&records(
            &["code", "note"],
            vec![
                vec![Some(Value::Integer(7)), None],
                vec![Some(Value::Text("a\tb".into())), None],
            ],
        ));
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "code  note");
        assert_eq!(lines[2], "7");
        assert_eq!(lines[3], "a b");
    }
}
