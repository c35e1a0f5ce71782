use std::{fmt, str::FromStr};

use chrono::Local;
use log::info;
use serde::Serialize;

use crate::{
    error::{AnalystError, AnalystResult},
    filter::{self, FilterCondition},
    io_utils,
    table::Table,
    workspace::Workspace,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Html,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Html => "html",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = AnalystError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "html" | "htm" => Ok(ExportFormat::Html),
            _ => Err(AnalystError::unsupported("export format", value.trim())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportResult {
    pub format: ExportFormat,
    pub filename: String,
    pub content: String,
    pub rows_exported: usize,
    pub columns_exported: usize,
    pub filters_applied: bool,
}

pub fn render(table: &Table, format: ExportFormat) -> AnalystResult<String> {
    match format {
        ExportFormat::Csv => io_utils::table_to_csv(table, b','),
        ExportFormat::Json => Ok(serde_json::to_string_pretty(&table.records(None))?),
        ExportFormat::Html => Ok(render_html(table)),
    }
}

fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn render_html(table: &Table) -> String {
    let mut html = String::from("<table class=\"table table-striped\">\n  <thead>\n    <tr>");
    for name in table.column_names() {
        html.push_str(&format!("<th>{}</th>", escape_html(&name)));
    }
    html.push_str("</tr>\n  </thead>\n  <tbody>\n");
    for row in 0..table.row_count() {
        html.push_str("    <tr>");
        for cell in table.row(row) {
            let text = cell.map(|v| v.as_display()).unwrap_or_default();
            html.push_str(&format!("<td>{}</td>", escape_html(&text)));
        }
        html.push_str("</tr>\n");
    }
    html.push_str("  </tbody>\n</table>\n");
    html
}

/// Renders the (filtered) sheet. Without an explicit name the file is called
/// `export_<sheet>_<timestamp>`; the format's extension is always appended.
pub fn export_sheet(
    workspace: &Workspace,
    format: ExportFormat,
    sheet: Option<&str>,
    filters: &[FilterCondition],
    filename: Option<&str>,
) -> AnalystResult<ExportResult> {
    let sheet = workspace.resolve_sheet(sheet)?;
    let table = filter::apply_filters(&sheet.table, filters)?;
    let stem = match filename {
        Some(name) => name.to_string(),
        None => format!(
            "export_{}_{}",
            sheet.name,
            Local::now().format("%Y%m%d_%H%M%S")
        ),
    };
    let result = ExportResult {
        format,
        filename: format!("{stem}.{}", format.extension()),
        content: render(&table, format)?,
        rows_exported: table.row_count(),
        columns_exported: table.column_count(),
        filters_applied: !filters.is_empty(),
    };
    info!(
        "Exported {} row(s) of sheet '{}' as {}",
        result.rows_exported, sheet.name, format
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_formats_are_unsupported() {
        let err = "excel".parse::<ExportFormat>().unwrap_err();
        assert_eq!(err.to_string(), "Unsupported export format: excel");
        assert_eq!("HTML".parse::<ExportFormat>().unwrap(), ExportFormat::Html);
    }

    #[test]
    fn html_cells_are_escaped() {
        assert_eq!(escape_html("a<b & \"c\""), "a&lt;b &amp; &quot;c&quot;");
    }
}
