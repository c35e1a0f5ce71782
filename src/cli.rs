use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Ask questions of spreadsheets in plain English",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Answer a natural-language question about a sheet
    Query(QueryArgs),
    /// Profile every loaded sheet and print recommendations
    Analyze(AnalyzeArgs),
    /// Run cleaning operations on a sheet
    Clean(CleanArgs),
    /// Build a pivot table
    Pivot(PivotArgs),
    /// Check columns against rules from a YAML file
    Validate(ValidateArgs),
    /// Export a sheet as CSV, JSON or HTML
    Export(ExportArgs),
    /// Prepare a chart from two columns
    Chart(ChartArgs),
    /// Preview the first rows of a sheet in a formatted table
    Preview(PreviewArgs),
    /// Suggest a spreadsheet formula for a request
    Formula(FormulaArgs),
}

/// Input options shared by every data command.
#[derive(Debug, Args)]
pub struct InputArgs {
    /// Input file; repeat to load several sheets ('-' reads stdin)
    #[arg(short = 'i', long = "input", required = true, action = clap::ArgAction::Append)]
    pub inputs: Vec<PathBuf>,
    /// Sheet to operate on (defaults to the first input)
    #[arg(long)]
    pub sheet: Option<String>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Number of rows to sample when inferring types (0 means full scan)
    #[arg(long)]
    pub sample_rows: Option<usize>,
    /// YAML file overriding analysis settings
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// The question, e.g. "total revenue in q1"
    #[arg(short = 'q', long = "query")]
    pub query: String,
    /// Print a one-line answer instead of JSON
    #[arg(long)]
    pub text: bool,
    /// Print result rows as a table instead of JSON
    #[arg(long)]
    pub table: bool,
}

#[derive(Debug, Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub input: InputArgs,
}

#[derive(Debug, Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Operations to apply in order (remove_duplicates, fill_missing_values,
    /// convert_data_types, normalize_text, remove_outliers, standardize_format)
    #[arg(
        long = "op",
        required = true,
        value_delimiter = ',',
        action = clap::ArgAction::Append
    )]
    pub operations: Vec<String>,
    /// Write the cleaned sheet as CSV to this path
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PivotArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Columns forming the pivot rows
    #[arg(long = "index", required = true, value_delimiter = ',')]
    pub index: Vec<String>,
    /// Columns to aggregate
    #[arg(long = "values", required = true, value_delimiter = ',')]
    pub values: Vec<String>,
    /// Aggregation: sum, mean, count, max or min
    #[arg(long = "agg", default_value = "sum")]
    pub aggregation: String,
    /// Row filters such as `Revenue>=100` or `Region = East`
    #[arg(long = "filter", action = clap::ArgAction::Append)]
    pub filters: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// YAML file mapping column names to rules
    #[arg(long)]
    pub rules: PathBuf,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Output format: csv, json or html
    #[arg(long)]
    pub format: String,
    /// Row filters such as `Revenue>=100` or `Region = East`
    #[arg(long = "filter", action = clap::ArgAction::Append)]
    pub filters: Vec<String>,
    /// File name stem (extension is added)
    #[arg(long)]
    pub filename: Option<String>,
    /// Write the exported content to this path instead of printing a JSON envelope
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ChartArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// bar, line, pie, scatter, area, histogram or boxplot
    #[arg(long)]
    pub kind: String,
    #[arg(short = 'x', long = "x-column")]
    pub x_column: String,
    #[arg(short = 'y', long = "y-column")]
    pub y_column: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long)]
    pub grid: bool,
    /// X tick label rotation in degrees
    #[arg(long, allow_hyphen_values = true)]
    pub rotation: Option<i32>,
    /// Write the rendered chart to this path
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub input: InputArgs,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct FormulaArgs {
    /// What the formula should do, e.g. "sum sales if region is east"
    #[arg(short = 'r', long = "request")]
    pub request: String,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delimiter_accepts_names_and_characters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter(";"), Ok(b';'));
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("").is_err());
    }

    #[test]
    fn repeated_inputs_and_comma_separated_ops() {
        let cli = Cli::try_parse_from([
            "sheet-analyst",
            "clean",
            "-i",
            "a.csv",
            "-i",
            "b.csv",
            "--op",
            "remove_duplicates,normalize_text",
            "--op",
            "fill_missing_values",
        ])
        .unwrap();
        let Commands::Clean(args) = cli.command else {
            panic!("expected clean command");
        };
        assert_eq!(args.input.inputs.len(), 2);
        assert_eq!(
            args.operations,
            vec!["remove_duplicates", "normalize_text", "fill_missing_values"]
        );
    }
}
