//! I/O utilities: delimiter and encoding resolution, CSV ingestion into a
//! typed [`Table`], and CSV serialization.
//!
//! - **Delimiter resolution**: `.tsv` → tab, anything else → comma, with
//!   manual override support.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//! - **stdin**: the `-` path convention reads from standard input.

use std::{
    collections::HashSet,
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};
use log::{debug, warn};

use crate::{
    data::{Value, parse_cell},
    error::{AnalystError, AnalystResult},
    schema::{ColumnKind, infer_kind, is_placeholder_token},
    table::{Column, Table},
};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    pub delimiter: Option<u8>,
    pub encoding: &'static Encoding,
    /// Rows inspected for type inference (0 means all rows).
    pub sample_rows: usize,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: None,
            encoding: UTF_8,
            sample_rows: 0,
        }
    }
}

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> AnalystResult<&'static Encoding> {
    if let Some(value) = label {
        Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| AnalystError::unsupported("encoding", value))
    } else {
        Ok(UTF_8)
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") => DEFAULT_TSV_DELIMITER,
        _ => DEFAULT_CSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(true)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(true);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(
    path: &Path,
    delimiter: u8,
) -> AnalystResult<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(std::io::stdin().lock())
    } else {
        Box::new(BufReader::new(File::open(path)?))
    };
    Ok(open_csv_reader(reader, delimiter))
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> AnalystResult<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(AnalystError::Decode(encoding.name()))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(
    record: &csv::ByteRecord,
    encoding: &'static Encoding,
) -> AnalystResult<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

/// Header names with blanks replaced by `Column_<n>` (1-based). Repeated
/// names get a `.1`, `.2`, ... suffix so every column stays addressable.
pub fn clean_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(raw.len());
    let mut headers = Vec::with_capacity(raw.len());
    for (idx, header) in raw.into_iter().enumerate() {
        let trimmed = header.trim();
        let base = if trimmed.is_empty() {
            format!("Column_{}", idx + 1)
        } else {
            trimmed.to_string()
        };
        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{base}.{suffix}");
            suffix += 1;
        }
        if name != base {
            debug!("Duplicate header '{base}' renamed to '{name}'");
        }
        seen.insert(name.clone());
        headers.push(name);
    }
    headers
}

/// Parses raw cells as `kind`, returning the cells and how many non-empty,
/// non-placeholder values did not fit and were nulled.
fn parse_column(raw: &[String], kind: ColumnKind) -> (Vec<Option<Value>>, usize) {
    let mut coerced = 0usize;
    let cells = raw
        .iter()
        .map(|value| {
            if is_placeholder_token(value) {
                return None;
            }
            let parsed = parse_cell(value, kind);
            if parsed.is_none() && !value.trim().is_empty() {
                coerced += 1;
            }
            parsed
        })
        .collect();
    (cells, coerced)
}

pub fn load_table(path: &Path, options: &LoadOptions) -> AnalystResult<Table> {
    let delimiter = resolve_input_delimiter(path, options.delimiter);
    let reader = open_csv_reader_from_path(path, delimiter)?;
    read_table(reader, options.encoding, options.sample_rows)
}

/// Reads delimited text into a typed table, skipping rows with no content.
pub fn read_table<R: Read>(
    mut reader: csv::Reader<R>,
    encoding: &'static Encoding,
    sample_rows: usize,
) -> AnalystResult<Table> {
    let headers = clean_headers(decode_record(reader.byte_headers()?, encoding)?);
    let mut raw_columns: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    for record in reader.byte_records() {
        let decoded = decode_record(&record?, encoding)?;
        if decoded.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        for (idx, column) in raw_columns.iter_mut().enumerate() {
            column.push(decoded.get(idx).cloned().unwrap_or_default());
        }
    }

    let columns = headers
        .into_iter()
        .zip(raw_columns)
        .map(|(name, raw)| {
            let kind = infer_kind(raw.iter().map(String::as_str), sample_rows);
            debug!("Column '{name}' inferred as {kind}");
            let (cells, coerced) = parse_column(&raw, kind);
            if coerced > 0 {
                warn!(
                    "Column '{name}': {coerced} value(s) outside the inferred {kind} kind were read as null"
                );
            }
            Column::new(name, kind, cells)
        })
        .collect();
    Table::from_columns(columns)
}

pub fn read_table_from_str(
    contents: &str,
    delimiter: u8,
    sample_rows: usize,
) -> AnalystResult<Table> {
    let reader = open_csv_reader(contents.as_bytes(), delimiter);
    read_table(reader, UTF_8, sample_rows)
}

/// Serializes a table as delimited text with a header row. Nulls become empty fields.
pub fn table_to_csv(table: &Table, delimiter: u8) -> AnalystResult<String> {
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    let mut writer = builder.from_writer(Vec::new());
    writer.write_record(table.column_names())?;
    for idx in 0..table.row_count() {
        let row = table
            .row(idx)
            .into_iter()
            .map(|cell| cell.map(|v| v.as_display()).unwrap_or_default())
            .collect::<Vec<_>>();
        writer.write_record(&row)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| AnalystError::Io(err.into_error()))?;
    String::from_utf8(bytes).map_err(|_| AnalystError::Decode("utf-8"))
}
