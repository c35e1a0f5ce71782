//! Typed in-memory table.
//!
//! A [`Table`] is an ordered list of named [`Column`]s of equal length. Every
//! mutation goes through methods that keep the row-count invariant intact.

use std::collections::HashSet;

use serde::{
    Serialize, Serializer,
    ser::{SerializeMap, SerializeSeq},
};

use crate::{
    data::Value,
    error::{AnalystError, AnalystResult},
    schema::ColumnKind,
};

pub type Row = Vec<Option<Value>>;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub cells: Vec<Option<Value>>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind, cells: Vec<Option<Value>>) -> Self {
        Self {
            name: name.into(),
            kind,
            cells,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_numeric(&self) -> bool {
        self.kind.is_numeric()
    }

    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_none()).count()
    }

    /// Non-null numeric values in row order.
    pub fn numeric_values(&self) -> Vec<f64> {
        self.cells
            .iter()
            .filter_map(|cell| cell.as_ref().and_then(Value::as_f64))
            .collect()
    }

    pub fn numeric_at(&self, row: usize) -> Option<f64> {
        self.cells
            .get(row)
            .and_then(|cell| cell.as_ref())
            .and_then(Value::as_f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_columns(columns: Vec<Column>) -> AnalystResult<Self> {
        let row_count = columns.first().map(Column::len).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.len() != row_count) {
            return Err(AnalystError::RowWidth {
                expected: row_count,
                found: bad.len(),
            });
        }
        Ok(Self { columns, row_count })
    }

    /// Builds a table from row-major data. Every row must match the header width.
    pub fn from_rows(headers: &[(&str, ColumnKind)], rows: Vec<Row>) -> AnalystResult<Self> {
        let mut columns = headers
            .iter()
            .map(|(name, kind)| Column::new(*name, *kind, Vec::with_capacity(rows.len())))
            .collect::<Vec<_>>();
        for row in rows {
            if row.len() != columns.len() {
                return Err(AnalystError::RowWidth {
                    expected: columns.len(),
                    found: row.len(),
                });
            }
            for (column, cell) in columns.iter_mut().zip(row) {
                column.cells.push(cell);
            }
        }
        Self::from_columns(columns)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn cell_count(&self) -> usize {
        self.row_count * self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn require_column(&self, name: &str) -> AnalystResult<&Column> {
        self.column(name)
            .ok_or_else(|| AnalystError::ColumnNotFound(name.to_string()))
    }

    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_numeric())
    }

    pub fn first_numeric_column(&self) -> Option<&Column> {
        self.numeric_columns().next()
    }

    pub fn first_datetime_column(&self) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.kind == ColumnKind::DateTime)
    }

    pub fn row(&self, idx: usize) -> Row {
        self.columns
            .iter()
            .map(|c| c.cells.get(idx).cloned().flatten())
            .collect()
    }

    pub fn missing_count(&self) -> usize {
        self.columns.iter().map(Column::missing_count).sum()
    }

    /// New table holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| {
                Column::new(
                    c.name.clone(),
                    c.kind,
                    indices.iter().map(|&i| c.cells[i].clone()).collect(),
                )
            })
            .collect();
        Table {
            columns,
            row_count: indices.len(),
        }
    }

    /// Keeps rows whose flag is `true`.
    pub fn retain_rows(&mut self, keep: &[bool]) {
        for column in &mut self.columns {
            let mut flags = keep.iter();
            column
                .cells
                .retain(|_| flags.next().copied().unwrap_or(false));
        }
        self.row_count = keep.iter().take(self.row_count).filter(|k| **k).count();
    }

    /// Swaps in a replacement column of the same length.
    pub fn replace_column(&mut self, idx: usize, column: Column) -> AnalystResult<()> {
        if column.len() != self.row_count {
            return Err(AnalystError::RowWidth {
                expected: self.row_count,
                found: column.len(),
            });
        }
        if let Some(slot) = self.columns.get_mut(idx) {
            *slot = column;
            Ok(())
        } else {
            Err(AnalystError::ColumnNotFound(column.name))
        }
    }

    /// Flags every row that repeats an earlier row exactly (first occurrence kept).
    pub fn duplicate_row_flags(&self) -> Vec<bool> {
        let mut seen = HashSet::with_capacity(self.row_count);
        (0..self.row_count)
            .map(|idx| !seen.insert(self.row(idx)))
            .collect()
    }

    pub fn duplicate_row_count(&self) -> usize {
        self.duplicate_row_flags().iter().filter(|d| **d).count()
    }

    pub fn records(&self, limit: Option<usize>) -> RecordSet {
        let take = limit.unwrap_or(self.row_count).min(self.row_count);
        RecordSet {
            columns: self.column_names(),
            rows: (0..take).map(|idx| self.row(idx)).collect(),
        }
    }
}

/// Row-oriented view of (part of) a table; serializes as an array of records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RecordSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.get(idx)?.as_ref()
    }
}

struct Record<'a> {
    columns: &'a [String],
    row: &'a Row,
}

impl Serialize for Record<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (name, cell) in self.columns.iter().zip(self.row) {
            map.serialize_entry(name, cell)?;
        }
        map.end()
    }
}

impl Serialize for RecordSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.rows.len()))?;
        for row in &self.rows {
            seq.serialize_element(&Record {
                columns: &self.columns,
                row,
            })?;
        }
        seq.end()
    }
}
