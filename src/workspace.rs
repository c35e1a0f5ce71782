//! The analysis context: every loaded sheet plus the charts and pivot tables
//! derived from them. Operations receive it explicitly; there is no global
//! store. Mutating operations take `&mut Workspace`, so read-modify-write
//! sequences are exclusive.

use std::{collections::HashMap, path::Path};

use chrono::{Local, NaiveDateTime};
use log::info;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    chart::ChartRecord,
    error::{AnalystError, AnalystResult},
    io_utils::{self, LoadOptions},
    pivot::PivotRecord,
    table::Table,
};

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub table: Table,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub filename: String,
    pub sheet: String,
    pub rows: usize,
    pub columns: usize,
    pub loaded_at: NaiveDateTime,
}

#[derive(Debug)]
pub struct Workspace {
    session_id: Uuid,
    sheets: Vec<Sheet>,
    pub charts: HashMap<Uuid, ChartRecord>,
    pub pivots: HashMap<Uuid, PivotRecord>,
    pub file_history: Vec<FileInfo>,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            sheets: Vec::new(),
            charts: HashMap::new(),
            pivots: HashMap::new(),
            file_history: Vec::new(),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Adds a sheet, or replaces an existing sheet of the same name in place.
    pub fn insert_sheet(&mut self, name: impl Into<String>, table: Table) {
        let name = name.into();
        if let Some(existing) = self.sheets.iter_mut().find(|s| s.name == name) {
            existing.table = table;
        } else {
            self.sheets.push(Sheet { name, table });
        }
    }

    /// Loads a delimited file as a sheet named after the file stem.
    pub fn load_csv(&mut self, path: &Path, options: &LoadOptions) -> AnalystResult<&Sheet> {
        let table = io_utils::load_table(path, options)?;
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty() && *stem != "-")
            .unwrap_or("stdin")
            .to_string();
        info!(
            "Loaded sheet '{}' with {} row(s) and {} column(s) from {:?}",
            name,
            table.row_count(),
            table.column_count(),
            path
        );
        self.file_history.push(FileInfo {
            filename: path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| "-".to_string()),
            sheet: name.clone(),
            rows: table.row_count(),
            columns: table.column_count(),
            loaded_at: Local::now().naive_local(),
        });
        self.insert_sheet(name.clone(), table);
        self.sheet(&name)
    }

    pub fn sheet(&self, name: &str) -> AnalystResult<&Sheet> {
        if self.sheets.is_empty() {
            return Err(AnalystError::NoSheetLoaded);
        }
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| AnalystError::SheetNotFound(name.to_string()))
    }

    /// The named sheet, or the first loaded sheet when no name is given.
    pub fn resolve_sheet(&self, name: Option<&str>) -> AnalystResult<&Sheet> {
        match name {
            Some(name) => self.sheet(name),
            None => self.sheets.first().ok_or(AnalystError::NoSheetLoaded),
        }
    }

    pub fn resolve_sheet_mut(&mut self, name: Option<&str>) -> AnalystResult<&mut Sheet> {
        if self.sheets.is_empty() {
            return Err(AnalystError::NoSheetLoaded);
        }
        match name {
            Some(name) => self
                .sheets
                .iter_mut()
                .find(|s| s.name == name)
                .ok_or_else(|| AnalystError::SheetNotFound(name.to_string())),
            None => self.sheets.first_mut().ok_or(AnalystError::NoSheetLoaded),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::Value, schema::ColumnKind};

    fn table(value: i64) -> Table {
        Table::from_rows(&[("n", ColumnKind::Integer)], vec![vec![Some(Value::Integer(value))]])
            .unwrap()
    }

    #[test]
    fn resolve_sheet_errors() {
        let mut workspace = Workspace::new();
        assert!(matches!(
            workspace.resolve_sheet(None),
            Err(AnalystError::NoSheetLoaded)
        ));
        workspace.insert_sheet("a", table(1));
        assert!(matches!(
            workspace.resolve_sheet(Some("b")),
            Err(AnalystError::SheetNotFound(name)) if name == "b"
        ));
    }

    #[test]
    fn insert_sheet_replaces_in_place_and_keeps_order() {
        let mut workspace = Workspace::new();
        workspace.insert_sheet("a", table(1));
        workspace.insert_sheet("b", table(2));
        workspace.insert_sheet("a", table(3));
        assert_eq!(workspace.sheet_names(), vec!["a", "b"]);
        let first = workspace.resolve_sheet(None).unwrap();
        assert_eq!(first.table.row(0), vec![Some(Value::Integer(3))]);
    }
}
