#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use sheet_analyst::{data::Value, schema::ColumnKind, table::Table, workspace::Workspace};
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }
}

pub fn text(value: &str) -> Option<Value> {
    Some(Value::Text(value.to_string()))
}

pub fn float(value: f64) -> Option<Value> {
    Some(Value::Float(value))
}

pub fn int(value: i64) -> Option<Value> {
    Some(Value::Integer(value))
}

/// Region/Revenue table: East 100, West 200, East 300.
pub fn region_revenue() -> Table {
    Table::from_rows(
        &[("Region", ColumnKind::Text), ("Revenue", ColumnKind::Float)],
        vec![
            vec![text("East"), float(100.0)],
            vec![text("West"), float(200.0)],
            vec![text("East"), float(300.0)],
        ],
    )
    .expect("region/revenue table")
}

pub fn workspace_with(name: &str, table: Table) -> Workspace {
    let mut workspace = Workspace::new();
    workspace.insert_sheet(name, table);
    workspace
}
