use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::AnalystResult;

/// Tunables for query execution and reporting. Defaults reproduce the
/// behaviour clients already depend on; a YAML file may override any subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalystConfig {
    pub filter_preview_rows: usize,
    pub group_preview_rows: usize,
    pub general_preview_rows: usize,
    pub top_n_default: usize,
    pub top_n_max: usize,
    pub correlation_threshold: f64,
    pub trend_min_rows: usize,
    pub max_recommendations: usize,
    pub common_values: usize,
    pub numeric_hint_ratio: f64,
    pub outlier_iqr_multiplier: f64,
    /// Rows inspected for type inference on load (0 means all rows).
    pub sample_rows: usize,
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            filter_preview_rows: 20,
            group_preview_rows: 20,
            general_preview_rows: 10,
            top_n_default: 5,
            top_n_max: 100,
            correlation_threshold: 0.7,
            trend_min_rows: 10,
            max_recommendations: 10,
            common_values: 5,
            numeric_hint_ratio: 0.8,
            outlier_iqr_multiplier: 1.5,
            sample_rows: 0,
        }
    }
}

impl AnalystConfig {
    pub fn load(path: &Path) -> AnalystResult<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> AnalystResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn load_or_default(path: Option<&Path>) -> AnalystResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
