// Report settings, loaded from TOML with a default for every field.
use crate::error::{ReportError, Result};
use crate::sections::PartitionRules;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Runtime settings. Every field has a default so an empty TOML file is valid.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    /// Sheet names (calendar years) holding ticket rows.
    pub ticket_sheets: Vec<String>,
    pub new_users_sheet: String,
    pub partition_rules: PartitionRules,
    /// Directory holding `sla_breach_data.json` and `dev_efforts_data.json`.
    pub data_dir: PathBuf,
    pub header_scan_rows: usize,
    pub preview_rows: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        ReportConfig {
            ticket_sheets: vec!["2024".into(), "2025".into(), "2026".into()],
            new_users_sheet: "New Users".into(),
            partition_rules: PartitionRules::default(),
            data_dir: PathBuf::from("data"),
            header_scan_rows: 10,
            preview_rows: 5,
        }
    }
}

impl ReportConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ReportError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_toml_str(&s)
    }

    /// Year sheets plus an optional caller-supplied sheet, without duplicates.
    pub fn sheet_allow_list(&self, explicit: Option<&str>) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let explicit = explicit.map(str::trim).filter(|s| !s.is_empty());
        for name in explicit.into_iter().chain(self.ticket_sheets.iter().map(|s| s.trim())) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }
}
