// Hand-entered monthly data kept next to the ticket workbook: SLA breaches
// and development effort hours. Stored as `{"monthly_data": {"YYYY-MM": ..}}`.
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

pub const SLA_FILE: &str = "sla_breach_data.json";
pub const DEV_EFFORTS_FILE: &str = "dev_efforts_data.json";

pub fn month_key(year: i32, month: u32) -> String {
    format!("{}-{:02}", year, month)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyStore<T> {
    #[serde(default = "BTreeMap::new")]
    pub monthly_data: BTreeMap<String, T>,
}

impl<T> Default for MonthlyStore<T> {
    fn default() -> Self {
        MonthlyStore { monthly_data: BTreeMap::new() }
    }
}

impl<T: Serialize + DeserializeOwned> MonthlyStore<T> {
    /// Missing or unreadable files load as an empty store.
    pub fn load(path: &Path) -> Self {
        let Ok(text) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&text) {
            Ok(store) => store,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring unreadable monthly store");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn get(&self, year: i32, month: u32) -> Option<&T> {
        self.monthly_data.get(&month_key(year, month))
    }

    pub fn insert(&mut self, year: i32, month: u32, value: T) -> Option<T> {
        self.monthly_data.insert(month_key(year, month), value)
    }

    /// Entries of one year keyed by month number.
    pub fn for_year(&self, year: i32) -> BTreeMap<u32, &T> {
        (1..=12)
            .filter_map(|m| self.get(year, m).map(|v| (m, v)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaBreach {
    #[serde(default)]
    pub id: Option<u32>,
    pub ticket_no: String,
    #[serde(default)]
    pub requested_for: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub percentage: String,
    #[serde(default)]
    pub elapsed_time: String,
    #[serde(default)]
    pub remarks: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlaMonth {
    #[serde(default)]
    pub breaches: Vec<SlaBreach>,
}

fn default_sow_planned() -> f64 {
    16.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DevEffort {
    pub me_hours: f64,
    #[serde(default = "default_sow_planned")]
    pub sow_planned: f64,
    #[serde(default)]
    pub carry_forward: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_key_zero_pads() {
        assert_eq!(month_key(2026, 3), "2026-03");
        assert_eq!(month_key(2025, 12), "2025-12");
    }

    #[test]
    fn missing_file_is_empty_store() {
        let store: MonthlyStore<SlaMonth> = MonthlyStore::load(Path::new("/nonexistent/sla.json"));
        assert!(store.monthly_data.is_empty());
    }

    #[test]
    fn save_then_load_keeps_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(DEV_EFFORTS_FILE);
        let mut store: MonthlyStore<DevEffort> = MonthlyStore::default();
        store.insert(2026, 1, DevEffort { me_hours: 12.5, sow_planned: 16.0, carry_forward: 3.5 });
        store.insert(2026, 4, DevEffort { me_hours: 20.0, sow_planned: 16.0, carry_forward: -4.0 });
        store.insert(2025, 12, DevEffort { me_hours: 1.0, sow_planned: 16.0, carry_forward: 15.0 });
        store.save(&path).unwrap();

        let loaded: MonthlyStore<DevEffort> = MonthlyStore::load(&path);
        let year = loaded.for_year(2026);
        assert_eq!(year.keys().copied().collect::<Vec<_>>(), vec![1, 4]);
        assert_eq!(year[&1].me_hours, 12.5);
    }

    #[test]
    fn sla_payload_tolerates_missing_fields() {
        let json = r#"{"monthly_data":{"2026-01":{"breaches":[{"ticket_no":"INC1","percentage":"120"}]}}}"#;
        let store: MonthlyStore<SlaMonth> = serde_json::from_str(json).unwrap();
        let month = store.get(2026, 1).unwrap();
        assert_eq!(month.breaches[0].ticket_no, "INC1");
        assert_eq!(month.breaches[0].remarks, "");
        let effort: DevEffort = serde_json::from_str(r#"{"me_hours": 8}"#).unwrap();
        assert_eq!(effort.sow_planned, 16.0);
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SLA_FILE);
        std::fs::write(&path, "{not json").unwrap();
        let store: MonthlyStore<SlaMonth> = MonthlyStore::load(&path);
        assert!(store.monthly_data.is_empty());
    }
}
