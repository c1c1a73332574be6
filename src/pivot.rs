// Monthly (type, category) × status-bucket counts.
use crate::error::{ReportError, Result};
use crate::types::{PivotRow, Status, TicketRecord, TicketSet};
use chrono::Datelike;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;

/// Label used when a ticket has no type or no category.
pub const UNSPECIFIED: &str = "Unspecified";

const KEY_SEPARATOR: char = '|';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    TransNon,
    TransWork,
    Open,
    Close,
}

/// PENDING counts as OPEN. CANCEL/OTHER land in no bucket.
pub fn bucket_for(status: Status) -> Option<Bucket> {
    match status {
        Status::TransNon => Some(Bucket::TransNon),
        Status::TransWork => Some(Bucket::TransWork),
        Status::Open | Status::Pending => Some(Bucket::Open),
        Status::Close => Some(Bucket::Close),
        Status::Cancel | Status::Other => None,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct BucketCounts {
    #[serde(rename = "TRANS_NON")]
    pub trans_non: usize,
    #[serde(rename = "TRANS_WORK")]
    pub trans_work: usize,
    #[serde(rename = "OPEN")]
    pub open: usize,
    #[serde(rename = "CLOSE")]
    pub close: usize,
}

impl BucketCounts {
    fn add(&mut self, bucket: Bucket) {
        match bucket {
            Bucket::TransNon => self.trans_non += 1,
            Bucket::TransWork => self.trans_work += 1,
            Bucket::Open => self.open += 1,
            Bucket::Close => self.close += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.trans_non + self.trans_work + self.open + self.close
    }
}

/// Pivot result for one month, ordered by (type, category).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PivotTable {
    pub year: i32,
    pub month: u32,
    groups: BTreeMap<(String, String), BucketCounts>,
    /// Tickets in the month, including those whose status fits no bucket.
    pub total_tickets: usize,
}

impl PivotTable {
    pub fn get(&self, kind: &str, category: &str) -> Option<&BucketCounts> {
        self.groups.get(&(kind.to_string(), category.to_string()))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(String, String), &BucketCounts)> {
        self.groups.iter()
    }

    pub fn closed_tickets(&self) -> usize {
        self.groups.values().map(|c| c.close).sum()
    }

    pub fn to_rows(&self) -> Vec<PivotRow> {
        self.groups
            .iter()
            .map(|((kind, category), c)| PivotRow {
                kind: kind.clone(),
                category: category.clone(),
                trans_non: c.trans_non,
                trans_work: c.trans_work,
                open: c.open,
                close: c.close,
            })
            .collect()
    }
}

pub fn pivot_key(kind: &str, category: &str) -> String {
    format!("{} {} {}", kind, KEY_SEPARATOR, category)
}

/// Inverse of `pivot_key`: split on the first `|` and trim both halves.
pub fn parse_pivot_key(key: &str) -> (String, String) {
    match key.split_once(KEY_SEPARATOR) {
        Some((k, c)) => (k.trim().to_string(), c.trim().to_string()),
        None => (key.trim().to_string(), String::new()),
    }
}

impl Serialize for PivotTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for ((kind, category), counts) in &self.groups {
            map.serialize_entry(&pivot_key(kind, category), counts)?;
        }
        map.end()
    }
}

/// Labels must not contain the key separator or the key stops round-tripping.
fn label(raw: Option<&str>) -> String {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.replace(KEY_SEPARATOR, "/"),
        None => UNSPECIFIED.to_string(),
    }
}

fn in_month(r: &TicketRecord, year: i32, month: u32) -> bool {
    r.date_created
        .map(|d| d.year() == year && d.month() == month)
        .unwrap_or(false)
}

/// Count tickets created in `year`-`month` by (type, category) and bucket.
///
/// Expects a set already passed through `category::normalize_categories`.
/// Every group present in the month gets a row, with zero for absent buckets.
pub fn aggregate_month(set: &TicketSet, year: i32, month: u32) -> Result<PivotTable> {
    if !(1..=12).contains(&month) {
        return Err(ReportError::InvalidMonth(month));
    }
    let mut table = PivotTable {
        year,
        month,
        ..PivotTable::default()
    };
    for r in set.iter().filter(|r| in_month(r, year, month)) {
        table.total_tickets += 1;
        let counts = table
            .groups
            .entry((label(r.kind.as_deref()), label(r.category.as_deref())))
            .or_default();
        if let Some(bucket) = bucket_for(r.status) {
            counts.add(bucket);
        }
    }
    if table.total_tickets == 0 {
        return Err(ReportError::NoDataForMonth { year, month });
    }
    Ok(table)
}
