// Category cleanup applied before any aggregation: spelling variants of
// "Deactivate account" fold together and cancelled tickets drop out.
use crate::types::{Status, TicketRecord, TicketSet};

pub const DEACTIVATE_ACCOUNT: &str = "Deactivate account";

const DEACTIVATE_VARIANTS: &[&str] = &["deactivate account", "deactivates account"];

/// Trim a category and fold the "Deactivate account" spelling variants.
pub fn normalize_category(raw: Option<&str>) -> Option<String> {
    let s = raw?.trim();
    if s.is_empty() {
        return None;
    }
    let lower = s.to_lowercase();
    if DEACTIVATE_VARIANTS.iter().any(|v| lower.contains(v)) {
        return Some(DEACTIVATE_ACCOUNT.to_string());
    }
    Some(s.to_string())
}

/// Status-level and category-level cancellation are both honoured.
pub fn is_cancelled(record: &TicketRecord) -> bool {
    record.status == Status::Cancel
        || record
            .category
            .as_deref()
            .map(|c| c.trim().eq_ignore_ascii_case("cancel"))
            .unwrap_or(false)
}

/// Clean categories and drop cancelled tickets. Idempotent.
pub fn normalize_categories(set: &TicketSet) -> TicketSet {
    let records = set
        .iter()
        .filter(|r| !is_cancelled(r))
        .map(|r| TicketRecord {
            category: normalize_category(r.category.as_deref()),
            ..r.clone()
        })
        .collect();
    TicketSet::from_records(records)
}
