// Year-to-date ticket counts per category, one bucket per month.
use crate::category::DEACTIVATE_ACCOUNT;
use crate::error::{ReportError, Result};
use crate::pivot::UNSPECIFIED;
use crate::types::TicketSet;
use chrono::Datelike;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Display order expected by the chart renderer. Categories outside this
/// list follow in first-seen order.
pub const PREFERRED_CATEGORY_ORDER: [&str; 7] = [
    "Miscellaneous",
    "Development",
    "Transfer to another group",
    "Permissions control",
    "Create account",
    "Reset password",
    DEACTIVATE_ACCOUNT,
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualSummary {
    pub year: i32,
    pub months: Vec<u32>,
    pub categories: Vec<String>,
    pub data: CategorySeries,
}

/// Per-category month counts, index 0 = January. Serializes as a map in
/// display order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorySeries(pub Vec<(String, Vec<usize>)>);

impl CategorySeries {
    pub fn get(&self, category: &str) -> Option<&[usize]> {
        self.0
            .iter()
            .find(|(c, _)| c == category)
            .map(|(_, v)| v.as_slice())
    }
}

impl Serialize for CategorySeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (category, counts) in &self.0 {
            map.serialize_entry(category, counts)?;
        }
        map.end()
    }
}

impl AnnualSummary {
    pub fn total(&self) -> usize {
        self.data.0.iter().flat_map(|(_, v)| v.iter()).sum()
    }
}

/// Month-by-category counts for `year`, optionally stopping at `cap_month`.
///
/// Expects a set already passed through `category::normalize_categories`.
/// Every month in range is present even when it has no tickets.
pub fn annual_series(set: &TicketSet, year: i32, cap_month: Option<u32>) -> Result<AnnualSummary> {
    let last_month = match cap_month {
        Some(m) if (1..=12).contains(&m) => m,
        Some(m) => return Err(ReportError::InvalidMonth(m)),
        None => 12,
    };
    let width = last_month as usize;

    let mut encountered: Vec<(String, Vec<usize>)> = Vec::new();
    for r in set.iter() {
        let Some(created) = r.date_created else { continue };
        if created.year() != year || created.month() > last_month {
            continue;
        }
        let category = r
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(UNSPECIFIED);
        let idx = match encountered.iter().position(|(c, _)| c == category) {
            Some(i) => i,
            None => {
                encountered.push((category.to_string(), vec![0; width]));
                encountered.len() - 1
            }
        };
        encountered[idx].1[created.month0() as usize] += 1;
    }

    let mut ordered: Vec<(String, Vec<usize>)> = Vec::with_capacity(encountered.len());
    for preferred in PREFERRED_CATEGORY_ORDER {
        if let Some(i) = encountered.iter().position(|(c, _)| c == preferred) {
            ordered.push(encountered.remove(i));
        }
    }
    ordered.extend(encountered);

    Ok(AnnualSummary {
        year,
        months: (1..=last_month).collect(),
        categories: ordered.iter().map(|(c, _)| c.clone()).collect(),
        data: CategorySeries(ordered),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::normalize_categories;
    use crate::types::{Status, TicketRecord};
    use chrono::NaiveDate;

    fn rec(day: &str, category: &str, status: Status) -> TicketRecord {
        let mut r = TicketRecord::empty(status);
        r.date_created = NaiveDate::parse_from_str(day, "%Y-%m-%d")
            .unwrap()
            .and_hms_opt(8, 30, 0);
        r.category = Some(category.to_string());
        r
    }

    #[test]
    fn preferred_categories_first_then_encounter_order() {
        let set = TicketSet::from_records(vec![
            rec("2026-01-03", "Zeta tasks", Status::Open),
            rec("2026-01-04", "Reset password", Status::Close),
            rec("2026-02-04", "Alpha tasks", Status::Close),
            rec("2026-02-05", "Miscellaneous", Status::Open),
        ]);
        let s = annual_series(&set, 2026, None).unwrap();
        assert_eq!(
            s.categories,
            vec!["Miscellaneous", "Reset password", "Zeta tasks", "Alpha tasks"]
        );
        assert_eq!(s.months, (1..=12).collect::<Vec<u32>>());
        assert_eq!(s.data.get("Zeta tasks").unwrap()[0], 1);
        assert_eq!(s.data.get("Miscellaneous").unwrap()[1], 1);
        assert_eq!(s.data.get("Alpha tasks").unwrap().len(), 12);
    }

    #[test]
    fn cap_month_trims_series_and_filters_future() {
        let set = TicketSet::from_records(vec![
            rec("2026-01-03", "Development", Status::Open),
            rec("2026-03-03", "Development", Status::Open),
            rec("2026-05-03", "Development", Status::Open),
            rec("2025-02-03", "Development", Status::Open),
        ]);
        let s = annual_series(&set, 2026, Some(3)).unwrap();
        assert_eq!(s.months, vec![1, 2, 3]);
        assert_eq!(s.data.get("Development").unwrap(), &[1, 0, 1]);
        assert_eq!(s.total(), 2);
    }

    #[test]
    fn empty_year_still_lists_months() {
        let s = annual_series(&TicketSet::default(), 2026, Some(2)).unwrap();
        assert_eq!(s.months, vec![1, 2]);
        assert!(s.categories.is_empty());
    }

    #[test]
    fn cancelled_excluded_after_normalizing() {
        let raw = TicketSet::from_records(vec![
            rec("2026-01-03", "Create account", Status::Cancel),
            rec("2026-01-04", "Cancel", Status::Open),
            rec("2026-01-05", "Create account", Status::Open),
            rec("2026-01-06", "deactivates account", Status::Close),
        ]);
        let s = annual_series(&normalize_categories(&raw), 2026, Some(1)).unwrap();
        assert_eq!(s.total(), 2);
        assert_eq!(s.categories, vec!["Create account", DEACTIVATE_ACCOUNT]);
    }

    #[test]
    fn data_serializes_in_display_order() {
        let set = TicketSet::from_records(vec![
            rec("2026-01-03", "Zeta tasks", Status::Open),
            rec("2026-01-04", "Development", Status::Close),
        ]);
        let s = annual_series(&set, 2026, Some(1)).unwrap();
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(
            json,
            r#"{"year":2026,"months":[1],"categories":["Development","Zeta tasks"],"data":{"Development":[1],"Zeta tasks":[1]}}"#
        );
    }

    #[test]
    fn bad_cap_month_rejected() {
        assert!(annual_series(&TicketSet::default(), 2026, Some(0)).is_err());
    }
}
