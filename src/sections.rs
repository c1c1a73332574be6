// Splits a ticket set into the weekly report's active and backlog sections.
use crate::error::{ReportError, Result};
use crate::types::{Status, SummaryCounts, TicketRecord, TicketSet};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Which revision of the section rules to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartitionRules {
    /// Active: every OPEN ticket regardless of date. Backlog: every OPEN
    /// ticket plus CLOSE tickets whose close time falls in the range.
    /// `open_count` is unconditional, `closed_count` is close-time bound.
    #[default]
    OpenWithClosedInRange,
    /// Earlier revision: both sections and both counts only consider
    /// tickets created inside the range.
    CreatedInRange,
}

impl FromStr for PartitionRules {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "open-with-closed-in-range" => Ok(PartitionRules::OpenWithClosedInRange),
            "created-in-range" => Ok(PartitionRules::CreatedInRange),
            other => Err(ReportError::Config(format!("unknown partition rules '{}'", other))),
        }
    }
}

impl fmt::Display for PartitionRules {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionRules::OpenWithClosedInRange => write!(f, "open-with-closed-in-range"),
            PartitionRules::CreatedInRange => write!(f, "created-in-range"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub active: Vec<TicketRecord>,
    pub backlog: Vec<TicketRecord>,
    pub summary: SummaryCounts,
}

fn in_range(d: Option<NaiveDate>, begin: NaiveDate, end: NaiveDate) -> bool {
    d.map(|d| d >= begin && d <= end).unwrap_or(false)
}

/// Ascending order with missing values last.
fn cmp_none_last<T: Ord>(a: &Option<T>, b: &Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn by_arrival(a: &TicketRecord, b: &TicketRecord) -> Ordering {
    cmp_none_last(&a.time_arrive, &b.time_arrive).then_with(|| cmp_none_last(&a.ticket_no, &b.ticket_no))
}

fn status_rank(s: Status) -> u8 {
    // OPEN sorts ahead of CLOSE (status descending).
    match s {
        Status::Open => 0,
        _ => 1,
    }
}

pub fn sort_active(rows: &mut [TicketRecord]) {
    rows.sort_by(by_arrival);
}

pub fn sort_backlog(rows: &mut [TicketRecord]) {
    rows.sort_by(|a, b| status_rank(a.status).cmp(&status_rank(b.status)).then_with(|| by_arrival(a, b)));
}

/// Partition `set` for the inclusive range `[begin, end]`.
///
/// Fails with `NoActiveTickets` / `NoBacklogTickets` when a section ends up
/// empty.
pub fn partition(set: &TicketSet, begin: NaiveDate, end: NaiveDate, rules: PartitionRules) -> Result<Partition> {
    let (mut active, mut backlog, summary) = match rules {
        PartitionRules::OpenWithClosedInRange => {
            let open: Vec<TicketRecord> = set.iter().filter(|r| r.status == Status::Open).cloned().collect();
            let closed: Vec<TicketRecord> = set
                .iter()
                .filter(|r| r.status == Status::Close && in_range(r.closed_on(), begin, end))
                .cloned()
                .collect();
            let summary = SummaryCounts {
                open_count: open.len(),
                closed_count: closed.len(),
            };
            let mut backlog = open.clone();
            backlog.extend(closed);
            (open, backlog, summary)
        }
        PartitionRules::CreatedInRange => {
            let created: Vec<&TicketRecord> = set
                .iter()
                .filter(|r| in_range(r.created_on(), begin, end))
                .collect();
            let active: Vec<TicketRecord> = created
                .iter()
                .filter(|r| r.status == Status::Open)
                .map(|r| (*r).clone())
                .collect();
            let backlog: Vec<TicketRecord> = created
                .iter()
                .filter(|r| matches!(r.status, Status::Open | Status::Close))
                .map(|r| (*r).clone())
                .collect();
            let summary = SummaryCounts {
                open_count: active.len(),
                closed_count: backlog.len() - active.len(),
            };
            (active, backlog, summary)
        }
    };

    if active.is_empty() {
        return Err(ReportError::NoActiveTickets);
    }
    if backlog.is_empty() {
        return Err(ReportError::NoBacklogTickets);
    }
    sort_active(&mut active);
    sort_backlog(&mut backlog);
    Ok(Partition { active, backlog, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn ticket(no: &str, status: Status, created: &str, closed: Option<&str>) -> TicketRecord {
        let mut r = TicketRecord::empty(status);
        r.ticket_no = Some(no.to_string());
        r.date_created = Some(dt(&format!("{} 00:00:00", created)));
        r.time_arrive = Some(dt(&format!("{} 09:00:00", created)));
        r.time_close = closed.map(|c| dt(&format!("{} 17:00:00", c)));
        r
    }

    fn numbers(rows: &[TicketRecord]) -> Vec<&str> {
        rows.iter().map(|r| r.ticket_no.as_deref().unwrap_or("")).collect()
    }

    #[test]
    fn canonical_rules_match_reference_scenario() {
        let set = TicketSet::from_records(vec![
            ticket("T26-001", Status::Open, "2026-01-05", None),
            ticket("T26-002", Status::Close, "2026-01-02", Some("2026-01-06")),
            ticket("T25-900", Status::Open, "2025-12-20", None),
        ]);
        let p = partition(&set, d("2026-01-01"), d("2026-01-15"), PartitionRules::OpenWithClosedInRange).unwrap();
        assert_eq!(numbers(&p.active), vec!["T25-900", "T26-001"]);
        assert_eq!(numbers(&p.backlog), vec!["T25-900", "T26-001", "T26-002"]);
        assert_eq!(p.summary, SummaryCounts { open_count: 2, closed_count: 1 });
    }

    #[test]
    fn closed_outside_range_excluded_from_backlog() {
        let set = TicketSet::from_records(vec![
            ticket("A", Status::Open, "2026-01-05", None),
            ticket("B", Status::Close, "2026-01-02", Some("2026-02-01")),
            ticket("C", Status::Close, "2026-01-02", None),
        ]);
        let p = partition(&set, d("2026-01-01"), d("2026-01-15"), PartitionRules::OpenWithClosedInRange).unwrap();
        assert_eq!(numbers(&p.backlog), vec!["A"]);
        assert_eq!(p.summary.closed_count, 0);
    }

    #[test]
    fn ticket_number_breaks_arrival_ties_and_missing_arrival_sorts_last() {
        let mut late = ticket("A0", Status::Open, "2026-01-05", None);
        late.time_arrive = None;
        let set = TicketSet::from_records(vec![
            late,
            ticket("B2", Status::Open, "2026-01-05", None),
            ticket("B1", Status::Open, "2026-01-05", None),
        ]);
        let p = partition(&set, d("2026-01-01"), d("2026-01-15"), PartitionRules::OpenWithClosedInRange).unwrap();
        assert_eq!(numbers(&p.active), vec!["B1", "B2", "A0"]);
    }

    #[test]
    fn no_open_tickets_fails() {
        let set = TicketSet::from_records(vec![ticket("B", Status::Close, "2026-01-02", Some("2026-01-03"))]);
        let err = partition(&set, d("2026-01-01"), d("2026-01-15"), PartitionRules::OpenWithClosedInRange).unwrap_err();
        assert!(matches!(err, ReportError::NoActiveTickets));
    }

    #[test]
    fn created_in_range_rules_are_date_bound() {
        let set = TicketSet::from_records(vec![
            ticket("T26-001", Status::Open, "2026-01-05", None),
            ticket("T26-002", Status::Close, "2026-01-06", Some("2026-01-07")),
            ticket("T26-003", Status::Open, "2026-01-07", None),
            ticket("T25-999", Status::Open, "2025-12-20", None),
            ticket("T26-004", Status::Pending, "2026-01-08", None),
        ]);
        let p = partition(&set, d("2026-01-01"), d("2026-01-15"), PartitionRules::CreatedInRange).unwrap();
        assert_eq!(numbers(&p.active), vec!["T26-001", "T26-003"]);
        assert_eq!(numbers(&p.backlog), vec!["T26-001", "T26-003", "T26-002"]);
        assert_eq!(p.summary, SummaryCounts { open_count: 2, closed_count: 1 });
    }

    #[test]
    fn created_in_range_with_empty_window_fails() {
        let set = TicketSet::from_records(vec![ticket("A", Status::Open, "2026-01-05", None)]);
        let err = partition(&set, d("2026-02-01"), d("2026-02-07"), PartitionRules::CreatedInRange).unwrap_err();
        assert_eq!(err.error_code(), "NO_OPEN_TICKETS");
    }

    #[test]
    fn rules_parse_from_kebab_names() {
        assert_eq!("created-in-range".parse::<PartitionRules>().unwrap(), PartitionRules::CreatedInRange);
        assert_eq!(
            PartitionRules::OpenWithClosedInRange.to_string().parse::<PartitionRules>().unwrap(),
            PartitionRules::OpenWithClosedInRange
        );
        assert!("latest".parse::<PartitionRules>().is_err());
    }
}
