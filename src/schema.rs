// Maps arbitrary ticket-sheet headers onto the canonical ticket schema.
//
// Column resolution is an explicit fallback chain, tried for every canonical
// field in priority order:
//
// 1. exact alias lookup (case-insensitive, after header sanitizing),
// 2. keyword substring match against the still unclaimed headers,
// 3. a fixed column position, for the fields that have one.
//
// A field that survives all three is `ColumnMatch::Missing` and its values
// are null for every row of the sheet.
use crate::types::{Cell, RawSheet, Status, TicketRecord};
use crate::util::{cell_to_datetime, sanitize_column_name};
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    DateCreated,
    Status,
    Category,
    TicketNo,
    Type,
    ReqNo,
    RequestedFor,
    Assignee,
    Detail,
    TimeArrive,
    TimeClose,
    Remarks,
}

impl CanonicalField {
    /// Resolution priority order.
    pub const ALL: [CanonicalField; 12] = [
        CanonicalField::DateCreated,
        CanonicalField::Status,
        CanonicalField::Category,
        CanonicalField::TicketNo,
        CanonicalField::Type,
        CanonicalField::ReqNo,
        CanonicalField::RequestedFor,
        CanonicalField::Assignee,
        CanonicalField::Detail,
        CanonicalField::TimeArrive,
        CanonicalField::TimeClose,
        CanonicalField::Remarks,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CanonicalField::DateCreated => "date_created",
            CanonicalField::Status => "status",
            CanonicalField::Category => "category",
            CanonicalField::TicketNo => "ticket_no",
            CanonicalField::Type => "type",
            CanonicalField::ReqNo => "req_no",
            CanonicalField::RequestedFor => "requested_for",
            CanonicalField::Assignee => "assignee",
            CanonicalField::Detail => "detail",
            CanonicalField::TimeArrive => "time_arrive",
            CanonicalField::TimeClose => "time_close",
            CanonicalField::Remarks => "remarks",
        }
    }

    // COLUMN_RULES is laid out in declaration order.
    fn rule(&self) -> &'static ColumnRule {
        &COLUMN_RULES[*self as usize]
    }
}

pub struct ColumnRule {
    pub field: CanonicalField,
    pub aliases: &'static [&'static str],
    pub keywords: &'static [&'static str],
    pub position: Option<usize>,
}

pub static COLUMN_RULES: &[ColumnRule] = &[
    ColumnRule {
        field: CanonicalField::DateCreated,
        aliases: &["date created", "date", "created", "opened", "start date", "created date", "date opened"],
        keywords: &["date", "created", "opened"],
        position: Some(1),
    },
    ColumnRule {
        field: CanonicalField::Status,
        aliases: &["status", "state"],
        keywords: &["status", "state"],
        position: None,
    },
    ColumnRule {
        field: CanonicalField::Category,
        aliases: &["category", "cat"],
        keywords: &["category"],
        position: None,
    },
    ColumnRule {
        field: CanonicalField::TicketNo,
        aliases: &[
            "ticket no.",
            "ticket no",
            "ticket",
            "ticket #",
            "ticket number",
            "servicenow ticket #",
            "servicenow ticket",
            "id",
        ],
        keywords: &["ticket"],
        position: None,
    },
    ColumnRule {
        field: CanonicalField::Type,
        aliases: &["type", "kind", "ticket type"],
        keywords: &["type", "kind"],
        position: None,
    },
    ColumnRule {
        field: CanonicalField::ReqNo,
        aliases: &["req no.", "req no", "req #", "request no.", "request number", "ritm"],
        keywords: &["req no", "req #", "request no"],
        position: None,
    },
    ColumnRule {
        field: CanonicalField::RequestedFor,
        aliases: &["requested for", "requester", "requested by", "contact"],
        keywords: &["requested", "requester", "contact"],
        position: None,
    },
    ColumnRule {
        field: CanonicalField::Assignee,
        aliases: &["assign to", "assigned to", "assignee", "pic", "team member"],
        keywords: &["assign", "team member"],
        position: None,
    },
    ColumnRule {
        field: CanonicalField::Detail,
        aliases: &["request detail", "description", "short description", "detail"],
        keywords: &["detail", "description"],
        position: None,
    },
    ColumnRule {
        field: CanonicalField::TimeArrive,
        aliases: &["time - arrive", "time-arrive", "time arrive", "received", "arrival time"],
        keywords: &["arrive", "received"],
        position: None,
    },
    ColumnRule {
        field: CanonicalField::TimeClose,
        aliases: &["time - close", "time-close", "time close", "resolved", "close time", "closed time"],
        keywords: &["close", "resolved"],
        position: None,
    },
    ColumnRule {
        field: CanonicalField::Remarks,
        aliases: &["remarks", "remark", "comments", "notes"],
        keywords: &["remark", "comment", "note"],
        position: None,
    },
];

static ALIAS_INDEX: Lazy<HashMap<&'static str, CanonicalField>> = Lazy::new(|| {
    let mut m = HashMap::new();
    for rule in COLUMN_RULES {
        for alias in rule.aliases {
            m.insert(*alias, rule.field);
        }
    }
    m
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Alias,
    Keyword,
    Position,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnMatch {
    /// `index` is the raw column index in the sheet.
    Found { index: usize, via: MatchKind },
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap {
    matches: Vec<(CanonicalField, ColumnMatch)>,
}

impl ColumnMap {
    pub fn get(&self, field: CanonicalField) -> ColumnMatch {
        self.matches
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, m)| *m)
            .unwrap_or(ColumnMatch::Missing)
    }

    pub fn index(&self, field: CanonicalField) -> Option<usize> {
        match self.get(field) {
            ColumnMatch::Found { index, .. } => Some(index),
            ColumnMatch::Missing => None,
        }
    }

    /// Field that claimed raw column `index`, if any.
    pub fn field_at(&self, index: usize) -> Option<CanonicalField> {
        self.matches.iter().find_map(|(f, m)| match m {
            ColumnMatch::Found { index: i, .. } if *i == index => Some(*f),
            _ => None,
        })
    }

    pub fn missing(&self) -> Vec<&'static str> {
        self.matches
            .iter()
            .filter(|(_, m)| *m == ColumnMatch::Missing)
            .map(|(f, _)| f.name())
            .collect()
    }
}

/// Resolve every canonical field against raw header text.
///
/// Blank and `nan`-like headers are dropped before matching; a positional
/// fallback counts only the named columns.
pub fn resolve_columns(raw_headers: &[String]) -> ColumnMap {
    // (raw index, lower-cased sanitized name) of every named column.
    let named: Vec<(usize, String)> = raw_headers
        .iter()
        .enumerate()
        .map(|(i, h)| (i, sanitize_column_name(h).to_lowercase()))
        .filter(|(_, h)| !h.is_empty())
        .collect();
    let mut claimed = vec![false; named.len()];
    let mut found: HashMap<CanonicalField, ColumnMatch> = HashMap::new();

    for (slot, (raw_idx, header)) in named.iter().enumerate() {
        if let Some(field) = ALIAS_INDEX.get(header.as_str()) {
            if !found.contains_key(field) {
                found.insert(*field, ColumnMatch::Found { index: *raw_idx, via: MatchKind::Alias });
                claimed[slot] = true;
            }
        }
    }

    for field in CanonicalField::ALL {
        if found.contains_key(&field) {
            continue;
        }
        let rule = field.rule();
        let hit = named.iter().enumerate().find(|(slot, (_, header))| {
            !claimed[*slot] && rule.keywords.iter().any(|k| header.contains(k))
        });
        if let Some((slot, (raw_idx, _))) = hit {
            found.insert(field, ColumnMatch::Found { index: *raw_idx, via: MatchKind::Keyword });
            claimed[slot] = true;
        }
    }

    for field in CanonicalField::ALL {
        if found.contains_key(&field) {
            continue;
        }
        if let Some(pos) = field.rule().position {
            if pos < named.len() && !claimed[pos] {
                found.insert(field, ColumnMatch::Found { index: named[pos].0, via: MatchKind::Position });
                claimed[pos] = true;
            }
        }
    }

    let matches = CanonicalField::ALL
        .iter()
        .map(|f| (*f, found.get(f).copied().unwrap_or(ColumnMatch::Missing)))
        .collect::<Vec<_>>();
    for (f, m) in &matches {
        debug!(field = f.name(), matched = ?m, "column resolution");
    }
    ColumnMap { matches }
}

/// Identity of a source row: `(column, cell text)` for every non-empty cell,
/// sorted by column. Resolved columns go by their canonical name so sheets
/// that spell a header differently still line up; every other column keeps
/// its sanitized header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey(Vec<(String, String)>);

impl RowKey {
    fn from_row(row: &[Cell], names: &[String]) -> Self {
        let mut cells: Vec<(String, String)> = row
            .iter()
            .enumerate()
            .filter_map(|(i, c)| c.as_text().map(|t| (names[i].clone(), t)))
            .collect();
        cells.sort();
        RowKey(cells)
    }
}

/// A normalized record together with the source row it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedRecord {
    pub key: RowKey,
    pub record: TicketRecord,
}

/// Column names used for row keys, one per raw column up to `width`.
fn key_columns(map: &ColumnMap, headers: &[String], width: usize) -> Vec<String> {
    (0..width)
        .map(|i| {
            if let Some(field) = map.field_at(i) {
                return field.name().to_string();
            }
            let header = headers.get(i).map(|h| sanitize_column_name(h)).unwrap_or_default();
            if header.is_empty() {
                format!("#{}", i)
            } else {
                header
            }
        })
        .collect()
}

/// Output of normalizing one sheet.
#[derive(Debug, Clone, Default)]
pub struct NormalizedSheet {
    pub rows: Vec<KeyedRecord>,
    pub missing: Vec<&'static str>,
    pub malformed_cells: usize,
}

/// Normalize one ticket sheet. `None` when no date column can be resolved.
pub fn normalize_sheet(sheet: &RawSheet) -> Option<NormalizedSheet> {
    let headers: Vec<String> = sheet
        .headers()
        .iter()
        .map(|c| c.as_text().unwrap_or_default())
        .collect();
    let map = resolve_columns(&headers);
    map.index(CanonicalField::DateCreated)?;

    let width = sheet
        .rows
        .iter()
        .map(Vec::len)
        .max()
        .unwrap_or(0);
    let names = key_columns(&map, &headers, width);

    let mut out = NormalizedSheet {
        missing: map.missing(),
        ..NormalizedSheet::default()
    };
    for row in sheet.data_rows() {
        if row.iter().all(Cell::is_blank) {
            continue;
        }
        let text = |f: CanonicalField| -> Option<String> {
            map.index(f).and_then(|i| row.get(i)).and_then(Cell::as_text)
        };
        let mut malformed = 0usize;
        let mut datetime = |f: CanonicalField| -> Option<NaiveDateTime> {
            let cell = map.index(f).and_then(|i| row.get(i))?;
            let parsed = cell_to_datetime(cell);
            if parsed.is_none() && !cell.is_blank() {
                malformed += 1;
            }
            parsed
        };
        let date_created = datetime(CanonicalField::DateCreated);
        let time_arrive = datetime(CanonicalField::TimeArrive);
        let time_close = datetime(CanonicalField::TimeClose);
        out.malformed_cells += malformed;

        let record = TicketRecord {
            date_created,
            ticket_no: text(CanonicalField::TicketNo),
            req_no: text(CanonicalField::ReqNo),
            kind: text(CanonicalField::Type),
            category: text(CanonicalField::Category),
            requested_for: text(CanonicalField::RequestedFor),
            assignee: text(CanonicalField::Assignee),
            detail: text(CanonicalField::Detail),
            time_arrive,
            time_close,
            remarks: text(CanonicalField::Remarks),
            status: Status::from_raw(text(CanonicalField::Status).as_deref()),
        };
        out.rows.push(KeyedRecord {
            key: RowKey::from_row(row, &names),
            record,
        });
    }
    Some(out)
}

/// Drop rows whose source cells repeat an earlier row exactly, keeping the
/// first occurrence. Returns the surviving records and how many were removed.
pub fn dedup_records(rows: Vec<KeyedRecord>) -> (Vec<TicketRecord>, usize) {
    let before = rows.len();
    let mut seen: HashSet<RowKey> = HashSet::with_capacity(before);
    let kept: Vec<TicketRecord> = rows
        .into_iter()
        .filter(|r| seen.insert(r.key.clone()))
        .map(|r| r.record)
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn every_alias_resolves_to_its_field() {
        for rule in COLUMN_RULES {
            for alias in rule.aliases {
                let upper = alias.to_uppercase();
                let map = resolve_columns(&headers(&["Zzz", &upper]));
                assert_eq!(
                    map.get(rule.field),
                    ColumnMatch::Found { index: 1, via: MatchKind::Alias },
                    "alias {alias}"
                );
            }
        }
    }

    #[test]
    fn rules_follow_field_order() {
        for (i, field) in CanonicalField::ALL.iter().enumerate() {
            assert_eq!(COLUMN_RULES[i].field, *field);
            assert_eq!(field.rule().field, *field);
        }
    }

    #[test]
    fn servicenow_header_maps_to_ticket_no() {
        let map = resolve_columns(&headers(&["Date", "ServiceNow Ticket #", "Status"]));
        assert_eq!(map.index(CanonicalField::TicketNo), Some(1));
    }

    #[test]
    fn keyword_match_after_alias_miss() {
        let map = resolve_columns(&headers(&["Ticket Reference", "Opened On (UTC)", "Current Status"]));
        assert_eq!(
            map.get(CanonicalField::TicketNo),
            ColumnMatch::Found { index: 0, via: MatchKind::Keyword }
        );
        assert_eq!(
            map.get(CanonicalField::DateCreated),
            ColumnMatch::Found { index: 1, via: MatchKind::Keyword }
        );
        assert_eq!(map.index(CanonicalField::Status), Some(2));
    }

    #[test]
    fn positional_fallback_for_date() {
        let map = resolve_columns(&headers(&["Ref", "When", "Status"]));
        assert_eq!(
            map.get(CanonicalField::DateCreated),
            ColumnMatch::Found { index: 1, via: MatchKind::Position }
        );
    }

    #[test]
    fn blank_headers_are_dropped_before_matching() {
        let map = resolve_columns(&headers(&["", "nan", "Ref", "When"]));
        // Second named column is "When" at raw index 3.
        assert_eq!(map.index(CanonicalField::DateCreated), Some(3));
    }

    #[test]
    fn messy_header_text_is_cleaned() {
        let map = resolve_columns(&headers(&["  Time -\nArrive ", "Date\tCreated"]));
        assert_eq!(map.get(CanonicalField::DateCreated), ColumnMatch::Found { index: 1, via: MatchKind::Alias });
        // "Time - Arrive" after whitespace collapse.
        assert_eq!(map.index(CanonicalField::TimeArrive), Some(0));
    }

    #[test]
    fn missing_fields_listed() {
        let map = resolve_columns(&headers(&["Date", "Status"]));
        let missing = map.missing();
        assert!(missing.contains(&"ticket_no"));
        assert!(!missing.contains(&"status"));
    }

    #[test]
    fn sheet_rows_get_every_canonical_field() {
        let sheet = RawSheet::new(
            "2026",
            vec![
                vec![Cell::text("Date"), Cell::text("Ticket No."), Cell::text("Status"), Cell::text("Time - Close")],
                vec![Cell::text("2026-01-05"), Cell::Number(1001.0), Cell::text(" close "), Cell::text("garbage")],
                vec![Cell::Empty, Cell::Empty, Cell::Empty, Cell::Empty],
                vec![Cell::text("not a date"), Cell::text("T2"), Cell::text("weird"), Cell::Empty],
            ],
        );
        let out = normalize_sheet(&sheet).unwrap();
        assert_eq!(out.rows.len(), 2);
        let first = &out.rows[0].record;
        assert_eq!(
            first.date_created,
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(first.ticket_no.as_deref(), Some("1001"));
        assert_eq!(first.status, Status::Close);
        assert_eq!(first.time_close, None);
        assert_eq!(first.category, None);
        assert_eq!(out.rows[1].record.date_created, None);
        assert_eq!(out.rows[1].record.status, Status::Other);
        assert_eq!(out.malformed_cells, 2);
    }

    fn ticket_sheet(name: &str, headers: &[&str], rows: &[&[&str]]) -> RawSheet {
        let mut all = vec![headers.iter().map(|h| Cell::text(h)).collect::<Vec<_>>()];
        for r in rows {
            all.push(r.iter().map(|v| if v.is_empty() { Cell::Empty } else { Cell::text(v) }).collect());
        }
        RawSheet::new(name, all)
    }

    fn normalized_rows(sheets: &[RawSheet]) -> Vec<KeyedRecord> {
        sheets
            .iter()
            .flat_map(|s| normalize_sheet(s).unwrap().rows)
            .collect()
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let sheet = ticket_sheet(
            "2026",
            &["Date", "Ticket No.", "Status"],
            &[
                &["2026-01-05", "A", "OPEN"],
                &["2026-01-05", "B", "OPEN"],
                &["2026-01-05", "A", "OPEN"],
            ],
        );
        let (kept, removed) = dedup_records(normalized_rows(&[sheet]));
        let numbers: Vec<&str> = kept.iter().map(|r| r.ticket_no.as_deref().unwrap()).collect();
        assert_eq!(numbers, vec!["A", "B"]);
        assert_eq!(removed, 1);
    }

    #[test]
    fn rows_differing_only_outside_canonical_fields_both_survive() {
        let sheet = ticket_sheet(
            "2026",
            &["Date", "Ticket No.", "Status", "Priority"],
            &[
                &["2026-01-05", "A", "In Progress", "High"],
                &["2026-01-05", "A", "Waiting", "Low"],
                &["not a date", "B", "OPEN", ""],
                &["garbage", "B", "OPEN", ""],
            ],
        );
        let rows = normalized_rows(&[sheet]);
        assert_eq!(rows[0].record, rows[1].record);
        assert_eq!(rows[2].record, rows[3].record);
        let (kept, removed) = dedup_records(rows);
        assert_eq!(kept.len(), 4);
        assert_eq!(removed, 0);
    }

    #[test]
    fn same_row_under_different_header_spellings_collapses() {
        let a = ticket_sheet("2025", &["Date Created", "Ticket No.", "Notes"], &[&["2025-12-30", "T1", "x"]]);
        let b = ticket_sheet("2026", &["Notes", "Ticket", "Date"], &[&["x", "T1", "2025-12-30"]]);
        let (kept, removed) = dedup_records(normalized_rows(&[a, b]));
        assert_eq!(kept.len(), 1);
        assert_eq!(removed, 1);
    }
}
