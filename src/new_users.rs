// Extraction of the auxiliary "New Users" onboarding sheet.
//
// The sheet is maintained by hand, so its header row is not always row 0:
// a title or blank row above the real headers is common. When the first
// row looks like placeholders, `HeaderScanner` walks the following rows
// looking for one that reads like a header.
use crate::types::{Cell, RawSheet, Workbook};
use crate::util::{cell_to_datetime, is_placeholder_header, sanitize_column_name};
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::{debug, info};

pub const DATE_COLUMN: &str = "Date Created";
pub const TICKET_COLUMN: &str = "Ticket No";
pub const USER_COLUMN: &str = "User Name";
pub const EMAIL_COLUMN: &str = "Email address";
pub const DEPARTMENT_COLUMN: &str = "Function / Department";

const HEADER_KEYWORDS: &[&str] = &["ticket", "date", "user", "name", "email", "department", "function"];
const MIN_KEYWORD_HITS: usize = 2;

static COLUMN_SYNONYMS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let table: &[(&[&str], &str)] = &[
        (&["email", "e-mail", "email address", "mail"], EMAIL_COLUMN),
        (&["ticket", "ticket no", "ticket no.", "ticket #", "ticket number"], TICKET_COLUMN),
        (&["user", "name", "user name", "username", "full name"], USER_COLUMN),
        (
            &["department", "function", "dept", "function / department", "function/department"],
            DEPARTMENT_COLUMN,
        ),
        (&["date", "created", "date created", "created date"], DATE_COLUMN),
    ];
    let mut m = HashMap::new();
    for (variants, canonical) in table {
        for v in *variants {
            m.insert(*v, *canonical);
        }
    }
    m
});

/// Canonical name for a sanitized header, or the header itself.
pub fn canonical_column(name: &str) -> String {
    let clean = sanitize_column_name(name);
    COLUMN_SYNONYMS
        .get(clean.to_lowercase().as_str())
        .map(|c| c.to_string())
        .unwrap_or(clean)
}

/// How many distinct header keywords appear somewhere in the row.
pub fn keyword_hits(row: &[Cell]) -> usize {
    let texts: Vec<String> = row.iter().filter_map(Cell::as_text).map(|t| t.to_lowercase()).collect();
    HEADER_KEYWORDS
        .iter()
        .filter(|k| texts.iter().any(|t| t.contains(*k)))
        .count()
}

/// A header row is unusable when it has placeholder cells and does not
/// itself read like a header.
pub fn header_is_usable(row: &[Cell]) -> bool {
    let placeholders = row
        .iter()
        .filter(|c| c.as_text().map(|t| is_placeholder_header(&t)).unwrap_or(true))
        .count();
    if row.is_empty() {
        return false;
    }
    placeholders == 0 || keyword_hits(row) >= MIN_KEYWORD_HITS
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderChoice {
    /// Keep row 0 as the header row.
    Original,
    /// Promote this data row (0-based, below row 0) to headers.
    Promoted(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderScanState {
    Scanning { next_row: usize },
    HeaderFound(usize),
    Done(HeaderChoice),
}

/// Walks at most `limit` data rows looking for one with enough header keywords.
pub struct HeaderScanner<'a> {
    rows: &'a [Vec<Cell>],
    limit: usize,
    state: HeaderScanState,
}

impl<'a> HeaderScanner<'a> {
    pub fn new(rows: &'a [Vec<Cell>], limit: usize) -> Self {
        HeaderScanner {
            rows,
            limit,
            state: HeaderScanState::Scanning { next_row: 0 },
        }
    }

    pub fn state(&self) -> HeaderScanState {
        self.state
    }

    pub fn step(&mut self) -> HeaderScanState {
        self.state = match self.state {
            HeaderScanState::Scanning { next_row } => {
                if next_row >= self.limit || next_row >= self.rows.len() {
                    HeaderScanState::Done(HeaderChoice::Original)
                } else if keyword_hits(&self.rows[next_row]) >= MIN_KEYWORD_HITS {
                    HeaderScanState::HeaderFound(next_row)
                } else {
                    HeaderScanState::Scanning { next_row: next_row + 1 }
                }
            }
            HeaderScanState::HeaderFound(row) => HeaderScanState::Done(HeaderChoice::Promoted(row)),
            done @ HeaderScanState::Done(_) => done,
        };
        self.state
    }

    pub fn run(mut self) -> HeaderChoice {
        loop {
            if let HeaderScanState::Done(choice) = self.step() {
                return choice;
            }
        }
    }
}

/// One onboarding row. `values` keeps the sheet's column order.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUserRow {
    pub values: Vec<(String, Option<String>)>,
    pub date_created: Option<NaiveDateTime>,
    pub is_new_user: bool,
}

impl NewUserRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(c, _)| c == column)
            .and_then(|(_, v)| v.as_deref())
    }
}

impl Serialize for NewUserRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        for (column, value) in &self.values {
            map.serialize_entry(column, value)?;
        }
        map.serialize_entry("is_new_user", &self.is_new_user)?;
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct NewUsersTable {
    pub columns: Vec<String>,
    pub rows: Vec<NewUserRow>,
}

fn locate_date_column(columns: &[String]) -> Option<usize> {
    columns
        .iter()
        .position(|c| c == DATE_COLUMN)
        .or_else(|| columns.iter().position(|c| c.to_lowercase().contains("date")))
}

/// Normalize the onboarding sheet and flag rows created inside `[begin, end]`.
pub fn extract_from_sheet(sheet: &RawSheet, begin: NaiveDate, end: NaiveDate, scan_rows: usize) -> NewUsersTable {
    let Some(first) = sheet.rows.first() else {
        return NewUsersTable::default();
    };
    let data = sheet.data_rows();
    let (header_row, body): (&[Cell], &[Vec<Cell>]) = if header_is_usable(first) {
        (first.as_slice(), data)
    } else {
        match HeaderScanner::new(data, scan_rows).run() {
            HeaderChoice::Promoted(i) => {
                debug!(row = i + 1, "promoted new-users header row");
                (data[i].as_slice(), &data[i + 1..])
            }
            HeaderChoice::Original => (first.as_slice(), data),
        }
    };

    // (raw index, canonical name); placeholder and repeated names dropped.
    let mut kept: Vec<(usize, String)> = Vec::new();
    for (i, cell) in header_row.iter().enumerate() {
        let name = canonical_column(&cell.as_text().unwrap_or_default());
        if is_placeholder_header(&name) || kept.iter().any(|(_, n)| *n == name) {
            continue;
        }
        kept.push((i, name));
    }
    let columns: Vec<String> = kept.iter().map(|(_, n)| n.clone()).collect();
    let date_col = locate_date_column(&columns);
    let key_cols: Vec<usize> = [TICKET_COLUMN, USER_COLUMN, EMAIL_COLUMN]
        .iter()
        .filter_map(|k| columns.iter().position(|c| c == k))
        .collect();

    let mut rows: Vec<NewUserRow> = Vec::new();
    for raw in body {
        let cells: Vec<Option<&Cell>> = kept.iter().map(|(i, _)| raw.get(*i)).collect();
        let texts: Vec<Option<String>> = cells.iter().map(|c| c.and_then(Cell::as_text)).collect();
        if texts.iter().all(Option::is_none) {
            continue;
        }
        if !key_cols.is_empty() && key_cols.iter().all(|k| texts[*k].is_none()) {
            continue;
        }
        let date_created = date_col.and_then(|d| cells[d]).and_then(cell_to_datetime);
        let mut values: Vec<(String, Option<String>)> = columns.iter().cloned().zip(texts).collect();
        if let (Some(d), Some(parsed)) = (date_col, date_created) {
            values[d].1 = Some(parsed.format("%Y-%m-%d").to_string());
        }
        let is_new_user = date_created
            .map(|d| d.date() >= begin && d.date() <= end)
            .unwrap_or(false);
        rows.push(NewUserRow { values, date_created, is_new_user });
    }

    // Newest first, undated rows last.
    rows.sort_by(|a, b| match (a.date_created, b.date_created) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    NewUsersTable { columns, rows }
}

/// Find the onboarding sheet by case-insensitive name. An absent sheet
/// yields an empty table.
pub fn extract_new_users(
    workbook: &Workbook,
    sheet_name: &str,
    begin: NaiveDate,
    end: NaiveDate,
    scan_rows: usize,
) -> NewUsersTable {
    match workbook.sheet_ci(sheet_name) {
        Some(sheet) => {
            let table = extract_from_sheet(sheet, begin, end, scan_rows);
            info!(
                rows = table.rows.len(),
                new = table.rows.iter().filter(|r| r.is_new_user).count(),
                "extracted new users"
            );
            table
        }
        None => {
            debug!(sheet = sheet_name, "no new-users sheet in workbook");
            NewUsersTable::default()
        }
    }
}
