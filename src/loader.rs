// Workbook loading.
//
// Reads every sheet with calamine into plain `RawSheet`s, then builds the
// combined, de-duplicated ticket set from the allow-listed year sheets.
use crate::error::{ReportError, Result};
use crate::schema::{dedup_records, normalize_sheet};
use crate::types::{Cell, RawSheet, TicketSet, Workbook};
use crate::util::parse_datetime_safe;
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader, Sheets};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};
use std::path::Path;
use tracing::{info, warn};

const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Diagnostics gathered while turning sheets into a `TicketSet`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub sheets_seen: usize,
    pub sheets_ingested: Vec<String>,
    pub total_rows: usize,
    pub duplicate_rows: usize,
    /// Canonical columns filled with nulls, per sheet.
    pub missing_columns: BTreeMap<String, Vec<&'static str>>,
    /// Non-empty date/time cells that could not be parsed.
    pub malformed_cells: usize,
}

pub fn load_workbook(path: &Path) -> Result<Workbook> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ReportError::UnsupportedFile(path.display().to_string()));
    }
    let wb = open_workbook_auto(path).map_err(|e| ReportError::InputUnreadable(e.to_string()))?;
    read_sheets(wb)
}

/// Same as `load_workbook` for an uploaded body already held in memory.
pub fn load_workbook_from_bytes(bytes: Vec<u8>) -> Result<Workbook> {
    let wb = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ReportError::InputUnreadable(e.to_string()))?;
    read_sheets(wb)
}

fn read_sheets<RS: Read + Seek>(mut wb: Sheets<RS>) -> Result<Workbook> {
    let names = wb.sheet_names().to_owned();
    let mut sheets = Vec::with_capacity(names.len());
    for name in names {
        let range = wb
            .worksheet_range(&name)
            .map_err(|e| ReportError::InputUnreadable(format!("sheet '{}': {}", name, e)))?;
        // calamine trims leading empty columns; pad them back so positional
        // fallbacks see the same column indexes as the spreadsheet.
        let lead_cols = range.start().map(|(_, c)| c as usize).unwrap_or(0);
        let rows = range
            .rows()
            .map(|r| {
                let mut row = vec![Cell::Empty; lead_cols];
                row.extend(r.iter().map(data_to_cell));
                row
            })
            .collect();
        sheets.push(RawSheet { name, rows });
    }
    Ok(Workbook::new(sheets))
}

pub fn data_to_cell(d: &Data) -> Cell {
    match d {
        Data::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(s.to_string())
            }
        }
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => {
            if dt.is_duration() {
                Cell::Number(dt.as_f64())
            } else {
                // as_datetime honours the workbook's 1904 date system.
                dt.as_datetime().map(Cell::DateTime).unwrap_or(Cell::Empty)
            }
        }
        Data::DateTimeIso(s) => parse_datetime_safe(Some(s))
            .map(Cell::DateTime)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Empty | Data::Error(_) => Cell::Empty,
    }
}

/// Sheets whose trimmed name is on the allow-list, in workbook order.
pub fn select_ticket_sheets<'a>(workbook: &'a Workbook, allow_list: &[String]) -> Vec<&'a RawSheet> {
    workbook
        .sheets
        .iter()
        .filter(|s| allow_list.iter().any(|a| a == s.name.trim()))
        .collect()
}

/// Ingest every allow-listed sheet into one de-duplicated `TicketSet`.
///
/// Sheets are matched on their trimmed name. Fails with `NoUsableSheets` when
/// nothing matches or no matching sheet yields a date column.
pub fn load_tickets(workbook: &Workbook, allow_list: &[String]) -> Result<(TicketSet, LoadReport)> {
    let mut report = LoadReport {
        sheets_seen: workbook.sheets.len(),
        ..LoadReport::default()
    };
    let selected = select_ticket_sheets(workbook, allow_list);
    if selected.is_empty() {
        return Err(ReportError::NoUsableSheets(format!(
            "none of the sheets matched {:?}",
            allow_list
        )));
    }

    let mut combined = Vec::new();
    for sheet in selected {
        let Some(normalized) = normalize_sheet(sheet) else {
            warn!(sheet = %sheet.name, "skipping sheet without a usable date column");
            continue;
        };
        info!(sheet = %sheet.name, rows = normalized.rows.len(), "loaded sheet");
        if !normalized.missing.is_empty() {
            report
                .missing_columns
                .entry(sheet.name.trim().to_string())
                .or_default()
                .extend(normalized.missing.iter().copied());
        }
        report.malformed_cells += normalized.malformed_cells;
        report.total_rows += normalized.rows.len();
        report.sheets_ingested.push(sheet.name.clone());
        combined.extend(normalized.rows);
    }
    if report.sheets_ingested.is_empty() {
        return Err(ReportError::NoUsableSheets(
            "no ticket sheet has a usable date column".to_string(),
        ));
    }

    let (records, dupes) = dedup_records(combined);
    report.duplicate_rows = dupes;
    info!(
        rows = records.len(),
        duplicates = dupes,
        "combined ticket data"
    );
    Ok((TicketSet::from_records(records), report))
}
