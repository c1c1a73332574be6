// Core data types: raw workbook cells, canonical ticket records and the
// row shapes used for previews and CSV export.
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use tabled::Tabled;

/// One spreadsheet cell after loading, independent of the workbook format.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    pub fn is_blank(&self) -> bool {
        self.as_text().is_none()
    }

    /// Render the cell as trimmed text. Blank strings and empty cells are `None`.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    None
                } else {
                    Some(s.to_string())
                }
            }
            Cell::Number(f) => {
                if f.is_finite() && (f.floor() - f).abs() < f64::EPSILON {
                    Some(format!("{}", *f as i64))
                } else {
                    Some(f.to_string())
                }
            }
            Cell::Bool(b) => Some(b.to_string()),
            Cell::DateTime(dt) => {
                if dt.num_seconds_from_midnight() == 0 {
                    Some(dt.format("%Y-%m-%d").to_string())
                } else {
                    Some(dt.format("%Y-%m-%d %H:%M:%S").to_string())
                }
            }
        }
    }
}

/// A sheet as read from the workbook. Row 0 holds the header cells.
#[derive(Debug, Clone, Default)]
pub struct RawSheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl RawSheet {
    pub fn new(name: &str, rows: Vec<Vec<Cell>>) -> Self {
        RawSheet { name: name.to_string(), rows }
    }

    pub fn headers(&self) -> &[Cell] {
        self.rows.first().map(|r| r.as_slice()).unwrap_or(&[])
    }

    pub fn data_rows(&self) -> &[Vec<Cell>] {
        if self.rows.is_empty() {
            &[]
        } else {
            &self.rows[1..]
        }
    }
}

/// Every sheet of one uploaded workbook, in workbook order.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<RawSheet>,
}

impl Workbook {
    pub fn new(sheets: Vec<RawSheet>) -> Self {
        Workbook { sheets }
    }

    /// Case-insensitive lookup on the trimmed sheet name.
    pub fn sheet_ci(&self, name: &str) -> Option<&RawSheet> {
        let wanted = name.trim().to_lowercase();
        self.sheets
            .iter()
            .find(|s| s.name.trim().to_lowercase() == wanted)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Open,
    Close,
    Cancel,
    TransNon,
    TransWork,
    Pending,
    Other,
}

impl Status {
    /// Upper-cases and trims the raw cell. Anything unrecognised becomes `Other`.
    pub fn from_raw(raw: Option<&str>) -> Status {
        let Some(raw) = raw else {
            return Status::Other;
        };
        match raw.trim().to_uppercase().as_str() {
            "OPEN" => Status::Open,
            "CLOSE" | "CLOSED" => Status::Close,
            "CANCEL" | "CANCELLED" | "CANCELED" => Status::Cancel,
            "TRANS_NON" => Status::TransNon,
            "TRANS_WORK" => Status::TransWork,
            "PENDING" => Status::Pending,
            _ => Status::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "OPEN",
            Status::Close => "CLOSE",
            Status::Cancel => "CANCEL",
            Status::TransNon => "TRANS_NON",
            Status::TransWork => "TRANS_WORK",
            Status::Pending => "PENDING",
            Status::Other => "OTHER",
        }
    }
}

/// One ticket row in the canonical schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketRecord {
    pub date_created: Option<NaiveDateTime>,
    pub ticket_no: Option<String>,
    pub req_no: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub category: Option<String>,
    pub requested_for: Option<String>,
    pub assignee: Option<String>,
    pub detail: Option<String>,
    pub time_arrive: Option<NaiveDateTime>,
    pub time_close: Option<NaiveDateTime>,
    pub remarks: Option<String>,
    pub status: Status,
}

impl TicketRecord {
    /// A record with every optional field empty. Handy for tests and fillers.
    pub fn empty(status: Status) -> Self {
        TicketRecord {
            date_created: None,
            ticket_no: None,
            req_no: None,
            kind: None,
            category: None,
            requested_for: None,
            assignee: None,
            detail: None,
            time_arrive: None,
            time_close: None,
            remarks: None,
            status,
        }
    }

    pub fn created_on(&self) -> Option<NaiveDate> {
        self.date_created.map(|d| d.date())
    }

    pub fn closed_on(&self) -> Option<NaiveDate> {
        self.time_close.map(|d| d.date())
    }
}

/// Concatenated, de-duplicated tickets from every ingested sheet.
/// Built once per request and not mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketSet {
    records: Vec<TicketRecord>,
}

impl TicketSet {
    pub fn from_records(records: Vec<TicketRecord>) -> Self {
        TicketSet { records }
    }

    pub fn records(&self) -> &[TicketRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TicketRecord> {
        self.records.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    pub open_count: usize,
    pub closed_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Period {
    pub begin: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Tabled, Clone)]
pub struct SectionPreviewRow {
    #[tabled(rename = "Ticket #")]
    pub ticket_no: String,
    #[tabled(rename = "Status")]
    pub status: String,
    #[tabled(rename = "Type")]
    pub kind: String,
    #[tabled(rename = "Description")]
    pub detail: String,
    #[tabled(rename = "Received")]
    pub received: String,
    #[tabled(rename = "Resolved")]
    pub resolved: String,
}

impl From<&TicketRecord> for SectionPreviewRow {
    fn from(r: &TicketRecord) -> Self {
        let fmt_dt = |d: Option<NaiveDateTime>| {
            d.map(|d| d.format("%m/%d/%Y").to_string())
                .unwrap_or_default()
        };
        SectionPreviewRow {
            ticket_no: r.ticket_no.clone().unwrap_or_default(),
            status: r.status.as_str().to_string(),
            kind: r.kind.clone().unwrap_or_default(),
            detail: r.detail.clone().unwrap_or_default(),
            received: fmt_dt(r.time_arrive),
            resolved: fmt_dt(r.time_close),
        }
    }
}

/// Flat row used for CSV export of a report section.
#[derive(Debug, Serialize, Clone)]
pub struct SectionCsvRow {
    #[serde(rename = "Date Created")]
    pub date_created: String,
    #[serde(rename = "Ticket No.")]
    pub ticket_no: String,
    #[serde(rename = "REQ No.")]
    pub req_no: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Requested for")]
    pub requested_for: String,
    #[serde(rename = "Assign To")]
    pub assignee: String,
    #[serde(rename = "Request Detail")]
    pub detail: String,
    #[serde(rename = "Time - Arrive")]
    pub time_arrive: String,
    #[serde(rename = "Time - Close")]
    pub time_close: String,
    #[serde(rename = "Remarks")]
    pub remarks: String,
    #[serde(rename = "Status")]
    pub status: String,
}

impl From<&TicketRecord> for SectionCsvRow {
    fn from(r: &TicketRecord) -> Self {
        let dt = |d: Option<NaiveDateTime>| {
            d.map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default()
        };
        let s = |v: &Option<String>| v.clone().unwrap_or_default();
        SectionCsvRow {
            date_created: dt(r.date_created),
            ticket_no: s(&r.ticket_no),
            req_no: s(&r.req_no),
            kind: s(&r.kind),
            category: s(&r.category),
            requested_for: s(&r.requested_for),
            assignee: s(&r.assignee),
            detail: s(&r.detail),
            time_arrive: dt(r.time_arrive),
            time_close: dt(r.time_close),
            remarks: s(&r.remarks),
            status: r.status.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct PivotRow {
    #[serde(rename = "Type")]
    #[tabled(rename = "Type")]
    pub kind: String,
    #[serde(rename = "Category")]
    #[tabled(rename = "Category")]
    pub category: String,
    #[serde(rename = "TRANS_NON")]
    #[tabled(rename = "TRANS_NON")]
    pub trans_non: usize,
    #[serde(rename = "TRANS_WORK")]
    #[tabled(rename = "TRANS_WORK")]
    pub trans_work: usize,
    #[serde(rename = "OPEN")]
    #[tabled(rename = "OPEN")]
    pub open: usize,
    #[serde(rename = "CLOSE")]
    #[tabled(rename = "CLOSE")]
    pub close: usize,
}
