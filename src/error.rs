// Error taxonomy shared by the library and the CLI.
use serde::Serialize;
use thiserror::Error;

/// Every fatal condition the report pipeline can surface.
///
/// Malformed cells and missing columns are not here: they are recovered
/// locally and only show up in the `LoadReport` counters.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Could not open workbook: {0}")]
    InputUnreadable(String),

    #[error("No usable ticket sheets: {0}")]
    NoUsableSheets(String),

    #[error("No OPEN tickets found")]
    NoActiveTickets,

    #[error("No OPEN or CLOSED tickets found for the selected period")]
    NoBacklogTickets,

    #[error("No data found for {year}-{month:02}")]
    NoDataForMonth { year: i32, month: u32 },

    #[error("begin_date {begin} must be before or equal to end_date {end}")]
    InvalidDateRange { begin: String, end: String },

    #[error("Dates must be in YYYY-MM-DD format, got '{0}'")]
    InvalidDate(String),

    #[error("Month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),

    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Transport-neutral error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error_code: String,
    pub message: String,
}

impl ReportError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ReportError::InputUnreadable(_) => "FILE_OPEN_ERROR",
            ReportError::NoUsableSheets(_) => "NO_USABLE_SHEETS",
            ReportError::NoActiveTickets => "NO_OPEN_TICKETS",
            ReportError::NoBacklogTickets => "NO_RIGHT_TICKETS",
            ReportError::NoDataForMonth { .. } => "NO_DATA_FOR_MONTH",
            ReportError::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            ReportError::InvalidDate(_) => "INVALID_DATE_FORMAT",
            ReportError::InvalidMonth(_) => "INVALID_MONTH",
            ReportError::UnsupportedFile(_) => "INVALID_FILE_EXTENSION",
            ReportError::Config(_) => "CONFIG_ERROR",
            ReportError::Io(_) => "IO_ERROR",
            ReportError::Json(_) | ReportError::Csv(_) => "SERIALIZATION_ERROR",
        }
    }

    /// True for conditions the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ReportError::InputUnreadable(_)
                | ReportError::NoUsableSheets(_)
                | ReportError::NoActiveTickets
                | ReportError::NoBacklogTickets
                | ReportError::NoDataForMonth { .. }
                | ReportError::InvalidDateRange { .. }
                | ReportError::InvalidDate(_)
                | ReportError::InvalidMonth(_)
                | ReportError::UnsupportedFile(_)
        )
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            error_code: self.error_code().to_string(),
            message: self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
