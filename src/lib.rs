// Support-ticket workbook ingestion and report generation.
//
// `loader` turns a workbook into raw sheets, `schema` maps them onto
// `TicketRecord`s, and `reports` assembles the weekly and monthly outputs
// from `sections`, `pivot`, `annual` and `new_users`.
pub mod annual;
pub mod auxdata;
pub mod category;
pub mod config;
pub mod error;
pub mod loader;
pub mod new_users;
pub mod output;
pub mod pivot;
pub mod reports;
pub mod schema;
pub mod sections;
pub mod types;
pub mod util;

pub use error::{ErrorBody, ReportError, Result};
