// File writers and console previews.
use crate::error::Result;
use crate::new_users::NewUsersTable;
use crate::pivot::PivotTable;
use crate::types::{SectionCsvRow, TicketRecord};
use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn section_rows(records: &[TicketRecord]) -> Vec<SectionCsvRow> {
    records.iter().map(SectionCsvRow::from).collect()
}

pub fn write_section_csv(path: &Path, records: &[TicketRecord]) -> Result<()> {
    write_csv(path, &section_rows(records))
}

pub fn write_pivot_csv(path: &Path, pivot: &PivotTable) -> Result<()> {
    write_csv(path, &pivot.to_rows())
}

/// New-user columns vary per workbook, so the header comes from the table
/// rather than a serde struct.
pub fn write_new_users_csv(path: &Path, table: &NewUsersTable) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let mut header: Vec<&str> = table.columns.iter().map(String::as_str).collect();
    header.push("is_new_user");
    wtr.write_record(&header)?;
    for row in &table.rows {
        let mut record: Vec<String> = table
            .columns
            .iter()
            .map(|c| row.get(c).unwrap_or_default().to_string())
            .collect();
        record.push(row.is_new_user.to_string());
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
