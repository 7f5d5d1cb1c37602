//! CSV export of result tables, export file naming and display formatting.
//!
//! Exported values are plain: metrics as decimal integers without grouping,
//! statistics as Arrow renders them, nulls as empty fields. Grouped or
//! sentinel renderings live in [`format_publications`] and are only meant
//! for display.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use arrow::csv::WriterBuilder;
use chrono::NaiveDateTime;

use crate::error::{ExplorerError, Result};
use crate::rowset::{Table, TableColumn};

/// Timestamp layout used in export file names
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Display text for a drug without any publication
pub const NO_PUBLICATIONS: &str = "No Pubs in MPRINT";

/// Write a table as UTF-8 CSV with a header row, columns in table order
pub fn write_csv<C: TableColumn, W: Write>(table: &Table<C>, writer: W) -> Result<W> {
    let mut csv = WriterBuilder::new().with_header(true).build(writer);
    csv.write(table.batch())?;
    Ok(csv.into_inner())
}

/// Render a table as a CSV string
pub fn to_csv_string<C: TableColumn>(table: &Table<C>) -> Result<String> {
    let bytes = write_csv(table, Vec::new())?;
    String::from_utf8(bytes).map_err(|e| ExplorerError::load(format!("Invalid UTF-8 in export: {e}")))
}

/// Write a table to a CSV file, creating or truncating it
pub fn write_csv_file<C: TableColumn>(table: &Table<C>, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = write_csv(table, BufWriter::new(file))?;
    writer.flush()?;
    log::info!("Wrote {} rows to {}", table.num_rows(), path.display());
    Ok(())
}

fn file_part(value: &str) -> String {
    value.trim().replace(' ', "_")
}

/// `<prefix>_results_<age>_<YYYYMMDD_HHMMSS>.csv`
#[must_use]
pub fn results_file_name(prefix: &str, age: &str, timestamp: NaiveDateTime) -> String {
    format!(
        "{prefix}_results_{}_{}.csv",
        file_part(age),
        timestamp.format(TIMESTAMP_FORMAT)
    )
}

/// `<prefix>_ade_<drug>_<age>_<YYYYMMDD_HHMMSS>.csv`
#[must_use]
pub fn ade_file_name(prefix: &str, drug: &str, age: &str, timestamp: NaiveDateTime) -> String {
    format!(
        "{prefix}_ade_{}_{}_{}.csv",
        file_part(drug),
        file_part(age),
        timestamp.format(TIMESTAMP_FORMAT)
    )
}

/// Insert `,` between groups of three digits
#[must_use]
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        grouped.push('-');
    }
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// Publication count for display: zero as a notice, anything else grouped
#[must_use]
pub fn format_publications(count: i64) -> String {
    if count == 0 {
        NO_PUBLICATIONS.to_string()
    } else {
        group_thousands(count)
    }
}
