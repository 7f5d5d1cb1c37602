//! Log lines for reading and cleaning the source tables.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::loader::SourceFormat;

/// The source table a log line is about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Drugs,
    AdverseEvents,
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Drugs => "drug table",
            Self::AdverseEvents => "adverse-event table",
        })
    }
}

fn load_start_message(table: TableKind, path: &Path) -> String {
    format!(
        "Loading {table} from {} ({})",
        path.display(),
        SourceFormat::from_path(path)
    )
}

fn load_complete_message(
    table: TableKind,
    path: &Path,
    rows: usize,
    columns: usize,
    elapsed: Duration,
) -> String {
    format!(
        "Loaded {table}: {rows} rows, {columns} columns from {} in {elapsed:.2?}",
        path.display()
    )
}

fn data_warning_message(table: TableKind, source: Option<&Path>, message: &str) -> String {
    match source {
        Some(path) => format!("{table} {}: {message}", path.display()),
        None => format!("{table}: {message}"),
    }
}

/// Announce that a table is about to be read, naming its on-disk format
pub fn log_load_start(table: TableKind, path: &Path) {
    log::info!("{}", load_start_message(table, path));
}

/// Report the shape of a normalised table and how long it took to produce
pub fn log_load_complete(table: TableKind, path: &Path, rows: usize, columns: usize, elapsed: Duration) {
    log::info!("{}", load_complete_message(table, path, rows, columns, elapsed));
}

/// Rows or values were repaired or dropped while cleaning a table
pub fn log_data_warning(table: TableKind, source: Option<&Path>, message: &str) {
    log::warn!("{}", data_warning_message(table, source, message));
}
