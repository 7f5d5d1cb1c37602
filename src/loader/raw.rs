//! Reading source files into a single all-string record batch.
//!
//! Every column is read as UTF-8 so that type coercion happens in one place,
//! the normaliser, whatever the on-disk format was.

use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use arrow::array::ArrayRef;
use arrow::compute::{cast, concat_batches};
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::{RecordBatch, RecordBatchReader};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::error::{ExplorerError, Result};

/// Supported on-disk formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Parquet,
}

impl SourceFormat {
    /// Guess from the file extension; anything but `.parquet` is read as CSV
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => Self::Parquet,
            _ => Self::Csv,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "CSV",
            Self::Parquet => "Parquet",
        })
    }
}

/// Open a source file, naming the path in the error
pub fn open_source(path: &Path, purpose: &str) -> Result<File> {
    if !path.is_file() {
        return Err(ExplorerError::load(format!(
            "{} is not a readable file (needed for {purpose})",
            path.display()
        )));
    }
    File::open(path)
        .map_err(|e| ExplorerError::load(format!("Failed to open {}: {e}", path.display())))
}

fn utf8_schema<'a>(names: impl Iterator<Item = &'a String>) -> SchemaRef {
    Arc::new(Schema::new(
        names
            .map(|name| Field::new(name.as_str(), DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ))
}

/// Read a delimited table with a header row; every column comes back as nullable UTF-8.
///
/// A table that cannot be parsed (no header, ragged rows, invalid UTF-8) is a
/// load error and yields no rows at all.
pub fn read_csv<R: Read>(mut reader: R, delimiter: u8, batch_size: usize) -> Result<RecordBatch> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let format = Format::default()
        .with_header(true)
        .with_delimiter(delimiter);
    let (inferred, _) = format
        .infer_schema(Cursor::new(&bytes), Some(0))
        .map_err(|e| ExplorerError::load(format!("Unreadable header: {e}")))?;
    if inferred.fields().is_empty() {
        return Err(ExplorerError::load("Table has no header row"));
    }

    let schema = utf8_schema(inferred.fields().iter().map(|f| f.name()));
    let csv = ReaderBuilder::new(Arc::clone(&schema))
        .with_header(true)
        .with_delimiter(delimiter)
        .with_batch_size(batch_size.max(1))
        .build(Cursor::new(&bytes))
        .map_err(|e| ExplorerError::load(e.to_string()))?;

    let batches = csv
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ExplorerError::load(format!("Malformed table: {e}")))?;
    Ok(concat_batches(&schema, &batches)?)
}

/// Read a Parquet file and cast every column to UTF-8
pub fn read_parquet(path: &Path, batch_size: usize) -> Result<RecordBatch> {
    let file = open_source(path, "reading parquet file")?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?
        .with_batch_size(batch_size.max(1))
        .build()?;
    let file_schema = reader.schema();

    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ExplorerError::load(format!("Failed to read {}: {e}", path.display())))?;
    let batch = concat_batches(&file_schema, &batches)?;

    let schema = utf8_schema(file_schema.fields().iter().map(|f| f.name()));
    let columns = batch
        .columns()
        .iter()
        .map(|column| cast(column, &DataType::Utf8))
        .collect::<std::result::Result<Vec<ArrayRef>, _>>()
        .map_err(|e| ExplorerError::load(format!("Unsupported column type: {e}")))?;
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Read any supported source file, choosing the format by extension
pub fn read_path(path: &Path, delimiter: u8, batch_size: usize) -> Result<RecordBatch> {
    match SourceFormat::from_path(path) {
        SourceFormat::Parquet => read_parquet(path, batch_size),
        SourceFormat::Csv => read_csv(open_source(path, "reading csv file")?, delimiter, batch_size),
    }
}
