//! Dataset loading
//!
//! Reads source files (CSV or Parquet) into all-string record batches and
//! normalises them into canonical [`RowSet`]s and [`AdeSet`]s.

pub mod cache;
pub mod merge;
pub mod normalize;
pub mod raw;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::ExplorerConfig;
use crate::error::Result;
use crate::rowset::{AdeSet, RowSet};
use crate::utils::logging::{TableKind, log_load_complete, log_load_start};

pub use self::cache::{DatasetCache, SourceKey};
pub use self::merge::{join_keys, merge_prescriptions};
pub use self::normalize::{normalize_adverse_events, normalize_drugs, parse_count, parse_statistic};
pub use self::raw::{SourceFormat, read_csv, read_parquet, read_path};

/// Options controlling how a source is read and normalised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub delimiter: u8,
    pub batch_size: usize,
    /// Drop rows without a drug name (and fail if the column is missing)
    pub require_drug_name: bool,
    /// Where the data came from, for log messages
    pub source: Option<PathBuf>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            batch_size: 8192,
            require_drug_name: false,
            source: None,
        }
    }
}

impl LoadOptions {
    #[must_use]
    pub fn from_config(config: &ExplorerConfig) -> Self {
        Self {
            delimiter: config.delimiter_byte(),
            batch_size: config.batch_size,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_drug_name_required(mut self) -> Self {
        self.require_drug_name = true;
        self
    }

    #[must_use]
    pub fn with_source(mut self, path: &Path) -> Self {
        self.source = Some(path.to_path_buf());
        self
    }
}

/// Parse and normalise a drug table from a CSV byte stream
pub fn load<R: Read>(reader: R, options: &LoadOptions) -> Result<RowSet> {
    let raw = read_csv(reader, options.delimiter, options.batch_size)?;
    normalize_drugs(&raw, options)
}

/// Parse and normalise an adverse-event table from a CSV byte stream
pub fn load_adverse_events<R: Read>(reader: R, options: &LoadOptions) -> Result<AdeSet> {
    let raw = read_csv(reader, options.delimiter, options.batch_size)?;
    normalize_adverse_events(&raw)
}

/// Load and normalise a drug table from a CSV or Parquet file
pub fn load_path(path: &Path, options: &LoadOptions) -> Result<RowSet> {
    let start = Instant::now();
    log_load_start(TableKind::Drugs, path);

    let options = options.clone().with_source(path);
    let raw = read_path(path, options.delimiter, options.batch_size)?;
    let rows = normalize_drugs(&raw, &options)?;

    log_load_complete(
        TableKind::Drugs,
        path,
        rows.num_rows(),
        rows.columns().len(),
        start.elapsed(),
    );
    Ok(rows)
}

/// Load and normalise an adverse-event table from a CSV or Parquet file
pub fn load_adverse_events_path(path: &Path, options: &LoadOptions) -> Result<AdeSet> {
    let start = Instant::now();
    log_load_start(TableKind::AdverseEvents, path);

    let raw = read_path(path, options.delimiter, options.batch_size)?;
    let ade = normalize_adverse_events(&raw)?;

    log_load_complete(
        TableKind::AdverseEvents,
        path,
        ade.num_rows(),
        ade.columns().len(),
        start.elapsed(),
    );
    Ok(ade)
}

/// Load the merged layout: publications with prescription volumes joined on
pub fn load_merged(publications: &Path, prescriptions: &Path, options: &LoadOptions) -> Result<RowSet> {
    let pubs = load_path(publications, &options.clone().with_drug_name_required())?;
    let rx = load_path(prescriptions, options)?;
    merge_prescriptions(&pubs, &rx)
}
