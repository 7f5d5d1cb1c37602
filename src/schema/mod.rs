//! Canonical column vocabulary for the drug and adverse-event tables.
//!
//! Source files name their columns inconsistently (`drug`, `rxnorm_name`,
//! `L1_code`, `agegroup`, ...). Everything downstream of the loader only ever
//! sees the canonical names defined here.

pub mod age;
pub mod atc;
pub mod column;

use std::sync::Arc;

use arrow::datatypes::{Schema, SchemaRef};

pub use age::AgeGroup;
pub use atc::{AtcLevel, split_level_label};
pub use column::{AdeColumn, Column, Metric};

/// Value used for classification levels that were never populated
pub const UNKNOWN_SENTINEL: &str = "(unknown)";

/// Normalise a raw header name: trimmed and lower-cased
#[must_use]
pub fn normalize_header(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Build the Arrow schema for a drug table holding the given canonical columns.
///
/// Columns are emitted in the order given.
#[must_use]
pub fn drug_schema(columns: &[Column]) -> SchemaRef {
    Arc::new(Schema::new(
        columns.iter().map(|c| c.field()).collect::<Vec<_>>(),
    ))
}

/// Build the Arrow schema for an adverse-event table holding the given columns
#[must_use]
pub fn ade_schema(columns: &[AdeColumn]) -> SchemaRef {
    Arc::new(Schema::new(
        columns.iter().map(|c| c.field()).collect::<Vec<_>>(),
    ))
}
