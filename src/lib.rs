//! Hierarchical ATC filtering, aggregation and ranking over pediatric
//! drug-safety tables (publication counts, prescription volumes and
//! adverse-event disproportionality statistics).
//!
//! Data flows raw file → [`loader`] → [`RowSet`] → [`filter`] →
//! [`aggregate`] → [`export`]; [`Explorer`] runs that pass per interaction.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod explorer;
pub mod export;
pub mod filter;
pub mod loader;
pub mod rowset;
pub mod schema;
pub mod utils;

// Core types
pub use config::{DataSource, DatasetLayout, ExplorerConfig, TopNBounds};
pub use error::{EmptyResultWarning, ExplorerError, Result};
pub use explorer::{DatasetCaches, Explorer, Query, QueryResult};
pub use rowset::{AdeSet, RowSet, Table, TableColumn};
pub use schema::{AdeColumn, AgeGroup, AtcLevel, Column, Metric, UNKNOWN_SENTINEL};

// Arrow types
pub use arrow::record_batch::RecordBatch;

// Pipeline stages
pub use aggregate::{AdeQuery, AdeReport, RankRequest, aggregate_and_rank, drill_down, group_sum, rank};
pub use filter::{Cascade, Identity, Selection, available_values, cascade, filter};
pub use loader::{DatasetCache, LoadOptions, load, load_adverse_events, load_path};
