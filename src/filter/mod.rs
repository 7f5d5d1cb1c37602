//! Hierarchical filter engine
//!
//! Filters are boolean masks over Arrow record batches, composed conjunctively.
//! The hierarchy layer builds those chains from a user [`Selection`] and
//! derives the cascading option lists.

pub mod column;
pub mod core;
pub mod hierarchy;

pub use self::column::{CaseInsensitiveEqFilter, ColumnEqFilter, ColumnInFilter, fold_case};
pub use self::core::{AndFilter, BatchFilter, IncludeAllFilter, filter_record_batch, filter_table};
pub use self::hierarchy::{
    ALL_OPTION, Cascade, Identity, LevelOption, Selection, available_age_groups,
    available_values, cascade, code_from_label, distinct_sorted, filter, is_all_choice,
    level_options, with_all_option,
};
