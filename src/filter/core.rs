//! Core filtering functionality for drug and adverse-event tables
//!
//! Filters evaluate to a boolean mask over a record batch; applying the mask
//! keeps matching rows in their original relative order.

use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::BooleanArray;
use arrow::compute::filter_record_batch as arrow_filter_record_batch;
use arrow::record_batch::RecordBatch;

use crate::error::{ExplorerError, Result};
use crate::rowset::{Table, TableColumn};

/// Filter a record batch based on a boolean mask
///
/// # Arguments
/// * `batch` - The record batch to filter
/// * `mask` - The boolean mask indicating which rows to keep (null counts as false)
///
/// # Returns
/// A new record batch with only rows where mask is true
pub fn filter_record_batch(batch: &RecordBatch, mask: &BooleanArray) -> Result<RecordBatch> {
    if batch.num_rows() != mask.len() {
        return Err(ExplorerError::schema(format!(
            "Mask length ({}) doesn't match batch row count ({})",
            mask.len(),
            batch.num_rows()
        )));
    }

    Ok(arrow_filter_record_batch(batch, mask)?)
}

/// Trait for objects that can filter record batches
pub trait BatchFilter: std::fmt::Debug + Send + Sync {
    /// Evaluate the filter to a row mask
    ///
    /// # Errors
    /// Returns a schema error if a required column is missing or mistyped
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray>;

    /// Filter a record batch
    fn filter(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        let mask = self.mask(batch)?;
        filter_record_batch(batch, &mask)
    }

    /// Returns the set of column names required by this filter
    fn required_columns(&self) -> HashSet<&'static str>;
}

/// Apply a filter to a table, producing a new table
pub fn filter_table<C: TableColumn>(
    table: &Table<C>,
    filter: &dyn BatchFilter,
) -> Result<Table<C>> {
    Ok(Table::from_batch(filter.filter(table.batch())?))
}

/// A filter that always includes all rows
#[derive(Debug, Clone, Default)]
pub struct IncludeAllFilter;

impl BatchFilter for IncludeAllFilter {
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        Ok(BooleanArray::from(vec![true; batch.num_rows()]))
    }

    fn filter(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        Ok(batch.clone())
    }

    fn required_columns(&self) -> HashSet<&'static str> {
        HashSet::new()
    }
}

/// A filter that combines multiple filters with a logical AND
///
/// Filters run in insertion order, each on the output of the previous one.
#[derive(Debug, Clone, Default)]
pub struct AndFilter {
    filters: Vec<Arc<dyn BatchFilter>>,
}

impl AndFilter {
    /// Create a new AND filter
    #[must_use]
    pub fn new(filters: Vec<Arc<dyn BatchFilter>>) -> Self {
        Self { filters }
    }

    /// Append a filter to the chain
    #[must_use]
    pub fn and(mut self, filter: impl BatchFilter + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }
}

impl BatchFilter for AndFilter {
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        let mut result = IncludeAllFilter.mask(batch)?;
        for filter in &self.filters {
            let mask = filter.mask(batch)?;
            result = arrow::compute::and(&result, &mask)?;
        }
        Ok(result)
    }

    fn filter(&self, batch: &RecordBatch) -> Result<RecordBatch> {
        let mut result_batch = batch.clone();

        for filter in &self.filters {
            // Every filter still validates its columns on an empty batch
            result_batch = filter.filter(&result_batch)?;
        }

        Ok(result_batch)
    }

    fn required_columns(&self) -> HashSet<&'static str> {
        let mut columns = HashSet::new();
        for filter in &self.filters {
            columns.extend(filter.required_columns());
        }
        columns
    }
}
