//! Immutable in-memory tables over Arrow record batches.
//!
//! Every filter and aggregation step produces a new table; nothing is mutated
//! in place, so a loaded table can be shared read-only (behind an `Arc`) by any
//! number of callers.

use std::fmt;
use std::marker::PhantomData;

use arrow::array::{Array, ArrayRef, Float64Array, Int64Array, StringArray, UInt64Array};
use arrow::compute::take_record_batch;
use arrow::datatypes::{DataType, Field};
use arrow::record_batch::RecordBatch;

use crate::error::{ExplorerError, Result};
use crate::schema::{AdeColumn, Column, Metric};

/// A canonical column vocabulary a [`Table`] can be keyed by
pub trait TableColumn: Copy + Eq + fmt::Debug + fmt::Display + 'static {
    /// Every column of the vocabulary, in canonical order
    fn all() -> &'static [Self];

    fn name(self) -> &'static str;

    fn field(self) -> Field;

    /// Look up a column by its canonical (not alias) name
    fn from_canonical(name: &str) -> Option<Self> {
        Self::all().iter().copied().find(|c| c.name() == name)
    }
}

impl TableColumn for Column {
    fn all() -> &'static [Self] {
        &Self::ALL
    }

    fn name(self) -> &'static str {
        Self::name(self)
    }

    fn field(self) -> Field {
        Self::field(self)
    }
}

impl TableColumn for AdeColumn {
    fn all() -> &'static [Self] {
        &Self::ALL
    }

    fn name(self) -> &'static str {
        Self::name(self)
    }

    fn field(self) -> Field {
        Self::field(self)
    }
}

/// A record batch whose columns are all drawn from one canonical vocabulary
#[derive(Debug, Clone, PartialEq)]
pub struct Table<C: TableColumn> {
    batch: RecordBatch,
    _columns: PhantomData<C>,
}

/// Normalised drug table (publications, prescriptions, ATC path)
pub type RowSet = Table<Column>;

/// Normalised adverse-event table
pub type AdeSet = Table<AdeColumn>;

impl<C: TableColumn> Table<C> {
    /// Wrap a record batch, checking every field is a canonical column of the right type
    pub fn try_new(batch: RecordBatch) -> Result<Self> {
        for field in batch.schema().fields() {
            let column = C::from_canonical(field.name())
                .ok_or_else(|| ExplorerError::schema(format!("Unexpected column '{}'", field.name())))?;
            let expected = column.field();
            if field.data_type() != expected.data_type() {
                return Err(ExplorerError::column_type(
                    column.name(),
                    &expected.data_type().to_string(),
                ));
            }
        }
        Ok(Self::from_batch(batch))
    }

    /// Wrap a batch already known to follow the vocabulary
    pub(crate) fn from_batch(batch: RecordBatch) -> Self {
        Self {
            batch,
            _columns: PhantomData,
        }
    }

    #[must_use]
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    /// Columns present, in batch order
    #[must_use]
    pub fn columns(&self) -> Vec<C> {
        self.batch
            .schema()
            .fields()
            .iter()
            .filter_map(|f| C::from_canonical(f.name()))
            .collect()
    }

    #[must_use]
    pub fn has_column(&self, column: C) -> bool {
        self.batch.schema().index_of(column.name()).is_ok()
    }

    /// Raw array for a column, if present
    #[must_use]
    pub fn array(&self, column: C) -> Option<&ArrayRef> {
        self.batch.column_by_name(column.name())
    }

    /// A string column, `None` when the dataset never had it
    pub fn strings(&self, column: C) -> Result<Option<&StringArray>> {
        self.array(column)
            .map(|array| {
                array
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| ExplorerError::column_type(column.name(), "string"))
            })
            .transpose()
    }

    /// A string column the calling operation cannot do without
    pub fn required_strings(&self, column: C) -> Result<&StringArray> {
        self.strings(column)?
            .ok_or_else(|| ExplorerError::column_not_found(column.name()))
    }

    /// Convenience accessor for a single string cell
    #[must_use]
    pub fn value(&self, column: C, row: usize) -> Option<&str> {
        let array = self.strings(column).ok().flatten()?;
        (row < array.len() && array.is_valid(row)).then(|| array.value(row))
    }

    /// Keep only the given columns, in the given order
    pub fn project(&self, columns: &[C]) -> Result<Self> {
        let schema = self.batch.schema();
        let indices = columns
            .iter()
            .map(|c| {
                schema
                    .index_of(c.name())
                    .map_err(|_| ExplorerError::column_not_found(c.name()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::from_batch(self.batch.project(&indices)?))
    }

    /// Gather rows by position, in the order given
    pub fn take(&self, rows: &[usize]) -> Result<Self> {
        let indices = UInt64Array::from_iter_values(rows.iter().map(|&i| i as u64));
        Ok(Self::from_batch(take_record_batch(&self.batch, &indices)?))
    }

    /// Keep the first `n` rows
    #[must_use]
    pub fn head(&self, n: usize) -> Self {
        Self::from_batch(self.batch.slice(0, n.min(self.num_rows())))
    }
}

impl RowSet {
    /// The summed metric column
    pub fn metric(&self, metric: Metric) -> Result<&Int64Array> {
        let column = metric.column();
        self.array(column)
            .ok_or_else(|| ExplorerError::column_not_found(column.name()))?
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| ExplorerError::column_type(column.name(), "Int64"))
    }

    /// Sum of a metric over every row
    pub fn total(&self, metric: Metric) -> Result<i64> {
        Ok(self.metric(metric)?.values().iter().sum())
    }

    /// Present non-metric columns, i.e. the identity and classification key
    #[must_use]
    pub fn key_columns(&self) -> Vec<Column> {
        self.columns().into_iter().filter(|c| !c.is_metric()).collect()
    }
}

impl AdeSet {
    /// A disproportionality statistic column
    pub fn statistic(&self, column: AdeColumn) -> Result<Option<&Float64Array>> {
        if !matches!(column.field().data_type(), DataType::Float64) {
            return Err(ExplorerError::column_type(column.name(), "Float64"));
        }
        self.array(column)
            .map(|array| {
                array
                    .as_any()
                    .downcast_ref::<Float64Array>()
                    .ok_or_else(|| ExplorerError::column_type(column.name(), "Float64"))
            })
            .transpose()
    }

    /// Convenience accessor for a single statistic cell
    #[must_use]
    pub fn statistic_value(&self, column: AdeColumn, row: usize) -> Option<f64> {
        let array = self.statistic(column).ok().flatten()?;
        (row < array.len() && array.is_valid(row)).then(|| array.value(row))
    }
}
