//! Single-column filters over string columns.

use std::collections::{BTreeSet, HashSet};

use arrow::array::{Array, BooleanArray, StringArray};
use arrow::compute::kernels::cmp::eq;
use arrow::record_batch::RecordBatch;

use crate::error::{ExplorerError, Result};
use crate::filter::core::BatchFilter;
use crate::rowset::TableColumn;

/// Look up a string column by canonical name
fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ExplorerError::column_not_found(name))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| ExplorerError::column_type(name, "string"))
}

/// Keeps rows whose column value equals a literal exactly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnEqFilter<C: TableColumn> {
    column: C,
    value: String,
}

impl<C: TableColumn> ColumnEqFilter<C> {
    #[must_use]
    pub fn new(column: C, value: impl Into<String>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

impl<C: TableColumn + Send + Sync> BatchFilter for ColumnEqFilter<C> {
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        let array = string_column(batch, self.column.name())?;
        Ok(eq(array, &StringArray::new_scalar(self.value.as_str()))?)
    }

    fn required_columns(&self) -> HashSet<&'static str> {
        HashSet::from([self.column.name()])
    }
}

/// Keeps rows whose column value is a member of a set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInFilter<C: TableColumn> {
    column: C,
    values: BTreeSet<String>,
}

impl<C: TableColumn> ColumnInFilter<C> {
    #[must_use]
    pub fn new<I, S>(column: C, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            column,
            values: values.into_iter().map(Into::into).collect(),
        }
    }
}

impl<C: TableColumn + Send + Sync> BatchFilter for ColumnInFilter<C> {
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        let array = string_column(batch, self.column.name())?;
        Ok(array
            .iter()
            .map(|value| Some(value.is_some_and(|v| self.values.contains(v))))
            .collect())
    }

    fn required_columns(&self) -> HashSet<&'static str> {
        HashSet::from([self.column.name()])
    }
}

/// Caseless form of a label: trimmed and lowercased, with the lowercase
/// letters that still have a caseless spelling replaced by it
#[must_use]
pub fn fold_case(value: &str) -> String {
    let lower = value.trim().to_lowercase();
    let mut folded = String::with_capacity(lower.len());
    for c in lower.chars() {
        match c {
            'ß' => folded.push_str("ss"),
            'ſ' => folded.push('s'),
            'ς' => folded.push('σ'),
            _ => folded.push(c),
        }
    }
    folded
}

/// Keeps rows whose column value equals a literal, ignoring case and
/// surrounding whitespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseInsensitiveEqFilter<C: TableColumn> {
    column: C,
    folded: String,
}

impl<C: TableColumn> CaseInsensitiveEqFilter<C> {
    #[must_use]
    pub fn new(column: C, value: &str) -> Self {
        Self {
            column,
            folded: fold_case(value),
        }
    }
}

impl<C: TableColumn + Send + Sync> BatchFilter for CaseInsensitiveEqFilter<C> {
    fn mask(&self, batch: &RecordBatch) -> Result<BooleanArray> {
        let array = string_column(batch, self.column.name())?;
        Ok(array
            .iter()
            .map(|value| Some(value.is_some_and(|v| fold_case(v) == self.folded)))
            .collect())
    }

    fn required_columns(&self) -> HashSet<&'static str> {
        HashSet::from([self.column.name()])
    }
}
