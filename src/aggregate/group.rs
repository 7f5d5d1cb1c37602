//! Group-and-sum kernel shared by load-time dedup and ranking.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Int64Array, UInt64Array};
use arrow::compute::take;
use arrow::record_batch::RecordBatch;
use itertools::Itertools;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::{ExplorerError, Result};
use crate::rowset::RowSet;
use crate::schema::{Column, Metric, drug_schema};

/// Borrowed grouping key; identity plus the full ATC path fits inline
type GroupKey<'a> = SmallVec<[Option<&'a str>; 12]>;

struct Group {
    first_row: usize,
    publications: i64,
    prescriptions: i64,
}

/// Group rows by `keys` and sum both metrics within each group.
///
/// Groups are emitted in order of first appearance. Null key values form their
/// own group; no input row is dropped. The output holds the key columns in the
/// order given, followed by `publication_count` and `prescription_count`.
pub fn group_sum(rows: &RowSet, keys: &[Column]) -> Result<RowSet> {
    let keys: Vec<Column> = keys.iter().copied().unique().collect();
    if let Some(metric) = keys.iter().find(|c| c.is_metric()) {
        return Err(ExplorerError::schema(format!(
            "Metric column '{metric}' cannot be a grouping key"
        )));
    }

    let key_arrays = keys
        .iter()
        .map(|&c| rows.required_strings(c))
        .collect::<Result<Vec<_>>>()?;
    let publications = rows.metric(Metric::Publications)?;
    let prescriptions = rows.metric(Metric::Prescriptions)?;

    let mut index: FxHashMap<GroupKey<'_>, usize> = FxHashMap::default();
    let mut groups: Vec<Group> = Vec::new();

    for row in 0..rows.num_rows() {
        let key: GroupKey<'_> = key_arrays
            .iter()
            .map(|array| array.is_valid(row).then(|| array.value(row)))
            .collect();

        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Group {
                first_row: row,
                publications: 0,
                prescriptions: 0,
            });
            groups.len() - 1
        });

        let group = &mut groups[slot];
        group.publications = group.publications.saturating_add(publications.value(row));
        group.prescriptions = group.prescriptions.saturating_add(prescriptions.value(row));
    }

    let first_rows = UInt64Array::from_iter_values(groups.iter().map(|g| g.first_row as u64));
    let mut columns = key_arrays
        .iter()
        .map(|array| take(*array, &first_rows, None))
        .collect::<std::result::Result<Vec<ArrayRef>, _>>()?;
    columns.push(Arc::new(Int64Array::from_iter_values(
        groups.iter().map(|g| g.publications),
    )));
    columns.push(Arc::new(Int64Array::from_iter_values(
        groups.iter().map(|g| g.prescriptions),
    )));

    let mut output = keys;
    output.extend([Column::Publications, Column::Prescriptions]);
    let batch = RecordBatch::try_new(drug_schema(&output), columns)?;

    log::debug!(
        "Grouped {} rows into {} groups",
        rows.num_rows(),
        batch.num_rows()
    );
    Ok(RowSet::from_batch(batch))
}
