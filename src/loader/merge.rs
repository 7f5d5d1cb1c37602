//! Left join of prescription volumes onto a publications table.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::aggregate::group_sum;
use crate::error::{ExplorerError, Result};
use crate::rowset::RowSet;
use crate::schema::{Column, Metric};

type JoinKey<'a> = SmallVec<[Option<&'a str>; 9]>;

/// Columns the two tables are aligned on: `cui` plus every ATC column the prescriptions table has
#[must_use]
pub fn join_keys(prescriptions: &RowSet) -> Vec<Column> {
    Column::ALL
        .into_iter()
        .filter(|&c| c == Column::Cui || c.is_level())
        .filter(|&c| prescriptions.has_column(c))
        .collect()
}

fn key_at<'a>(arrays: &[&'a StringArray], row: usize) -> JoinKey<'a> {
    arrays
        .iter()
        .map(|array| array.is_valid(row).then(|| array.value(row)))
        .collect()
}

/// Replace the publications table's prescription counts with the matching volumes.
///
/// Volumes are summed per join key first, so a key repeated in the
/// prescriptions table never duplicates publication rows. Publication rows
/// without a match get a volume of 0.
pub fn merge_prescriptions(publications: &RowSet, prescriptions: &RowSet) -> Result<RowSet> {
    let keys = join_keys(prescriptions);
    if !keys.contains(&Column::Cui) {
        return Err(ExplorerError::schema(
            "Prescriptions table needs a 'cui' column to join on",
        ));
    }
    if let Some(missing) = keys.iter().find(|&&c| !publications.has_column(c)) {
        return Err(ExplorerError::schema(format!(
            "Join column '{missing}' is missing from the publications table"
        )));
    }

    let volumes = group_sum(prescriptions, &keys)?;
    let volume_keys = keys
        .iter()
        .map(|&c| volumes.required_strings(c))
        .collect::<Result<Vec<_>>>()?;
    let volume_values = volumes.metric(Metric::Prescriptions)?;
    let lookup: FxHashMap<JoinKey<'_>, i64> = (0..volumes.num_rows())
        .map(|row| (key_at(&volume_keys, row), volume_values.value(row)))
        .collect();

    let publication_keys = keys
        .iter()
        .map(|&c| publications.required_strings(c))
        .collect::<Result<Vec<_>>>()?;
    let mut matched = 0usize;
    let joined: Int64Array = (0..publications.num_rows())
        .map(|row| {
            let volume = lookup.get(&key_at(&publication_keys, row)).copied();
            matched += usize::from(volume.is_some());
            volume.unwrap_or(0)
        })
        .collect::<Vec<_>>()
        .into();

    let batch = publications.batch();
    let target = batch
        .schema_ref()
        .index_of(Column::Prescriptions.name())
        .map_err(|_| ExplorerError::column_not_found(Column::Prescriptions.name()))?;
    let mut columns: Vec<ArrayRef> = batch.columns().to_vec();
    columns[target] = Arc::new(joined);

    log::info!(
        "Matched prescription volumes for {matched} of {} publication rows",
        publications.num_rows()
    );
    Ok(RowSet::from_batch(RecordBatch::try_new(
        batch.schema(),
        columns,
    )?))
}
