//! Normalisation of raw all-string tables into canonical row-sets.

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::compute::is_not_null;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use rustc_hash::FxHashMap;

use crate::aggregate::group_sum;
use crate::error::{ExplorerError, Result};
use crate::filter::filter_record_batch;
use crate::loader::LoadOptions;
use crate::rowset::{AdeSet, RowSet};
use crate::schema::{
    AdeColumn, AtcLevel, Column, UNKNOWN_SENTINEL, ade_schema, drug_schema, normalize_header,
    split_level_label,
};
use crate::utils::logging::{TableKind, log_data_warning};

/// Raw header name of the dedup flag
pub const IS_FIRST_HEADER: &str = "is_first";

/// Source column positions keyed by normalised header; the first duplicate wins
struct Headers {
    index: FxHashMap<String, usize>,
}

impl Headers {
    fn new(schema: &Schema) -> Self {
        let mut index = FxHashMap::default();
        for (i, field) in schema.fields().iter().enumerate() {
            index.entry(normalize_header(field.name())).or_insert(i);
        }
        Self { index }
    }

    /// Position of the first alias present
    fn find(&self, aliases: &[&str]) -> Option<usize> {
        aliases.iter().find_map(|alias| self.index.get(*alias).copied())
    }
}

fn text(batch: &RecordBatch, index: usize) -> Result<&StringArray> {
    batch
        .column(index)
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| ExplorerError::column_type(batch.schema_ref().field(index).name(), "string"))
}

/// Trimmed values, with empty strings as null
fn clean(array: &StringArray) -> StringArray {
    array
        .iter()
        .map(|value| value.map(str::trim).filter(|v| !v.is_empty()))
        .collect()
}

fn fill_unknown(array: &StringArray) -> StringArray {
    array
        .iter()
        .map(|value| Some(value.unwrap_or(UNKNOWN_SENTINEL)))
        .collect()
}

/// Parse a count leniently: integers, or finite non-negative decimals rounded
#[must_use]
pub fn parse_count(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(n) = value.parse::<i64>() {
        return (n >= 0).then_some(n);
    }
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v.round() as i64)
}

/// Parse a statistic leniently; NaN and infinities count as missing
#[must_use]
pub fn parse_statistic(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Metric column with nulls as zero, plus the number of values that had to be coerced
fn counts(source: Option<&StringArray>, num_rows: usize) -> (Int64Array, usize) {
    let Some(source) = source else {
        return (Int64Array::from(vec![0; num_rows]), 0);
    };
    let mut coerced = 0;
    let values = source
        .iter()
        .map(|value| match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => 0,
            Some(v) => parse_count(v).unwrap_or_else(|| {
                coerced += 1;
                0
            }),
        })
        .collect::<Vec<_>>();
    (Int64Array::from(values), coerced)
}

/// Keep only rows whose `is_first` flag equals 1, when the flag is present
fn keep_first_rows(raw: &RecordBatch, headers: &Headers) -> Result<RecordBatch> {
    let Some(index) = headers.find(&[IS_FIRST_HEADER]) else {
        return Ok(raw.clone());
    };
    let flags = text(raw, index)?;
    let mask: BooleanArray = flags
        .iter()
        .map(|flag| Some(flag.and_then(|f| f.trim().parse::<f64>().ok()) == Some(1.0)))
        .collect();

    let kept = filter_record_batch(raw, &mask)?;
    log::debug!(
        "Kept {} of {} rows flagged {IS_FIRST_HEADER} = 1",
        kept.num_rows(),
        raw.num_rows()
    );
    Ok(kept)
}

/// Code and name columns of one ATC level, if the source has either
fn level_columns(
    raw: &RecordBatch,
    headers: &Headers,
    level: AtcLevel,
) -> Result<(Option<StringArray>, Option<StringArray>)> {
    let explicit = |column: Column| {
        headers
            .find(column.aliases())
            .map(|index| text(raw, index).map(clean))
            .transpose()
    };
    let mut code = explicit(level.code_column())?;
    let mut name = explicit(level.name_column())?;

    if code.is_none() || name.is_none() {
        if let Some(index) = headers.find(&[level.label_header()]) {
            let labels = clean(text(raw, index)?);
            let pairs: Vec<Option<(&str, &str)>> =
                labels.iter().map(|label| label.map(split_level_label)).collect();
            code = code.or_else(|| Some(pairs.iter().map(|p| p.map(|(code, _)| code)).collect()));
            name = name.or_else(|| Some(pairs.iter().map(|p| p.map(|(_, name)| name)).collect()));
        }
    }

    Ok((
        code.as_ref().map(fill_unknown),
        name.as_ref().map(fill_unknown),
    ))
}

/// Normalise a raw drug table.
///
/// Headers are matched case-insensitively against the known aliases, rows not
/// flagged `is_first = 1` are dropped when the flag exists, string cells are
/// trimmed, missing classification values become `"(unknown)"` and metrics are
/// parsed leniently with missing values as zero. Rows sharing the same
/// identity and classification path are then summed into one.
pub fn normalize_drugs(raw: &RecordBatch, options: &LoadOptions) -> Result<RowSet> {
    let headers = Headers::new(raw.schema_ref());
    let raw = keep_first_rows(raw, &headers)?;
    let num_rows = raw.num_rows();

    let mut present: FxHashMap<Column, ArrayRef> = FxHashMap::default();
    for column in [Column::Cui, Column::DrugName, Column::TermType, Column::AgeGroup] {
        if let Some(index) = headers.find(column.aliases()) {
            present.insert(column, Arc::new(clean(text(&raw, index)?)));
        }
    }
    for level in AtcLevel::ALL {
        let (code, name) = level_columns(&raw, &headers, level)?;
        if let Some(code) = code {
            present.insert(level.code_column(), Arc::new(code));
        }
        if let Some(name) = name {
            present.insert(level.name_column(), Arc::new(name));
        }
    }

    if !present.contains_key(&Column::Cui) && !present.contains_key(&Column::DrugName) {
        return Err(ExplorerError::schema(
            "Drug table needs a 'cui' or 'drug_name' column",
        ));
    }
    if options.require_drug_name && !present.contains_key(&Column::DrugName) {
        return Err(ExplorerError::column_not_found(Column::DrugName.name()));
    }

    for metric in [Column::Publications, Column::Prescriptions] {
        let source = headers
            .find(metric.aliases())
            .map(|index| text(&raw, index))
            .transpose()?;
        let (values, coerced) = counts(source, num_rows);
        if coerced > 0 {
            log_data_warning(
                TableKind::Drugs,
                options.source.as_deref(),
                &format!("Treated {coerced} unparseable or negative '{metric}' values as 0"),
            );
        }
        present.insert(metric, Arc::new(values));
    }

    let columns: Vec<Column> = Column::ALL
        .into_iter()
        .filter(|c| present.contains_key(c))
        .collect();
    let arrays: Vec<ArrayRef> = columns
        .iter()
        .filter_map(|c| present.remove(c))
        .collect();
    let mut batch = RecordBatch::try_new(drug_schema(&columns), arrays)?;

    if options.require_drug_name {
        if let Some(names) = batch.column_by_name(Column::DrugName.name()) {
            let mask = is_not_null(names)?;
            let kept = filter_record_batch(&batch, &mask)?;
            let dropped = batch.num_rows() - kept.num_rows();
            if dropped > 0 {
                log_data_warning(
                    TableKind::Drugs,
                    options.source.as_deref(),
                    &format!("Dropped {dropped} rows without a drug name"),
                );
            }
            batch = kept;
        }
    }

    let rows = RowSet::from_batch(batch);
    let keys = rows.key_columns();
    group_sum(&rows, &keys)
}

/// Normalise a raw adverse-event table; statistics become nullable floats
pub fn normalize_adverse_events(raw: &RecordBatch) -> Result<AdeSet> {
    let headers = Headers::new(raw.schema_ref());

    let mut columns = Vec::new();
    let mut arrays: Vec<ArrayRef> = Vec::new();
    for column in AdeColumn::ALL {
        let Some(index) = headers.find(column.aliases()) else {
            continue;
        };
        let source = text(raw, index)?;
        let array: ArrayRef = if column.is_statistic() {
            Arc::new(
                source
                    .iter()
                    .map(|value| value.and_then(parse_statistic))
                    .collect::<Float64Array>(),
            )
        } else {
            Arc::new(clean(source))
        };
        columns.push(column);
        arrays.push(array);
    }

    if !columns.contains(&AdeColumn::Cui) && !columns.contains(&AdeColumn::DrugName) {
        return Err(ExplorerError::schema(
            "Adverse-event table needs a 'cui' or 'drug_name' column",
        ));
    }

    let batch = RecordBatch::try_new(ade_schema(&columns), arrays)?;
    Ok(AdeSet::from_batch(batch))
}
