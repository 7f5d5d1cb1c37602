//! Aggregation and ranking of filtered drug tables.

pub mod drilldown;
pub mod group;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rowset::RowSet;
use crate::schema::{Column, Metric};

pub use self::drilldown::{AdeQuery, AdeReport, drill_down, lookup_cui};
pub use self::group::group_sum;

/// Parameters of one ranking pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankRequest {
    /// Identity plus whichever classification columns survive into the result
    pub group_keys: Vec<Column>,
    pub metric: Metric,
    /// Already bounded by the caller
    pub top_n: usize,
    pub descending: bool,
}

impl RankRequest {
    /// Descending ranking by `metric`
    #[must_use]
    pub fn new(group_keys: Vec<Column>, metric: Metric, top_n: usize) -> Self {
        Self {
            group_keys,
            metric,
            top_n,
            descending: true,
        }
    }

    #[must_use]
    pub fn ascending(mut self) -> Self {
        self.descending = false;
        self
    }

    pub fn apply(&self, rows: &RowSet) -> Result<RowSet> {
        aggregate_and_rank(rows, &self.group_keys, self.metric, self.top_n, self.descending)
    }
}

/// Stable sort by a metric, then keep the first `top_n` rows.
///
/// Equal metric values keep their input order whichever direction is asked for.
pub fn rank(rows: &RowSet, metric: Metric, top_n: usize, descending: bool) -> Result<RowSet> {
    let values = rows.metric(metric)?.values();

    let mut order: Vec<usize> = (0..rows.num_rows()).collect();
    if descending {
        order.sort_by(|&a, &b| values[b].cmp(&values[a]));
    } else {
        order.sort_by(|&a, &b| values[a].cmp(&values[b]));
    }
    order.truncate(top_n);

    rows.take(&order)
}

/// Group by `group_keys`, sum both metrics, rank by `metric` and truncate.
pub fn aggregate_and_rank(
    rows: &RowSet,
    group_keys: &[Column],
    metric: Metric,
    top_n: usize,
    descending: bool,
) -> Result<RowSet> {
    let grouped = group_sum(rows, group_keys)?;
    let ranked = rank(&grouped, metric, top_n, descending)?;
    log::debug!(
        "Ranked {} groups by {}, kept {}",
        grouped.num_rows(),
        metric.label(),
        ranked.num_rows()
    );
    Ok(ranked)
}
