//! One explorer session over loaded, immutable datasets.
//!
//! Every interaction is a full recomputation pass: cascade the selection,
//! aggregate and rank, project for display. The loaded tables sit behind
//! `Arc` and are never modified, so one `Explorer` can serve any number of
//! concurrent callers.

use std::sync::Arc;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::aggregate::{AdeQuery, AdeReport, aggregate_and_rank, drill_down};
use crate::config::{DatasetLayout, ExplorerConfig, TopNBounds};
use crate::error::{EmptyResultWarning, ExplorerError, Result};
use crate::filter::{
    Cascade, LevelOption, Selection, available_age_groups, cascade, level_options, with_all_option,
};
use crate::loader::{self, DatasetCache, LoadOptions, merge_prescriptions};
use crate::rowset::{AdeSet, RowSet};
use crate::schema::{AgeGroup, AtcLevel, Column, Metric};
use crate::utils::logging::{TableKind, log_data_warning};

/// Caches a long-running front end keeps between sessions
#[derive(Debug, Default)]
pub struct DatasetCaches {
    pub drugs: DatasetCache<RowSet>,
    pub adverse_events: DatasetCache<AdeSet>,
}

/// What the user asked for in one interaction
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Query {
    pub selection: Selection,
    pub metric: Metric,
    pub descending: bool,
    /// Requested row count; bounded by the session's [`TopNBounds`]
    pub top_n: Option<usize>,
    /// Classification levels to carry into the results table
    pub extra_levels: Vec<AtcLevel>,
}

impl Query {
    /// Descending ranking of the selection by `metric`
    #[must_use]
    pub fn new(selection: Selection, metric: Metric) -> Self {
        Self {
            selection,
            metric,
            descending: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = Some(top_n);
        self
    }

    #[must_use]
    pub fn ascending(mut self) -> Self {
        self.descending = false;
        self
    }

    #[must_use]
    pub fn with_extra_levels(mut self, levels: impl IntoIterator<Item = AtcLevel>) -> Self {
        self.extra_levels = levels.into_iter().unique().collect();
        self
    }
}

/// Output of one recomputation pass
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Options and intermediate row-sets of the cascading filters
    pub cascade: Cascade,
    /// Ranked groups with every grouping key
    pub ranked: RowSet,
    /// `ranked` projected to the results-table columns
    pub display: RowSet,
    /// The bounded top-N actually applied
    pub top_n: usize,
    pub warning: Option<EmptyResultWarning>,
}

/// A session over one drug table and, optionally, an adverse-event table
#[derive(Debug, Clone)]
pub struct Explorer {
    layout: DatasetLayout,
    drugs: Arc<RowSet>,
    adverse_events: Option<Arc<AdeSet>>,
    top_n: TopNBounds,
}

impl Explorer {
    #[must_use]
    pub fn new(layout: DatasetLayout, drugs: Arc<RowSet>) -> Self {
        Self {
            layout,
            drugs,
            adverse_events: None,
            top_n: TopNBounds::default(),
        }
    }

    #[must_use]
    pub fn with_adverse_events(mut self, adverse_events: Arc<AdeSet>) -> Self {
        self.adverse_events = Some(adverse_events);
        self
    }

    #[must_use]
    pub fn with_top_n_bounds(mut self, bounds: TopNBounds) -> Self {
        self.top_n = bounds;
        self
    }

    /// Resolve and load the configured sources, reusing cached tables
    pub fn open(config: &ExplorerConfig, caches: &DatasetCaches) -> Result<Self> {
        config.validate()?;
        let options = LoadOptions::from_config(config);

        let drugs = match config.layout {
            DatasetLayout::Stratified => {
                let path = config.require(&config.drugs)?;
                caches
                    .drugs
                    .get_or_load(&path, |p| loader::load_path(p, &options))?
            }
            DatasetLayout::Merged => {
                let pubs_path = config.require(&config.publications)?;
                let rx_path = config.require(&config.prescriptions)?;
                let pubs_options = options.clone().with_drug_name_required();
                let pubs = caches
                    .drugs
                    .get_or_load(&pubs_path, |p| loader::load_path(p, &pubs_options))?;
                let rx = caches
                    .drugs
                    .get_or_load(&rx_path, |p| loader::load_path(p, &options))?;
                Arc::new(merge_prescriptions(&pubs, &rx)?)
            }
        };

        let mut explorer = Self::new(config.layout, drugs).with_top_n_bounds(config.top_n);
        match config.resolve(&config.adverse_events) {
            Some(path) => {
                let ade = caches
                    .adverse_events
                    .get_or_load(&path, |p| loader::load_adverse_events_path(p, &options))?;
                explorer = explorer.with_adverse_events(ade);
            }
            None => log_data_warning(
                TableKind::AdverseEvents,
                None,
                &format!("no file found for {}; drill-down disabled", config.adverse_events),
            ),
        }
        Ok(explorer)
    }

    #[must_use]
    pub fn layout(&self) -> DatasetLayout {
        self.layout
    }

    /// The unfiltered drug table
    #[must_use]
    pub fn drugs(&self) -> &RowSet {
        &self.drugs
    }

    #[must_use]
    pub fn adverse_events(&self) -> Option<&AdeSet> {
        self.adverse_events.as_deref()
    }

    #[must_use]
    pub fn top_n_bounds(&self) -> TopNBounds {
        self.top_n
    }

    /// Age stratum a stratified ranking uses when none is chosen: the first one present.
    ///
    /// `None` for the merged layout and for tables without an age column.
    #[must_use]
    pub fn default_age_group(&self) -> Option<AgeGroup> {
        if self.layout != DatasetLayout::Stratified || !self.drugs.has_column(Column::AgeGroup) {
            return None;
        }
        available_age_groups(&self.drugs).first().copied()
    }

    /// Choices offered at `level` given the selections above it, led by `(all)`
    pub fn level_choices(&self, selection: &Selection, level: AtcLevel) -> Result<Vec<String>> {
        let cascade = cascade(&self.drugs, selection)?;
        Ok(with_all_option(&cascade.level_values[level.index()]))
    }

    /// `(code, name)` options at `level` given the selections above it
    pub fn level_options(&self, selection: &Selection, level: AtcLevel) -> Result<Vec<LevelOption>> {
        let mut above = Selection::all();
        for &ancestor in level.ancestors() {
            above.levels[ancestor.index()] = selection.level(ancestor).map(str::to_owned);
        }
        let rows = cascade(&self.drugs, &above)?.hierarchy_rows;
        level_options(&rows, level)
    }

    /// Keys the results are grouped by, limited to columns the data has
    fn group_keys(&self, extra_levels: &[AtcLevel]) -> Vec<Column> {
        self.layout
            .group_keys(extra_levels)
            .into_iter()
            .filter(|&c| self.drugs.has_column(c))
            .collect()
    }

    /// Cascade, aggregate, rank and project one query
    pub fn run(&self, query: &Query) -> Result<QueryResult> {
        let cascade = cascade(&self.drugs, &query.selection)?;
        let top_n = self.top_n.clamp(query.top_n);
        let keys = self.group_keys(&query.extra_levels);

        let ranked = aggregate_and_rank(&cascade.rows, &keys, query.metric, top_n, query.descending)?;
        let identity = if ranked.has_column(Column::DrugName) {
            Column::DrugName
        } else {
            Column::Cui
        };
        let display_columns: Vec<Column> = self
            .layout
            .display_columns(&query.extra_levels, identity)
            .into_iter()
            .filter(|&c| ranked.has_column(c))
            .collect();
        let display = ranked.project(&display_columns)?;

        let warning = ranked
            .is_empty()
            .then(|| EmptyResultWarning::new(describe(&query.selection)));
        log::debug!(
            "Query over {} rows produced {} ranked rows",
            cascade.rows.num_rows(),
            ranked.num_rows()
        );

        Ok(QueryResult {
            cascade,
            ranked,
            display,
            top_n,
            warning,
        })
    }

    /// Adverse events for a drug picked from the results
    pub fn drill_down(&self, drug_name: &str, age_group: Option<AgeGroup>) -> Result<AdeReport> {
        let ade = self
            .adverse_events
            .as_deref()
            .ok_or_else(|| ExplorerError::config("No adverse-event table is loaded"))?;
        let query = AdeQuery::for_drug(&self.drugs, drug_name, age_group)?;
        drill_down(ade, &query)
    }
}

/// Short human description of a selection, for notices
#[must_use]
pub fn describe(selection: &Selection) -> String {
    let path = selection.levels.iter().flatten().join(" > ");
    let mut parts = Vec::new();
    parts.push(if path.is_empty() { "all drugs".to_string() } else { path });
    if let Some(age) = selection.age_group {
        parts.push(age.to_string());
    }
    if !selection.identities.is_empty() {
        parts.push(selection.identities.iter().join(", "));
    }
    parts.join(" — ")
}
