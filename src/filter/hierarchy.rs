//! Cascading ATC hierarchy selection.
//!
//! A [`Selection`] holds an optional code per level, an optional age stratum
//! and an optional set of drug identities. The options offered at level k+1
//! are recomputed from the rows left after applying levels 1..=k, so the
//! cascade is plain function composition over immutable row-sets.

use std::collections::BTreeSet;
use std::fmt;

use arrow::array::Array;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filter::column::{ColumnEqFilter, ColumnInFilter};
use crate::filter::core::{AndFilter, filter_table};
use crate::rowset::RowSet;
use crate::schema::{AgeGroup, AtcLevel, Column};

/// Label of the "no filter" choice offered first at every level
pub const ALL_OPTION: &str = "(all)";

/// Separator between code and name in option labels (`"N06 — Psychoanaleptics"`)
pub const OPTION_SEPARATOR: &str = " — ";

/// Whether a user choice means "no filter"
#[must_use]
pub fn is_all_choice(choice: &str) -> bool {
    let choice = choice.trim();
    choice.is_empty()
        || choice.eq_ignore_ascii_case("all")
        || choice.eq_ignore_ascii_case(ALL_OPTION)
}

/// Recover the code from an option label; `None` for the "all" choice
#[must_use]
pub fn code_from_label(label: &str) -> Option<&str> {
    if is_all_choice(label) {
        return None;
    }
    let code = label
        .split_once(OPTION_SEPARATOR)
        .map_or(label, |(code, _)| code);
    Some(code.trim())
}

/// Prefix a list of level values with the "all" option
#[must_use]
pub fn with_all_option(values: &[String]) -> Vec<String> {
    std::iter::once(ALL_OPTION.to_string())
        .chain(values.iter().cloned())
        .collect()
}

/// Which column identifies a drug in identity selections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Identity {
    Cui,
    #[default]
    DrugName,
}

impl Identity {
    #[must_use]
    pub const fn column(self) -> Column {
        match self {
            Self::Cui => Column::Cui,
            Self::DrugName => Column::DrugName,
        }
    }
}

/// The user's current choices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    /// Chosen code per level (L1..L4); `None` means all
    pub levels: [Option<String>; 4],
    /// Exact age stratum to keep
    pub age_group: Option<AgeGroup>,
    /// Drug identities to keep; empty means all
    pub identities: BTreeSet<String>,
    /// Column the identities are matched against
    pub identity: Identity,
}

impl Selection {
    /// A selection that restricts nothing
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Choose a level value; accepts a bare code, an option label, or an "all" choice
    #[must_use]
    pub fn with_level(mut self, level: AtcLevel, choice: &str) -> Self {
        self.levels[level.index()] = code_from_label(choice).map(str::to_owned);
        self
    }

    #[must_use]
    pub fn with_age_group(mut self, age_group: AgeGroup) -> Self {
        self.age_group = Some(age_group);
        self
    }

    /// Restrict to a set of drug identities matched against `identity`
    #[must_use]
    pub fn with_identities<I, S>(mut self, identity: Identity, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.identity = identity;
        self.identities = values.into_iter().map(Into::into).collect();
        self
    }

    /// The chosen code at a level, if any
    #[must_use]
    pub fn level(&self, level: AtcLevel) -> Option<&str> {
        self.levels[level.index()].as_deref()
    }

    /// Whether applying this selection returns its input unchanged
    #[must_use]
    pub fn is_unrestricted(&self) -> bool {
        self.levels.iter().all(Option::is_none)
            && self.age_group.is_none()
            && self.identities.is_empty()
    }

    /// The conjunctive filter chain: L1, L2, L3, L4, then age, then identity
    #[must_use]
    pub fn to_filter(&self) -> AndFilter {
        let mut filter = self.hierarchy_filter();
        if let Some(age) = self.age_group {
            filter = filter.and(ColumnEqFilter::new(Column::AgeGroup, age.as_str()));
        }
        if !self.identities.is_empty() {
            filter = filter.and(ColumnInFilter::new(
                self.identity.column(),
                self.identities.iter().cloned(),
            ));
        }
        filter
    }

    /// Only the classification-level part of the chain
    #[must_use]
    pub fn hierarchy_filter(&self) -> AndFilter {
        AtcLevel::ALL
            .into_iter()
            .filter_map(|level| {
                self.level(level)
                    .map(|code| ColumnEqFilter::new(level.code_column(), code))
            })
            .fold(AndFilter::default(), |chain, filter| chain.and(filter))
    }

    /// The same selection without any level choices
    #[must_use]
    pub fn without_hierarchy(&self) -> Self {
        Self {
            levels: Default::default(),
            ..self.clone()
        }
    }
}

/// Narrow a row-set to the rows matching a selection.
///
/// Stable: surviving rows keep their input order. An unrestricted selection
/// returns the input unchanged.
pub fn filter(rows: &RowSet, selection: &Selection) -> Result<RowSet> {
    if selection.is_unrestricted() {
        return Ok(rows.clone());
    }

    let filtered = filter_table(rows, &selection.to_filter())?;
    log::debug!(
        "Filtered {} rows down to {} with {:?}",
        rows.num_rows(),
        filtered.num_rows(),
        selection
    );
    Ok(filtered)
}

/// Distinct non-null codes of a level in the given rows, sorted ascending.
///
/// A dataset without the level column offers no values.
#[must_use]
pub fn available_values(rows: &RowSet, level: AtcLevel) -> Vec<String> {
    distinct_sorted(rows, level.code_column())
}

/// Distinct non-null values of any string column, sorted ascending
#[must_use]
pub fn distinct_sorted(rows: &RowSet, column: Column) -> Vec<String> {
    match rows.strings(column) {
        Ok(Some(array)) => array
            .iter()
            .flatten()
            .unique()
            .sorted()
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

/// A selectable level value with its human-readable name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LevelOption {
    pub code: String,
    pub name: String,
}

impl LevelOption {
    /// `"CODE — NAME"`, or just the code when the name adds nothing
    #[must_use]
    pub fn label(&self) -> String {
        if self.name.is_empty() || self.name == self.code {
            self.code.clone()
        } else {
            format!("{}{OPTION_SEPARATOR}{}", self.code, self.name)
        }
    }
}

impl fmt::Display for LevelOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Distinct `(code, name)` pairs of a level, sorted by label
pub fn level_options(rows: &RowSet, level: AtcLevel) -> Result<Vec<LevelOption>> {
    let Some(codes) = rows.strings(level.code_column())? else {
        return Ok(Vec::new());
    };
    let names = rows.strings(level.name_column())?;

    Ok((0..codes.len())
        .filter(|&row| codes.is_valid(row))
        .map(|row| {
            let code = codes.value(row);
            let name = names
                .filter(|n| n.is_valid(row))
                .map_or(code, |n| n.value(row));
            (code, name)
        })
        .unique()
        .map(|(code, name)| LevelOption {
            code: code.to_string(),
            name: name.to_string(),
        })
        .sorted_by_key(LevelOption::label)
        .collect())
}

/// Age strata present in the rows, in display order; all four if none are present
#[must_use]
pub fn available_age_groups(rows: &RowSet) -> Vec<AgeGroup> {
    let present = distinct_sorted(rows, Column::AgeGroup);
    let available: Vec<AgeGroup> = AgeGroup::ORDER
        .into_iter()
        .filter(|age| present.iter().any(|p| p == age.as_str()))
        .collect();
    if available.is_empty() {
        AgeGroup::ORDER.to_vec()
    } else {
        available
    }
}

/// Everything a front end needs to render the cascading filters
#[derive(Debug, Clone, PartialEq)]
pub struct Cascade {
    /// Values offered at each level, given the choices above it
    pub level_values: [Vec<String>; 4],
    /// Rows after the level filters only
    pub hierarchy_rows: RowSet,
    /// Drug names available for the identity picker
    pub drug_options: Vec<String>,
    /// Age strata available for the age picker
    pub age_options: Vec<AgeGroup>,
    /// Rows after every filter in the selection
    pub rows: RowSet,
}

/// Resolve a selection level by level, recording the options offered at each step
pub fn cascade(rows: &RowSet, selection: &Selection) -> Result<Cascade> {
    let mut current = rows.clone();
    let mut level_values: [Vec<String>; 4] = Default::default();

    for level in AtcLevel::ALL {
        level_values[level.index()] = available_values(&current, level);
        if let Some(code) = selection.level(level) {
            current = filter_table(&current, &ColumnEqFilter::new(level.code_column(), code))?;
        }
    }

    let drug_options = distinct_sorted(&current, Column::DrugName);
    let age_options = available_age_groups(rows);
    let filtered = filter(&current, &selection.without_hierarchy())?;

    Ok(Cascade {
        level_values,
        hierarchy_rows: current,
        drug_options,
        age_options,
        rows: filtered,
    })
}
