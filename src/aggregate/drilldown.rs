//! Adverse-event drill-down for a single drug.

use std::cmp::Ordering;

use arrow::array::Array;

use crate::error::{EmptyResultWarning, Result};
use crate::filter::{AndFilter, CaseInsensitiveEqFilter, ColumnEqFilter, filter_table};
use crate::rowset::{AdeSet, RowSet};
use crate::schema::{AdeColumn, AgeGroup, Column};

/// First non-null CUI recorded for a drug name in the drug table
pub fn lookup_cui(drugs: &RowSet, drug_name: &str) -> Result<Option<String>> {
    let Some(cuis) = drugs.strings(Column::Cui)? else {
        return Ok(None);
    };
    let names = drugs.required_strings(Column::DrugName)?;

    Ok((0..drugs.num_rows())
        .find(|&row| names.is_valid(row) && names.value(row) == drug_name && cuis.is_valid(row))
        .map(|row| cuis.value(row).to_string()))
}

/// Which adverse events to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdeQuery {
    pub drug_name: String,
    /// Preferred join key; the name is only used when this is absent
    pub cui: Option<String>,
    /// `None` or [`AgeGroup::Total`] means every age stratum
    pub age_group: Option<AgeGroup>,
}

impl AdeQuery {
    #[must_use]
    pub fn new(drug_name: impl Into<String>) -> Self {
        Self {
            drug_name: drug_name.into(),
            cui: None,
            age_group: None,
        }
    }

    #[must_use]
    pub fn with_cui(mut self, cui: impl Into<String>) -> Self {
        self.cui = Some(cui.into());
        self
    }

    #[must_use]
    pub fn with_age_group(mut self, age_group: AgeGroup) -> Self {
        self.age_group = Some(age_group);
        self
    }

    /// Build a query for a drug picked from the drug table, resolving its CUI there
    pub fn for_drug(drugs: &RowSet, drug_name: &str, age_group: Option<AgeGroup>) -> Result<Self> {
        Ok(Self {
            drug_name: drug_name.to_string(),
            cui: lookup_cui(drugs, drug_name.trim())?,
            age_group,
        })
    }

    /// The age stratum to restrict to, if any
    #[must_use]
    pub fn age_restriction(&self) -> Option<AgeGroup> {
        self.age_group.filter(|age| !age.is_all_ages())
    }

    /// Heading for the drill-down view
    #[must_use]
    pub fn subject(&self) -> String {
        match self.age_restriction() {
            Some(age) => format!("{} — {age}", self.drug_name),
            None => format!("{} — All pediatric ages", self.drug_name),
        }
    }
}

/// Adverse events of one drug, strongest signal first
#[derive(Debug, Clone, PartialEq)]
pub struct AdeReport {
    pub subject: String,
    pub rows: AdeSet,
}

impl AdeReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Set when nothing matched
    #[must_use]
    pub fn warning(&self) -> Option<EmptyResultWarning> {
        self.is_empty()
            .then(|| EmptyResultWarning::new(self.subject.clone()))
    }

    /// The display columns the adverse-event table actually has
    pub fn view(&self) -> Result<AdeSet> {
        let columns: Vec<AdeColumn> = AdeColumn::VIEW
            .into_iter()
            .filter(|&c| self.rows.has_column(c))
            .collect();
        self.rows.project(&columns)
    }
}

/// Descending with missing values last
fn prr_order(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Adverse-event rows for a drug, sorted by `prr` descending with nulls last.
///
/// Rows are matched on `cui` when the query carries one and the table has the
/// column, otherwise on the drug name ignoring case. An age stratum other than
/// "Total" further restricts the rows.
pub fn drill_down(ade: &AdeSet, query: &AdeQuery) -> Result<AdeReport> {
    let mut chain = AndFilter::default();
    chain = match query.cui.as_deref() {
        Some(cui) if ade.has_column(AdeColumn::Cui) => {
            chain.and(ColumnEqFilter::new(AdeColumn::Cui, cui))
        }
        _ => chain.and(CaseInsensitiveEqFilter::new(
            AdeColumn::DrugName,
            query.drug_name.trim(),
        )),
    };
    if let Some(age) = query.age_restriction() {
        chain = chain.and(ColumnEqFilter::new(AdeColumn::AgeGroup, age.as_str()));
    }

    let matched = filter_table(ade, &chain)?;
    let rows = match matched.statistic(AdeColumn::Prr)? {
        Some(prr) => {
            let value = |row: usize| {
                (prr.is_valid(row) && !prr.value(row).is_nan()).then(|| prr.value(row))
            };
            let mut order: Vec<usize> = (0..matched.num_rows()).collect();
            order.sort_by(|&a, &b| prr_order(value(a), value(b)));
            matched.take(&order)?
        }
        None => matched,
    };

    log::debug!(
        "Drill-down for {:?} matched {} adverse-event rows",
        query.drug_name,
        rows.num_rows()
    );
    Ok(AdeReport {
        subject: query.subject(),
        rows,
    })
}
