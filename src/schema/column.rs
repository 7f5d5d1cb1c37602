//! Canonical columns and the header aliases that map onto them.

use std::fmt;
use std::str::FromStr;

use arrow::datatypes::{DataType, Field};
use serde::{Deserialize, Serialize};

use crate::error::ExplorerError;
use crate::schema::normalize_header;

/// A column of the normalised drug table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    /// Unique medical concept identifier
    Cui,
    /// Human-readable drug name
    DrugName,
    /// Vocabulary term type of the drug name (e.g. `IN`, `PIN`)
    TermType,
    L1Code,
    L1Name,
    L2Code,
    L2Name,
    L3Code,
    L3Name,
    L4Code,
    L4Name,
    /// Age stratum (`Total`, `0-2`, `3-10`, `11-17`)
    AgeGroup,
    /// Summed publication count
    Publications,
    /// Summed prescription volume
    Prescriptions,
}

impl Column {
    /// Every column in canonical output order
    pub const ALL: [Self; 14] = [
        Self::Cui,
        Self::DrugName,
        Self::TermType,
        Self::L1Code,
        Self::L1Name,
        Self::L2Code,
        Self::L2Name,
        Self::L3Code,
        Self::L3Name,
        Self::L4Code,
        Self::L4Name,
        Self::AgeGroup,
        Self::Publications,
        Self::Prescriptions,
    ];

    /// Canonical column name in normalised tables and exported CSV
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cui => "cui",
            Self::DrugName => "drug_name",
            Self::TermType => "term_type",
            Self::L1Code => "l1_code",
            Self::L1Name => "l1_name",
            Self::L2Code => "l2_code",
            Self::L2Name => "l2_name",
            Self::L3Code => "l3_code",
            Self::L3Name => "l3_name",
            Self::L4Code => "l4_code",
            Self::L4Name => "l4_name",
            Self::AgeGroup => "age_group",
            Self::Publications => "publication_count",
            Self::Prescriptions => "prescription_count",
        }
    }

    /// Normalised source header names accepted for this column, in priority order
    #[must_use]
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Cui => &["cui"],
            Self::DrugName => &["drug_name", "drug", "rxnorm_name"],
            Self::TermType => &["term_type", "rxnorm_tty", "tty"],
            Self::L1Code => &["l1_code"],
            Self::L1Name => &["l1_name"],
            Self::L2Code => &["l2_code"],
            Self::L2Name => &["l2_name"],
            Self::L3Code => &["l3_code"],
            Self::L3Name => &["l3_name"],
            Self::L4Code => &["l4_code"],
            Self::L4Name => &["l4_name"],
            Self::AgeGroup => &["age_group", "agegroup"],
            Self::Publications => &["publication_count", "pubs", "pub_count", "unique_pub_count"],
            Self::Prescriptions => &[
                "prescription_count",
                "prescriptions",
                "rx_volume",
                "rx_freq_total",
                "freq_total",
                "freq",
            ],
        }
    }

    /// Whether this column holds a summed numeric metric
    #[must_use]
    pub const fn is_metric(self) -> bool {
        matches!(self, Self::Publications | Self::Prescriptions)
    }

    /// Whether this column belongs to the ATC classification path
    #[must_use]
    pub const fn is_level(self) -> bool {
        matches!(
            self,
            Self::L1Code
                | Self::L1Name
                | Self::L2Code
                | Self::L2Name
                | Self::L3Code
                | Self::L3Name
                | Self::L4Code
                | Self::L4Name
        )
    }

    /// Arrow type of the column after normalisation
    #[must_use]
    pub fn data_type(self) -> DataType {
        if self.is_metric() {
            DataType::Int64
        } else {
            DataType::Utf8
        }
    }

    /// Arrow field for the column; metrics are never null
    #[must_use]
    pub fn field(self) -> Field {
        Field::new(self.name(), self.data_type(), !self.is_metric())
    }

    /// Resolve a canonical name or any alias (case- and whitespace-insensitive)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = normalize_header(name);
        Self::ALL
            .into_iter()
            .find(|c| c.aliases().contains(&normalized.as_str()))
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| ExplorerError::schema(format!("Unknown column '{s}'")))
    }
}

/// The numeric metric a ranking sorts by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    #[default]
    Publications,
    Prescriptions,
}

impl Metric {
    /// The drug-table column this metric sums
    #[must_use]
    pub const fn column(self) -> Column {
        match self {
            Self::Publications => Column::Publications,
            Self::Prescriptions => Column::Prescriptions,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Publications => "Publications",
            Self::Prescriptions => "Prescriptions",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Metric {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_header(s).as_str() {
            "publications" | "pubs" | "publication_count" => Ok(Self::Publications),
            "prescriptions" | "rx" | "rx volume" | "rx_volume" | "prescription_count" => {
                Ok(Self::Prescriptions)
            }
            other => Err(ExplorerError::config(format!(
                "Unknown metric '{other}' (expected publications or prescriptions)"
            ))),
        }
    }
}

/// A column of the normalised adverse-event table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdeColumn {
    Cui,
    DrugName,
    AgeGroup,
    /// The reported event (MedDRA preferred term)
    PreferredTerm,
    /// Proportional reporting ratio
    Prr,
    /// Reporting odds ratio
    Ror,
    /// Information component
    Ic,
    /// Empirical Bayes geometric mean
    Ebgm,
}

impl AdeColumn {
    pub const ALL: [Self; 8] = [
        Self::Cui,
        Self::DrugName,
        Self::AgeGroup,
        Self::PreferredTerm,
        Self::Prr,
        Self::Ror,
        Self::Ic,
        Self::Ebgm,
    ];

    /// Columns shown in the drill-down view, in display order
    pub const VIEW: [Self; 6] = [
        Self::AgeGroup,
        Self::PreferredTerm,
        Self::Prr,
        Self::Ror,
        Self::Ic,
        Self::Ebgm,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cui => "cui",
            Self::DrugName => "drug_name",
            Self::AgeGroup => "age_group",
            Self::PreferredTerm => "preferred_term",
            Self::Prr => "prr",
            Self::Ror => "ror",
            Self::Ic => "ic",
            Self::Ebgm => "ebgm",
        }
    }

    #[must_use]
    pub const fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Cui => &["cui"],
            Self::DrugName => &["drug_name", "drug", "rxnorm_name"],
            Self::AgeGroup => &["age_group", "agegroup"],
            Self::PreferredTerm => &["preferred_term", "pt"],
            Self::Prr => &["prr"],
            Self::Ror => &["ror"],
            Self::Ic => &["ic"],
            Self::Ebgm => &["ebgm"],
        }
    }

    /// Whether this column is a floating-point disproportionality statistic
    #[must_use]
    pub const fn is_statistic(self) -> bool {
        matches!(self, Self::Prr | Self::Ror | Self::Ic | Self::Ebgm)
    }

    #[must_use]
    pub fn data_type(self) -> DataType {
        if self.is_statistic() {
            DataType::Float64
        } else {
            DataType::Utf8
        }
    }

    #[must_use]
    pub fn field(self) -> Field {
        Field::new(self.name(), self.data_type(), true)
    }
}

impl fmt::Display for AdeColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
