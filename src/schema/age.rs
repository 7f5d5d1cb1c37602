//! Pediatric age strata.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ExplorerError;

/// Age stratum of a drug or adverse-event row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeGroup {
    /// All pediatric ages combined
    #[serde(rename = "Total")]
    Total,
    #[serde(rename = "0-2")]
    Infant,
    #[serde(rename = "3-10")]
    Child,
    #[serde(rename = "11-17")]
    Adolescent,
}

impl AgeGroup {
    /// Display order of the strata, `Total` first
    pub const ORDER: [Self; 4] = [Self::Total, Self::Infant, Self::Child, Self::Adolescent];

    /// The value stored in the `age_group` column
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Total => "Total",
            Self::Infant => "0-2",
            Self::Child => "3-10",
            Self::Adolescent => "11-17",
        }
    }

    /// Whether this stratum stands for every age (no restriction in drill-downs)
    #[must_use]
    pub const fn is_all_ages(self) -> bool {
        matches!(self, Self::Total)
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgeGroup {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ORDER
            .into_iter()
            .find(|age| age.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| {
                ExplorerError::config(format!(
                    "Unknown age group '{trimmed}' (expected Total, 0-2, 3-10 or 11-17)"
                ))
            })
    }
}
