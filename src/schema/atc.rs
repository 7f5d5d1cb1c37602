//! The four-level ATC classification path.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ExplorerError;
use crate::schema::Column;

/// Separator between code and name in full-label level columns (`"J05, ANTIVIRALS"`)
const LABEL_SEPARATOR: &str = ", ";

static LEVELS: [AtcLevel; 4] = AtcLevel::ALL;

/// One level of the ATC hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AtcLevel {
    L1,
    L2,
    L3,
    L4,
}

impl AtcLevel {
    /// Levels from the anatomical main group down to the chemical subgroup
    pub const ALL: [Self; 4] = [Self::L1, Self::L2, Self::L3, Self::L4];

    /// Zero-based depth of the level
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::L1 => 0,
            Self::L2 => 1,
            Self::L3 => 2,
            Self::L4 => 3,
        }
    }

    #[must_use]
    pub const fn code_column(self) -> Column {
        match self {
            Self::L1 => Column::L1Code,
            Self::L2 => Column::L2Code,
            Self::L3 => Column::L3Code,
            Self::L4 => Column::L4Code,
        }
    }

    #[must_use]
    pub const fn name_column(self) -> Column {
        match self {
            Self::L1 => Column::L1Name,
            Self::L2 => Column::L2Name,
            Self::L3 => Column::L3Name,
            Self::L4 => Column::L4Name,
        }
    }

    /// Header of the single full-label column some sources use instead of code/name pairs
    #[must_use]
    pub const fn label_header(self) -> &'static str {
        match self {
            Self::L1 => "l1",
            Self::L2 => "l2",
            Self::L3 => "l3",
            Self::L4 => "l4",
        }
    }

    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::L1 => "Anatomical main group",
            Self::L2 => "Therapeutic main group",
            Self::L3 => "Pharmacological subgroup",
            Self::L4 => "Chemical subgroup",
        }
    }

    /// Levels strictly above this one
    #[must_use]
    pub fn ancestors(self) -> &'static [Self] {
        &LEVELS[..self.index()]
    }
}

impl fmt::Display for AtcLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.index() + 1)
    }
}

impl FromStr for AtcLevel {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "l1" | "1" => Ok(Self::L1),
            "l2" | "2" => Ok(Self::L2),
            "l3" | "3" => Ok(Self::L3),
            "l4" | "4" => Ok(Self::L4),
            other => Err(ExplorerError::config(format!("Unknown ATC level '{other}'"))),
        }
    }
}

/// Split a full level label into `(code, name)`.
///
/// `"J05, ANTIVIRALS FOR SYSTEMIC USE"` becomes `("J05", "ANTIVIRALS FOR SYSTEMIC USE")`.
/// A label without the separator is used as both code and name.
#[must_use]
pub fn split_level_label(label: &str) -> (&str, &str) {
    match label.split_once(LABEL_SEPARATOR) {
        Some((code, name)) if !code.trim().is_empty() => (code.trim(), name.trim()),
        _ => (label, label),
    }
}
