//! Configuration for dataset discovery, layout and ranking bounds.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ExplorerError, Result};
use crate::schema::{AtcLevel, Column};

/// A source file looked up by name in the data directories, or via an environment variable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSource {
    /// File name looked up in `data_dir`, then `root_dir`
    pub file_name: String,
    /// Environment variable holding a fallback path
    pub env_var: String,
}

impl DataSource {
    pub fn new(file_name: impl Into<String>, env_var: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            env_var: env_var.into(),
        }
    }

    /// Resolve against the process environment
    #[must_use]
    pub fn resolve(&self, data_dir: &Path, root_dir: &Path) -> Option<PathBuf> {
        self.resolve_with(data_dir, root_dir, |name| std::env::var(name).ok())
    }

    /// First existing path of `<data_dir>/<file>`, `<root_dir>/<file>`, `$<env_var>`
    pub fn resolve_with<F>(&self, data_dir: &Path, root_dir: &Path, lookup: F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        [data_dir.join(&self.file_name), root_dir.join(&self.file_name)]
            .into_iter()
            .chain(lookup(&self.env_var).filter(|v| !v.is_empty()).map(PathBuf::from))
            .find(|path| path.is_file())
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (${})", self.file_name, self.env_var)
    }
}

/// Which of the two source schemas the drug table follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetLayout {
    /// One drug table stratified by age, deduplicated by `is_first`
    #[default]
    Stratified,
    /// Publications table joined with a separate prescriptions table
    Merged,
}

impl DatasetLayout {
    /// Columns a ranked result is grouped by, before dropping absent ones
    #[must_use]
    pub fn group_keys(self, extra_levels: &[AtcLevel]) -> Vec<Column> {
        match self {
            Self::Stratified => {
                let mut keys = vec![Column::Cui, Column::DrugName, Column::AgeGroup];
                keys.extend(level_columns(extra_levels));
                keys
            }
            Self::Merged => {
                let mut keys = vec![Column::Cui, Column::DrugName];
                keys.extend(level_columns(&AtcLevel::ALL));
                keys
            }
        }
    }

    /// Column order of the results table.
    ///
    /// `identity` is the column naming each drug; the stratified layout shows
    /// `cui` only when the data has no drug names.
    #[must_use]
    pub fn display_columns(self, extra_levels: &[AtcLevel], identity: Column) -> Vec<Column> {
        match self {
            Self::Stratified => {
                let mut columns = vec![
                    identity,
                    Column::AgeGroup,
                    Column::Prescriptions,
                    Column::Publications,
                ];
                columns.extend(level_columns(extra_levels));
                columns
            }
            Self::Merged => {
                let mut columns = self.group_keys(extra_levels);
                columns.extend([Column::Publications, Column::Prescriptions]);
                columns
            }
        }
    }
}

fn level_columns(levels: &[AtcLevel]) -> impl Iterator<Item = Column> + '_ {
    levels
        .iter()
        .flat_map(|level| [level.code_column(), level.name_column()])
}

impl fmt::Display for DatasetLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stratified => write!(f, "stratified"),
            Self::Merged => write!(f, "merged"),
        }
    }
}

/// Caller-side bounds on the number of ranked rows shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopNBounds {
    pub min: usize,
    pub max: usize,
    pub default: usize,
    pub step: usize,
}

impl Default for TopNBounds {
    fn default() -> Self {
        Self {
            min: 10,
            max: 1000,
            default: 100,
            step: 10,
        }
    }
}

impl TopNBounds {
    /// Bound a requested top-N; `None` picks the default
    #[must_use]
    pub fn clamp(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default)
            .clamp(self.min, self.max.max(self.min))
    }
}

/// Configuration for an explorer session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Directory searched first for source files
    pub data_dir: PathBuf,
    /// Directory searched second
    pub root_dir: PathBuf,
    pub layout: DatasetLayout,
    /// Age-stratified drug table
    pub drugs: DataSource,
    /// Adverse-event disproportionality table
    pub adverse_events: DataSource,
    /// Publications table of the merged layout
    pub publications: DataSource,
    /// Prescription volumes of the merged layout
    pub prescriptions: DataSource,
    pub top_n: TopNBounds,
    /// Field delimiter of CSV sources
    pub delimiter: char,
    /// Rows per record batch while reading
    pub batch_size: usize,
    /// Prefix of exported file names
    pub export_prefix: String,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            root_dir: PathBuf::from("."),
            layout: DatasetLayout::default(),
            drugs: DataSource::new("smr3.csv", "SMR3_CSV"),
            adverse_events: DataSource::new("prr3.csv", "PRR3_CSV"),
            publications: DataSource::new("pedpubs_atc_merged.csv", "PUBS_CSV"),
            prescriptions: DataSource::new("rx_vol_joined_to_umls.csv", "RX_CSV"),
            top_n: TopNBounds::default(),
            delimiter: ',',
            batch_size: 8192,
            export_prefix: "rweeye".to_string(),
        }
    }
}

impl ExplorerConfig {
    /// Read a JSON configuration file; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let config: Self = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the values the loader and ranker rely on
    pub fn validate(&self) -> Result<()> {
        if !self.delimiter.is_ascii() {
            return Err(ExplorerError::config(format!(
                "Delimiter {:?} is not a single-byte character",
                self.delimiter
            )));
        }
        if self.batch_size == 0 {
            return Err(ExplorerError::config("Batch size must be positive"));
        }
        if self.top_n.min == 0 || self.top_n.min > self.top_n.max {
            return Err(ExplorerError::config(format!(
                "Invalid top-N bounds {}..={}",
                self.top_n.min, self.top_n.max
            )));
        }
        Ok(())
    }

    /// The delimiter as the byte the CSV reader expects
    #[must_use]
    pub fn delimiter_byte(&self) -> u8 {
        u8::try_from(self.delimiter).unwrap_or(b',')
    }

    /// Resolve a source against this configuration's directories
    #[must_use]
    pub fn resolve(&self, source: &DataSource) -> Option<PathBuf> {
        source.resolve(&self.data_dir, &self.root_dir)
    }

    /// Resolve a source, reporting a configuration error when nothing exists
    pub fn require(&self, source: &DataSource) -> Result<PathBuf> {
        self.resolve(source).ok_or_else(|| {
            ExplorerError::config(format!(
                "Could not find {source} in {} or {}",
                self.data_dir.display(),
                self.root_dir.display()
            ))
        })
    }
}

impl fmt::Display for ExplorerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Explorer Configuration:")?;
        writeln!(f, "  Data Dir: {}", self.data_dir.display())?;
        writeln!(f, "  Root Dir: {}", self.root_dir.display())?;
        writeln!(f, "  Layout: {}", self.layout)?;
        match self.layout {
            DatasetLayout::Stratified => writeln!(f, "  Drugs: {}", self.drugs)?,
            DatasetLayout::Merged => {
                writeln!(f, "  Publications: {}", self.publications)?;
                writeln!(f, "  Prescriptions: {}", self.prescriptions)?;
            }
        }
        writeln!(f, "  Adverse Events: {}", self.adverse_events)?;
        writeln!(
            f,
            "  Top N: {} (min {}, max {})",
            self.top_n.default, self.top_n.min, self.top_n.max
        )
    }
}
