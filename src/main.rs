//! ATC explorer CLI
//!
//! Usage:
//!   atc-explorer [--config FILE] [--data-dir DIR] rank [--l1 N] [--age Total] [--drug NAME]... [--output FILE]
//!   atc-explorer options --level l2 [--l1 N]
//!   atc-explorer ade --drug NAME [--age 0-2] [--output FILE]

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use atc_explorer::export::{ade_file_name, results_file_name, write_csv, write_csv_file};
use atc_explorer::filter::Identity;
use atc_explorer::utils::logging::{create_spinner, finish_spinner};
use atc_explorer::{
    AgeGroup, AtcLevel, DatasetCaches, Explorer, ExplorerConfig, Metric, Query, Selection, Table,
    TableColumn,
};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

#[derive(Parser)]
#[command(name = "atc-explorer")]
#[command(version)]
#[command(about = "Filter, rank and export pediatric drug-safety tables by ATC class", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory searched first for the source files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

/// Choices along the classification hierarchy
#[derive(Args)]
struct LevelArgs {
    // Values are a code or a "CODE — NAME" label
    #[arg(long, help = AtcLevel::L1.description())]
    l1: Option<String>,

    #[arg(long, help = AtcLevel::L2.description())]
    l2: Option<String>,

    #[arg(long, help = AtcLevel::L3.description())]
    l3: Option<String>,

    #[arg(long, help = AtcLevel::L4.description())]
    l4: Option<String>,
}

impl LevelArgs {
    fn selection(&self) -> Selection {
        [&self.l1, &self.l2, &self.l3, &self.l4]
            .into_iter()
            .zip(AtcLevel::ALL)
            .fold(Selection::all(), |selection, (choice, level)| match choice {
                Some(choice) => selection.with_level(level, choice),
                None => selection,
            })
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Rank drugs in the current selection and export them as CSV
    Rank {
        #[command(flatten)]
        levels: LevelArgs,

        /// Age stratum: Total, 0-2, 3-10 or 11-17 (default: first one in the data)
        #[arg(long)]
        age: Option<AgeGroup>,

        /// Keep only these drugs (repeatable)
        #[arg(long = "drug")]
        drugs: Vec<String>,

        /// Metric to rank by: publications or prescriptions
        #[arg(short, long, default_value = "publications")]
        metric: Metric,

        /// Smallest first
        #[arg(long)]
        ascending: bool,

        /// Number of drugs to keep
        #[arg(short = 'n', long)]
        top_n: Option<usize>,

        /// ATC level to add to the results table (repeatable)
        #[arg(long = "show-level")]
        show_levels: Vec<AtcLevel>,

        /// Output file, or directory for a timestamped file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the choices available at one level given the levels above it
    Options {
        /// Level to list: l1, l2, l3 or l4
        #[arg(long)]
        level: AtcLevel,

        #[command(flatten)]
        levels: LevelArgs,
    },

    /// Show adverse-event statistics for one drug
    Ade {
        /// Drug name as it appears in the results
        #[arg(long)]
        drug: String,

        /// Age stratum; Total or omitted means all ages
        #[arg(long)]
        age: Option<AgeGroup>,

        /// Output file, or directory for a timestamped file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> Result<ExplorerConfig> {
    let mut config = match &cli.config {
        Some(path) => ExplorerConfig::from_json_file(path)
            .with_context(|| format!("Failed to read configuration {}", path.display()))?,
        None => ExplorerConfig::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir.clone_from(dir);
    }
    Ok(config)
}

/// Write to stdout, to `output`, or into `output` when it is a directory
fn emit<C: TableColumn>(table: &Table<C>, output: Option<&Path>, file_name: impl FnOnce() -> String) -> Result<()> {
    match output {
        None => {
            let stdout = io::stdout().lock();
            write_csv(table, stdout)?.flush()?;
        }
        Some(path) => {
            let target = if path.is_dir() {
                path.join(file_name())
            } else {
                path.to_path_buf()
            };
            write_csv_file(table, &target)
                .with_context(|| format!("Failed to write {}", target.display()))?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let spinner = create_spinner(Some("Loading datasets"));
    let caches = DatasetCaches::default();
    let explorer = Explorer::open(&config, &caches);
    finish_spinner(&spinner, None);
    let explorer = explorer.context("Failed to load datasets")?;
    info!(
        "Loaded {} drug rows ({} layout)",
        explorer.drugs().num_rows(),
        explorer.layout()
    );

    match cli.command {
        Commands::Rank {
            levels,
            age,
            drugs,
            metric,
            ascending,
            top_n,
            show_levels,
            output,
        } => {
            let mut selection = levels.selection().with_identities(Identity::DrugName, drugs);
            selection.age_group = age.or_else(|| explorer.default_age_group());

            let mut query = Query::new(selection, metric).with_extra_levels(show_levels);
            query.top_n = top_n;
            if ascending {
                query = query.ascending();
            }

            let result = explorer.run(&query)?;
            if let Some(warning) = &result.warning {
                warn!("{warning}");
            }
            let age_label = query.selection.age_group.map_or("all", AgeGroup::as_str);
            emit(&result.display, output.as_deref(), || {
                results_file_name(&config.export_prefix, age_label, Local::now().naive_local())
            })?;
        }
        Commands::Options { level, levels } => {
            let choices = explorer.level_choices(&levels.selection(), level)?;
            let mut stdout = io::stdout().lock();
            for choice in choices {
                writeln!(stdout, "{choice}")?;
            }
        }
        Commands::Ade { drug, age, output } => {
            let report = explorer.drill_down(&drug, age)?;
            if let Some(warning) = report.warning() {
                warn!("{warning}");
                return Ok(());
            }
            info!("{}", report.subject);
            let age_label = age.map_or(AgeGroup::Total.as_str(), AgeGroup::as_str);
            emit(&report.view()?, output.as_deref(), || {
                ade_file_name(&config.export_prefix, &drug, age_label, Local::now().naive_local())
            })?;
        }
    }

    Ok(())
}
