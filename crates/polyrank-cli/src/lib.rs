//! polyrank-cli — command-line driver for the scaling engine.

pub mod report;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use polyrank_common::table::read_triples_from_path;
use polyrank_common::{DuplicatePolicy, ScalingConfig};
use polyrank_engine::{run_scaling, IterationObserver, NoopObserver, TracingObserver};

use crate::report::{write_percentiles_csv, write_ranks_csv, ScalingReport};

pub const CONFIG_ENV: &str = "POLYRANK_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "polyrank.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DuplicateArg {
    Reject,
    LastWins,
}

impl From<DuplicateArg> for DuplicatePolicy {
    fn from(arg: DuplicateArg) -> Self {
        match arg {
            DuplicateArg::Reject => DuplicatePolicy::Reject,
            DuplicateArg::LastWins => DuplicatePolicy::LastWins,
        }
    }
}

/// Scale raw subject results into a comparable cross-subject rank.
#[derive(Debug, Parser)]
#[command(name = "polyrank", version)]
pub struct Cli {
    /// CSV with `student_id`, `subject_id` and `result` columns
    pub input: PathBuf,

    /// Config file (TOML or YAML); falls back to $POLYRANK_CONFIG, then ./polyrank.toml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Iteration cap
    #[arg(short = 'n', long)]
    pub iterations: Option<usize>,

    /// Early-stop swing in student positions (0 disables early stopping)
    #[arg(short = 'L', long)]
    pub swing: Option<f64>,

    /// What to do with two results for the same student and subject
    #[arg(long, value_enum)]
    pub duplicates: Option<DuplicateArg>,

    /// Fit subjects in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Also write the final percentile table as CSV
    #[arg(long)]
    pub percentiles_csv: Option<PathBuf>,

    /// Also write per-student polyscore/polyrank as CSV
    #[arg(long)]
    pub ranks_csv: Option<PathBuf>,

    /// Suppress iteration progress
    #[arg(short, long)]
    pub quiet: bool,
}

/// Config file from the CLI, the environment, or the working directory, in
/// that order; command-line flags win over the file.
pub fn resolve_config(cli: &Cli) -> Result<ScalingConfig> {
    let path = cli
        .config
        .clone()
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .or_else(|| {
            let local = PathBuf::from(DEFAULT_CONFIG_FILE);
            local.exists().then_some(local)
        });

    let mut config = match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            ScalingConfig::load(&path)
                .with_context(|| format!("Failed to load config: {:?}", path))?
        }
        None => ScalingConfig::default(),
    };

    if let Some(iterations) = cli.iterations {
        config.iterations = iterations;
    }
    if let Some(swing) = cli.swing {
        config.swing = swing;
    }
    if let Some(duplicates) = cli.duplicates {
        config.duplicate_policy = duplicates.into();
    }
    if cli.parallel {
        config.parallel = true;
    }

    config.validate()?;
    if config.parallel && !cfg!(feature = "parallel") {
        warn!("Built without the `parallel` feature; fitting subjects sequentially");
    }
    Ok(config)
}

/// Load, scale and write outputs. Returns the report that was written.
pub fn run(cli: &Cli) -> Result<ScalingReport> {
    check_input(&cli.input)?;
    let config = resolve_config(cli)?;

    let triples = read_triples_from_path(&cli.input)
        .with_context(|| format!("Failed to read results from {:?}", cli.input))?;
    info!("Loaded {} results from {:?}", triples.len(), cli.input);

    let mut observer: Box<dyn IterationObserver> = if cli.quiet {
        Box::new(NoopObserver)
    } else {
        Box::new(TracingObserver)
    };
    let outcome = run_scaling(&triples, &config, observer.as_mut())?;

    let report = ScalingReport::new(cli.input.display().to_string(), config, outcome);

    match &cli.out {
        Some(path) => {
            report.save_json(path)?;
            info!("Report written to {:?}", path);
        }
        None => report.write_json(std::io::stdout().lock())?,
    }
    if let Some(path) = &cli.percentiles_csv {
        write_percentiles_csv(path, &report.outcome.percentiles)?;
    }
    if let Some(path) = &cli.ranks_csv {
        write_ranks_csv(path, &report.outcome.student_ranks())?;
    }

    Ok(report)
}

/// Fail early on a missing input file.
pub fn check_input(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("Input file not found: {:?}", path);
    }
    Ok(())
}
