//! polyrank — cross-subject scaling rank from raw subject results.
//! Entry point for the command-line binary.

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use polyrank_cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so the JSON report can own stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("polyrank=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("polyrank {}", env!("CARGO_PKG_VERSION"));

    let report = polyrank_cli::run(&cli)?;
    info!(
        "Run {} finished: {} iteration(s), converged: {}",
        report.run_id, report.outcome.iterations_run, report.outcome.converged
    );
    Ok(())
}
