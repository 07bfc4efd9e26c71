mod cli;
mod tables;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use btm_dispatch::config::AppConfig;
use btm_dispatch::{bundle, runner, telemetry};
use cli::{Args, Command};

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = AppConfig::load_from(&args.config)?;
    telemetry::init_tracing(args.json_logs || config.logging.json);

    match args.command {
        Command::Validate(target) => {
            bundle::load_bundle(&target.bundle)
                .with_context(|| format!("bundle {} is invalid", target.bundle.display()))?;
            println!("✓ bundle {} is valid", target.bundle.display());
        }
        Command::Backtest(target) => {
            let outcome = runner::run_backtest(&target.bundle, &config)?;
            println!("{}", tables::build_metrics_table(&outcome.metrics));
        }
        Command::Frontier(frontier) => {
            if let Some(points) = frontier.points {
                config.frontier.points = points;
            }
            let outcome = runner::run_frontier(&frontier.bundle.bundle, &config, frontier.preference)?;
            println!("{}", tables::build_frontier_table(&outcome.summary));
        }
        Command::Report(target) => {
            let metrics = bundle::read_metrics(&target.bundle)
                .context("no backtest results in this bundle, run `backtest` first")?;
            println!("{}", tables::build_metrics_table(&metrics));
            if let Some(summary) = bundle::read_frontier(&target.bundle)? {
                println!("{}", tables::build_frontier_table(&summary));
            }
        }
        Command::Underwrite(target) => runner::run_underwriting(&target.bundle)?,
    }

    info!("done");
    Ok(())
}
