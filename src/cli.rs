use std::path::PathBuf;

use clap::{Parser, Subcommand};

use btm_dispatch::config::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
pub struct Args {
    /// Application settings file (TOML). Missing is fine.
    #[clap(long, env = "BTM_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Emit logs as JSON lines, overriding the settings file.
    #[clap(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check that a bundle holds every input and that the inputs are consistent.
    Validate(BundleArgs),

    /// Optimize the bundle's horizon and compare against the baseline.
    Backtest(BundleArgs),

    /// Trace the cost-vs-peak Pareto front and select an operating point.
    Frontier(FrontierArgs),

    /// Print the results stored in a bundle.
    Report(BundleArgs),

    /// Project economics over representative periods.
    Underwrite(BundleArgs),
}

#[derive(Parser)]
pub struct BundleArgs {
    /// Bundle directory.
    pub bundle: PathBuf,
}

#[derive(Parser)]
pub struct FrontierArgs {
    #[clap(flatten)]
    pub bundle: BundleArgs,

    /// Number of peak limits in the sweep (overrides the settings file).
    #[clap(long)]
    pub points: Option<usize>,

    /// 0 favours the cheapest energy, 1 the lowest peak, 0.5 the lowest total cost.
    #[clap(long, default_value = "0.5")]
    pub preference: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_frontier_arguments() {
        let args = Args::parse_from(["btm-dispatch", "frontier", "runs/a", "--points", "8", "--preference", "0.2"]);
        let Command::Frontier(frontier) = args.command else {
            panic!("expected the frontier command");
        };
        assert_eq!(frontier.bundle.bundle, PathBuf::from("runs/a"));
        assert_eq!(frontier.points, Some(8));
        assert_eq!(frontier.preference, 0.2);
    }
}
