//! End-to-end runs over a bundle: load, optimize, evaluate, persist.

use anyhow::{Context, Result};
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument};

use crate::bundle::{self, FrontierEntry, FrontierSummary};
use crate::config::AppConfig;
use crate::domain::Dispatch;
use crate::evaluation::{compute_metrics, Metrics};
use crate::optimizer::{baseline, optimize, select, FrontierGenerator, OptimizedDispatch, ParetoPoint};

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{0} runs are not implemented yet")]
    NotImplemented(&'static str),

    #[error("selected operating point is not part of the front")]
    SelectionOutsideFront,
}

#[derive(Debug, Clone)]
pub struct BacktestOutcome {
    pub optimized: OptimizedDispatch,
    pub baseline: Dispatch,
    pub metrics: Metrics,
}

#[derive(Debug, Clone)]
pub struct FrontierOutcome {
    pub front: Vec<ParetoPoint>,
    pub summary: FrontierSummary,
}

impl FrontierOutcome {
    pub fn selected(&self) -> &ParetoPoint {
        &self.front[self.summary.selected_index]
    }
}

/// Single full-horizon optimization against the self-consumption baseline.
#[instrument(skip(config), fields(bundle = %path.display()))]
pub fn run_backtest(path: &Path, config: &AppConfig) -> Result<BacktestOutcome> {
    let bundle = bundle::load_bundle(path).context("loading bundle")?;
    let scenario = &bundle.scenario;
    let adapter = config.solver_adapter(&scenario.run);

    let optimized = optimize(scenario, &bundle.series, &adapter).context("optimizing dispatch")?;
    let baseline = baseline(scenario, &bundle.series);

    let prices = scenario.tariff().resolve_prices(&bundle.series)?;
    let metrics = compute_metrics(&optimized.dispatch, &baseline, scenario, &prices);
    info!(
        savings_gbp = metrics.savings_gbp,
        savings_pct = metrics.savings_pct,
        peak_reduction_kw = metrics.peak_reduction_kw,
        cycles = metrics.battery_cycles,
        "backtest complete"
    );

    bundle::write_results(&bundle, &optimized.dispatch, &optimized.report, Some(&metrics))
        .context("writing results")?;
    Ok(BacktestOutcome {
        optimized,
        baseline,
        metrics,
    })
}

/// Trace the cost-vs-peak front and pick the point matching `preference`.
#[instrument(skip(config), fields(bundle = %path.display()))]
pub fn run_frontier(path: &Path, config: &AppConfig, preference: f64) -> Result<FrontierOutcome> {
    let bundle = bundle::load_bundle(path).context("loading bundle")?;
    let adapter = config.solver_adapter(&bundle.scenario.run);

    let front = FrontierGenerator::new(&bundle.scenario, &bundle.series, &adapter, config.frontier)
        .generate()
        .context("tracing Pareto front")?;
    let chosen = select(&front, preference)?;
    let selected_index = front
        .iter()
        .position(|p| std::ptr::eq(p, chosen))
        .ok_or(RunnerError::SelectionOutsideFront)?;

    let summary = FrontierSummary {
        preference,
        selected_index,
        points: front
            .iter()
            .map(|p| FrontierEntry {
                peak_demand_kw: p.peak_demand_kw,
                energy_cost_gbp: p.energy_cost_gbp,
                total_cost_gbp: p.total_cost_gbp,
            })
            .collect(),
    };
    info!(
        points = front.len(),
        selected_peak_kw = chosen.peak_demand_kw,
        selected_total_gbp = chosen.total_cost_gbp,
        "operating point selected"
    );

    bundle::write_frontier(&bundle, &summary, &chosen.dispatch, adapter.backend_name())
        .context("writing frontier")?;
    Ok(FrontierOutcome { front, summary })
}

/// Multi-year project economics over representative periods.
pub fn run_underwriting(path: &Path) -> Result<()> {
    bundle::validate_bundle(path)?;
    Err(RunnerError::NotImplemented("underwriting").into())
}
