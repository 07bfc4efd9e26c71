use tracing::{info, instrument};

use super::builder::ModelBuilder;
use super::solver::{SolveReport, SolverAdapter};
use super::OptimizeError;
use crate::domain::{Dispatch, Scenario, TimeSeries};
use crate::evaluation::validate_dispatch;

/// A solved and physically validated dispatch.
#[derive(Debug, Clone)]
pub struct OptimizedDispatch {
    pub dispatch: Dispatch,
    pub report: SolveReport,
}

/// Build → solve → validate for the full tariff, demand charge included.
#[instrument(skip_all, fields(run_id = %scenario.run.run_id, steps = series.len()))]
pub fn optimize(
    scenario: &Scenario,
    series: &TimeSeries,
    adapter: &SolverAdapter,
) -> Result<OptimizedDispatch, OptimizeError> {
    let model = ModelBuilder::new(scenario, series).build()?;
    let (dispatch, report) = adapter.solve(model)?;
    validate_dispatch(&dispatch, scenario, series)?;

    info!(
        objective_gbp = report.objective_value_gbp,
        peak_import_kw = dispatch.peak_import_kw(),
        solve_time_s = report.solve_time_seconds,
        "dispatch optimized"
    );
    Ok(OptimizedDispatch { dispatch, report })
}
