//! Cost-vs-peak Pareto front by the epsilon-constraint method.
//!
//! The demand charge is taken out of the objective and replaced by a hard cap
//! on grid import. Sweeping that cap from the smallest feasible value up to a
//! little beyond the cost-optimal peak traces the trade-off between energy
//! cost and peak demand.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use super::builder::ModelBuilder;
use super::solver::SolverAdapter;
use super::OptimizeError;
use crate::domain::{Dispatch, Scenario, TimeSeries};
use crate::evaluation::validate_dispatch;

/// Energy costs closer than this are the same point on the front.
const DUPLICATE_COST_GBP: f64 = 1e-6;
/// Guard against a zero span when normalising a single-point front.
const NORMALISATION_EPSILON: f64 = 1e-9;
/// Smallest upper bound for the peak search, for sites that never draw from the grid.
const MIN_PEAK_SEARCH_KW: f64 = 0.1;
/// Floor of the import cap used for the energy-optimal reference solve.
const REFERENCE_PEAK_LIMIT_KW: f64 = 1000.0;

#[derive(Debug, Error)]
pub enum FrontierError {
    #[error("solve at peak limit {limit_kw:?} kW failed: {source}")]
    Solve {
        limit_kw: Option<f64>,
        #[source]
        source: OptimizeError,
    },

    #[error("the Pareto front is empty")]
    EmptyFront,

    #[error("preference {0} must lie within [0, 1]")]
    InvalidPreference(f64),

    #[error("invalid frontier settings: {0}")]
    Settings(#[from] validator::ValidationErrors),
}

/// One solved epsilon value. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ParetoPoint {
    /// Objective without the demand charge (energy, export revenue, wear).
    pub energy_cost_gbp: f64,
    pub peak_demand_kw: f64,
    /// `energy_cost_gbp` plus the peak billed at the tariff's demand rate.
    pub total_cost_gbp: f64,
    pub dispatch: Dispatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FrontierSettings {
    /// Number of evenly spaced peak limits in the sweep
    #[validate(range(min = 1))]
    pub points: usize,

    /// Fixed number of halvings when searching for the minimum feasible peak
    #[validate(range(min = 1, max = 60))]
    pub bisection_iterations: u32,
}

impl Default for FrontierSettings {
    fn default() -> Self {
        Self {
            points: 20,
            bisection_iterations: 20,
        }
    }
}

pub struct FrontierGenerator<'a> {
    scenario: &'a Scenario,
    series: &'a TimeSeries,
    adapter: &'a SolverAdapter,
    settings: FrontierSettings,
}

impl<'a> FrontierGenerator<'a> {
    pub fn new(
        scenario: &'a Scenario,
        series: &'a TimeSeries,
        adapter: &'a SolverAdapter,
        settings: FrontierSettings,
    ) -> Self {
        Self {
            scenario,
            series,
            adapter,
            settings,
        }
    }

    /// Build, solve and validate with grid import capped at `limit_kw`.
    ///
    /// `None` leaves import uncapped (apart from the site cap) and yields the
    /// energy-cost optimum.
    pub fn solve_with_peak_limit(&self, limit_kw: Option<f64>) -> Result<ParetoPoint, OptimizeError> {
        let model = ModelBuilder::new(self.scenario, self.series)
            .energy_only()
            .peak_limit(limit_kw)
            .build()?;
        let (dispatch, report) = self.adapter.solve(model)?;
        validate_dispatch(&dispatch, self.scenario, self.series)?;

        let peak = dispatch.peak_import_kw();
        let energy = report.objective_value_gbp;
        Ok(ParetoPoint {
            energy_cost_gbp: energy,
            peak_demand_kw: peak,
            total_cost_gbp: energy + peak * self.scenario.tariff().demand_charge_gbp_per_kw,
            dispatch,
        })
    }

    /// Bisect for the smallest peak limit that still admits a feasible dispatch.
    ///
    /// The upper end starts at the no-battery worst case. Infeasible midpoints
    /// raise the lower end; any other failure aborts the search.
    pub fn min_feasible_peak(&self) -> Result<f64, FrontierError> {
        let worst_net_load = self.series.net_load_kw().fold(f64::NEG_INFINITY, f64::max);
        let mut upper = worst_net_load.max(MIN_PEAK_SEARCH_KW);
        let mut lower = 0.0;

        for iteration in 0..self.settings.bisection_iterations {
            let mid = (lower + upper) / 2.0;
            match self.solve_with_peak_limit(Some(mid)) {
                Ok(_) => upper = mid,
                Err(e) if e.is_infeasible() => lower = mid,
                Err(source) => {
                    return Err(FrontierError::Solve {
                        limit_kw: Some(mid),
                        source,
                    })
                }
            }
            debug!(iteration, lower, upper, "peak bisection step");
        }
        Ok(upper)
    }

    /// Import cap for the reference solve: far above anything the site can
    /// draw for its own load and battery.
    ///
    /// Left uncapped, a step whose import price undercuts its export price
    /// makes the LP unbounded.
    fn reference_limit_kw(&self) -> f64 {
        let max_load = self.series.load_kw().iter().copied().fold(0.0, f64::max);
        REFERENCE_PEAK_LIMIT_KW.max(max_load + self.scenario.battery().max_charge_kw)
    }

    /// Trace the front, sorted by increasing peak demand.
    #[instrument(skip_all, fields(steps = self.series.len(), points = self.settings.points))]
    pub fn generate(&self) -> Result<Vec<ParetoPoint>, FrontierError> {
        self.settings.validate()?;

        let min_peak = self.min_feasible_peak()?;
        let reference_limit = self.reference_limit_kw();
        let reference = self
            .solve_with_peak_limit(Some(reference_limit))
            .map_err(|source| FrontierError::Solve {
                limit_kw: Some(reference_limit),
                source,
            })?;
        let max_peak = (reference.peak_demand_kw * 1.1).max(min_peak * 1.5);
        info!(min_peak, max_peak, reference_cost = reference.energy_cost_gbp, "peak sweep range");

        let mut front: Vec<ParetoPoint> = Vec::with_capacity(self.settings.points);
        for limit in linspace(min_peak, max_peak, self.settings.points) {
            let point = match self.solve_with_peak_limit(Some(limit)) {
                Ok(point) => point,
                Err(e) => {
                    warn!(limit_kw = limit, error = %e, "dropping sweep point");
                    continue;
                }
            };
            let duplicate = front
                .last()
                .is_some_and(|last| (point.energy_cost_gbp - last.energy_cost_gbp).abs() <= DUPLICATE_COST_GBP);
            if !duplicate {
                front.push(point);
            }
        }

        if front.is_empty() {
            return Err(FrontierError::EmptyFront);
        }
        front.sort_by_key(|p| OrderedFloat(p.peak_demand_kw));
        info!(points = front.len(), "Pareto front traced");
        Ok(front)
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
fn linspace(start: f64, end: f64, n: usize) -> impl Iterator<Item = f64> {
    let step = if n > 1 { (end - start) / (n - 1) as f64 } else { 0.0 };
    (0..n).map(move |i| if i + 1 == n && n > 1 { end } else { start + step * i as f64 })
}

/// Pick an operating point from the front.
///
/// `preference` 0 favours the cheapest energy, 1 the lowest peak. Exactly 0.5
/// picks the point with the lowest total cost including the demand charge.
pub fn select(front: &[ParetoPoint], preference: f64) -> Result<&ParetoPoint, FrontierError> {
    if !(0.0..=1.0).contains(&preference) {
        return Err(FrontierError::InvalidPreference(preference));
    }

    if preference == 0.5 {
        return front
            .iter()
            .min_by_key(|p| OrderedFloat(p.total_cost_gbp))
            .ok_or(FrontierError::EmptyFront);
    }

    let (e_min, e_max) = span(front.iter().map(|p| p.energy_cost_gbp));
    let (k_min, k_max) = span(front.iter().map(|p| p.peak_demand_kw));
    front
        .iter()
        .min_by_key(|p| {
            let energy = (p.energy_cost_gbp - e_min) / (e_max - e_min + NORMALISATION_EPSILON);
            let peak = (p.peak_demand_kw - k_min) / (k_max - k_min + NORMALISATION_EPSILON);
            OrderedFloat((1.0 - preference) * energy + preference * peak)
        })
        .ok_or(FrontierError::EmptyFront)
}

fn span(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)))
}
