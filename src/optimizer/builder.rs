use tracing::debug;

use super::constraints;
use super::model::{Family, Model, VariableLayout};
use crate::domain::{ConfigError, Scenario, TimeSeries};

/// Builds the dispatch LP for one scenario and timeseries.
///
/// ```ignore
/// let model = ModelBuilder::new(&scenario, &series).peak_limit(Some(6.0)).build()?;
/// ```
pub struct ModelBuilder<'a> {
    scenario: &'a Scenario,
    series: &'a TimeSeries,
    peak_limit: Option<f64>,
    energy_only: bool,
}

impl<'a> ModelBuilder<'a> {
    pub fn new(scenario: &'a Scenario, series: &'a TimeSeries) -> Self {
        Self {
            scenario,
            series,
            peak_limit: None,
            energy_only: false,
        }
    }

    /// Hard cap on grid import at every step (the epsilon of the epsilon-constraint method).
    pub fn peak_limit(mut self, limit_kw: Option<f64>) -> Self {
        self.peak_limit = limit_kw;
        self
    }

    /// Leave the demand charge out of the objective even if the tariff enables it.
    pub fn energy_only(mut self) -> Self {
        self.energy_only = true;
        self
    }

    pub fn build(self) -> Result<Model, ConfigError> {
        self.scenario.check()?;

        let run_timestep = self.scenario.run.timestep();
        if self.series.timestep() != run_timestep {
            return Err(ConfigError::invalid(
                "run.timestep_minutes",
                format!(
                    "timeseries is spaced {} min apart but the run expects {} min",
                    self.series.timestep().num_minutes(),
                    run_timestep.num_minutes()
                ),
            ));
        }
        if let Some(limit) = self.peak_limit {
            if !(limit.is_finite() && limit >= 0.0) {
                return Err(ConfigError::invalid(
                    "peak_limit",
                    format!("{limit} is not a finite non-negative power"),
                ));
            }
        }

        let tariff = self.scenario.tariff();
        let battery = self.scenario.battery();
        let prices = tariff.resolve_prices(self.series)?;
        let dt = self.scenario.timestep_hours();

        let demand_rate = (tariff.demand_charge_enabled && !self.energy_only)
            .then_some(tariff.demand_charge_gbp_per_kw);
        let layout = VariableLayout::new(self.series.len(), demand_rate.is_some());

        let bounds = constraints::variable_bounds(
            layout,
            battery,
            &self.scenario.site.constraints,
            self.peak_limit,
        );
        let equalities = constraints::site_balance(layout, self.series.load_kw(), self.series.pv_kw())
            .chain(constraints::soc_dynamics(layout, battery, dt))
            .collect::<Vec<_>>();
        let inequalities = constraints::peak_tracking(layout).collect::<Vec<_>>();

        // Cost and revenue stay separate so negative prices only flip coefficients.
        let mut objective = vec![0.0; layout.len()];
        let wear = battery.degradation_cost_gbp_per_kwh * dt;
        for t in 0..layout.steps() {
            objective[layout.index(Family::GridImport, t)] = prices.import[t] * dt;
            objective[layout.index(Family::GridExport, t)] = -prices.export[t] * dt;
            objective[layout.index(Family::Charge, t)] = wear;
            objective[layout.index(Family::Discharge, t)] = wear;
        }
        if let (Some(peak), Some(rate)) = (layout.peak(), demand_rate) {
            objective[peak] = rate;
        }

        debug!(
            steps = layout.steps(),
            variables = layout.len(),
            equalities = equalities.len(),
            inequalities = inequalities.len(),
            peak_limit = ?self.peak_limit,
            "built dispatch model"
        );

        Ok(Model {
            layout,
            timestep_hours: dt,
            bounds,
            equalities,
            inequalities,
            objective,
        })
    }
}
