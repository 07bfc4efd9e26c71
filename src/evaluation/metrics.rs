//! Cost and performance metrics for any dispatch, optimal or baseline.

use serde::{Deserialize, Serialize};

use crate::domain::{Dispatch, PriceSchedule, Scenario, Tariff};

/// Cost components of one dispatch, in GBP. Positive `total` is a cost.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub import_cost: f64,
    pub export_revenue: f64,
    pub demand_charge: f64,
    pub degradation_cost: f64,
    pub total: f64,
}

/// `import_cost - export_revenue + demand_charge + degradation_cost`.
///
/// The demand charge applies only when the tariff enables it and bills the
/// single highest import over the horizon.
pub fn compute_cost(
    dispatch: &Dispatch,
    prices: &PriceSchedule,
    tariff: &Tariff,
    degradation_rate: f64,
) -> CostBreakdown {
    let dt = dispatch.timestep_hours;
    let import_cost: f64 = dispatch
        .grid_import_kw
        .iter()
        .zip(&prices.import)
        .map(|(kw, price)| kw * price * dt)
        .sum();
    let export_revenue: f64 = dispatch
        .grid_export_kw
        .iter()
        .zip(&prices.export)
        .map(|(kw, price)| kw * price * dt)
        .sum();
    let demand_charge = dispatch.peak_import_kw() * tariff.effective_demand_rate();
    let degradation_cost = dispatch.throughput_kwh() * degradation_rate;

    CostBreakdown {
        import_cost,
        export_revenue,
        demand_charge,
        degradation_cost,
        total: import_cost - export_revenue + demand_charge + degradation_cost,
    }
}

/// Optimal-vs-baseline comparison written to `metrics.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub optimal_cost_gbp: f64,
    pub baseline_cost_gbp: f64,
    pub savings_gbp: f64,
    pub savings_pct: f64,
    pub optimal_peak_import_kw: f64,
    pub baseline_peak_import_kw: f64,
    pub peak_reduction_kw: f64,
    pub battery_throughput_kwh: f64,
    pub battery_cycles: f64,
    pub total_import_kwh: f64,
    pub total_export_kwh: f64,
}

/// Compare `optimal` against `baseline`. Utilisation figures describe `optimal`.
pub fn compute_metrics(
    optimal: &Dispatch,
    baseline: &Dispatch,
    scenario: &Scenario,
    prices: &PriceSchedule,
) -> Metrics {
    let battery = scenario.battery();
    let tariff = scenario.tariff();
    let degradation = battery.degradation_cost_gbp_per_kwh;

    let optimal_cost = compute_cost(optimal, prices, tariff, degradation).total;
    let baseline_cost = compute_cost(baseline, prices, tariff, degradation).total;
    let savings = baseline_cost - optimal_cost;
    let savings_pct = if baseline_cost == 0.0 {
        0.0
    } else {
        savings / baseline_cost * 100.0
    };

    let optimal_peak = optimal.peak_import_kw();
    let baseline_peak = baseline.peak_import_kw();
    let throughput = optimal.throughput_kwh();

    Metrics {
        optimal_cost_gbp: optimal_cost,
        baseline_cost_gbp: baseline_cost,
        savings_gbp: savings,
        savings_pct,
        optimal_peak_import_kw: optimal_peak,
        baseline_peak_import_kw: baseline_peak,
        peak_reduction_kw: baseline_peak - optimal_peak,
        battery_throughput_kwh: throughput,
        battery_cycles: throughput / (2.0 * battery.capacity_kwh),
        total_import_kwh: optimal.total_import_kwh(),
        total_export_kwh: optimal.total_export_kwh(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BatteryAsset, RunParameters, SiteConfig};
    use approx::assert_relative_eq;

    fn dispatch() -> Dispatch {
        let mut d = Dispatch::zeros(4, 0.5);
        d.grid_import_kw = vec![2.0, 4.0, 0.0, 0.0];
        d.grid_export_kw = vec![0.0, 0.0, 1.0, 3.0];
        d.battery_charge_kw = vec![1.0, 0.0, 1.0, 0.0];
        d.battery_discharge_kw = vec![0.0, 2.0, 0.0, 0.0];
        d
    }

    fn prices() -> PriceSchedule {
        PriceSchedule {
            import: vec![0.10, 0.20, 0.10, 0.10],
            export: vec![0.05; 4],
        }
    }

    #[test]
    fn test_cost_components() {
        let tariff = Tariff::flat(0.1, 0.05).with_demand_charge(10.0);
        let cost = compute_cost(&dispatch(), &prices(), &tariff, 0.01);
        assert_relative_eq!(cost.import_cost, 2.0 * 0.1 * 0.5 + 4.0 * 0.2 * 0.5);
        assert_relative_eq!(cost.export_revenue, 4.0 * 0.05 * 0.5);
        assert_relative_eq!(cost.demand_charge, 40.0);
        assert_relative_eq!(cost.degradation_cost, 4.0 * 0.5 * 0.01);
        assert_relative_eq!(
            cost.total,
            cost.import_cost - cost.export_revenue + cost.demand_charge + cost.degradation_cost
        );
    }

    #[test]
    fn test_demand_charge_only_when_enabled() {
        let mut tariff = Tariff::flat(0.1, 0.05).with_demand_charge(10.0);
        tariff.demand_charge_enabled = false;
        let cost = compute_cost(&dispatch(), &prices(), &tariff, 0.0);
        assert_eq!(cost.demand_charge, 0.0);
    }

    #[test]
    fn test_metrics_against_itself_show_no_savings() {
        let scenario = Scenario::new(
            SiteConfig::new("m", BatteryAsset::new(10.0, 5.0, 5.0)),
            RunParameters::new("m", Tariff::flat(0.1, 0.05)),
        );
        let d = dispatch();
        let m = compute_metrics(&d, &d, &scenario, &prices());
        assert_eq!(m.savings_gbp, 0.0);
        assert_eq!(m.peak_reduction_kw, 0.0);
        assert_relative_eq!(m.battery_throughput_kwh, 2.0);
        assert_relative_eq!(m.battery_cycles, 0.1);
        assert_relative_eq!(m.total_import_kwh, 3.0);
        assert_relative_eq!(m.total_export_kwh, 2.0);
    }

    #[test]
    fn test_zero_baseline_cost_gives_zero_percentage() {
        let scenario = Scenario::new(
            SiteConfig::new("m", BatteryAsset::new(10.0, 5.0, 5.0)),
            RunParameters::new("m", Tariff::flat(0.0, 0.0)),
        );
        let free = PriceSchedule {
            import: vec![0.0; 4],
            export: vec![0.0; 4],
        };
        let m = compute_metrics(&dispatch(), &Dispatch::zeros(4, 0.5), &scenario, &free);
        assert_eq!(m.baseline_cost_gbp, 0.0);
        assert_eq!(m.savings_pct, 0.0);
    }
}
