mod common;

use approx::assert_relative_eq;

use btm_dispatch::bundle::{self, BundleMetadata, DISPATCH_FILE, METADATA_FILE, SOLVE_STATS_FILE};
use btm_dispatch::config::AppConfig;
use btm_dispatch::domain::{RunParameters, SiteConfig, Tariff};
use btm_dispatch::forecast::{ForecastProvider, HistoricalReplay};
use btm_dispatch::optimizer::SolveReport;
use btm_dispatch::runner::{run_backtest, run_frontier, run_underwriting};
use common::{daily_profile, default_battery, start, TOLERANCE};
use tempfile::tempdir;

fn init(dir: &std::path::Path, tariff: Tariff) {
    let site = SiteConfig::new("bundle-site", default_battery()).with_import_cap(12.0);
    let run = RunParameters::new("bundle-run", tariff);
    bundle::init_bundle(dir, &site, &run, &daily_profile(32)).unwrap();
}

#[test]
fn backtest_writes_and_reports_results() {
    let dir = tempdir().unwrap();
    init(dir.path(), Tariff::flat(0.15, 0.05).with_demand_charge(1.0));

    let outcome = run_backtest(dir.path(), &AppConfig::default()).unwrap();
    assert!(outcome.metrics.savings_gbp >= -TOLERANCE);
    assert_eq!(outcome.optimized.report.solver_status, "optimal");

    let stored = bundle::read_metrics(dir.path()).unwrap();
    assert_relative_eq!(stored.savings_gbp, outcome.metrics.savings_gbp, epsilon = 1e-9);
    assert_relative_eq!(stored.battery_cycles, outcome.metrics.battery_cycles, epsilon = 1e-9);

    let report: SolveReport =
        serde_json::from_reader(std::fs::File::open(dir.path().join(SOLVE_STATS_FILE)).unwrap()).unwrap();
    assert_eq!(report.backend, "good_lp/minilp");

    let metadata: BundleMetadata =
        serde_json::from_reader(std::fs::File::open(dir.path().join(METADATA_FILE)).unwrap()).unwrap();
    assert_eq!(metadata.engine_version, env!("CARGO_PKG_VERSION"));

    let rows = csv::Reader::from_path(dir.path().join(DISPATCH_FILE))
        .unwrap()
        .records()
        .count();
    assert_eq!(rows, 32);
}

#[test]
fn frontier_run_selects_a_stored_point() {
    let dir = tempdir().unwrap();
    init(dir.path(), Tariff::flat(0.15, 0.05).with_demand_charge(1.0));

    let mut config = AppConfig::default();
    config.frontier.points = 5;
    let outcome = run_frontier(dir.path(), &config, 1.0).unwrap();

    let stored = bundle::read_frontier(dir.path()).unwrap().unwrap();
    assert_eq!(stored.selected_index, outcome.summary.selected_index);
    assert_eq!(stored.points.len(), outcome.front.len());
    let lowest_peak = outcome
        .summary
        .points
        .iter()
        .map(|p| p.peak_demand_kw)
        .fold(f64::INFINITY, f64::min);
    assert_eq!(outcome.selected().peak_demand_kw, lowest_peak);
}

#[test]
fn underwriting_is_not_available() {
    let dir = tempdir().unwrap();
    init(dir.path(), Tariff::flat(0.15, 0.05));
    let err = run_underwriting(dir.path()).unwrap_err();
    assert!(err.to_string().contains("not implemented"));
}

#[test]
fn replayed_forecast_round_trips_through_a_bundle() {
    let dir = tempdir().unwrap();
    init(dir.path(), Tariff::flat(0.15, 0.05));
    let loaded = bundle::load_bundle(dir.path()).unwrap();

    let forecast = HistoricalReplay::new(loaded.series.clone()).forecast(start(), 2).unwrap();
    assert_eq!(forecast.len(), 8);
    assert_eq!(forecast.load_kw(), &loaded.series.load_kw()[..8]);
}
