//! Shared fixtures for integration tests.
#![allow(dead_code)]

use btm_dispatch::domain::{BatteryAsset, RunParameters, Scenario, SiteConfig, Tariff, TimeSeries};
use btm_dispatch::optimizer::SolverAdapter;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::time::Duration as StdDuration;

pub const TOLERANCE: f64 = 1e-6;

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// 10 kWh / 5 kW / 5 kW, 95 % each way, SOC window 10–90 %, starting at 50 %.
pub fn default_battery() -> BatteryAsset {
    BatteryAsset::new(10.0, 5.0, 5.0)
}

pub fn scenario(battery: BatteryAsset, tariff: Tariff) -> Scenario {
    Scenario::new(
        SiteConfig::new("test-site", battery),
        RunParameters::new("test-run", tariff),
    )
}

/// Quarter-hourly series without price columns.
pub fn series(load: Vec<f64>, pv: Vec<f64>) -> TimeSeries {
    TimeSeries::from_columns(start(), Duration::minutes(15), load, pv, None, None).unwrap()
}

/// Quarter-hourly series with per-step prices.
pub fn priced_series(load: Vec<f64>, pv: Vec<f64>, import: Vec<f64>, export: Vec<f64>) -> TimeSeries {
    TimeSeries::from_columns(start(), Duration::minutes(15), load, pv, Some(import), Some(export)).unwrap()
}

/// `steps` quarter-hours spread over one daily shape: base load with an
/// evening peak, a midday PV bell and time-of-use prices.
pub fn daily_profile(steps: usize) -> TimeSeries {
    let hours: Vec<f64> = (0..steps).map(|t| t as f64 * 24.0 / steps as f64).collect();
    let load = hours
        .iter()
        .map(|h| 2.0 + 1.5 * (-(h - 18.0).powi(2) / 4.0).exp() + if (7.0..22.0).contains(h) { 1.0 } else { 0.0 })
        .collect();
    let pv = hours
        .iter()
        .map(|h| (4.0 * ((h - 6.0) * std::f64::consts::PI / 12.0).sin()).max(0.0))
        .collect();
    let import = hours
        .iter()
        .map(|h| match h {
            h if (16.0..21.0).contains(h) => 0.30,
            h if (7.0..16.0).contains(h) => 0.15,
            _ => 0.10,
        })
        .collect();
    priced_series(load, pv, import, vec![0.05; steps])
}

pub fn adapter() -> SolverAdapter {
    SolverAdapter::default().with_time_limit(StdDuration::from_secs(30))
}
