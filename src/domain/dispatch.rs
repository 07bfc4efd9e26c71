use chrono::{DateTime, Utc};
use itertools::izip;
use serde::{Deserialize, Serialize};

/// Battery and grid schedule for a horizon, stored column-wise.
///
/// Every flow is a non-negative power in kW held for `timestep_hours`;
/// `soc_kwh[t]` is the absolute state of charge at the end of step `t`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dispatch {
    pub timestep_hours: f64,
    pub grid_import_kw: Vec<f64>,
    pub grid_export_kw: Vec<f64>,
    pub battery_charge_kw: Vec<f64>,
    pub battery_discharge_kw: Vec<f64>,
    pub soc_kwh: Vec<f64>,
}

/// One output row, as written to `dispatch.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchRow {
    pub timestamp: DateTime<Utc>,
    pub grid_import_kw: f64,
    pub grid_export_kw: f64,
    pub battery_charge_kw: f64,
    pub battery_discharge_kw: f64,
    pub soc_kwh: f64,
    pub soc_frac: f64,
}

impl Dispatch {
    /// All-zero schedule of `steps` steps.
    pub fn zeros(steps: usize, timestep_hours: f64) -> Self {
        Self {
            timestep_hours,
            grid_import_kw: vec![0.0; steps],
            grid_export_kw: vec![0.0; steps],
            battery_charge_kw: vec![0.0; steps],
            battery_discharge_kw: vec![0.0; steps],
            soc_kwh: vec![0.0; steps],
        }
    }

    pub fn len(&self) -> usize {
        self.soc_kwh.len()
    }

    pub fn is_empty(&self) -> bool {
        self.soc_kwh.is_empty()
    }

    /// Single maximum grid import over the horizon.
    pub fn peak_import_kw(&self) -> f64 {
        self.grid_import_kw.iter().copied().fold(0.0, f64::max)
    }

    /// Energy through the battery terminals, charge plus discharge.
    pub fn throughput_kwh(&self) -> f64 {
        self.battery_charge_kw
            .iter()
            .zip(&self.battery_discharge_kw)
            .map(|(c, d)| (c + d) * self.timestep_hours)
            .sum()
    }

    pub fn total_import_kwh(&self) -> f64 {
        self.grid_import_kw.iter().sum::<f64>() * self.timestep_hours
    }

    pub fn total_export_kwh(&self) -> f64 {
        self.grid_export_kw.iter().sum::<f64>() * self.timestep_hours
    }

    /// Zip with timestamps into output rows.
    pub fn rows(&self, timestamps: &[DateTime<Utc>], capacity_kwh: f64) -> Vec<DispatchRow> {
        izip!(
            timestamps,
            &self.grid_import_kw,
            &self.grid_export_kw,
            &self.battery_charge_kw,
            &self.battery_discharge_kw,
            &self.soc_kwh
        )
        .map(|(&timestamp, &import, &export, &charge, &discharge, &soc)| DispatchRow {
            timestamp,
            grid_import_kw: import,
            grid_export_kw: export,
            battery_charge_kw: charge,
            battery_discharge_kw: discharge,
            soc_kwh: soc,
            soc_frac: soc / capacity_kwh,
        })
        .collect()
    }
}
