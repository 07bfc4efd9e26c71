use serde::{Deserialize, Serialize};
use validator::Validate;

use super::ConfigError;

fn default_efficiency() -> f64 {
    0.95
}

fn default_min_soc_frac() -> f64 {
    0.1
}

fn default_max_soc_frac() -> f64 {
    0.9
}

fn default_initial_soc_frac() -> f64 {
    0.5
}

/// Battery asset as installed behind the meter.
///
/// All powers are in kW, energies in kWh and state-of-charge limits are
/// fractions of `capacity_kwh`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct BatteryAsset {
    #[validate(range(exclusive_min = 0.0))]
    pub capacity_kwh: f64,

    #[validate(range(exclusive_min = 0.0))]
    pub max_charge_kw: f64,

    #[validate(range(exclusive_min = 0.0))]
    pub max_discharge_kw: f64,

    /// Fraction of grid-side energy that ends up stored while charging
    #[serde(default = "default_efficiency")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub charge_efficiency: f64,

    /// Fraction of stored energy delivered to the site while discharging
    #[serde(default = "default_efficiency")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub discharge_efficiency: f64,

    #[serde(default = "default_min_soc_frac")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub min_soc_frac: f64,

    #[serde(default = "default_max_soc_frac")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub max_soc_frac: f64,

    #[serde(default = "default_initial_soc_frac")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub initial_soc_frac: f64,

    /// Linear wear cost per kWh of throughput (charge + discharge)
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub degradation_cost_gbp_per_kwh: f64,
}

impl BatteryAsset {
    /// Battery with default efficiencies and SOC window.
    pub fn new(capacity_kwh: f64, max_charge_kw: f64, max_discharge_kw: f64) -> Self {
        Self {
            capacity_kwh,
            max_charge_kw,
            max_discharge_kw,
            charge_efficiency: default_efficiency(),
            discharge_efficiency: default_efficiency(),
            min_soc_frac: default_min_soc_frac(),
            max_soc_frac: default_max_soc_frac(),
            initial_soc_frac: default_initial_soc_frac(),
            degradation_cost_gbp_per_kwh: 0.0,
        }
    }

    pub fn min_soc_kwh(&self) -> f64 {
        self.min_soc_frac * self.capacity_kwh
    }

    pub fn max_soc_kwh(&self) -> f64 {
        self.max_soc_frac * self.capacity_kwh
    }

    pub fn initial_soc_kwh(&self) -> f64 {
        self.initial_soc_frac * self.capacity_kwh
    }

    /// SOC after one step of `charge_kw` / `discharge_kw` held for `timestep_hours`.
    pub fn next_soc(&self, soc_kwh: f64, charge_kw: f64, discharge_kw: f64, timestep_hours: f64) -> f64 {
        soc_kwh + charge_kw * self.charge_efficiency * timestep_hours
            - discharge_kw * timestep_hours / self.discharge_efficiency
    }

    /// Range checks plus the cross-field and physical checks the schema cannot express.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;

        if self.min_soc_frac >= self.max_soc_frac {
            return Err(ConfigError::invalid(
                "battery.min_soc_frac",
                format!(
                    "must be below max_soc_frac ({} >= {})",
                    self.min_soc_frac, self.max_soc_frac
                ),
            ));
        }

        if self.initial_soc_frac < self.min_soc_frac || self.initial_soc_frac > self.max_soc_frac {
            return Err(ConfigError::invalid(
                "battery.initial_soc_frac",
                format!(
                    "{} lies outside the SOC window [{}, {}]",
                    self.initial_soc_frac, self.min_soc_frac, self.max_soc_frac
                ),
            ));
        }

        // The SOC recurrence divides by the discharge efficiency.
        if self.discharge_efficiency <= 0.0 {
            return Err(ConfigError::invalid(
                "battery.discharge_efficiency",
                "must be strictly positive",
            ));
        }

        Ok(())
    }
}
