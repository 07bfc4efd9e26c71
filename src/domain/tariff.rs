use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{ConfigError, PriceDirection, TimeSeries};

/// Energy and demand pricing for one run.
///
/// Per-step prices carried by the timeseries take precedence over the flat
/// prices here; the flat prices are only a fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct Tariff {
    #[serde(default)]
    pub flat_import_price_gbp_per_kwh: Option<f64>,

    #[serde(default)]
    pub flat_export_price_gbp_per_kwh: Option<f64>,

    /// Charge the single maximum grid import over the horizon
    #[serde(default)]
    pub demand_charge_enabled: bool,

    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub demand_charge_gbp_per_kw: f64,
}

/// Import/export prices resolved for every step of a horizon (£/kWh).
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSchedule {
    pub import: Vec<f64>,
    pub export: Vec<f64>,
}

impl Tariff {
    pub fn flat(import_gbp_per_kwh: f64, export_gbp_per_kwh: f64) -> Self {
        Self {
            flat_import_price_gbp_per_kwh: Some(import_gbp_per_kwh),
            flat_export_price_gbp_per_kwh: Some(export_gbp_per_kwh),
            ..Self::default()
        }
    }

    pub fn with_demand_charge(mut self, gbp_per_kw: f64) -> Self {
        self.demand_charge_enabled = true;
        self.demand_charge_gbp_per_kw = gbp_per_kw;
        self
    }

    /// Demand rate that actually applies to this tariff (zero when disabled).
    pub fn effective_demand_rate(&self) -> f64 {
        if self.demand_charge_enabled {
            self.demand_charge_gbp_per_kw
        } else {
            0.0
        }
    }

    /// Pick per-step prices from the series, falling back to flat prices.
    pub fn resolve_prices(&self, series: &TimeSeries) -> Result<PriceSchedule, ConfigError> {
        let n = series.len();
        let import = match (series.import_price(), self.flat_import_price_gbp_per_kwh) {
            (Some(column), _) => column.to_vec(),
            (None, Some(flat)) => vec![flat; n],
            (None, None) => return Err(ConfigError::MissingPrice(PriceDirection::Import)),
        };
        let export = match (series.export_price(), self.flat_export_price_gbp_per_kwh) {
            (Some(column), _) => column.to_vec(),
            (None, Some(flat)) => vec![flat; n],
            (None, None) => return Err(ConfigError::MissingPrice(PriceDirection::Export)),
        };
        Ok(PriceSchedule { import, export })
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        for (field, price) in [
            ("tariff.flat_import_price_gbp_per_kwh", self.flat_import_price_gbp_per_kwh),
            ("tariff.flat_export_price_gbp_per_kwh", self.flat_export_price_gbp_per_kwh),
        ] {
            if price.is_some_and(|p| !p.is_finite()) {
                return Err(ConfigError::invalid(field, "must be finite"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TimeStep;
    use chrono::{Duration, TimeZone, Utc};

    fn series(with_prices: bool) -> TimeSeries {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let records = (0..3)
            .map(|i| TimeStep {
                timestamp: start + Duration::minutes(15 * i),
                load_kw: 1.0,
                pv_kw: 0.0,
                import_price: with_prices.then_some(0.3),
                export_price: with_prices.then_some(-0.01),
            })
            .collect();
        TimeSeries::new(records, Duration::minutes(15)).unwrap()
    }

    #[test]
    fn test_series_prices_take_precedence() {
        let prices = Tariff::flat(0.15, 0.05).resolve_prices(&series(true)).unwrap();
        assert_eq!(prices.import, vec![0.3; 3]);
        assert_eq!(prices.export, vec![-0.01; 3]);
    }

    #[test]
    fn test_flat_prices_fill_missing_columns() {
        let prices = Tariff::flat(0.15, 0.05).resolve_prices(&series(false)).unwrap();
        assert_eq!(prices.import, vec![0.15; 3]);
        assert_eq!(prices.export, vec![0.05; 3]);
    }

    #[test]
    fn test_missing_prices_name_the_direction() {
        let tariff = Tariff {
            flat_import_price_gbp_per_kwh: Some(0.15),
            ..Tariff::default()
        };
        let err = tariff.resolve_prices(&series(false)).unwrap_err();
        assert!(matches!(err, ConfigError::MissingPrice(PriceDirection::Export)));
        assert!(err.to_string().contains("export"));
    }

    #[test]
    fn test_disabled_demand_charge_has_no_rate() {
        let mut tariff = Tariff::flat(0.1, 0.0);
        tariff.demand_charge_gbp_per_kw = 12.0;
        assert_eq!(tariff.effective_demand_rate(), 0.0);
        assert_eq!(tariff.with_demand_charge(12.0).effective_demand_rate(), 12.0);
    }
}
