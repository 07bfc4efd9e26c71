//! Independent physical check of a dispatch.
//!
//! Nothing here trusts the solver or the model formulation: every invariant is
//! re-derived from the scenario and the input series.

use thiserror::Error;

use crate::domain::{Dispatch, Scenario, TimeSeries};

/// Absolute tolerance for all physical checks (kW, kWh).
pub const NUMERICAL_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{quantity} has {found} steps, expected {expected}")]
    LengthMismatch {
        quantity: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{quantity} is negative at step {step}: {value}")]
    Negative {
        quantity: &'static str,
        step: usize,
        value: f64,
    },

    #[error("{quantity} at step {step} is {value}, above its limit {limit}")]
    AboveLimit {
        quantity: &'static str,
        step: usize,
        value: f64,
        limit: f64,
    },

    #[error("{quantity} at step {step} is {value}, below its limit {limit}")]
    BelowLimit {
        quantity: &'static str,
        step: usize,
        value: f64,
        limit: f64,
    },

    #[error("energy balance violated at step {step}: residual {residual} kW")]
    EnergyBalance { step: usize, residual: f64 },

    #[error("dispatch timestep is {found} h, the input series uses {expected} h")]
    Timestep { expected: f64, found: f64 },

    #[error("soc_kwh does not follow the battery dynamics at step {step}: expected {expected}, found {found}")]
    SocRecurrence { step: usize, expected: f64, found: f64 },
}

/// Check every physical invariant of `dispatch` against the scenario and inputs.
///
/// Returns the first violation found, naming the quantity, step and bound.
pub fn validate_dispatch(
    dispatch: &Dispatch,
    scenario: &Scenario,
    series: &TimeSeries,
) -> Result<(), ValidationError> {
    let battery = scenario.battery();
    let caps = &scenario.site.constraints;
    let steps = series.len();
    let dt = series.timestep_hours();
    if (dispatch.timestep_hours - dt).abs() > NUMERICAL_TOLERANCE {
        return Err(ValidationError::Timestep {
            expected: dt,
            found: dispatch.timestep_hours,
        });
    }

    let columns: [(&'static str, &[f64]); 5] = [
        ("grid_import_kw", dispatch.grid_import_kw.as_slice()),
        ("grid_export_kw", dispatch.grid_export_kw.as_slice()),
        ("battery_charge_kw", dispatch.battery_charge_kw.as_slice()),
        ("battery_discharge_kw", dispatch.battery_discharge_kw.as_slice()),
        ("soc_kwh", dispatch.soc_kwh.as_slice()),
    ];
    for (quantity, values) in columns {
        if values.len() != steps {
            return Err(ValidationError::LengthMismatch {
                quantity,
                expected: steps,
                found: values.len(),
            });
        }
        if let Some((step, &value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| **v < -NUMERICAL_TOLERANCE)
        {
            return Err(ValidationError::Negative { quantity, step, value });
        }
    }

    let mut upper_limits: Vec<(&'static str, &[f64], f64)> = vec![
        ("soc_kwh", dispatch.soc_kwh.as_slice(), battery.max_soc_kwh()),
        ("battery_charge_kw", dispatch.battery_charge_kw.as_slice(), battery.max_charge_kw),
        ("battery_discharge_kw", dispatch.battery_discharge_kw.as_slice(), battery.max_discharge_kw),
    ];
    if let Some(cap) = caps.max_grid_import_kw {
        upper_limits.push(("grid_import_kw", dispatch.grid_import_kw.as_slice(), cap));
    }
    if let Some(cap) = caps.max_grid_export_kw {
        upper_limits.push(("grid_export_kw", dispatch.grid_export_kw.as_slice(), cap));
    }
    for (quantity, values, limit) in upper_limits {
        if let Some((step, &value)) = values
            .iter()
            .enumerate()
            .find(|(_, v)| **v > limit + NUMERICAL_TOLERANCE)
        {
            return Err(ValidationError::AboveLimit { quantity, step, value, limit });
        }
    }

    let min_soc = battery.min_soc_kwh();
    if let Some((step, &value)) = dispatch
        .soc_kwh
        .iter()
        .enumerate()
        .find(|(_, v)| **v < min_soc - NUMERICAL_TOLERANCE)
    {
        return Err(ValidationError::BelowLimit {
            quantity: "soc_kwh",
            step,
            value,
            limit: min_soc,
        });
    }

    let mut previous_soc = battery.initial_soc_kwh();
    for step in 0..steps {
        let residual = series.load_kw()[step]
            + dispatch.battery_charge_kw[step]
            + dispatch.grid_export_kw[step]
            - series.pv_kw()[step]
            - dispatch.battery_discharge_kw[step]
            - dispatch.grid_import_kw[step];
        if residual.abs() > NUMERICAL_TOLERANCE {
            return Err(ValidationError::EnergyBalance { step, residual });
        }

        let expected = battery.next_soc(
            previous_soc,
            dispatch.battery_charge_kw[step],
            dispatch.battery_discharge_kw[step],
            dt,
        );
        let found = dispatch.soc_kwh[step];
        if (found - expected).abs() > NUMERICAL_TOLERANCE {
            return Err(ValidationError::SocRecurrence { step, expected, found });
        }
        previous_soc = found;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BatteryAsset, RunParameters, SiteConfig, Tariff};
    use chrono::{Duration, TimeZone, Utc};

    fn fixture() -> (Scenario, TimeSeries, Dispatch) {
        let site = SiteConfig::new("v", BatteryAsset::new(10.0, 5.0, 5.0)).with_import_cap(10.0);
        let scenario = Scenario::new(site, RunParameters::new("v", Tariff::flat(0.15, 0.05)));
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let series =
            TimeSeries::from_columns(start, Duration::minutes(15), vec![4.0, 4.0], vec![0.0, 0.0], None, None)
                .unwrap();
        // Idle battery, everything imported.
        let mut dispatch = Dispatch::zeros(2, 0.25);
        dispatch.grid_import_kw = vec![4.0, 4.0];
        dispatch.soc_kwh = vec![5.0, 5.0];
        (scenario, series, dispatch)
    }

    #[test]
    fn test_consistent_dispatch_passes() {
        let (scenario, series, dispatch) = fixture();
        assert_eq!(validate_dispatch(&dispatch, &scenario, &series), Ok(()));
    }

    #[test]
    fn test_energy_imbalance_is_reported() {
        let (scenario, series, mut dispatch) = fixture();
        dispatch.grid_import_kw[1] = 3.0;
        assert_eq!(
            validate_dispatch(&dispatch, &scenario, &series),
            Err(ValidationError::EnergyBalance { step: 1, residual: 1.0 })
        );
    }

    #[test]
    fn test_soc_jump_is_reported() {
        let (scenario, series, mut dispatch) = fixture();
        dispatch.soc_kwh[1] = 6.0;
        assert!(matches!(
            validate_dispatch(&dispatch, &scenario, &series),
            Err(ValidationError::SocRecurrence { step: 1, .. })
        ));
    }

    #[test]
    fn test_soc_is_checked_against_the_series_timestep() {
        let (scenario, series, mut dispatch) = fixture();
        // Consistent with half-hour steps, wrong for the quarter-hourly series.
        dispatch.timestep_hours = 0.5;
        dispatch.grid_import_kw = vec![6.0, 6.0];
        dispatch.battery_charge_kw = vec![2.0, 2.0];
        dispatch.soc_kwh = vec![5.95, 6.9];
        assert_eq!(
            validate_dispatch(&dispatch, &scenario, &series),
            Err(ValidationError::Timestep {
                expected: 0.25,
                found: 0.5,
            })
        );

        dispatch.timestep_hours = 0.25;
        assert!(matches!(
            validate_dispatch(&dispatch, &scenario, &series),
            Err(ValidationError::SocRecurrence { step: 0, .. })
        ));
    }

    #[test]
    fn test_limits_are_named() {
        let (scenario, series, mut dispatch) = fixture();
        dispatch.grid_import_kw[0] = 11.0;
        dispatch.grid_export_kw[0] = 7.0;
        assert_eq!(
            validate_dispatch(&dispatch, &scenario, &series),
            Err(ValidationError::AboveLimit {
                quantity: "grid_import_kw",
                step: 0,
                value: 11.0,
                limit: 10.0,
            })
        );

        let (scenario, series, mut dispatch) = fixture();
        dispatch.soc_kwh[0] = 0.5;
        assert!(matches!(
            validate_dispatch(&dispatch, &scenario, &series),
            Err(ValidationError::BelowLimit { quantity: "soc_kwh", step: 0, .. })
        ));
    }

    #[test]
    fn test_negative_and_length_checks() {
        let (scenario, series, mut dispatch) = fixture();
        dispatch.battery_charge_kw[1] = -0.1;
        assert!(matches!(
            validate_dispatch(&dispatch, &scenario, &series),
            Err(ValidationError::Negative { quantity: "battery_charge_kw", step: 1, .. })
        ));

        let (scenario, series, mut dispatch) = fixture();
        dispatch.soc_kwh.pop();
        assert!(matches!(
            validate_dispatch(&dispatch, &scenario, &series),
            Err(ValidationError::LengthMismatch { quantity: "soc_kwh", .. })
        ));
    }
}
