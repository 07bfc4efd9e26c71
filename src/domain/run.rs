use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use super::{BatteryAsset, ConfigError, SiteConfig, Tariff};

fn default_timestep_minutes() -> u32 {
    15
}

fn default_horizon_hours() -> u32 {
    24
}

fn default_time_limit_seconds() -> f64 {
    60.0
}

fn default_gap_tolerance() -> f64 {
    1e-4
}

/// Parameters of a single optimization run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RunParameters {
    #[validate(length(min = 1))]
    pub run_id: String,

    #[serde(default = "default_timestep_minutes")]
    #[validate(range(min = 1))]
    pub timestep_minutes: u32,

    #[serde(default = "default_horizon_hours")]
    #[validate(range(min = 1))]
    pub horizon_hours: u32,

    #[serde(default)]
    #[validate(nested)]
    pub tariff: Tariff,

    #[serde(default = "default_time_limit_seconds")]
    #[validate(range(exclusive_min = 0.0))]
    pub solver_time_limit_seconds: f64,

    /// Recorded for reproducibility; LP backends solve to optimality.
    #[serde(default = "default_gap_tolerance")]
    #[validate(range(min = 0.0))]
    pub solver_gap_tolerance: f64,
}

impl RunParameters {
    pub fn new(run_id: impl Into<String>, tariff: Tariff) -> Self {
        Self {
            run_id: run_id.into(),
            timestep_minutes: default_timestep_minutes(),
            horizon_hours: default_horizon_hours(),
            tariff,
            solver_time_limit_seconds: default_time_limit_seconds(),
            solver_gap_tolerance: default_gap_tolerance(),
        }
    }

    pub fn timestep_hours(&self) -> f64 {
        f64::from(self.timestep_minutes) / 60.0
    }

    pub fn timestep(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.timestep_minutes))
    }

    /// Wall-clock budget per solve; absurdly large limits saturate.
    pub fn time_limit(&self) -> Duration {
        Duration::try_from_secs_f64(self.solver_time_limit_seconds).unwrap_or(Duration::MAX)
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if !self.solver_time_limit_seconds.is_finite() {
            return Err(ConfigError::invalid(
                "run.solver_time_limit_seconds",
                "must be a finite number of seconds",
            ));
        }
        if 60 % self.timestep_minutes != 0 {
            return Err(ConfigError::invalid(
                "run.timestep_minutes",
                format!("{} must divide 60 evenly", self.timestep_minutes),
            ));
        }
        self.tariff.check()
    }
}

/// One complete dispatch problem: the site and how to run it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub site: SiteConfig,
    pub run: RunParameters,
}

impl Scenario {
    pub fn new(site: SiteConfig, run: RunParameters) -> Self {
        Self { site, run }
    }

    pub fn battery(&self) -> &BatteryAsset {
        &self.site.battery
    }

    pub fn tariff(&self) -> &Tariff {
        &self.run.tariff
    }

    pub fn timestep_hours(&self) -> f64 {
        self.run.timestep_hours()
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        self.site.check()?;
        self.run.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(15, 0.25)]
    #[case(30, 0.5)]
    #[case(60, 1.0)]
    #[case(5, 5.0 / 60.0)]
    fn test_timestep_hours(#[case] minutes: u32, #[case] hours: f64) {
        let mut run = RunParameters::new("r", Tariff::flat(0.1, 0.0));
        run.timestep_minutes = minutes;
        assert!(run.check().is_ok());
        assert!((run.timestep_hours() - hours).abs() < 1e-12);
    }

    #[rstest]
    #[case(7)]
    #[case(45)]
    #[case(90)]
    fn test_timestep_must_divide_an_hour(#[case] minutes: u32) {
        let mut run = RunParameters::new("r", Tariff::flat(0.1, 0.0));
        run.timestep_minutes = minutes;
        assert!(matches!(
            run.check(),
            Err(ConfigError::Invalid { field: "run.timestep_minutes", .. })
        ));
    }

    #[test]
    fn test_run_yaml_defaults() {
        let run: RunParameters = serde_yaml::from_str("run_id: backtest-1\n").unwrap();
        assert_eq!(run.timestep_minutes, 15);
        assert_eq!(run.horizon_hours, 24);
        assert_eq!(run.time_limit(), Duration::from_secs(60));
        assert!(!run.tariff.demand_charge_enabled);
    }
}
