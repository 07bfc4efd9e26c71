use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use validator::Validate;

use crate::domain::RunParameters;
use crate::optimizer::{FrontierSettings, GoodLpBackend, SolverAdapter, SolverKind};

/// Default location of the application config, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "btm.toml";

/// Application settings. Per-run inputs live in the bundle, not here.
///
/// Sources, later ones winning: built-in defaults, the TOML file, then
/// `BTM__`-prefixed environment variables (`BTM__SOLVER__BACKEND=clarabel`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AppConfig {
    #[validate(nested)]
    pub solver: SolverConfig,
    #[validate(nested)]
    pub frontier: FrontierSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SolverConfig {
    pub backend: SolverKind,
    /// Overrides `solver_time_limit_seconds` of every run when set
    #[validate(range(exclusive_min = 0.0))]
    pub time_limit_seconds: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load from `path` (missing file is fine) plus the environment.
    pub fn load_from(path: &Path) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("BTM__").split("__"));
        Self::from_figment(figment).with_context(|| format!("loading settings from {}", path.display()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Solver adapter for `run`, honouring the time-limit override.
    pub fn solver_adapter(&self, run: &RunParameters) -> SolverAdapter {
        let time_limit = self
            .solver
            .time_limit_seconds
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or_else(|| run.time_limit());
        SolverAdapter::new(GoodLpBackend::new(self.solver.backend), time_limit)
    }
}
