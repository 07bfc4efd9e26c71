use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{BatteryAsset, ConfigError};

/// Contractual grid connection limits. `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct SiteConstraints {
    #[serde(default)]
    #[validate(range(exclusive_min = 0.0))]
    pub max_grid_import_kw: Option<f64>,

    #[serde(default)]
    #[validate(range(exclusive_min = 0.0))]
    pub max_grid_export_kw: Option<f64>,
}

/// Everything physical about one site: the battery and its grid connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SiteConfig {
    #[validate(length(min = 1))]
    pub site_id: String,

    #[validate(nested)]
    pub battery: BatteryAsset,

    #[serde(flatten)]
    #[validate(nested)]
    pub constraints: SiteConstraints,
}

impl SiteConfig {
    pub fn new(site_id: impl Into<String>, battery: BatteryAsset) -> Self {
        Self {
            site_id: site_id.into(),
            battery,
            constraints: SiteConstraints::default(),
        }
    }

    pub fn with_import_cap(mut self, kw: f64) -> Self {
        self.constraints.max_grid_import_kw = Some(kw);
        self
    }

    pub fn with_export_cap(mut self, kw: f64) -> Self {
        self.constraints.max_grid_export_kw = Some(kw);
        self
    }

    pub fn check(&self) -> Result<(), ConfigError> {
        self.validate()?;
        self.battery.check()
    }
}
