use thiserror::Error;

/// Direction of a grid price (used to name which price is missing)
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum PriceDirection {
    Import,
    Export,
}

/// Missing or contradictory configuration. Always fatal, never retried.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no {0} price: supply a flat tariff price or a per-step price column")]
    MissingPrice(PriceDirection),

    #[error("schema validation failed: {0}")]
    Schema(#[from] validator::ValidationErrors),

    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}
