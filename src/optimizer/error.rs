use thiserror::Error;

use crate::domain::ConfigError;
use crate::evaluation::ValidationError;

/// Failure of a build → solve → validate pass.
///
/// `Infeasible` is kept apart from `Solver`: the frontier generator treats
/// infeasibility as a control signal while any other solver failure is fatal.
#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no feasible dispatch: {0}")]
    Infeasible(String),

    #[error("solver failed: {0}")]
    Solver(String),

    #[error("dispatch violates physical constraints: {0}")]
    Validation(#[from] ValidationError),
}

impl OptimizeError {
    pub fn is_infeasible(&self) -> bool {
        matches!(self, OptimizeError::Infeasible(_))
    }
}
