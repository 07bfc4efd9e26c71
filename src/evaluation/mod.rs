//! Post-solve evaluation: cost metrics and the physical validator.

mod metrics;
mod validate;

pub use metrics::{compute_cost, compute_metrics, CostBreakdown, Metrics};
pub use validate::{validate_dispatch, ValidationError, NUMERICAL_TOLERANCE};
