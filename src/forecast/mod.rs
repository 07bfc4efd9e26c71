//! Forecast providers: where the optimizer's view of the coming horizon comes from.

mod persistence;
mod replay;

pub use persistence::Persistence;
pub use replay::HistoricalReplay;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{TimeSeries, TimeSeriesError};

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("no data available for a forecast issued at {0}")]
    NoData(DateTime<Utc>),

    #[error("horizon of {horizon_hours} h holds no whole {timestep_minutes}-minute step")]
    EmptyHorizon { horizon_hours: u32, timestep_minutes: i64 },

    #[error(transparent)]
    Series(#[from] TimeSeriesError),
}

/// Produces load, generation and price inputs for the horizon starting at `now`.
pub trait ForecastProvider {
    fn forecast(&self, now: DateTime<Utc>, horizon_hours: u32) -> Result<TimeSeries, ForecastError>;
}
