use chrono::{DateTime, Duration, Utc};

use super::{ForecastError, ForecastProvider};
use crate::domain::TimeSeries;

/// Perfect foresight for backtesting: the recorded history itself.
#[derive(Debug, Clone)]
pub struct HistoricalReplay {
    history: TimeSeries,
}

impl HistoricalReplay {
    pub fn new(history: TimeSeries) -> Self {
        Self { history }
    }
}

impl ForecastProvider for HistoricalReplay {
    /// Recorded rows with `now <= timestamp < now + horizon`.
    fn forecast(&self, now: DateTime<Utc>, horizon_hours: u32) -> Result<TimeSeries, ForecastError> {
        let until = now + Duration::hours(i64::from(horizon_hours));
        self.history
            .window(now, until)
            .ok_or(ForecastError::NoData(now))
    }
}
