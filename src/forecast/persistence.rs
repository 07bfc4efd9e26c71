use chrono::{DateTime, Utc};

use super::{ForecastError, ForecastProvider};
use crate::domain::TimeSeries;

/// Naive forecast: the last observation held flat over the whole horizon.
#[derive(Debug, Clone)]
pub struct Persistence {
    history: TimeSeries,
}

impl Persistence {
    pub fn new(history: TimeSeries) -> Self {
        Self { history }
    }
}

impl ForecastProvider for Persistence {
    /// Repeats the last row at or before `now`, starting one step after `now`.
    fn forecast(&self, now: DateTime<Utc>, horizon_hours: u32) -> Result<TimeSeries, ForecastError> {
        let observed = self.history.timestamps().partition_point(|ts| *ts <= now);
        let last = observed.checked_sub(1).ok_or(ForecastError::NoData(now))?;
        let row = self.history.record(last);

        let timestep = self.history.timestep();
        let timestep_minutes = timestep.num_minutes();
        let steps = (i64::from(horizon_hours) * 60 / timestep_minutes) as usize;
        if steps == 0 {
            return Err(ForecastError::EmptyHorizon {
                horizon_hours,
                timestep_minutes,
            });
        }

        let series = TimeSeries::from_columns(
            now + timestep,
            timestep,
            vec![row.load_kw; steps],
            vec![row.pv_kw; steps],
            row.import_price.map(|p| vec![p; steps]),
            row.export_price.map(|p| vec![p; steps]),
        )?;
        Ok(series)
    }
}
