//! Input timeseries: load, on-site generation and optional per-step prices.
//!
//! The series is validated once at construction; every consumer downstream
//! may assume it is non-empty, evenly spaced and free of missing values.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TimeSeriesError {
    #[error("timeseries is empty")]
    Empty,

    #[error("timestamps must be strictly increasing (row {index})")]
    NonMonotonic { index: usize },

    #[error("duplicate timestamp {timestamp} (row {index})")]
    Duplicate { index: usize, timestamp: DateTime<Utc> },

    #[error("inconsistent timestep at row {index}: expected {expected_minutes} min, found {found_minutes} min")]
    InconsistentTimestep {
        index: usize,
        expected_minutes: i64,
        found_minutes: i64,
    },

    #[error("column {column} contains negative value {value} (row {index})")]
    Negative {
        column: &'static str,
        index: usize,
        value: f64,
    },

    #[error("column {column} contains a non-finite value (row {index})")]
    NonFinite { column: &'static str, index: usize },

    #[error("column {column} has {missing} missing values")]
    MissingValues { column: &'static str, missing: usize },

    #[error("column {column} has {found} values, expected {expected}")]
    LengthMismatch {
        column: &'static str,
        expected: usize,
        found: usize,
    },
}

/// One row of input data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeStep {
    pub timestamp: DateTime<Utc>,
    pub load_kw: f64,
    pub pv_kw: f64,
    #[serde(rename = "import_price_gbp_per_kwh", default)]
    pub import_price: Option<f64>,
    #[serde(rename = "export_price_gbp_per_kwh", default)]
    pub export_price: Option<f64>,
}

/// Validated, column-oriented timeseries.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    timestep: Duration,
    timestamps: Vec<DateTime<Utc>>,
    load_kw: Vec<f64>,
    pv_kw: Vec<f64>,
    import_price: Option<Vec<f64>>,
    export_price: Option<Vec<f64>>,
}

impl TimeSeries {
    /// Validate `records` against the expected `timestep` and store them column-wise.
    pub fn new(records: Vec<TimeStep>, timestep: Duration) -> Result<Self, TimeSeriesError> {
        if records.is_empty() {
            return Err(TimeSeriesError::Empty);
        }

        for (index, pair) in records.windows(2).enumerate() {
            let index = index + 1;
            let delta = pair[1].timestamp - pair[0].timestamp;
            if delta == Duration::zero() {
                return Err(TimeSeriesError::Duplicate {
                    index,
                    timestamp: pair[1].timestamp,
                });
            }
            if delta < Duration::zero() {
                return Err(TimeSeriesError::NonMonotonic { index });
            }
            if delta != timestep {
                return Err(TimeSeriesError::InconsistentTimestep {
                    index,
                    expected_minutes: timestep.num_minutes(),
                    found_minutes: delta.num_minutes(),
                });
            }
        }

        let timestamps = records.iter().map(|r| r.timestamp).collect();
        let load_kw = records.iter().map(|r| r.load_kw).collect();
        let pv_kw = records.iter().map(|r| r.pv_kw).collect();
        let import_price = collect_optional("import_price_gbp_per_kwh", records.iter().map(|r| r.import_price))?;
        let export_price = collect_optional("export_price_gbp_per_kwh", records.iter().map(|r| r.export_price))?;

        let series = Self {
            timestep,
            timestamps,
            load_kw,
            pv_kw,
            import_price,
            export_price,
        };
        series.check_values()?;
        Ok(series)
    }

    /// Build from aligned columns starting at `start`.
    pub fn from_columns(
        start: DateTime<Utc>,
        timestep: Duration,
        load_kw: Vec<f64>,
        pv_kw: Vec<f64>,
        import_price: Option<Vec<f64>>,
        export_price: Option<Vec<f64>>,
    ) -> Result<Self, TimeSeriesError> {
        let n = load_kw.len();
        let check_len = |column: &'static str, found: usize| {
            if found == n {
                Ok(())
            } else {
                Err(TimeSeriesError::LengthMismatch { column, expected: n, found })
            }
        };
        check_len("pv_kw", pv_kw.len())?;
        if let Some(prices) = &import_price {
            check_len("import_price_gbp_per_kwh", prices.len())?;
        }
        if let Some(prices) = &export_price {
            check_len("export_price_gbp_per_kwh", prices.len())?;
        }

        let records = (0..n)
            .map(|t| TimeStep {
                timestamp: start + timestep * t as i32,
                load_kw: load_kw[t],
                pv_kw: pv_kw[t],
                import_price: import_price.as_ref().map(|p| p[t]),
                export_price: export_price.as_ref().map(|p| p[t]),
            })
            .collect();
        Self::new(records, timestep)
    }

    fn check_values(&self) -> Result<(), TimeSeriesError> {
        for (column, values, non_negative) in [
            ("load_kw", Some(&self.load_kw), true),
            ("pv_kw", Some(&self.pv_kw), true),
            ("import_price_gbp_per_kwh", self.import_price.as_ref(), false),
            ("export_price_gbp_per_kwh", self.export_price.as_ref(), false),
        ] {
            let Some(values) = values else { continue };
            for (index, &value) in values.iter().enumerate() {
                if !value.is_finite() {
                    return Err(TimeSeriesError::NonFinite { column, index });
                }
                if non_negative && value < 0.0 {
                    return Err(TimeSeriesError::Negative { column, index, value });
                }
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timestep(&self) -> Duration {
        self.timestep
    }

    pub fn timestep_hours(&self) -> f64 {
        self.timestep.num_seconds() as f64 / 3600.0
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.timestamps[0]
    }

    pub fn load_kw(&self) -> &[f64] {
        &self.load_kw
    }

    pub fn pv_kw(&self) -> &[f64] {
        &self.pv_kw
    }

    pub fn import_price(&self) -> Option<&[f64]> {
        self.import_price.as_deref()
    }

    pub fn export_price(&self) -> Option<&[f64]> {
        self.export_price.as_deref()
    }

    /// `load - pv` per step; positive is a deficit the site must cover.
    pub fn net_load_kw(&self) -> impl Iterator<Item = f64> + '_ {
        self.load_kw.iter().zip(&self.pv_kw).map(|(load, pv)| load - pv)
    }

    pub fn record(&self, t: usize) -> TimeStep {
        TimeStep {
            timestamp: self.timestamps[t],
            load_kw: self.load_kw[t],
            pv_kw: self.pv_kw[t],
            import_price: self.import_price.as_ref().map(|p| p[t]),
            export_price: self.export_price.as_ref().map(|p| p[t]),
        }
    }

    pub fn records(&self) -> impl Iterator<Item = TimeStep> + '_ {
        (0..self.len()).map(|t| self.record(t))
    }

    /// Rows with `from <= timestamp < until`, if any.
    pub fn window(&self, from: DateTime<Utc>, until: DateTime<Utc>) -> Option<Self> {
        let start = self.timestamps.partition_point(|ts| *ts < from);
        let end = self.timestamps.partition_point(|ts| *ts < until);
        if start >= end {
            return None;
        }
        let slice = |v: &Vec<f64>| v[start..end].to_vec();
        Some(Self {
            timestep: self.timestep,
            timestamps: self.timestamps[start..end].to_vec(),
            load_kw: slice(&self.load_kw),
            pv_kw: slice(&self.pv_kw),
            import_price: self.import_price.as_ref().map(slice),
            export_price: self.export_price.as_ref().map(slice),
        })
    }
}

/// All `Some` → column present; all `None` → column absent; a mix is an error.
fn collect_optional(
    column: &'static str,
    values: impl Iterator<Item = Option<f64>>,
) -> Result<Option<Vec<f64>>, TimeSeriesError> {
    let values: Vec<Option<f64>> = values.collect();
    let missing = values.iter().filter(|v| v.is_none()).count();
    match missing {
        0 => Ok(Some(values.into_iter().flatten().collect())),
        m if m == values.len() => Ok(None),
        missing => Err(TimeSeriesError::MissingValues { column, missing }),
    }
}
