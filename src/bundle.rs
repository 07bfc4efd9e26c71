//! Run bundles: one directory per run holding its inputs and results.
//!
//! ```text
//! <bundle>/
//!   site_config.yaml      inputs
//!   run_config.yaml
//!   timeseries.csv
//!   dispatch.csv          outputs
//!   solve_stats.json
//!   metrics.json
//!   frontier.json
//!   bundle_metadata.json
//! ```

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{
    ConfigError, Dispatch, RunParameters, Scenario, SiteConfig, TimeSeries, TimeSeriesError, TimeStep,
};
use crate::evaluation::Metrics;
use crate::optimizer::SolveReport;

pub const SITE_CONFIG_FILE: &str = "site_config.yaml";
pub const RUN_CONFIG_FILE: &str = "run_config.yaml";
pub const TIMESERIES_FILE: &str = "timeseries.csv";
pub const DISPATCH_FILE: &str = "dispatch.csv";
pub const SOLVE_STATS_FILE: &str = "solve_stats.json";
pub const METRICS_FILE: &str = "metrics.json";
pub const FRONTIER_FILE: &str = "frontier.json";
pub const METADATA_FILE: &str = "bundle_metadata.json";

const REQUIRED_FILES: [&str; 3] = [SITE_CONFIG_FILE, RUN_CONFIG_FILE, TIMESERIES_FILE];

#[derive(Debug, Error)]
pub enum BundleError {
    #[error("bundle not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("bundle {} is missing required file {file}", .bundle.display())]
    MissingFile { bundle: PathBuf, file: &'static str },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{}: {source}", .path.display())]
    TimeSeries {
        path: PathBuf,
        #[source]
        source: TimeSeriesError,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Inputs of one run, checked and ready to optimize.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub path: PathBuf,
    pub scenario: Scenario,
    pub series: TimeSeries,
}

/// Provenance written next to every set of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleMetadata {
    pub created_at: DateTime<Utc>,
    pub engine_version: String,
    pub solver_backend: String,
}

impl BundleMetadata {
    pub fn new(solver_backend: impl Into<String>) -> Self {
        Self {
            created_at: Utc::now(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            solver_backend: solver_backend.into(),
        }
    }
}

/// One point of `frontier.json`. The per-point dispatch is not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierEntry {
    pub peak_demand_kw: f64,
    pub energy_cost_gbp: f64,
    pub total_cost_gbp: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrontierSummary {
    pub preference: f64,
    pub selected_index: usize,
    pub points: Vec<FrontierEntry>,
}

/// Check that the directory exists and holds every input file.
pub fn validate_bundle(path: &Path) -> Result<(), BundleError> {
    if !path.is_dir() {
        return Err(BundleError::NotFound(path.to_path_buf()));
    }
    for file in REQUIRED_FILES {
        if !path.join(file).is_file() {
            return Err(BundleError::MissingFile {
                bundle: path.to_path_buf(),
                file,
            });
        }
    }
    Ok(())
}

/// Read and check a bundle's inputs.
pub fn load_bundle(path: &Path) -> Result<Bundle, BundleError> {
    validate_bundle(path)?;

    let site: SiteConfig = read_yaml(&path.join(SITE_CONFIG_FILE))?;
    let run: RunParameters = read_yaml(&path.join(RUN_CONFIG_FILE))?;
    let scenario = Scenario::new(site, run);
    scenario.check()?;

    let series_path = path.join(TIMESERIES_FILE);
    let records = read_csv::<TimeStep>(&series_path)?;
    let series = TimeSeries::new(records, scenario.run.timestep()).map_err(|source| {
        BundleError::TimeSeries {
            path: series_path.clone(),
            source,
        }
    })?;

    info!(
        bundle = %path.display(),
        site_id = %scenario.site.site_id,
        run_id = %scenario.run.run_id,
        steps = series.len(),
        start = %series.start(),
        "bundle loaded"
    );
    Ok(Bundle {
        path: path.to_path_buf(),
        scenario,
        series,
    })
}

/// Create a bundle directory holding the given inputs.
pub fn init_bundle(
    path: &Path,
    site: &SiteConfig,
    run: &RunParameters,
    series: &TimeSeries,
) -> Result<(), BundleError> {
    fs::create_dir_all(path).map_err(|source| BundleError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    write_yaml(&path.join(SITE_CONFIG_FILE), site)?;
    write_yaml(&path.join(RUN_CONFIG_FILE), run)?;
    write_csv(&path.join(TIMESERIES_FILE), series.records())?;
    debug!(bundle = %path.display(), "bundle initialised");
    Ok(())
}

/// Write a solved dispatch, its solve report, optional metrics and provenance.
pub fn write_results(
    bundle: &Bundle,
    dispatch: &Dispatch,
    report: &SolveReport,
    metrics: Option<&Metrics>,
) -> Result<(), BundleError> {
    write_dispatch(bundle, dispatch)?;
    write_json(&bundle.path.join(SOLVE_STATS_FILE), report)?;
    if let Some(metrics) = metrics {
        write_json(&bundle.path.join(METRICS_FILE), metrics)?;
    }
    write_json(&bundle.path.join(METADATA_FILE), &BundleMetadata::new(&report.backend))?;
    info!(bundle = %bundle.path.display(), "results written");
    Ok(())
}

/// Write the front summary and the selected point's dispatch.
pub fn write_frontier(
    bundle: &Bundle,
    summary: &FrontierSummary,
    selected: &Dispatch,
    backend: &str,
) -> Result<(), BundleError> {
    write_dispatch(bundle, selected)?;
    write_json(&bundle.path.join(FRONTIER_FILE), summary)?;
    write_json(&bundle.path.join(METADATA_FILE), &BundleMetadata::new(backend))?;
    info!(bundle = %bundle.path.display(), points = summary.points.len(), "frontier written");
    Ok(())
}

pub fn read_metrics(path: &Path) -> Result<Metrics, BundleError> {
    read_json(&path.join(METRICS_FILE))
}

/// `None` when no frontier has been run for this bundle.
pub fn read_frontier(path: &Path) -> Result<Option<FrontierSummary>, BundleError> {
    let file = path.join(FRONTIER_FILE);
    if !file.is_file() {
        return Ok(None);
    }
    read_json(&file).map(Some)
}

fn write_dispatch(bundle: &Bundle, dispatch: &Dispatch) -> Result<(), BundleError> {
    let rows = dispatch.rows(bundle.series.timestamps(), bundle.scenario.battery().capacity_kwh);
    write_csv(&bundle.path.join(DISPATCH_FILE), rows)
}

fn open(path: &Path) -> Result<BufReader<File>, BundleError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| BundleError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn create(path: &Path) -> Result<BufWriter<File>, BundleError> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| BundleError::Io {
            path: path.to_path_buf(),
            source,
        })
}

fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T, BundleError> {
    serde_yaml::from_reader(open(path)?).map_err(|source| BundleError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

fn write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), BundleError> {
    serde_yaml::to_writer(create(path)?, value).map_err(|source| BundleError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, BundleError> {
    serde_json::from_reader(open(path)?).map_err(|source| BundleError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), BundleError> {
    serde_json::to_writer_pretty(create(path)?, value).map_err(|source| BundleError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, BundleError> {
    let csv_error = |source| BundleError::Csv {
        path: path.to_path_buf(),
        source,
    };
    csv::Reader::from_reader(open(path)?)
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(csv_error)
}

fn write_csv<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> Result<(), BundleError> {
    let csv_error = |source| BundleError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_writer(create(path)?);
    for row in rows {
        writer.serialize(row).map_err(csv_error)?;
    }
    writer.flush().map_err(|source| BundleError::Io {
        path: path.to_path_buf(),
        source,
    })
}
