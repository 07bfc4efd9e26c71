//! Solver adapter: runs an [`LpBackend`] under a wall-clock budget and turns
//! its raw output into a typed [`Dispatch`] plus a [`SolveReport`].

use serde::{Deserialize, Serialize};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument};

use super::backends::GoodLpBackend;
use super::model::Model;
use super::OptimizeError;
use crate::domain::Dispatch;

/// Raw backend answer: solver status, objective and one value per model variable.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSolution {
    pub status: String,
    pub objective_value: f64,
    pub values: Vec<f64>,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("problem is infeasible: {0}")]
    Infeasible(String),

    #[error("problem is unbounded")]
    Unbounded,

    #[error("{0}")]
    Failed(String),
}

/// A linear programming engine. Swapping implementations must not change how
/// models are built or how dispatches are validated.
pub trait LpBackend: Send + Sync {
    fn name(&self) -> &'static str;

    /// Solve `model` to optimality. `time_limit` is a hint for backends that
    /// support one; the adapter enforces it regardless.
    fn solve(&self, model: &Model, time_limit: Duration) -> Result<RawSolution, BackendError>;
}

/// Reproducibility record for one solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    pub backend: String,
    pub solver_status: String,
    pub solver_termination_condition: String,
    pub objective_value_gbp: f64,
    pub solve_time_seconds: f64,
    pub gap: Option<f64>,
}

pub struct SolverAdapter {
    backend: Arc<dyn LpBackend>,
    time_limit: Duration,
}

impl Default for SolverAdapter {
    fn default() -> Self {
        Self::new(GoodLpBackend::default(), Duration::from_secs(60))
    }
}

impl SolverAdapter {
    pub fn new(backend: impl LpBackend + 'static, time_limit: Duration) -> Self {
        Self {
            backend: Arc::new(backend),
            time_limit,
        }
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn time_limit(&self) -> Duration {
        self.time_limit
    }

    /// Solve `model` within the time limit.
    ///
    /// The backend runs on a worker thread; if it has not answered when the
    /// budget runs out the solve fails outright and the worker is abandoned.
    /// The limit bounds how long the caller waits, not how long the worker
    /// runs: an abandoned solve keeps its thread and CPU until the backend
    /// returns. Backends that can stop early should honour the `time_limit`
    /// they are handed.
    #[instrument(skip_all, fields(backend = self.backend.name(), variables = model.num_variables()))]
    pub fn solve(&self, model: Model) -> Result<(Dispatch, SolveReport), OptimizeError> {
        let started = Instant::now();
        let model = Arc::new(model);

        let (tx, rx) = mpsc::channel();
        let backend = Arc::clone(&self.backend);
        let worker_model = Arc::clone(&model);
        let time_limit = self.time_limit;
        thread::Builder::new()
            .name("lp-solve".into())
            .spawn(move || {
                // The receiver is gone if the budget already ran out.
                let _ = tx.send(backend.solve(&worker_model, time_limit));
            })
            .map_err(|e| OptimizeError::Solver(format!("cannot start solver thread: {e}")))?;

        let outcome = match rx.recv_timeout(self.time_limit) {
            Ok(outcome) => outcome,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                return Err(OptimizeError::Solver(format!(
                    "time limit of {:.1}s exceeded",
                    self.time_limit.as_secs_f64()
                )))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                return Err(OptimizeError::Solver(
                    "solver thread terminated without an answer".into(),
                ))
            }
        };
        let solve_time = started.elapsed();

        let raw = outcome.map_err(|e| match e {
            BackendError::Infeasible(reason) => OptimizeError::Infeasible(reason),
            other => OptimizeError::Solver(other.to_string()),
        })?;

        if raw.values.len() != model.num_variables() {
            return Err(OptimizeError::Solver(format!(
                "backend returned {} values for {} variables",
                raw.values.len(),
                model.num_variables()
            )));
        }

        debug!(
            objective = raw.objective_value,
            elapsed_ms = solve_time.as_millis() as u64,
            status = %raw.status,
            "solve finished"
        );

        let dispatch = model.dispatch(&raw.values);
        let report = SolveReport {
            backend: self.backend.name().to_string(),
            solver_termination_condition: raw.status.clone(),
            solver_status: raw.status,
            objective_value_gbp: raw.objective_value,
            solve_time_seconds: solve_time.as_secs_f64(),
            gap: None,
        };
        Ok((dispatch, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::model::{Bounds, VariableLayout};

    struct Scripted(fn(&Model) -> Result<RawSolution, BackendError>);

    impl LpBackend for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn solve(&self, model: &Model, _time_limit: Duration) -> Result<RawSolution, BackendError> {
            (self.0)(model)
        }
    }

    struct Sleepy;

    impl LpBackend for Sleepy {
        fn name(&self) -> &'static str {
            "sleepy"
        }

        fn solve(&self, _model: &Model, _time_limit: Duration) -> Result<RawSolution, BackendError> {
            thread::sleep(Duration::from_millis(500));
            Err(BackendError::Failed("too late".into()))
        }
    }

    fn one_step_model() -> Model {
        Model {
            layout: VariableLayout::new(1, false),
            timestep_hours: 0.25,
            bounds: vec![Bounds::non_negative(); 5],
            equalities: vec![],
            inequalities: vec![],
            objective: vec![0.0; 5],
        }
    }

    #[test]
    fn test_successful_solve_produces_dispatch_and_report() {
        let adapter = SolverAdapter::new(
            Scripted(|_| {
                Ok(RawSolution {
                    status: "optimal".into(),
                    objective_value: 1.5,
                    values: vec![1.0, 0.0, 0.0, 0.0, 5.0],
                })
            }),
            Duration::from_secs(5),
        );
        let (dispatch, report) = adapter.solve(one_step_model()).unwrap();
        assert_eq!(dispatch.grid_import_kw, vec![1.0]);
        assert_eq!(dispatch.soc_kwh, vec![5.0]);
        assert_eq!(report.backend, "scripted");
        assert_eq!(report.solver_status, "optimal");
        assert_eq!(report.objective_value_gbp, 1.5);
    }

    #[test]
    fn test_infeasible_is_distinct_from_failure() {
        let adapter = SolverAdapter::new(
            Scripted(|_| Err(BackendError::Infeasible("peak cap".into()))),
            Duration::from_secs(5),
        );
        assert!(adapter.solve(one_step_model()).unwrap_err().is_infeasible());

        let adapter = SolverAdapter::new(Scripted(|_| Err(BackendError::Unbounded)), Duration::from_secs(5));
        assert!(matches!(adapter.solve(one_step_model()), Err(OptimizeError::Solver(_))));
    }

    #[test]
    fn test_time_limit_is_terminal() {
        let adapter = SolverAdapter::new(Sleepy, Duration::from_millis(20));
        let started = Instant::now();
        let err = adapter.solve(one_step_model()).unwrap_err();
        assert!(matches!(&err, OptimizeError::Solver(msg) if msg.contains("time limit")));
        // The caller is released at the limit while the worker sleeps on.
        assert!(started.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn test_panicking_backend_is_a_solver_error() {
        let adapter = SolverAdapter::new(Scripted(|_| panic!("boom")), Duration::from_secs(5));
        assert!(matches!(adapter.solve(one_step_model()), Err(OptimizeError::Solver(_))));
    }

    #[test]
    fn test_wrong_value_count_is_rejected() {
        let adapter = SolverAdapter::new(
            Scripted(|_| {
                Ok(RawSolution {
                    status: "optimal".into(),
                    objective_value: 0.0,
                    values: vec![0.0; 3],
                })
            }),
            Duration::from_secs(5),
        );
        assert!(matches!(adapter.solve(one_step_model()), Err(OptimizeError::Solver(_))));
    }
}
