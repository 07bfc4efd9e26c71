use good_lp::{
    constraint, variable, Expression, ProblemVariables, ResolutionError, Solution, SolverModel,
    Variable,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::optimizer::model::{LinearRow, Model};
use crate::optimizer::solver::{BackendError, LpBackend, RawSolution};

/// Which engine `good_lp` hands the problem to.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SolverKind {
    /// Pure-Rust simplex, always available with the default features.
    #[default]
    Minilp,
    /// Interior-point solver, requires the `clarabel` feature.
    Clarabel,
}

/// [`LpBackend`] that formulates the model with `good_lp`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpBackend {
    kind: SolverKind,
}

impl GoodLpBackend {
    pub fn new(kind: SolverKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> SolverKind {
        self.kind
    }
}

impl LpBackend for GoodLpBackend {
    fn name(&self) -> &'static str {
        match self.kind {
            SolverKind::Minilp => "good_lp/minilp",
            SolverKind::Clarabel => "good_lp/clarabel",
        }
    }

    fn solve(&self, model: &Model, time_limit: Duration) -> Result<RawSolution, BackendError> {
        debug!(
            solver = self.name(),
            variables = model.num_variables(),
            equalities = model.equalities.len(),
            inequalities = model.inequalities.len(),
            time_limit_s = time_limit.as_secs_f64(),
            "formulating LP"
        );

        let (vars, handles) = declare_variables(model);
        let objective: Expression = handles
            .iter()
            .zip(&model.objective)
            .filter(|(_, c)| **c != 0.0)
            .map(|(&v, &c)| c * v)
            .sum();
        let problem = vars.minimise(objective);

        let values = match self.kind {
            #[cfg(feature = "minilp")]
            SolverKind::Minilp => run(problem.using(good_lp::solvers::microlp::microlp), model, &handles),
            #[cfg(feature = "clarabel")]
            SolverKind::Clarabel => {
                run(problem.using(good_lp::solvers::clarabel::clarabel), model, &handles)
            }
            #[allow(unreachable_patterns)]
            other => {
                warn!(solver = %other, "solver not compiled into this build");
                Err(BackendError::Failed(format!(
                    "solver '{other}' is not available; rebuild with `--features {other}`"
                )))
            }
        }?;

        Ok(RawSolution {
            status: "optimal".into(),
            objective_value: model.objective_value(&values),
            values,
        })
    }
}

fn declare_variables(model: &Model) -> (ProblemVariables, Vec<Variable>) {
    let mut vars = ProblemVariables::new();
    let handles = model
        .bounds
        .iter()
        .map(|b| {
            let definition = variable().min(b.lower);
            let definition = match b.upper {
                Some(upper) => definition.max(upper),
                None => definition,
            };
            vars.add(definition)
        })
        .collect();
    (vars, handles)
}

fn row_expression(row: &LinearRow, handles: &[Variable]) -> Expression {
    row.terms.iter().map(|&(i, c)| c * handles[i]).sum()
}

#[allow(dead_code)]
fn run<S>(mut problem: S, model: &Model, handles: &[Variable]) -> Result<Vec<f64>, BackendError>
where
    S: SolverModel<Error = ResolutionError>,
{
    for row in &model.equalities {
        problem = problem.with(constraint::eq(row_expression(row, handles), row.rhs));
    }
    for row in &model.inequalities {
        problem = problem.with(constraint::leq(row_expression(row, handles), row.rhs));
    }

    let solution = problem.solve().map_err(|e| match e {
        ResolutionError::Infeasible => {
            BackendError::Infeasible("no point satisfies every constraint".into())
        }
        ResolutionError::Unbounded => BackendError::Unbounded,
        other => BackendError::Failed(other.to_string()),
    })?;

    Ok(handles.iter().map(|&v| solution.value(v)).collect())
}

#[cfg(all(test, feature = "minilp"))]
mod tests {
    use super::*;
    use crate::optimizer::model::{Bounds, VariableLayout};

    fn tiny(bounds: Vec<Bounds>, equalities: Vec<LinearRow>, objective: Vec<f64>) -> Model {
        Model {
            layout: VariableLayout::new(0, false),
            timestep_hours: 1.0,
            bounds,
            equalities,
            inequalities: vec![],
            objective,
        }
    }

    #[test]
    fn test_solves_small_lp() {
        // min x + 2y  s.t.  x + y = 3,  0 <= x <= 2
        let model = tiny(
            vec![Bounds::between(0.0, 2.0), Bounds::non_negative()],
            vec![LinearRow::new(vec![(0, 1.0), (1, 1.0)], 3.0)],
            vec![1.0, 2.0],
        );
        let raw = GoodLpBackend::default().solve(&model, Duration::from_secs(5)).unwrap();
        assert!((raw.values[0] - 2.0).abs() < 1e-6);
        assert!((raw.values[1] - 1.0).abs() < 1e-6);
        assert!((raw.objective_value - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_reports_infeasibility() {
        let model = tiny(
            vec![Bounds::between(0.0, 1.0)],
            vec![LinearRow::new(vec![(0, 1.0)], 5.0)],
            vec![1.0],
        );
        let err = GoodLpBackend::default().solve(&model, Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, BackendError::Infeasible(_)));
    }

    #[test]
    fn test_solver_kind_parses() {
        assert_eq!("minilp".parse::<SolverKind>().unwrap(), SolverKind::Minilp);
        assert_eq!("clarabel".parse::<SolverKind>().unwrap(), SolverKind::Clarabel);
        assert_eq!(SolverKind::Minilp.to_string(), "minilp");
    }
}
