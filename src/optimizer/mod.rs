pub mod backends;
pub mod builder;
pub mod constraints;
pub mod error;
pub mod greedy;
pub mod model;
pub mod pareto;
pub mod pipeline;
pub mod solver;

pub use backends::{GoodLpBackend, SolverKind};
pub use builder::ModelBuilder;
pub use error::OptimizeError;
pub use greedy::baseline;
pub use model::{Bounds, Family, LinearRow, Model, VariableLayout};
pub use pareto::{select, FrontierError, FrontierGenerator, FrontierSettings, ParetoPoint};
pub use pipeline::{optimize, OptimizedDispatch};
pub use solver::{BackendError, LpBackend, RawSolution, SolveReport, SolverAdapter};
