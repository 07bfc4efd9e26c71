//! Concrete [`LpBackend`](super::solver::LpBackend) implementations.

mod goodlp;

pub use goodlp::{GoodLpBackend, SolverKind};
