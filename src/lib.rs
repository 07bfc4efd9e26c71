//! Behind-the-meter battery dispatch: LP formulation, self-consumption
//! baseline, physical validation and the cost-vs-peak Pareto front.

pub mod bundle;
pub mod config;
pub mod domain;
pub mod evaluation;
pub mod forecast;
pub mod optimizer;
pub mod runner;
pub mod telemetry;
