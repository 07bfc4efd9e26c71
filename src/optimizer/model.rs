//! Solver-agnostic linear program for one dispatch horizon.
//!
//! The model is plain data: variable bounds, sparse equality and `<=` rows and a
//! dense objective. Backends translate it into their own representation, so the
//! formulation never depends on which solver runs it.

use strum::EnumCount;

use crate::domain::Dispatch;

/// Solver round-off below this magnitude is snapped to exactly zero.
const ZERO_SNAP: f64 = 1e-9;

/// The five per-step decision variable families. All are non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumCount, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Family {
    GridImport,
    GridExport,
    Charge,
    Discharge,
    Soc,
}

/// Family-major variable indexing: `[import..., export..., charge..., discharge..., soc..., peak?]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableLayout {
    steps: usize,
    has_peak: bool,
}

impl VariableLayout {
    pub fn new(steps: usize, has_peak: bool) -> Self {
        Self { steps, has_peak }
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn index(&self, family: Family, t: usize) -> usize {
        debug_assert!(t < self.steps);
        family as usize * self.steps + t
    }

    /// Index of the scalar peak-import variable, present only with demand charges.
    pub fn peak(&self) -> Option<usize> {
        self.has_peak.then_some(Family::COUNT * self.steps)
    }

    pub fn len(&self) -> usize {
        Family::COUNT * self.steps + usize::from(self.has_peak)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lower: f64,
    pub upper: Option<f64>,
}

impl Bounds {
    pub fn non_negative() -> Self {
        Self { lower: 0.0, upper: None }
    }

    pub fn between(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper: Some(upper),
        }
    }

    pub fn contains(&self, value: f64, tolerance: f64) -> bool {
        value >= self.lower - tolerance && self.upper.map_or(true, |u| value <= u + tolerance)
    }
}

/// Sparse row `Σ coefficient·x[index]` compared against `rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRow {
    pub terms: Vec<(usize, f64)>,
    pub rhs: f64,
}

impl LinearRow {
    pub fn new(terms: Vec<(usize, f64)>, rhs: f64) -> Self {
        Self { terms, rhs }
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|&(i, c)| c * values[i]).sum()
    }
}

/// Minimization LP: `min c·x  s.t.  A_eq x = b_eq,  A_ub x <= b_ub,  l <= x <= u`.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub layout: VariableLayout,
    pub timestep_hours: f64,
    pub bounds: Vec<Bounds>,
    pub equalities: Vec<LinearRow>,
    pub inequalities: Vec<LinearRow>,
    pub objective: Vec<f64>,
}

impl Model {
    pub fn num_variables(&self) -> usize {
        self.bounds.len()
    }

    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.objective.iter().zip(values).map(|(c, x)| c * x).sum()
    }

    /// Largest violation of any row or bound by `values`.
    pub fn max_violation(&self, values: &[f64]) -> f64 {
        let eq = self
            .equalities
            .iter()
            .map(|row| (row.evaluate(values) - row.rhs).abs());
        let ub = self
            .inequalities
            .iter()
            .map(|row| (row.evaluate(values) - row.rhs).max(0.0));
        let bounds = self.bounds.iter().zip(values).map(|(b, &x)| {
            let below = (b.lower - x).max(0.0);
            let above = b.upper.map_or(0.0, |u| (x - u).max(0.0));
            below.max(above)
        });
        eq.chain(ub).chain(bounds).fold(0.0, f64::max)
    }

    fn column(&self, values: &[f64], family: Family) -> Vec<f64> {
        (0..self.layout.steps())
            .map(|t| {
                let v = values[self.layout.index(family, t)];
                if v.abs() < ZERO_SNAP {
                    0.0
                } else {
                    v
                }
            })
            .collect()
    }

    /// Read the five variable families back out of a solution vector.
    pub fn dispatch(&self, values: &[f64]) -> Dispatch {
        Dispatch {
            timestep_hours: self.timestep_hours,
            grid_import_kw: self.column(values, Family::GridImport),
            grid_export_kw: self.column(values, Family::GridExport),
            battery_charge_kw: self.column(values, Family::Charge),
            battery_discharge_kw: self.column(values, Family::Discharge),
            soc_kwh: self.column(values, Family::Soc),
        }
    }
}
