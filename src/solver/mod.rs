//! MILP solver adapter.
//!
//! The rest of the crate depends only on [`MilpSolver`], the five-way
//! [`SolveStatus`], and the variable values in [`SolveResult`]. [`HighsSolver`]
//! is the bundled backend.
//!
//! A run that hits its time limit before finding any feasible assignment is
//! reported as `Feasible { incumbent: false }` and handled like `Infeasible`
//! by [`crate::dispatch`].

mod highs;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};
use crate::formulation::Formulation;

pub use self::highs::HighsSolver;

/// Terminal status of a solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SolveStatus {
    /// Proven optimal within the gap.
    Optimal,
    /// Time limit reached. `incumbent` tells whether a feasible assignment
    /// is available.
    Feasible {
        /// A feasible assignment was found.
        incumbent: bool,
    },
    /// No assignment satisfies the constraints.
    Infeasible,
    /// Objective unbounded below.
    Unbounded,
    /// The backend failed.
    Error,
}

impl SolveStatus {
    /// Returns `true` if variable values are available for route extraction.
    pub fn is_solved(&self) -> bool {
        matches!(self, Self::Optimal | Self::Feasible { incumbent: true })
    }

    /// Returns `true` for outcomes routed to the infeasibility advisor.
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Self::Infeasible | Self::Feasible { incumbent: false })
    }

    /// Human-readable explanation of the outcome.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Optimal => "optimal solution found",
            Self::Feasible { incumbent: true } => {
                "time limit reached; best solution found is returned without an optimality proof"
            }
            Self::Feasible { incumbent: false } => {
                "time limit reached before any feasible solution was found"
            }
            Self::Infeasible => {
                "no solution satisfies the constraints: required speeds exceed the capacity \
                 available on the routes to the destinations"
            }
            Self::Unbounded => "the objective is unbounded",
            Self::Error => "the solver reported an error",
        }
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optimal => write!(f, "optimal"),
            Self::Feasible { incumbent: true } => write!(f, "feasible"),
            Self::Feasible { incumbent: false } => write!(f, "feasible (no incumbent)"),
            Self::Infeasible => write!(f, "infeasible"),
            Self::Unbounded => write!(f, "unbounded"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Outcome of a solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveResult {
    /// Terminal status.
    pub status: SolveStatus,
    /// One value per formulation column, when a solution is available.
    pub values: Option<Vec<f64>>,
    /// Objective including the fixed-cost offset, when a solution is available.
    pub objective_value: Option<f64>,
    /// Time spent in the solver.
    pub wall_clock: Duration,
}

impl SolveResult {
    /// Result carrying no solution.
    pub fn without_solution(status: SolveStatus, wall_clock: Duration) -> Self {
        Self {
            status,
            values: None,
            objective_value: None,
            wall_clock,
        }
    }
}

/// Solver parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    /// Wall-clock limit in seconds.
    pub time_limit_s: f64,
    /// Relative optimality gap at which the search stops.
    pub gap: f64,
    /// Solve the LP relaxation instead of the binary program.
    pub relax_integrality: bool,
}

impl SolverParams {
    /// Checks `time_limit_s > 0` and `gap` in `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if !(self.time_limit_s.is_finite() && self.time_limit_s > 0.0) {
            return Err(DispatchError::InvalidConfig(format!(
                "time limit must be positive, got {}",
                self.time_limit_s
            )));
        }
        if !(0.0..=1.0).contains(&self.gap) {
            return Err(DispatchError::InvalidConfig(format!(
                "optimality gap must lie in [0, 1], got {}",
                self.gap
            )));
        }
        Ok(())
    }
}

impl Default for SolverParams {
    fn default() -> Self {
        Self {
            time_limit_s: 120.0,
            gap: 0.01,
            relax_integrality: false,
        }
    }
}

/// A MILP engine able to solve a [`Formulation`].
///
/// Implementations must return a terminal status within roughly
/// `params.time_limit_s` and must not keep state between calls.
pub trait MilpSolver {
    /// Solves `formulation`.
    fn solve(&self, formulation: &Formulation, params: &SolverParams) -> SolveResult;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(SolveStatus::Optimal.is_solved());
        assert!(SolveStatus::Feasible { incumbent: true }.is_solved());
        assert!(!SolveStatus::Feasible { incumbent: false }.is_solved());
        assert!(SolveStatus::Feasible { incumbent: false }.is_infeasible());
        assert!(SolveStatus::Infeasible.is_infeasible());
        assert!(!SolveStatus::Unbounded.is_solved());
        assert!(!SolveStatus::Error.is_infeasible());
    }

    #[test]
    fn test_describe_distinguishes_timeouts() {
        assert_ne!(
            SolveStatus::Feasible { incumbent: true }.describe(),
            SolveStatus::Feasible { incumbent: false }.describe()
        );
        assert_eq!(SolveStatus::Infeasible.to_string(), "infeasible");
    }

    #[test]
    fn test_params_defaults_and_validation() {
        let p = SolverParams::default();
        assert_eq!(p.time_limit_s, 120.0);
        assert_eq!(p.gap, 0.01);
        assert!(!p.relax_integrality);
        assert!(p.validate().is_ok());

        let bad = SolverParams {
            time_limit_s: 0.0,
            ..p
        };
        assert!(bad.validate().is_err());
        let bad = SolverParams { gap: 1.5, ..p };
        assert!(bad.validate().is_err());
    }
}
