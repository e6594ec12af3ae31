//! HiGHS backend.

use std::time::Instant;

use ::highs::{HighsModelStatus, RowProblem, Sense};
use tracing::{debug, info, instrument, warn};

use super::{MilpSolver, SolveResult, SolveStatus, SolverParams};
use crate::formulation::Formulation;

/// Integrality and row tolerance used to validate an incumbent.
const FEASIBILITY_TOL: f64 = 1e-6;

/// Solves formulations with the HiGHS branch-and-cut solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighsSolver {
    verbose: bool,
}

impl HighsSolver {
    /// Creates a quiet solver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets HiGHS print its own log to stdout.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn to_problem(formulation: &Formulation, relax: bool) -> RowProblem {
        let mut problem = RowProblem::default();
        let cols: Vec<_> = formulation
            .objective()
            .iter()
            .map(|&c| {
                if relax {
                    problem.add_column(c, 0.0..=1.0)
                } else {
                    problem.add_integer_column(c, 0.0..=1.0)
                }
            })
            .collect();
        for row in formulation.constraints() {
            let terms: Vec<_> = row.terms.iter().map(|&(v, c)| (cols[v.0], c)).collect();
            problem.add_row(row.lower..=row.upper, terms);
        }
        problem
    }
}

impl MilpSolver for HighsSolver {
    #[instrument(level = "info", skip_all, fields(vars = formulation.num_variables(), rows = formulation.num_constraints()))]
    fn solve(&self, formulation: &Formulation, params: &SolverParams) -> SolveResult {
        let start = Instant::now();
        if formulation.num_variables() == 0 {
            // Nothing to route; a row left over has no terms and is checked directly.
            let values: Vec<f64> = Vec::new();
            return if formulation.is_feasible(&values, FEASIBILITY_TOL) {
                SolveResult {
                    status: SolveStatus::Optimal,
                    objective_value: Some(formulation.evaluate_objective(&values)),
                    values: Some(values),
                    wall_clock: start.elapsed(),
                }
            } else {
                SolveResult::without_solution(SolveStatus::Infeasible, start.elapsed())
            };
        }

        let problem = Self::to_problem(formulation, params.relax_integrality);
        let mut model = problem.optimise(Sense::Minimise);
        if !self.verbose {
            model.make_quiet();
        }
        model.set_option("time_limit", params.time_limit_s);
        model.set_option("mip_rel_gap", params.gap);

        let solved = match model.try_solve() {
            Ok(solved) => solved,
            Err(status) => {
                warn!(?status, "HiGHS failed to run");
                return SolveResult::without_solution(SolveStatus::Error, start.elapsed());
            }
        };
        let model_status = solved.status();
        debug!(?model_status, "HiGHS finished");

        let status = match model_status {
            HighsModelStatus::Optimal => SolveStatus::Optimal,
            // Columns are bounded to [0, 1], so presolve's ambiguous verdict
            // can only mean infeasibility.
            HighsModelStatus::Infeasible | HighsModelStatus::UnboundedOrInfeasible => {
                SolveStatus::Infeasible
            }
            HighsModelStatus::Unbounded => SolveStatus::Unbounded,
            HighsModelStatus::ReachedTimeLimit => SolveStatus::Feasible {
                incumbent: is_incumbent(formulation, solved.get_solution().columns()),
            },
            _ => SolveStatus::Error,
        };

        let result = if status.is_solved() {
            let mut values = solved.get_solution().columns().to_vec();
            if !params.relax_integrality {
                snap_integral(&mut values);
            }
            SolveResult {
                status,
                objective_value: Some(solved.objective_value() + formulation.objective_offset()),
                values: Some(values),
                wall_clock: start.elapsed(),
            }
        } else {
            SolveResult::without_solution(status, start.elapsed())
        };

        info!(
            status = %result.status,
            objective = result.objective_value,
            elapsed_ms = result.wall_clock.as_millis() as u64,
            "solve finished"
        );
        result
    }

    fn name(&self) -> &str {
        "highs"
    }
}

/// Whether `values` is a complete assignment satisfying every row and
/// integrality within [`FEASIBILITY_TOL`].
fn is_incumbent(formulation: &Formulation, values: &[f64]) -> bool {
    values.len() == formulation.num_variables() && formulation.is_feasible(values, FEASIBILITY_TOL)
}

/// Rounds values lying within tolerance of an integer.
fn snap_integral(values: &mut [f64]) {
    for v in values {
        let r = v.round();
        if (*v - r).abs() <= FEASIBILITY_TOL {
            *v = r;
        }
    }
}
