//! End-to-end dispatch pipeline.
//!
//! [`plan`] builds the formulation for one scenario, solves it, and routes
//! the result: solved runs go to route extraction, infeasible runs (including
//! time-outs without an incumbent) go to the infeasibility advisor, and
//! unbounded or failed runs are surfaced as-is. Each call builds its own
//! formulation; nothing is shared between calls.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::DispatchConfig;
use crate::diagnostics::{diagnose, Suggestion};
use crate::error::Result;
use crate::evaluation::extract;
use crate::formulation::{FlowFormulationBuilder, FormulationOptions};
use crate::models::{CostOverrides, EmergencySet, Solution};
use crate::network::{Network, RawGraph};
use crate::solver::{MilpSolver, SolveResult, SolveStatus, SolverParams};

/// Outcome of planning one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DispatchOutcome {
    /// A solution was found and routes were extracted.
    Routed {
        /// Solver result.
        result: SolveResult,
        /// Routes and utilization.
        solution: Solution,
    },
    /// No feasible solution; hints for fixing the scenario.
    Infeasible {
        /// Solver result.
        result: SolveResult,
        /// Ranked hints, possibly empty.
        suggestions: Vec<Suggestion>,
    },
    /// The solver reported an unbounded model or an error.
    Failed {
        /// Solver result.
        result: SolveResult,
    },
}

impl DispatchOutcome {
    /// Solver result behind the outcome.
    pub fn result(&self) -> &SolveResult {
        match self {
            Self::Routed { result, .. }
            | Self::Infeasible { result, .. }
            | Self::Failed { result } => result,
        }
    }

    /// Solver status.
    pub fn status(&self) -> SolveStatus {
        self.result().status
    }

    /// Extracted solution, if routed.
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Self::Routed { solution, .. } => Some(solution),
            _ => None,
        }
    }

    /// Advisor hints; empty unless infeasible.
    pub fn suggestions(&self) -> &[Suggestion] {
        match self {
            Self::Infeasible { suggestions, .. } => suggestions,
            _ => &[],
        }
    }

    /// Human-readable description of the status.
    pub fn message(&self) -> &'static str {
        self.status().describe()
    }
}

/// Plans routes for `emergencies` on `network` with default formulation options.
///
/// # Errors
///
/// Invalid solver parameters or cost overrides, and integrity failures
/// during route extraction. Infeasibility is an outcome, not an error.
pub fn plan<S: MilpSolver + ?Sized>(
    network: &Network,
    emergencies: &EmergencySet,
    overrides: &CostOverrides,
    solver: &S,
    params: &SolverParams,
) -> Result<DispatchOutcome> {
    plan_with_options(
        network,
        emergencies,
        overrides,
        FormulationOptions::default(),
        solver,
        params,
    )
}

/// Plans routes with explicit formulation options; see [`plan`].
#[instrument(level = "info", skip_all, fields(solver = solver.name(), emergencies = emergencies.len()))]
pub fn plan_with_options<S: MilpSolver + ?Sized>(
    network: &Network,
    emergencies: &EmergencySet,
    overrides: &CostOverrides,
    options: FormulationOptions,
    solver: &S,
    params: &SolverParams,
) -> Result<DispatchOutcome> {
    params.validate()?;
    overrides.validate()?;
    let formulation = FlowFormulationBuilder::new(network, emergencies, overrides)
        .with_options(options)
        .build();
    let result = solver.solve(&formulation, params);

    let outcome = if result.status.is_solved() {
        let solution = extract(&formulation, &result)?;
        DispatchOutcome::Routed { result, solution }
    } else if result.status.is_infeasible() {
        let suggestions = diagnose(&formulation, network, emergencies);
        DispatchOutcome::Infeasible {
            result,
            suggestions,
        }
    } else {
        warn!(status = %result.status, "{}", result.status.describe());
        DispatchOutcome::Failed { result }
    };

    info!(
        status = %outcome.status(),
        objective = outcome.result().objective_value,
        suggestions = outcome.suggestions().len(),
        "dispatch planned"
    );
    Ok(outcome)
}

/// Everything produced by [`run_scenario`].
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    /// Normalised road network.
    pub network: Network,
    /// Generated emergencies.
    pub emergencies: EmergencySet,
    /// Planning outcome.
    pub outcome: DispatchOutcome,
}

/// Builds the network, generates emergencies, and plans routes, all driven
/// by `config`.
///
/// # Errors
///
/// Any setup failure: invalid configuration, empty graph, missing origin,
/// or too few destination candidates. Integrity failures from extraction.
#[instrument(level = "info", skip_all, fields(seed = config.seed))]
pub fn run_scenario<S: MilpSolver + ?Sized>(
    raw: &RawGraph,
    config: &DispatchConfig,
    solver: &S,
) -> Result<ScenarioRun> {
    config.validate()?;
    let network = Network::build(raw, &config.network, config.seed)?;
    let emergencies = EmergencySet::generate(
        &network,
        config.scenario.count,
        &config.scenario.severity_mix,
        &config.scenario.speed_ranges,
        config.seed,
    )?;
    let outcome = plan_with_options(
        &network,
        &emergencies,
        &config.costs,
        config.formulation,
        solver,
        &config.solver,
    )?;
    Ok(ScenarioRun {
        network,
        emergencies,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use super::*;
    use crate::diagnostics::SuggestionKind;
    use crate::error::DispatchError;
    use crate::formulation::Formulation;
    use crate::models::{Emergency, EmergencyId, Severity, SpeedRange, SpeedRanges, VehicleCost};
    use crate::network::{GeoPoint, NetworkConfig, NodeId};
    use crate::solver::HighsSolver;

    const EPS: f64 = 1e-6;
    const O: NodeId = NodeId(0);
    const A: NodeId = NodeId(1);
    const B: NodeId = NodeId(2);
    const D: NodeId = NodeId(4);

    fn config() -> NetworkConfig {
        NetworkConfig {
            origin: GeoPoint::new(0.0, 0.0),
            ..NetworkConfig::default()
        }
    }

    /// Nodes O, A, B, C, D with O->A (80, 500 m), A->B (80, 500 m),
    /// A->C (40, 400 m), C->D (40, 300 m).
    fn example_raw() -> RawGraph {
        let mut raw = RawGraph::directed();
        raw.add_node(0, 0.0, 0.0)
            .add_node(1, 0.0, 0.001)
            .add_node(2, 0.0, 0.002)
            .add_node(3, 0.001, 0.001)
            .add_node(4, 0.001, 0.002);
        raw.add_edge_with_capacity(0, 1, 500.0, 80.0)
            .add_edge_with_capacity(1, 2, 500.0, 80.0)
            .add_edge_with_capacity(1, 3, 400.0, 40.0)
            .add_edge_with_capacity(3, 4, 300.0, 40.0);
        raw
    }

    fn example() -> Network {
        Network::build(&example_raw(), &config(), 1).unwrap()
    }

    /// Example graph plus a detour A -> E -> B (80, 600 m each), with the
    /// origin's road at `oa_capacity`.
    fn detour_raw(oa_capacity: f64) -> RawGraph {
        let mut raw = RawGraph::directed();
        raw.add_node(0, 0.0, 0.0)
            .add_node(1, 0.0, 0.001)
            .add_node(2, 0.0, 0.002)
            .add_node(3, 0.001, 0.001)
            .add_node(4, 0.001, 0.002)
            .add_node(5, -0.001, 0.0015);
        raw.add_edge_with_capacity(0, 1, 500.0, oa_capacity)
            .add_edge_with_capacity(1, 2, 500.0, 80.0)
            .add_edge_with_capacity(1, 3, 400.0, 40.0)
            .add_edge_with_capacity(3, 4, 300.0, 40.0)
            .add_edge_with_capacity(1, 5, 600.0, 80.0)
            .add_edge_with_capacity(5, 2, 600.0, 80.0);
        raw
    }

    fn with_detour() -> Network {
        Network::build(&detour_raw(80.0), &config(), 1).unwrap()
    }

    fn run(net: &Network, emergencies: Vec<Emergency>) -> DispatchOutcome {
        crate::init_test_logging();
        let set = EmergencySet::new(net, emergencies).unwrap();
        plan(
            net,
            &set,
            &CostOverrides::new(),
            &HighsSolver::new(),
            &SolverParams::default(),
        )
        .unwrap()
    }

    /// Relative comparison for objectives reported by the solver.
    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= EPS * b.abs().max(1.0)
    }

    fn assert_routes_valid(net: &Network, set: &[Emergency], solution: &Solution) {
        for e in set {
            let route = solution.route(e.id).unwrap();
            assert_eq!(route.nodes()[0], net.origin());
            assert_eq!(route.end(), e.destination);
            let unique: HashSet<_> = route.nodes().iter().collect();
            assert_eq!(unique.len(), route.nodes().len());
        }
        for u in solution.utilization() {
            assert!(u.load <= u.capacity + EPS, "{u:?}");
        }
    }

    #[test]
    fn test_single_commodity_route() {
        let net = example();
        let e = Emergency::new(1, Severity::Medium, 60.0, B);
        let outcome = run(&net, vec![e]);
        assert_eq!(outcome.status(), SolveStatus::Optimal);

        let solution = outcome.solution().unwrap();
        let route = solution.route(EmergencyId(1)).unwrap();
        assert_eq!(route.nodes(), &[O, A, B]);
        let expected = 60_000.0 + 1.0 * 10_534.0;
        assert!((route.total_cost() - expected).abs() < EPS);
        assert!(close(outcome.result().objective_value.unwrap(), expected));
        assert_routes_valid(&net, &[e], solution);
    }

    #[test]
    fn test_speed_above_capacity_is_infeasible() {
        let net = example();
        let outcome = run(&net, vec![Emergency::new(1, Severity::High, 100.0, B)]);
        assert_eq!(outcome.status(), SolveStatus::Infeasible);
        assert!(outcome.solution().is_none());
        let suggestions = outcome.suggestions();
        assert!(!suggestions.is_empty());
        assert!(matches!(
            suggestions[0].kind,
            SuggestionKind::SpeedExceedsCapacity { .. }
        ));
    }

    #[test]
    fn test_shared_capacity_without_detour() {
        let net = example();
        let outcome = run(
            &net,
            vec![
                Emergency::new(1, Severity::Medium, 50.0, B),
                Emergency::new(2, Severity::Medium, 50.0, B),
            ],
        );
        assert_eq!(outcome.status(), SolveStatus::Infeasible);
        assert!(outcome
            .suggestions()
            .iter()
            .any(|s| matches!(s.kind, SuggestionKind::SharedCorridor { .. })));
    }

    #[test]
    fn test_shared_capacity_with_detour() {
        let net = with_detour();
        let set = vec![
            Emergency::new(1, Severity::Medium, 50.0, B),
            Emergency::new(2, Severity::Medium, 50.0, B),
        ];
        let outcome = run(&net, set.clone());
        // O->A is still shared: 100 > 80.
        assert_eq!(outcome.status(), SolveStatus::Infeasible);

        let set = vec![
            Emergency::new(1, Severity::Low, 40.0, B),
            Emergency::new(2, Severity::Medium, 45.0, B),
        ];
        // Widen the origin's road so only A->B is contended.
        let net = Network::build(&detour_raw(100.0), &config(), 1).unwrap();
        let outcome = run(&net, set.clone());
        assert_eq!(outcome.status(), SolveStatus::Optimal);
        let solution = outcome.solution().unwrap();
        assert_routes_valid(&net, &set, solution);

        let ab = net.find_edge(A, B).unwrap();
        let on_ab: Vec<_> = solution
            .utilization()
            .iter()
            .filter(|u| u.edge == ab)
            .collect();
        assert_eq!(on_ab.len(), 1);
        assert_eq!(on_ab[0].emergencies.len(), 1);
        // The costlier vehicle takes the short path.
        assert_eq!(on_ab[0].emergencies[0], EmergencyId(2));
    }

    #[test]
    fn test_objective_matches_route_costs() {
        let net = example();
        let set = vec![
            Emergency::new(1, Severity::Low, 30.0, B),
            Emergency::new(2, Severity::High, 35.0, D),
        ];
        let outcome = run(&net, set.clone());
        let solution = outcome.solution().unwrap();
        assert_routes_valid(&net, &set, solution);
        // Solver objective against costs recomputed from the routes.
        let objective = outcome.result().objective_value.unwrap();
        assert!(close(objective, solution.total_cost()));
        let expected = 35_000.0 + 5_585.0 + 85_000.0 + 1.2 * 20_396.0;
        assert!(close(objective, expected));
    }

    #[test]
    fn test_cost_overrides_fall_back_to_defaults() {
        let net = example();
        let set = EmergencySet::new(
            &net,
            vec![
                Emergency::new(1, Severity::Low, 30.0, B),
                Emergency::new(2, Severity::High, 35.0, D),
            ],
        )
        .unwrap();
        let mut overrides = CostOverrides::new();
        overrides.insert(Severity::Low, VehicleCost::new(0.0, 1_000.0));
        let outcome = plan(
            &net,
            &set,
            &overrides,
            &HighsSolver::new(),
            &SolverParams::default(),
        )
        .unwrap();
        let expected = 1_000.0 + 85_000.0 + 1.2 * 20_396.0;
        assert!(close(outcome.result().objective_value.unwrap(), expected));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let net = with_detour();
        let set = vec![
            Emergency::new(1, Severity::Low, 20.0, B),
            Emergency::new(2, Severity::Medium, 25.0, B),
            Emergency::new(3, Severity::High, 30.0, D),
        ];
        let a = run(&net, set.clone());
        let b = run(&net, set);
        assert_eq!(a.status(), b.status());
        let (oa, ob) = (
            a.result().objective_value.unwrap(),
            b.result().objective_value.unwrap(),
        );
        assert!(close(oa, ob));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let net = example();
        let set = EmergencySet::new(&net, vec![Emergency::new(1, Severity::Low, 30.0, B)]).unwrap();
        let params = SolverParams {
            gap: -0.1,
            ..SolverParams::default()
        };
        let err = plan(&net, &set, &CostOverrides::new(), &HighsSolver::new(), &params).unwrap_err();
        assert!(matches!(err, DispatchError::InvalidConfig(_)));
    }

    #[test]
    fn test_invalid_cost_overrides_rejected() {
        let net = example();
        let set = EmergencySet::new(&net, vec![Emergency::new(1, Severity::Low, 30.0, B)]).unwrap();
        for cost in [VehicleCost::new(35_000.0, -100.0), VehicleCost::new(35_000.0, 0.0)] {
            let mut overrides = CostOverrides::new();
            overrides.insert(Severity::Low, cost);
            let solver = Canned(SolveStatus::Optimal);
            let err = plan(&net, &set, &overrides, &solver, &SolverParams::default()).unwrap_err();
            assert!(matches!(err, DispatchError::InvalidConfig(_)), "{cost:?}");
        }
    }

    /// Solver returning a fixed status without values.
    struct Canned(SolveStatus);

    impl MilpSolver for Canned {
        fn solve(&self, _: &Formulation, _: &SolverParams) -> SolveResult {
            SolveResult::without_solution(self.0, Duration::ZERO)
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    #[test]
    fn test_timeout_without_incumbent_goes_to_advisor() {
        let net = example();
        let set = EmergencySet::new(&net, vec![Emergency::new(1, Severity::Low, 30.0, B)]).unwrap();
        let solver = Canned(SolveStatus::Feasible { incumbent: false });
        let outcome = plan(&net, &set, &CostOverrides::new(), &solver, &SolverParams::default()).unwrap();
        assert!(matches!(outcome, DispatchOutcome::Infeasible { .. }));
        assert!(outcome.solution().is_none());
    }

    /// Solver stopped by its time limit holding an incumbent that sends
    /// every commodity along a fixed node path.
    struct TimedOut(Vec<NodeId>);

    impl MilpSolver for TimedOut {
        fn solve(&self, f: &Formulation, _: &SolverParams) -> SolveResult {
            let mut values = vec![0.0; f.num_variables()];
            for k in 0..f.commodities().len() {
                for w in self.0.windows(2) {
                    let edge = f
                        .edges()
                        .iter()
                        .find(|e| e.from == w[0] && e.to == w[1])
                        .unwrap();
                    values[f.var(k, edge.id).unwrap().0] = 1.0;
                }
            }
            SolveResult {
                status: SolveStatus::Feasible { incumbent: true },
                objective_value: Some(f.evaluate_objective(&values)),
                values: Some(values),
                wall_clock: Duration::from_secs(120),
            }
        }

        fn name(&self) -> &str {
            "timed-out"
        }
    }

    #[test]
    fn test_timeout_with_incumbent_is_routed() {
        let net = example();
        let e = Emergency::new(1, Severity::Low, 30.0, B);
        let set = EmergencySet::new(&net, vec![e]).unwrap();
        let solver = TimedOut(vec![O, A, B]);
        let outcome = plan(&net, &set, &CostOverrides::new(), &solver, &SolverParams::default()).unwrap();
        assert!(matches!(outcome, DispatchOutcome::Routed { .. }));
        assert_eq!(outcome.status(), SolveStatus::Feasible { incumbent: true });
        assert!(outcome.suggestions().is_empty());

        let solution = outcome.solution().unwrap();
        assert_eq!(solution.route(EmergencyId(1)).unwrap().nodes(), &[O, A, B]);
        assert_routes_valid(&net, &[e], solution);
        assert!(close(solution.total_cost(), 35_000.0 + 5_585.0));
    }

    #[test]
    fn test_solver_error_is_surfaced() {
        let net = example();
        let set = EmergencySet::new(&net, vec![Emergency::new(1, Severity::Low, 30.0, B)]).unwrap();
        for status in [SolveStatus::Error, SolveStatus::Unbounded] {
            let outcome =
                plan(&net, &set, &CostOverrides::new(), &Canned(status), &SolverParams::default())
                    .unwrap();
            assert!(matches!(outcome, DispatchOutcome::Failed { .. }));
            assert_eq!(outcome.message(), status.describe());
            assert!(outcome.suggestions().is_empty());
        }
    }

    /// Undirected 4x4 grid, 200 m blocks, capacities left to the generator.
    fn grid() -> RawGraph {
        let mut raw = RawGraph::undirected();
        let id = |r: u64, c: u64| r * 4 + c;
        for r in 0..4 {
            for c in 0..4 {
                raw.add_node(id(r, c), 0.0018 * r as f64, 0.0018 * c as f64);
            }
        }
        for r in 0..4 {
            for c in 0..4 {
                if c + 1 < 4 {
                    raw.add_edge(id(r, c), id(r, c + 1), 200.0);
                }
                if r + 1 < 4 {
                    raw.add_edge(id(r, c), id(r + 1, c), 200.0);
                }
            }
        }
        raw
    }

    #[test]
    fn test_run_scenario_on_grid() {
        crate::init_test_logging();
        let mut config = DispatchConfig::default();
        config.network.origin = GeoPoint::new(0.0018, 0.0018);
        config.network.capacity_min = 90.0;
        config.scenario.count = 3;
        // Any two vehicles fit on one road.
        config.scenario.speed_ranges = SpeedRanges {
            low: SpeedRange::new(30.0, 35.0).unwrap(),
            medium: SpeedRange::new(35.0, 40.0).unwrap(),
            high: SpeedRange::new(40.0, 45.0).unwrap(),
        };
        let solver = HighsSolver::new();

        let run = run_scenario(&grid(), &config, &solver).unwrap();
        assert_eq!(run.emergencies.len(), 3);
        assert_eq!(run.network.origin(), NodeId(5));
        assert_eq!(run.outcome.status(), SolveStatus::Optimal);
        let solution = run.outcome.solution().unwrap();
        assert_routes_valid(&run.network, run.emergencies.as_slice(), solution);
        assert!(solution.to_json().unwrap().contains("routes"));

        let again = run_scenario(&grid(), &config, &solver).unwrap();
        assert_eq!(again.emergencies, run.emergencies);
        let (a, b) = (
            run.outcome.result().objective_value.unwrap(),
            again.outcome.result().objective_value.unwrap(),
        );
        assert!(close(a, b));
    }

    #[test]
    fn test_run_scenario_setup_errors() {
        let mut config = DispatchConfig::default();
        // Default origin lies far from the grid.
        assert!(matches!(
            run_scenario(&grid(), &config, &HighsSolver::new()),
            Err(DispatchError::OriginNotFound { .. })
        ));
        config.network.origin = GeoPoint::new(0.0, 0.0);
        config.scenario.count = 50;
        assert!(matches!(
            run_scenario(&grid(), &config, &HighsSolver::new()),
            Err(DispatchError::InsufficientNodes { required: 50, .. })
        ));
    }
}
