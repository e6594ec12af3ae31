//! Reads routes and edge utilization back from solved variable values.
//!
//! For each commodity the walk starts at the origin and repeatedly follows
//! the outgoing edge whose variable is active until the destination is
//! reached. A revisited node or a dead end means the values do not encode a
//! simple path; both are surfaced as errors and never repaired.
//!
//! # Complexity
//!
//! O(K·E) where K = number of commodities and E = number of edges.

use tracing::{debug, info, instrument};

use crate::error::{DispatchError, Result};
use crate::formulation::Formulation;
use crate::models::{EdgeUtilization, Route, Solution};
use crate::solver::SolveResult;

/// Threshold above which a binary variable counts as set.
const ACTIVE: f64 = 0.5;

/// Flow below this is treated as zero when summing edge load.
const FLOW_TOL: f64 = 1e-6;

/// Extracts routes and utilization from a solved formulation.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use emergency_dispatch::evaluation::RouteExtractor;
/// use emergency_dispatch::formulation::FlowFormulationBuilder;
/// use emergency_dispatch::models::{CostOverrides, Emergency, EmergencyId, EmergencySet, Severity};
/// use emergency_dispatch::network::{GeoPoint, Network, NetworkConfig, NodeId, RawGraph};
/// use emergency_dispatch::solver::{SolveResult, SolveStatus};
///
/// let mut raw = RawGraph::directed();
/// raw.add_node(1, 0.0, 0.0).add_node(2, 0.0, 0.001);
/// raw.add_edge_with_capacity(1, 2, 2000.0, 80.0);
/// let config = NetworkConfig { origin: GeoPoint::new(0.0, 0.0), ..NetworkConfig::default() };
/// let net = Network::build(&raw, &config, 1).unwrap();
/// let set = EmergencySet::new(&net, vec![Emergency::new(1, Severity::Low, 40.0, NodeId(1))]).unwrap();
/// let f = FlowFormulationBuilder::new(&net, &set, &CostOverrides::new()).build();
///
/// let result = SolveResult {
///     status: SolveStatus::Optimal,
///     values: Some(vec![1.0]),
///     objective_value: Some(35_000.0 + 2.0 * 5_585.0),
///     wall_clock: Duration::ZERO,
/// };
/// let solution = RouteExtractor::new(&f).extract(&result).unwrap();
/// let route = solution.route(EmergencyId(1)).unwrap();
/// assert_eq!(route.nodes(), &[NodeId(0), NodeId(1)]);
/// assert!((route.total_cost() - 46_170.0).abs() < 1e-6);
/// ```
pub struct RouteExtractor<'a> {
    formulation: &'a Formulation,
}

impl<'a> RouteExtractor<'a> {
    /// Creates an extractor for `formulation`.
    pub fn new(formulation: &'a Formulation) -> Self {
        Self { formulation }
    }

    /// Extracts one route per commodity plus per-edge utilization.
    ///
    /// # Errors
    ///
    /// [`DispatchError::MissingValues`] if `result` carries no values,
    /// [`DispatchError::ValueCountMismatch`] if they do not match the
    /// columns, [`DispatchError::CycleDetected`] and
    /// [`DispatchError::DisconnectedRoute`] if a commodity's values do not
    /// form a simple origin-destination path.
    #[instrument(level = "info", skip_all, fields(status = %result.status))]
    pub fn extract(&self, result: &SolveResult) -> Result<Solution> {
        let f = self.formulation;
        let values = result
            .values
            .as_deref()
            .ok_or(DispatchError::MissingValues {
                status: result.status,
            })?;
        if values.len() != f.num_variables() {
            return Err(DispatchError::ValueCountMismatch {
                expected: f.num_variables(),
                found: values.len(),
            });
        }

        let mut solution = Solution::new();
        for k in 0..f.commodities().len() {
            let route = self.walk(k, values)?;
            debug!(
                emergency = %route.emergency(),
                hops = route.len(),
                distance_m = route.distance_m(),
                cost = route.total_cost(),
                "route extracted"
            );
            solution.add_route(route);
        }
        for u in self.utilization(values) {
            solution.add_utilization(u);
        }

        info!(
            routes = solution.num_routes(),
            total_cost = solution.total_cost(),
            max_utilization = solution.max_utilization(),
            "solution extracted"
        );
        Ok(solution)
    }

    fn walk(&self, k: usize, values: &[f64]) -> Result<Route> {
        let f = self.formulation;
        let commodity = &f.commodities()[k];
        let emergency = commodity.emergency;
        let dest = emergency.destination;

        let mut visited = vec![false; f.out_slots.len()];
        let mut route = Route::new(&emergency, f.origin());
        let mut current = f.origin();
        visited[current.0] = true;

        while current != dest {
            let slot = f
                .out_slots(current)
                .iter()
                .copied()
                .find(|&s| values[f.var_at(k, s).0] > ACTIVE)
                .ok_or(DispatchError::DisconnectedRoute {
                    emergency: emergency.id,
                    node: current,
                })?;
            let edge = &f.edges()[slot];
            if visited[edge.to.0] {
                return Err(DispatchError::CycleDetected {
                    emergency: emergency.id,
                    node: edge.to,
                });
            }
            visited[edge.to.0] = true;
            route.push_edge(edge);
            current = edge.to;
        }

        route.set_costs(commodity.cost);
        Ok(route)
    }

    fn utilization(&self, values: &[f64]) -> Vec<EdgeUtilization> {
        let f = self.formulation;
        f.edges()
            .iter()
            .enumerate()
            .filter_map(|(s, edge)| {
                let mut emergencies = Vec::new();
                let mut load = 0.0;
                for (k, c) in f.commodities().iter().enumerate() {
                    let x = values[f.var_at(k, s).0];
                    if x > FLOW_TOL {
                        load += c.emergency.required_speed * x;
                    }
                    if x > ACTIVE {
                        emergencies.push(c.emergency.id);
                    }
                }
                if load == 0.0 {
                    return None;
                }
                Some(EdgeUtilization {
                    edge: edge.id,
                    from: edge.from,
                    to: edge.to,
                    emergencies,
                    load,
                    capacity: edge.capacity,
                    ratio: load / edge.capacity,
                })
            })
            .collect()
    }
}

/// Extracts routes from `result`; see [`RouteExtractor::extract`].
pub fn extract(formulation: &Formulation, result: &SolveResult) -> Result<Solution> {
    RouteExtractor::new(formulation).extract(result)
}
