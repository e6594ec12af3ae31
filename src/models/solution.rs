//! Extracted solution: routes per emergency and edge utilization.

use std::collections::BTreeMap;

use serde::Serialize;

use super::{EmergencyId, Route};
use crate::network::{EdgeId, NodeId};

/// Load on one edge carrying at least one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeUtilization {
    /// The edge.
    pub edge: EdgeId,
    /// Tail node.
    pub from: NodeId,
    /// Head node.
    pub to: NodeId,
    /// Emergencies routed over the edge.
    pub emergencies: Vec<EmergencyId>,
    /// Sum of their required speeds.
    pub load: f64,
    /// Edge capacity.
    pub capacity: f64,
    /// `load / capacity`.
    pub ratio: f64,
}

/// Routes and utilization read back from a solved formulation.
///
/// # Examples
///
/// ```
/// use emergency_dispatch::models::{Emergency, Route, Severity, Solution};
/// use emergency_dispatch::network::NodeId;
///
/// let mut sol = Solution::new();
/// let e = Emergency::new(1, Severity::Low, 40.0, NodeId(1));
/// sol.add_route(Route::new(&e, NodeId(0)));
/// assert_eq!(sol.num_routes(), 1);
/// assert_eq!(sol.max_utilization(), 0.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Solution {
    routes: BTreeMap<EmergencyId, Route>,
    utilization: Vec<EdgeUtilization>,
}

impl Solution {
    /// Creates an empty solution.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route, replacing any previous route of the same emergency.
    pub fn add_route(&mut self, route: Route) {
        self.routes.insert(route.emergency(), route);
    }

    /// Records the load of a used edge.
    pub fn add_utilization(&mut self, utilization: EdgeUtilization) {
        self.utilization.push(utilization);
    }

    /// Route of `emergency`, if extracted.
    pub fn route(&self, emergency: EmergencyId) -> Option<&Route> {
        self.routes.get(&emergency)
    }

    /// Routes keyed by emergency.
    pub fn routes(&self) -> &BTreeMap<EmergencyId, Route> {
        &self.routes
    }

    /// Number of routes.
    pub fn num_routes(&self) -> usize {
        self.routes.len()
    }

    /// Per-edge utilization for every edge with nonzero flow.
    pub fn utilization(&self) -> &[EdgeUtilization] {
        &self.utilization
    }

    /// Highest utilization ratio over all used edges, 0 if none.
    pub fn max_utilization(&self) -> f64 {
        self.utilization
            .iter()
            .map(|u| u.ratio)
            .fold(0.0, f64::max)
    }

    /// Sum of route costs (fixed plus variable).
    pub fn total_cost(&self) -> f64 {
        self.routes.values().map(|r| r.total_cost()).sum()
    }

    /// Sum of route lengths in kilometers.
    pub fn total_distance_km(&self) -> f64 {
        self.routes.values().map(|r| r.distance_km()).sum()
    }

    /// JSON document for downstream consumers.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Emergency, Severity, VehicleCost};
    use crate::network::Edge;

    fn route(id: u32, length: f64) -> Route {
        let e = Emergency::new(id, Severity::Low, 40.0, NodeId(1));
        let mut r = Route::new(&e, NodeId(0));
        r.push_edge(&Edge {
            id: EdgeId(0),
            from: NodeId(0),
            to: NodeId(1),
            capacity: 80.0,
            length,
        });
        r.set_costs(VehicleCost::new(10.0, 1.0));
        r
    }

    #[test]
    fn test_solution_empty() {
        let sol = Solution::new();
        assert_eq!(sol.num_routes(), 0);
        assert_eq!(sol.total_cost(), 0.0);
        assert!(sol.utilization().is_empty());
    }

    #[test]
    fn test_solution_totals() {
        let mut sol = Solution::new();
        sol.add_route(route(1, 1000.0));
        sol.add_route(route(2, 3000.0));
        sol.add_utilization(EdgeUtilization {
            edge: EdgeId(0),
            from: NodeId(0),
            to: NodeId(1),
            emergencies: vec![EmergencyId(1), EmergencyId(2)],
            load: 80.0,
            capacity: 80.0,
            ratio: 1.0,
        });
        assert_eq!(sol.num_routes(), 2);
        assert!((sol.total_distance_km() - 4.0).abs() < 1e-12);
        assert!((sol.total_cost() - 24.0).abs() < 1e-12);
        assert_eq!(sol.max_utilization(), 1.0);
        assert!(sol.route(EmergencyId(2)).is_some());
    }

    #[test]
    fn test_json_export() {
        let mut sol = Solution::new();
        sol.add_route(route(1, 1000.0));
        let json = sol.to_json().unwrap();
        assert!(json.contains("\"routes\""));
        assert!(json.contains("\"distance_m\":1000.0"));
    }
}
