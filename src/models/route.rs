//! Route of a single emergency vehicle.

use serde::Serialize;

use super::{Emergency, EmergencyId, Severity, VehicleClass, VehicleCost};
use crate::network::{Edge, EdgeId, NodeId};

/// An ordered path from the origin to an emergency's destination.
///
/// Distance and travel time accumulate as edges are pushed; costs are set
/// once the path is complete.
///
/// # Examples
///
/// ```
/// use emergency_dispatch::models::{Emergency, Route, Severity, VehicleCost};
/// use emergency_dispatch::network::{Edge, EdgeId, NodeId};
///
/// let emergency = Emergency::new(1, Severity::Low, 40.0, NodeId(1));
/// let mut route = Route::new(&emergency, NodeId(0));
/// route.push_edge(&Edge { id: EdgeId(0), from: NodeId(0), to: NodeId(1), capacity: 60.0, length: 1500.0 });
/// route.set_costs(VehicleCost::new(100.0, 10.0));
///
/// assert_eq!(route.nodes(), &[NodeId(0), NodeId(1)]);
/// assert!((route.total_cost() - 115.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    emergency: EmergencyId,
    severity: Severity,
    vehicle_class: VehicleClass,
    required_speed: f64,
    nodes: Vec<NodeId>,
    edges: Vec<EdgeId>,
    distance_m: f64,
    travel_time_min: f64,
    fixed_cost: f64,
    variable_cost: f64,
}

impl Route {
    /// Starts an empty route at `origin` for `emergency`.
    pub fn new(emergency: &Emergency, origin: NodeId) -> Self {
        Self {
            emergency: emergency.id,
            severity: emergency.severity,
            vehicle_class: emergency.vehicle_class(),
            required_speed: emergency.required_speed,
            nodes: vec![origin],
            edges: Vec::new(),
            distance_m: 0.0,
            travel_time_min: 0.0,
            fixed_cost: 0.0,
            variable_cost: 0.0,
        }
    }

    /// Appends `edge`, whose tail must be the current last node.
    pub fn push_edge(&mut self, edge: &Edge) {
        debug_assert_eq!(self.nodes.last(), Some(&edge.from));
        self.nodes.push(edge.to);
        self.edges.push(edge.id);
        self.distance_m += edge.length;
        self.travel_time_min += edge.travel_time_min();
    }

    /// Prices the route with the given cost profile.
    pub fn set_costs(&mut self, cost: VehicleCost) {
        self.fixed_cost = cost.fixed_cost;
        self.variable_cost = cost.variable_cost(self.distance_m);
    }

    /// Emergency served.
    pub fn emergency(&self) -> EmergencyId {
        self.emergency
    }

    /// Severity of the emergency served.
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Vehicle class dispatched.
    pub fn vehicle_class(&self) -> VehicleClass {
        self.vehicle_class
    }

    /// Required speed in km/h.
    pub fn required_speed(&self) -> f64 {
        self.required_speed
    }

    /// Visited nodes, origin first.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Traversed edges in order.
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    /// Number of traversed edges.
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Returns `true` if no edge has been traversed.
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Last node reached.
    pub fn end(&self) -> NodeId {
        // Never empty: constructed with the origin.
        self.nodes[self.nodes.len() - 1]
    }

    /// Length in meters.
    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    /// Length in kilometers.
    pub fn distance_km(&self) -> f64 {
        self.distance_m / 1000.0
    }

    /// Travel time in minutes at road capacity speed.
    pub fn travel_time_min(&self) -> f64 {
        self.travel_time_min
    }

    /// Activation cost.
    pub fn fixed_cost(&self) -> f64 {
        self.fixed_cost
    }

    /// Distance-dependent cost.
    pub fn variable_cost(&self) -> f64 {
        self.variable_cost
    }

    /// Fixed plus variable cost.
    pub fn total_cost(&self) -> f64 {
        self.fixed_cost + self.variable_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(id: usize, from: usize, to: usize, length: f64) -> Edge {
        Edge {
            id: EdgeId(id),
            from: NodeId(from),
            to: NodeId(to),
            capacity: 60.0,
            length,
        }
    }

    #[test]
    fn test_route_empty() {
        let e = Emergency::new(3, Severity::Medium, 55.0, NodeId(4));
        let r = Route::new(&e, NodeId(0));
        assert!(r.is_empty());
        assert_eq!(r.end(), NodeId(0));
        assert_eq!(r.emergency(), EmergencyId(3));
        assert_eq!(r.vehicle_class(), VehicleClass::MedicalizedModerate);
        assert_eq!(r.total_cost(), 0.0);
    }

    #[test]
    fn test_route_accumulates() {
        let e = Emergency::new(1, Severity::High, 80.0, NodeId(2));
        let mut r = Route::new(&e, NodeId(0));
        r.push_edge(&edge(0, 0, 1, 500.0));
        r.push_edge(&edge(1, 1, 2, 500.0));
        r.set_costs(VehicleCost::new(85_000.0, 20_396.0));
        assert_eq!(r.len(), 2);
        assert_eq!(r.end(), NodeId(2));
        assert!((r.distance_km() - 1.0).abs() < 1e-12);
        assert!((r.travel_time_min() - 1.0).abs() < 1e-12);
        assert!((r.variable_cost() - 20_396.0).abs() < 1e-9);
        assert!((r.total_cost() - 105_396.0).abs() < 1e-9);
    }
}
