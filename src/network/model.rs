//! Normalised road network: simple directed graph with capacities and lengths.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::{GeoPoint, RawGraph};
use crate::error::{DispatchError, Result};
use crate::models::EmergencySet;

/// Minimum number of distinct predecessors and successors of a
/// well-connected node.
pub const MIN_CONNECTIVITY: usize = 3;

/// Dense index of a node in a [`Network`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Dense index of an edge in a [`Network`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeId(pub usize);

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Role a node plays in a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeRole {
    /// The single dispatch origin.
    Origin,
    /// Destination of at least one emergency.
    Destination,
    /// Any other node.
    Interior,
}

/// A network node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Node {
    /// Dense index.
    pub id: NodeId,
    /// Identifier in the supplier graph.
    pub source_id: u64,
    /// Position, for external consumers and origin lookup.
    pub position: GeoPoint,
}

/// A directed road segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Edge {
    /// Dense index.
    pub id: EdgeId,
    /// Tail node.
    pub from: NodeId,
    /// Head node.
    pub to: NodeId,
    /// Throughput ceiling in km/h, shared by all vehicles on the segment.
    pub capacity: f64,
    /// Length in meters.
    pub length: f64,
}

impl Edge {
    /// Traversal time in minutes when driving at capacity speed.
    pub fn travel_time_min(&self) -> f64 {
        self.length / (self.capacity * 1000.0 / 60.0)
    }
}

/// Parameters of network normalisation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Lower bound of edge capacities in km/h (C_MIN).
    pub capacity_min: f64,
    /// Upper bound of edge capacities in km/h (C_MAX).
    pub capacity_max: f64,
    /// Location of the dispatch base.
    pub origin: GeoPoint,
    /// Maximum distance in meters from `origin` to the origin node.
    pub search_radius_m: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            capacity_min: 30.0,
            capacity_max: 100.0,
            origin: GeoPoint::new(6.19082795, -75.5777409611334),
            search_radius_m: 500.0,
        }
    }
}

impl NetworkConfig {
    /// Checks the capacity range, origin, and search radius.
    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = (self.capacity_min, self.capacity_max);
        if !(lo.is_finite() && hi.is_finite() && lo > 0.0 && lo <= hi) {
            return Err(DispatchError::InvalidConfig(format!(
                "capacity range [{lo}, {hi}] must satisfy 0 < C_MIN <= C_MAX"
            )));
        }
        if !self.origin.is_valid() {
            return Err(DispatchError::InvalidConfig(format!(
                "origin ({}, {}) is not a valid coordinate",
                self.origin.lat, self.origin.lon
            )));
        }
        if self.search_radius_m.is_nan() || self.search_radius_m < 0.0 {
            return Err(DispatchError::InvalidConfig(format!(
                "search radius must be non-negative, got {}",
                self.search_radius_m
            )));
        }
        Ok(())
    }
}

/// Descriptive statistics of a network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NetworkStats {
    /// Number of nodes.
    pub num_nodes: usize,
    /// Number of directed edges.
    pub num_edges: usize,
    /// Smallest edge capacity.
    pub capacity_min: f64,
    /// Largest edge capacity.
    pub capacity_max: f64,
    /// Mean edge capacity.
    pub capacity_mean: f64,
    /// Sum of edge lengths in kilometers.
    pub total_length_km: f64,
    /// Mean edge length in meters.
    pub mean_length_m: f64,
    /// Nodes eligible as emergency destinations.
    pub num_well_connected: usize,
}

/// A simple directed road graph with one origin node.
///
/// Built once from a [`RawGraph`] and immutable afterwards. Parallel edges
/// are collapsed keeping the lowest capacity and the shortest length;
/// missing capacities are drawn uniformly from the configured range with a
/// seeded generator.
///
/// # Examples
///
/// ```
/// use emergency_dispatch::network::{GeoPoint, Network, NetworkConfig, RawGraph};
///
/// let mut raw = RawGraph::directed();
/// raw.add_node(1, 0.0, 0.0).add_node(2, 0.0, 0.001);
/// raw.add_edge(1, 2, 100.0).add_edge(1, 2, 80.0);
///
/// let config = NetworkConfig { origin: GeoPoint::new(0.0, 0.0), ..NetworkConfig::default() };
/// let net = Network::build(&raw, &config, 7).unwrap();
/// assert_eq!(net.num_edges(), 1);
/// assert_eq!(net.edges()[0].length, 80.0);
/// ```
#[derive(Debug, Clone)]
pub struct Network {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    out_edges: Vec<Vec<EdgeId>>,
    in_edges: Vec<Vec<EdgeId>>,
    by_source: HashMap<u64, NodeId>,
    origin: NodeId,
}

#[derive(Default)]
struct Collapsed {
    capacity: Option<f64>,
    length: f64,
}

impl Network {
    /// Normalises `raw` into a network and locates the origin node.
    ///
    /// `seed` drives capacity assignment for edges without one.
    #[instrument(level = "info", skip(raw, config), fields(raw_nodes = raw.nodes.len(), raw_edges = raw.edges.len()))]
    pub fn build(raw: &RawGraph, config: &NetworkConfig, seed: u64) -> Result<Self> {
        config.validate()?;
        let mut nodes = Vec::with_capacity(raw.nodes.len());
        let mut by_source = HashMap::with_capacity(raw.nodes.len());
        for rn in &raw.nodes {
            if by_source.contains_key(&rn.id) {
                warn!(node = rn.id, "duplicate node id ignored");
                continue;
            }
            let id = NodeId(nodes.len());
            by_source.insert(rn.id, id);
            nodes.push(Node {
                id,
                source_id: rn.id,
                position: GeoPoint::new(rn.lat, rn.lon),
            });
        }

        // Ordered map so that capacity draws are reproducible for a seed.
        let mut collapsed: BTreeMap<(NodeId, NodeId), Collapsed> = BTreeMap::new();
        let mut parallel = 0usize;
        for re in raw.directed_edges() {
            let from = *by_source
                .get(&re.from)
                .ok_or(DispatchError::UnknownNode(re.from))?;
            let to = *by_source
                .get(&re.to)
                .ok_or(DispatchError::UnknownNode(re.to))?;
            if !(re.length.is_finite() && re.length > 0.0) {
                return Err(DispatchError::InvalidEdge {
                    from: re.from,
                    to: re.to,
                    reason: format!("length must be positive, got {}", re.length),
                });
            }
            if let Some(c) = re.capacity {
                if !(c.is_finite() && c > 0.0) {
                    return Err(DispatchError::InvalidEdge {
                        from: re.from,
                        to: re.to,
                        reason: format!("capacity must be positive, got {c}"),
                    });
                }
            }
            if from == to {
                debug!(node = re.from, "self-loop dropped");
                continue;
            }
            match collapsed.get_mut(&(from, to)) {
                Some(entry) => {
                    parallel += 1;
                    entry.length = entry.length.min(re.length);
                    entry.capacity = match (entry.capacity, re.capacity) {
                        (Some(a), Some(b)) => Some(a.min(b)),
                        (a, b) => a.or(b),
                    };
                }
                None => {
                    collapsed.insert(
                        (from, to),
                        Collapsed {
                            capacity: re.capacity,
                            length: re.length,
                        },
                    );
                }
            }
        }

        if collapsed.is_empty() {
            return Err(DispatchError::GraphEmpty);
        }

        let (c_min, c_max) = (config.capacity_min, config.capacity_max);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut clamped = 0usize;
        let mut assigned = 0usize;
        let mut edges = Vec::with_capacity(collapsed.len());
        let mut out_edges = vec![Vec::new(); nodes.len()];
        let mut in_edges = vec![Vec::new(); nodes.len()];
        for ((from, to), c) in collapsed {
            let capacity = match c.capacity {
                Some(cap) => {
                    let bounded = cap.clamp(c_min, c_max);
                    if bounded != cap {
                        clamped += 1;
                    }
                    bounded
                }
                None => {
                    assigned += 1;
                    rng.random_range(c_min..=c_max)
                }
            };
            let id = EdgeId(edges.len());
            out_edges[from.0].push(id);
            in_edges[to.0].push(id);
            edges.push(Edge {
                id,
                from,
                to,
                capacity,
                length: c.length,
            });
        }
        if clamped > 0 {
            warn!(clamped, c_min, c_max, "supplied capacities clamped into range");
        }

        let mut network = Self {
            nodes,
            edges,
            out_edges,
            in_edges,
            by_source,
            origin: NodeId(0),
        };
        let origin = network
            .nearest_node_within(config.origin, config.search_radius_m)
            .ok_or(DispatchError::OriginNotFound {
                lat: config.origin.lat,
                lon: config.origin.lon,
                radius_m: config.search_radius_m,
            })?;
        network.origin = origin;

        info!(
            nodes = network.nodes.len(),
            edges = network.edges.len(),
            parallel_collapsed = parallel,
            capacities_assigned = assigned,
            origin = %origin,
            "network built"
        );
        Ok(network)
    }

    /// All nodes, indexed by [`NodeId`].
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// All edges, indexed by [`EdgeId`].
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Node by index.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Edge by index.
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of directed edges.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// The dispatch origin.
    pub fn origin(&self) -> NodeId {
        self.origin
    }

    /// Edges leaving `node`.
    pub fn out_edges(&self, node: NodeId) -> &[EdgeId] {
        &self.out_edges[node.0]
    }

    /// Edges entering `node`.
    pub fn in_edges(&self, node: NodeId) -> &[EdgeId] {
        &self.in_edges[node.0]
    }

    /// Looks up a node by its supplier id.
    pub fn node_by_source_id(&self, source_id: u64) -> Option<NodeId> {
        self.by_source.get(&source_id).copied()
    }

    /// The edge `from -> to`, if present.
    pub fn find_edge(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.out_edges[from.0]
            .iter()
            .copied()
            .find(|&e| self.edges[e.0].to == to)
    }

    /// Node closest to the given coordinate.
    pub fn nearest_node(&self, lat: f64, lon: f64) -> NodeId {
        // A built network always has nodes: it has at least one edge.
        self.nearest(GeoPoint::new(lat, lon))
            .map(|(id, _)| id)
            .unwrap_or(self.origin)
    }

    /// Node closest to `point`, if it lies within `radius_m` meters.
    pub fn nearest_node_within(&self, point: GeoPoint, radius_m: f64) -> Option<NodeId> {
        self.nearest(point)
            .filter(|&(_, d)| d <= radius_m)
            .map(|(id, _)| id)
    }

    fn nearest(&self, point: GeoPoint) -> Option<(NodeId, f64)> {
        self.nodes
            .iter()
            .map(|n| (n.id, n.position.distance_m(&point)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Returns `true` if `node` has at least three distinct predecessors and
    /// three distinct successors.
    pub fn is_well_connected(&self, node: NodeId) -> bool {
        // Edges are simple, so edge counts equal neighbor counts.
        self.in_edges[node.0].len() >= MIN_CONNECTIVITY
            && self.out_edges[node.0].len() >= MIN_CONNECTIVITY
    }

    /// Well-connected nodes other than the origin, in index order.
    pub fn destination_candidates(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .map(|n| n.id)
            .filter(|&n| n != self.origin && self.is_well_connected(n))
            .collect()
    }

    /// Role of `node` in the scenario described by `emergencies`.
    pub fn role(&self, node: NodeId, emergencies: &EmergencySet) -> NodeRole {
        if node == self.origin {
            NodeRole::Origin
        } else if emergencies.iter().any(|e| e.destination == node) {
            NodeRole::Destination
        } else {
            NodeRole::Interior
        }
    }

    /// Nodes reachable from `start`, optionally pretending `skip` is absent.
    pub fn reachable_from(&self, start: NodeId, skip: Option<EdgeId>) -> Vec<bool> {
        let mut seen = vec![false; self.nodes.len()];
        let mut queue = VecDeque::new();
        seen[start.0] = true;
        queue.push_back(start);
        while let Some(n) = queue.pop_front() {
            for &e in &self.out_edges[n.0] {
                if Some(e) == skip {
                    continue;
                }
                let next = self.edges[e.0].to;
                if !seen[next.0] {
                    seen[next.0] = true;
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// Summary statistics.
    pub fn stats(&self) -> NetworkStats {
        let n = self.edges.len() as f64;
        let (mut cmin, mut cmax, mut csum, mut lsum) = (f64::INFINITY, 0.0f64, 0.0, 0.0);
        for e in &self.edges {
            cmin = cmin.min(e.capacity);
            cmax = cmax.max(e.capacity);
            csum += e.capacity;
            lsum += e.length;
        }
        NetworkStats {
            num_nodes: self.nodes.len(),
            num_edges: self.edges.len(),
            capacity_min: cmin,
            capacity_max: cmax,
            capacity_mean: csum / n,
            total_length_km: lsum / 1000.0,
            mean_length_m: lsum / n,
            num_well_connected: self.destination_candidates().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at_origin() -> NetworkConfig {
        NetworkConfig {
            origin: GeoPoint::new(0.0, 0.0),
            ..NetworkConfig::default()
        }
    }

    fn line() -> RawGraph {
        let mut g = RawGraph::directed();
        g.add_node(10, 0.0, 0.0)
            .add_node(20, 0.0, 0.001)
            .add_node(30, 0.0, 0.002);
        g.add_edge(10, 20, 100.0).add_edge(20, 30, 120.0);
        g
    }

    /// Hub 0 with in- and out-edges to four spokes.
    fn star() -> RawGraph {
        let mut g = RawGraph::directed();
        g.add_node(0, 0.0, 0.0);
        for i in 1..=4u64 {
            g.add_node(i, 0.0, 0.001 * i as f64);
            g.add_edge(0, i, 100.0).add_edge(i, 0, 100.0);
        }
        g
    }

    #[test]
    fn test_build_line() {
        let net = Network::build(&line(), &at_origin(), 1).unwrap();
        assert_eq!(net.num_nodes(), 3);
        assert_eq!(net.num_edges(), 2);
        assert_eq!(net.node(net.origin()).source_id, 10);
        for e in net.edges() {
            assert!(e.capacity >= 30.0 && e.capacity <= 100.0);
        }
    }

    #[test]
    fn test_parallel_edges_keep_lowest_capacity_and_shortest_length() {
        let mut g = line();
        g.add_edge_with_capacity(10, 20, 90.0, 70.0)
            .add_edge_with_capacity(10, 20, 150.0, 40.0);
        let net = Network::build(&g, &at_origin(), 1).unwrap();
        let e = net.edge(net.find_edge(NodeId(0), NodeId(1)).unwrap());
        assert_eq!(e.capacity, 40.0);
        assert_eq!(e.length, 90.0);
        assert_eq!(net.num_edges(), 2);
    }

    #[test]
    fn test_capacity_assignment_is_seeded() {
        let a = Network::build(&line(), &at_origin(), 99).unwrap();
        let b = Network::build(&line(), &at_origin(), 99).unwrap();
        let c = Network::build(&line(), &at_origin(), 100).unwrap();
        let caps = |n: &Network| n.edges().iter().map(|e| e.capacity).collect::<Vec<_>>();
        assert_eq!(caps(&a), caps(&b));
        assert_ne!(caps(&a), caps(&c));
    }

    #[test]
    fn test_supplied_capacity_clamped() {
        let mut g = RawGraph::directed();
        g.add_node(1, 0.0, 0.0).add_node(2, 0.0, 0.001);
        g.add_edge_with_capacity(1, 2, 100.0, 500.0);
        let net = Network::build(&g, &at_origin(), 1).unwrap();
        assert_eq!(net.edges()[0].capacity, 100.0);
    }

    #[test]
    fn test_empty_graph() {
        let mut g = RawGraph::directed();
        g.add_node(1, 0.0, 0.0);
        assert!(matches!(
            Network::build(&g, &at_origin(), 1),
            Err(DispatchError::GraphEmpty)
        ));
        g.add_edge(1, 1, 10.0);
        assert!(matches!(
            Network::build(&g, &at_origin(), 1),
            Err(DispatchError::GraphEmpty)
        ));
    }

    #[test]
    fn test_origin_outside_radius() {
        let config = NetworkConfig {
            origin: GeoPoint::new(1.0, 1.0),
            ..NetworkConfig::default()
        };
        let err = Network::build(&line(), &config, 1).unwrap_err();
        assert!(matches!(err, DispatchError::OriginNotFound { .. }));
        assert!(err.is_graph_empty());
    }

    #[test]
    fn test_invalid_edges() {
        let mut g = line();
        g.add_edge(10, 99, 10.0);
        assert!(matches!(
            Network::build(&g, &at_origin(), 1),
            Err(DispatchError::UnknownNode(99))
        ));

        let mut g = line();
        g.add_edge(10, 30, 0.0);
        assert!(matches!(
            Network::build(&g, &at_origin(), 1),
            Err(DispatchError::InvalidEdge { .. })
        ));
    }

    #[test]
    fn test_nearest_node() {
        let net = Network::build(&line(), &at_origin(), 1).unwrap();
        assert_eq!(net.nearest_node(0.0, 0.0021), NodeId(2));
        assert_eq!(net.nearest_node_within(GeoPoint::new(0.0, 0.0021), 5.0), None);
    }

    #[test]
    fn test_well_connected() {
        let net = Network::build(&star(), &at_origin(), 1).unwrap();
        let hub = net.node_by_source_id(0).unwrap();
        assert_eq!(hub, net.origin());
        assert!(net.is_well_connected(hub));
        assert!(!net.is_well_connected(NodeId(1)));
        // The hub is the only well-connected node and it is the origin.
        assert!(net.destination_candidates().is_empty());
    }

    #[test]
    fn test_reachability_with_skipped_edge() {
        let net = Network::build(&line(), &at_origin(), 1).unwrap();
        let all = net.reachable_from(NodeId(0), None);
        assert!(all.iter().all(|&r| r));
        let cut = net.find_edge(NodeId(1), NodeId(2));
        let partial = net.reachable_from(NodeId(0), cut);
        assert_eq!(partial, vec![true, true, false]);
    }

    #[test]
    fn test_stats() {
        let net = Network::build(&line(), &at_origin(), 1).unwrap();
        let s = net.stats();
        assert_eq!(s.num_edges, 2);
        assert!((s.total_length_km - 0.22).abs() < 1e-9);
        assert!((s.mean_length_m - 110.0).abs() < 1e-9);
        assert!(s.capacity_min <= s.capacity_mean && s.capacity_mean <= s.capacity_max);
    }

    #[test]
    fn test_travel_time() {
        let e = Edge {
            id: EdgeId(0),
            from: NodeId(0),
            to: NodeId(1),
            capacity: 60.0,
            length: 1000.0,
        };
        assert!((e.travel_time_min() - 1.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_normalised_graph_is_simple_and_bounded(
            arcs in prop::collection::vec((0u64..6, 0u64..6, 1.0f64..500.0, prop::option::of(1.0f64..200.0)), 1..40),
            seed in any::<u64>(),
        ) {
            let mut g = RawGraph::directed();
            for i in 0..6u64 {
                g.add_node(i, 0.0, 0.0005 * i as f64);
            }
            for (from, to, length, capacity) in arcs {
                g.edges.push(crate::network::RawEdge { from, to, length, capacity });
            }
            match Network::build(&g, &at_origin(), seed) {
                Ok(net) => {
                    let mut pairs = std::collections::HashSet::new();
                    for e in net.edges() {
                        prop_assert!(e.from != e.to);
                        prop_assert!(pairs.insert((e.from, e.to)));
                        prop_assert!(e.capacity >= 30.0 && e.capacity <= 100.0);
                        prop_assert!(e.length > 0.0);
                    }
                }
                Err(err) => prop_assert!(matches!(err, DispatchError::GraphEmpty)),
            }
        }
    }
}
