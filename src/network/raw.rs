//! Road graph as handed over by the map supplier, before normalisation.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A node of the supplier graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    /// Supplier-side identifier (e.g. an OSM node id).
    pub id: u64,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

/// An edge of the supplier graph. Parallel edges are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawEdge {
    /// Tail node id.
    pub from: u64,
    /// Head node id.
    pub to: u64,
    /// Length in meters.
    pub length: f64,
    /// Capacity in km/h, if the supplier knows it.
    #[serde(default)]
    pub capacity: Option<f64>,
}

/// A directed or undirected multigraph with coordinates and lengths.
///
/// # Examples
///
/// ```
/// use emergency_dispatch::network::RawGraph;
///
/// let json = r#"{
///     "directed": false,
///     "nodes": [{"id": 1, "lat": 6.19, "lon": -75.57}, {"id": 2, "lat": 6.191, "lon": -75.57}],
///     "edges": [{"from": 1, "to": 2, "length": 110.0}]
/// }"#;
/// let raw = RawGraph::from_json_str(json).unwrap();
/// assert_eq!(raw.directed_edges().count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawGraph {
    /// When `false`, every edge is traversable in both directions.
    #[serde(default = "default_directed")]
    pub directed: bool,
    /// Nodes with coordinates.
    pub nodes: Vec<RawNode>,
    /// Edges, possibly parallel.
    pub edges: Vec<RawEdge>,
}

fn default_directed() -> bool {
    true
}

impl Default for RawGraph {
    /// An empty directed graph, matching a JSON document without `directed`.
    fn default() -> Self {
        Self {
            directed: default_directed(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }
}

impl RawGraph {
    /// Creates an empty directed graph.
    pub fn directed() -> Self {
        Self::default()
    }

    /// Creates an empty undirected graph.
    pub fn undirected() -> Self {
        Self {
            directed: false,
            ..Self::default()
        }
    }

    /// Parses a graph from its JSON representation.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Adds a node.
    pub fn add_node(&mut self, id: u64, lat: f64, lon: f64) -> &mut Self {
        self.nodes.push(RawNode { id, lat, lon });
        self
    }

    /// Adds an edge without a known capacity.
    pub fn add_edge(&mut self, from: u64, to: u64, length: f64) -> &mut Self {
        self.edges.push(RawEdge {
            from,
            to,
            length,
            capacity: None,
        });
        self
    }

    /// Adds an edge with a known capacity.
    pub fn add_edge_with_capacity(
        &mut self,
        from: u64,
        to: u64,
        length: f64,
        capacity: f64,
    ) -> &mut Self {
        self.edges.push(RawEdge {
            from,
            to,
            length,
            capacity: Some(capacity),
        });
        self
    }

    /// Iterates over edges as directed arcs, expanding undirected edges.
    pub fn directed_edges(&self) -> impl Iterator<Item = RawEdge> + '_ {
        let both_ways = !self.directed;
        self.edges.iter().flat_map(move |e| {
            let reverse = both_ways.then_some(RawEdge {
                from: e.to,
                to: e.from,
                ..*e
            });
            std::iter::once(*e).chain(reverse)
        })
    }
}
