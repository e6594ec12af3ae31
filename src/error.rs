//! Error taxonomy for setup and post-solve integrity failures.
//!
//! Solver outcomes such as infeasibility are not errors; they are reported
//! through [`SolveStatus`](crate::solver::SolveStatus).

use thiserror::Error;

use crate::models::EmergencyId;
use crate::network::NodeId;
use crate::solver::SolveStatus;

/// Errors raised while preparing a scenario or reading back a solution.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The normalised road graph has no edges.
    #[error("road graph has no usable edges")]
    GraphEmpty,

    /// No node lies within the search radius of the requested origin.
    ///
    /// A refinement of [`DispatchError::GraphEmpty`] that keeps the
    /// coordinate and radius; [`DispatchError::is_graph_empty`] covers both.
    #[error("no node within {radius_m} m of origin ({lat}, {lon})")]
    OriginNotFound {
        /// Requested latitude.
        lat: f64,
        /// Requested longitude.
        lon: f64,
        /// Search radius in meters.
        radius_m: f64,
    },

    /// Too few well-connected nodes to place the requested emergencies.
    #[error("need {required} well-connected destination nodes, found {available}")]
    InsufficientNodes {
        /// Number of emergencies requested.
        required: usize,
        /// Number of eligible nodes.
        available: usize,
    },

    /// An emergency was placed on the origin node.
    #[error("emergency {emergency} has the origin as its destination")]
    OriginAsDestination {
        /// Offending emergency.
        emergency: EmergencyId,
    },

    /// A raw edge or emergency references a node that does not exist.
    #[error("unknown node {0}")]
    UnknownNode(u64),

    /// A raw edge has a non-positive or non-finite attribute.
    #[error("invalid edge {from} -> {to}: {reason}")]
    InvalidEdge {
        /// Source node id in the raw graph.
        from: u64,
        /// Target node id in the raw graph.
        to: u64,
        /// What was wrong with it.
        reason: String,
    },

    /// Route extraction revisited a node before reaching the destination.
    #[error("cycle detected in route of emergency {emergency} at node {node}")]
    CycleDetected {
        /// Emergency whose route is broken.
        emergency: EmergencyId,
        /// First node visited twice.
        node: NodeId,
    },

    /// Route extraction found no active outgoing edge at an intermediate node.
    #[error("route of emergency {emergency} is disconnected at node {node}")]
    DisconnectedRoute {
        /// Emergency whose route is broken.
        emergency: EmergencyId,
        /// Node with no active outgoing edge.
        node: NodeId,
    },

    /// Route extraction was asked to read a result without variable values.
    #[error("solve result with status {status} carries no variable values")]
    MissingValues {
        /// Status of the result.
        status: SolveStatus,
    },

    /// The result's value vector does not match the formulation's columns.
    #[error("expected {expected} variable values, found {found}")]
    ValueCountMismatch {
        /// Number of formulation columns.
        expected: usize,
        /// Number of values supplied.
        found: usize,
    },

    /// A configuration value is out of its admissible range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration file could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A raw graph document could not be parsed.
    #[error("failed to parse road graph: {0}")]
    GraphParse(#[from] serde_json::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, DispatchError>;

impl DispatchError {
    /// Whether the network could not be built at all: no usable edges, or no
    /// node near the requested origin.
    pub fn is_graph_empty(&self) -> bool {
        matches!(self, Self::GraphEmpty | Self::OriginNotFound { .. })
    }
}
