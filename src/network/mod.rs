//! Road network model.
//!
//! Turns a supplier multigraph ([`RawGraph`]) into a simple directed
//! [`Network`] with per-edge capacity and length, and locates the dispatch
//! origin.

mod geo;
mod model;
mod raw;

pub use geo::{haversine_km, GeoPoint};
pub use model::{
    Edge, EdgeId, Network, NetworkConfig, NetworkStats, Node, NodeId, NodeRole, MIN_CONNECTIVITY,
};
pub use raw::{RawEdge, RawGraph, RawNode};
