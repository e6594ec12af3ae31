//! Human-readable hints produced by the advisor.

use std::fmt;

use serde::Serialize;

use crate::models::EmergencyId;
use crate::network::{EdgeId, NodeId};

/// What a suggestion is about, with the numbers that triggered it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SuggestionKind {
    /// An emergency needs more speed than the roads at its origin or
    /// destination allow.
    SpeedExceedsCapacity {
        /// Emergency concerned.
        emergency: EmergencyId,
        /// Its required speed in km/h.
        required_speed: f64,
        /// Highest capacity available at the tighter end, in km/h.
        max_capacity: f64,
    },
    /// All vehicles together need more than the roads leaving the origin carry.
    OriginBottleneck {
        /// Sum of required speeds.
        total_required: f64,
        /// Sum of capacities of the origin's outgoing edges.
        origin_capacity: f64,
    },
    /// Several emergencies can only be reached through one edge that cannot
    /// carry them all.
    SharedCorridor {
        /// The corridor edge.
        edge: EdgeId,
        /// Emergencies that must use it.
        emergencies: Vec<EmergencyId>,
        /// Their combined required speed.
        load: f64,
        /// Edge capacity.
        capacity: f64,
    },
    /// No path leads from the origin to the destination at all.
    Unreachable {
        /// Emergency concerned.
        emergency: EmergencyId,
        /// Its destination.
        destination: NodeId,
    },
}

/// A ranked hint for making an infeasible scenario solvable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    /// Trigger and its data.
    pub kind: SuggestionKind,
    /// Explanation and recommended change.
    pub message: String,
}

impl Suggestion {
    /// Creates a suggestion with a message derived from `kind`.
    pub fn new(kind: SuggestionKind) -> Self {
        let message = match &kind {
            SuggestionKind::SpeedExceedsCapacity {
                emergency,
                required_speed,
                max_capacity,
            } => format!(
                "emergency {emergency} requires {required_speed:.1} km/h but the roads at its \
                 origin or destination allow at most {max_capacity:.1} km/h; lower the \
                 required-speed range or raise the capacity range (C_MAX)"
            ),
            SuggestionKind::OriginBottleneck {
                total_required,
                origin_capacity,
            } => format!(
                "the emergencies need {total_required:.1} km/h combined but the roads leaving \
                 the origin carry {origin_capacity:.1} km/h; increase C_MIN/C_MAX or reduce the \
                 number of emergencies"
            ),
            SuggestionKind::SharedCorridor {
                edge,
                emergencies,
                load,
                capacity,
            } => {
                let ids: Vec<String> = emergencies.iter().map(|e| e.to_string()).collect();
                format!(
                    "emergencies {} can only be reached through edge {edge}, which carries \
                     {capacity:.1} km/h of the {load:.1} km/h they need; redistribute the \
                     destinations",
                    ids.join(", ")
                )
            }
            SuggestionKind::Unreachable {
                emergency,
                destination,
            } => format!(
                "no road path leads from the origin to node {destination} of emergency \
                 {emergency}; check that the road graph is connected"
            ),
        };
        Self { kind, message }
    }
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
