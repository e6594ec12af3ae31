//! Emergencies (commodities) and the per-scenario emergency set.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Severity, VehicleClass};
use crate::error::{DispatchError, Result};
use crate::network::{Network, NodeId};

/// Identifier of an emergency, unique within a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EmergencyId(pub u32);

impl fmt::Display for EmergencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// One emergency: a unit of flow from the origin to `destination`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Emergency {
    /// Unique id.
    pub id: EmergencyId,
    /// Clinical severity.
    pub severity: Severity,
    /// Speed in km/h the vehicle needs on every segment of its route.
    pub required_speed: f64,
    /// Destination node.
    pub destination: NodeId,
}

impl Emergency {
    /// Creates an emergency.
    pub fn new(id: u32, severity: Severity, required_speed: f64, destination: NodeId) -> Self {
        Self {
            id: EmergencyId(id),
            severity,
            required_speed,
            destination,
        }
    }

    /// Vehicle class dispatched to this emergency.
    pub fn vehicle_class(&self) -> VehicleClass {
        self.severity.vehicle_class()
    }
}

/// The emergencies of one scenario, all dispatched from the same origin.
///
/// Read-only once built. Several emergencies may share a destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmergencySet {
    origin: NodeId,
    emergencies: Vec<Emergency>,
}

impl EmergencySet {
    /// Validates `emergencies` against `network` and wraps them.
    ///
    /// Fails if a destination is unknown or equals the origin, if a required
    /// speed is not positive, or if ids repeat.
    pub fn new(network: &Network, emergencies: Vec<Emergency>) -> Result<Self> {
        let origin = network.origin();
        let mut ids = HashSet::with_capacity(emergencies.len());
        for e in &emergencies {
            if e.destination.0 >= network.num_nodes() {
                return Err(DispatchError::UnknownNode(e.destination.0 as u64));
            }
            if e.destination == origin {
                return Err(DispatchError::OriginAsDestination { emergency: e.id });
            }
            if !(e.required_speed.is_finite() && e.required_speed > 0.0) {
                return Err(DispatchError::InvalidConfig(format!(
                    "emergency {} has non-positive required speed {}",
                    e.id, e.required_speed
                )));
            }
            if !ids.insert(e.id) {
                return Err(DispatchError::InvalidConfig(format!(
                    "duplicate emergency id {}",
                    e.id
                )));
            }
        }
        Ok(Self {
            origin,
            emergencies,
        })
    }

    /// Origin shared by all emergencies.
    pub fn origin(&self) -> NodeId {
        self.origin
    }

    /// Emergencies in commodity order.
    pub fn as_slice(&self) -> &[Emergency] {
        &self.emergencies
    }

    /// Iterates over the emergencies in commodity order.
    pub fn iter(&self) -> impl Iterator<Item = &Emergency> {
        self.emergencies.iter()
    }

    /// Number of emergencies.
    pub fn len(&self) -> usize {
        self.emergencies.len()
    }

    /// Returns `true` if there are no emergencies.
    pub fn is_empty(&self) -> bool {
        self.emergencies.is_empty()
    }

    /// Emergency at commodity index `k`.
    pub fn get(&self, k: usize) -> Option<&Emergency> {
        self.emergencies.get(k)
    }

    /// Sum of all required speeds.
    pub fn total_required_speed(&self) -> f64 {
        self.emergencies.iter().map(|e| e.required_speed).sum()
    }
}
