//! Static analysis of infeasible scenarios.
//!
//! The advisor never re-solves. It inspects required speeds, capacities and
//! graph structure and emits ranked hints, in this order:
//!
//! 1. A single emergency needs more speed than any road into its destination
//!    (or out of the origin) allows.
//! 2. The combined required speed exceeds the total capacity leaving the origin.
//! 3. Several emergencies must all cross one edge (removing it disconnects
//!    them) whose capacity is below their combined speed.
//! 4. A destination is not reachable from the origin at all.
//!
//! An empty result is valid: the scenario may be infeasible for reasons these
//! checks do not capture.
//!
//! # Complexity
//!
//! O(E·(V + E)) for the corridor check, which runs one reachability search
//! per edge; the other checks are linear.

use tracing::{debug, info, instrument};

use super::suggestion::{Suggestion, SuggestionKind};
use crate::formulation::Formulation;
use crate::models::EmergencySet;
use crate::network::{EdgeId, Network};

/// Produces ranked hints for an infeasible scenario.
pub struct InfeasibilityAdvisor<'a> {
    formulation: &'a Formulation,
    network: &'a Network,
    emergencies: &'a EmergencySet,
}

impl<'a> InfeasibilityAdvisor<'a> {
    /// Creates an advisor over one scenario.
    pub fn new(
        formulation: &'a Formulation,
        network: &'a Network,
        emergencies: &'a EmergencySet,
    ) -> Self {
        Self {
            formulation,
            network,
            emergencies,
        }
    }

    /// Runs every heuristic and returns their hints in priority order.
    #[instrument(level = "info", skip_all, fields(emergencies = self.emergencies.len()))]
    pub fn diagnose(&self) -> Vec<Suggestion> {
        let reachable = self.network.reachable_from(self.emergencies.origin(), None);

        let mut out = Vec::new();
        out.extend(self.speed_exceeds_capacity());
        out.extend(self.origin_bottleneck());
        out.extend(self.shared_corridors(&reachable));
        out.extend(self.unreachable(&reachable));

        info!(suggestions = out.len(), "infeasibility diagnosed");
        out
    }

    fn max_capacity(&self, edges: &[EdgeId]) -> Option<f64> {
        edges
            .iter()
            .map(|&e| self.network.edge(e).capacity)
            .reduce(f64::max)
    }

    fn speed_exceeds_capacity(&self) -> Vec<Suggestion> {
        let origin = self.emergencies.origin();
        let origin_max = self.max_capacity(self.network.out_edges(origin));
        self.formulation
            .commodities()
            .iter()
            .filter_map(|c| {
                let e = &c.emergency;
                let dest_max = self.max_capacity(self.network.in_edges(e.destination));
                // Missing edges are reported by the reachability check.
                let tightest = match (origin_max, dest_max) {
                    (Some(a), Some(b)) => a.min(b),
                    _ => return None,
                };
                (e.required_speed > tightest).then(|| {
                    debug!(emergency = %e.id, required = e.required_speed, tightest, "speed exceeds capacity");
                    Suggestion::new(SuggestionKind::SpeedExceedsCapacity {
                        emergency: e.id,
                        required_speed: e.required_speed,
                        max_capacity: tightest,
                    })
                })
            })
            .collect()
    }

    fn origin_bottleneck(&self) -> Option<Suggestion> {
        let origin = self.emergencies.origin();
        let origin_capacity: f64 = self
            .network
            .out_edges(origin)
            .iter()
            .map(|&e| self.network.edge(e).capacity)
            .sum();
        let total_required = self.emergencies.total_required_speed();
        if self.emergencies.is_empty() || total_required <= origin_capacity {
            return None;
        }
        debug!(total_required, origin_capacity, "origin bottleneck");
        Some(Suggestion::new(SuggestionKind::OriginBottleneck {
            total_required,
            origin_capacity,
        }))
    }

    fn shared_corridors(&self, reachable: &[bool]) -> Vec<Suggestion> {
        let origin = self.emergencies.origin();
        let mut out = Vec::new();
        for edge in self.formulation.edges() {
            if !reachable[edge.from.0] {
                continue;
            }
            let without = self.network.reachable_from(origin, Some(edge.id));
            let mut ids = Vec::new();
            let mut load = 0.0;
            for c in self.formulation.commodities() {
                let d = c.emergency.destination;
                if reachable[d.0] && !without[d.0] {
                    ids.push(c.emergency.id);
                    load += c.emergency.required_speed;
                }
            }
            if ids.len() >= 2 && load > edge.capacity {
                debug!(edge = %edge.id, load, capacity = edge.capacity, "shared corridor");
                out.push(Suggestion::new(SuggestionKind::SharedCorridor {
                    edge: edge.id,
                    emergencies: ids,
                    load,
                    capacity: edge.capacity,
                }));
            }
        }
        out
    }

    fn unreachable(&self, reachable: &[bool]) -> Vec<Suggestion> {
        self.emergencies
            .iter()
            .filter(|e| !reachable[e.destination.0])
            .map(|e| {
                Suggestion::new(SuggestionKind::Unreachable {
                    emergency: e.id,
                    destination: e.destination,
                })
            })
            .collect()
    }
}

/// Diagnoses an infeasible scenario; see [`InfeasibilityAdvisor`].
pub fn diagnose(
    formulation: &Formulation,
    network: &Network,
    emergencies: &EmergencySet,
) -> Vec<Suggestion> {
    InfeasibilityAdvisor::new(formulation, network, emergencies).diagnose()
}
