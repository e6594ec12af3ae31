//! Construction of the multi-commodity flow formulation.
//!
//! For commodities K, nodes V and edges E the model has |K|·|E| binary
//! columns, |K|·|V| conservation rows and |E| capacity rows:
//!
//! ```text
//! min  Σ_k F(k) + Σ_k Σ_(i,j) (d_ij / 1000) · C(k) · x_ijk
//! s.t. Σ_j x_ijk - Σ_j x_jik = b_ik          ∀ k, i
//!      Σ_k r_k · x_ijk      <= c_ij          ∀ (i,j)
//!      x_ijk ∈ {0, 1}
//! ```
//!
//! with `b_ik = +1` at the origin, `-1` at the destination of `k`, else 0.
//! Required speeds add up on shared edges: several vehicles may use one
//! segment as long as their combined speed stays within its capacity.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use super::model::{Commodity, ConstraintKind, FlowVariable, Formulation, LinearConstraint};
use crate::models::{CostOverrides, CostTable, EmergencySet};
use crate::network::Network;

/// Options controlling which variables are materialised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormulationOptions {
    /// Only create variables for edges whose tail is reachable from the
    /// origin, and skip conservation rows of unreachable nodes.
    pub prune_unreachable: bool,
}

/// Builds a [`Formulation`] from a network, an emergency set, and costs.
///
/// Each call to [`build`](Self::build) produces an independent model; no
/// state is shared between builds.
///
/// # Examples
///
/// ```
/// use emergency_dispatch::formulation::FlowFormulationBuilder;
/// use emergency_dispatch::models::{CostOverrides, Emergency, EmergencySet, Severity};
/// use emergency_dispatch::network::{GeoPoint, Network, NetworkConfig, NodeId, RawGraph};
///
/// let mut raw = RawGraph::directed();
/// raw.add_node(1, 0.0, 0.0).add_node(2, 0.0, 0.001).add_node(3, 0.0, 0.002);
/// raw.add_edge_with_capacity(1, 2, 500.0, 80.0)
///     .add_edge_with_capacity(2, 3, 500.0, 80.0);
/// let config = NetworkConfig { origin: GeoPoint::new(0.0, 0.0), ..NetworkConfig::default() };
/// let net = Network::build(&raw, &config, 1).unwrap();
/// let set = EmergencySet::new(&net, vec![Emergency::new(1, Severity::Low, 40.0, NodeId(2))]).unwrap();
///
/// let f = FlowFormulationBuilder::new(&net, &set, &CostOverrides::new()).build();
/// assert_eq!(f.num_variables(), 2);
/// assert_eq!(f.conservation_constraints().count(), 3);
/// assert_eq!(f.capacity_constraints().count(), 2);
/// assert_eq!(f.objective_offset(), 35_000.0);
/// ```
pub struct FlowFormulationBuilder<'a> {
    network: &'a Network,
    emergencies: &'a EmergencySet,
    costs: CostTable,
    options: FormulationOptions,
}

impl<'a> FlowFormulationBuilder<'a> {
    /// Creates a builder, resolving `overrides` against the default costs.
    pub fn new(
        network: &'a Network,
        emergencies: &'a EmergencySet,
        overrides: &CostOverrides,
    ) -> Self {
        Self {
            network,
            emergencies,
            costs: CostTable::resolve(overrides),
            options: FormulationOptions::default(),
        }
    }

    /// Sets formulation options.
    pub fn with_options(mut self, options: FormulationOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolved cost table used for the objective.
    pub fn costs(&self) -> &CostTable {
        &self.costs
    }

    /// Builds the formulation.
    #[instrument(level = "info", skip(self), fields(emergencies = self.emergencies.len(), edges = self.network.num_edges()))]
    pub fn build(&self) -> Formulation {
        let network = self.network;
        let origin = network.origin();
        let n_nodes = network.num_nodes();

        let reachable = if self.options.prune_unreachable {
            network.reachable_from(origin, None)
        } else {
            vec![true; n_nodes]
        };

        let mut edges = Vec::new();
        let mut slot_of = vec![None; network.num_edges()];
        let mut out_slots = vec![Vec::new(); n_nodes];
        let mut in_slots = vec![Vec::new(); n_nodes];
        for e in network.edges() {
            if !reachable[e.from.0] {
                continue;
            }
            let slot = edges.len();
            slot_of[e.id.0] = Some(slot);
            out_slots[e.from.0].push(slot);
            in_slots[e.to.0].push(slot);
            edges.push(*e);
        }
        let pruned = network.num_edges() - edges.len();

        let commodities: Vec<Commodity> = self
            .emergencies
            .iter()
            .map(|e| Commodity {
                emergency: *e,
                cost: self.costs.get(e.severity),
            })
            .collect();

        let n_slots = edges.len();
        let mut variables = Vec::with_capacity(commodities.len() * n_slots);
        let mut objective = Vec::with_capacity(commodities.len() * n_slots);
        for (k, c) in commodities.iter().enumerate() {
            for e in &edges {
                variables.push(FlowVariable {
                    edge: e.id,
                    commodity: k,
                });
                objective.push(e.length / 1000.0 * c.cost.cost_per_km);
            }
        }
        let objective_offset = commodities.iter().map(|c| c.cost.fixed_cost).sum();

        let mut formulation = Formulation {
            origin,
            edges,
            slot_of,
            out_slots,
            commodities,
            variables,
            objective,
            objective_offset,
            constraints: Vec::new(),
        };

        let conservation = self.conservation_rows(&formulation, &in_slots, &reachable);
        let capacity = self.capacity_rows(&formulation);
        debug!(
            conservation = conservation.len(),
            capacity = capacity.len(),
            "rows generated"
        );
        formulation.constraints = conservation;
        formulation.constraints.extend(capacity);

        info!(
            variables = formulation.num_variables(),
            constraints = formulation.num_constraints(),
            pruned_edges = pruned,
            fixed_cost = formulation.objective_offset,
            "formulation built"
        );
        formulation
    }

    fn conservation_rows(
        &self,
        f: &Formulation,
        in_slots: &[Vec<usize>],
        reachable: &[bool],
    ) -> Vec<LinearConstraint> {
        let mut rows = Vec::with_capacity(f.commodities.len() * self.network.num_nodes());
        for (k, c) in f.commodities.iter().enumerate() {
            let dest = c.emergency.destination;
            for node in self.network.nodes() {
                let n = node.id;
                if !reachable[n.0] && n != dest {
                    continue;
                }
                // Origin and destination never coincide: EmergencySet rejects it.
                let supply = if n == f.origin {
                    1.0
                } else if n == dest {
                    -1.0
                } else {
                    0.0
                };
                let terms = f.out_slots[n.0]
                    .iter()
                    .map(|&s| (f.var_at(k, s), 1.0))
                    .chain(in_slots[n.0].iter().map(|&s| (f.var_at(k, s), -1.0)))
                    .collect();
                rows.push(LinearConstraint {
                    kind: ConstraintKind::Conservation {
                        commodity: k,
                        node: n,
                    },
                    terms,
                    lower: supply,
                    upper: supply,
                });
            }
        }
        rows
    }

    fn capacity_rows(&self, f: &Formulation) -> Vec<LinearConstraint> {
        f.edges
            .iter()
            .enumerate()
            .map(|(s, e)| LinearConstraint {
                kind: ConstraintKind::Capacity { edge: e.id },
                terms: f
                    .commodities
                    .iter()
                    .enumerate()
                    .map(|(k, c)| (f.var_at(k, s), c.emergency.required_speed))
                    .collect(),
                lower: f64::NEG_INFINITY,
                upper: e.capacity,
            })
            .collect()
    }
}
