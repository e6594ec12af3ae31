//! Solver-agnostic mixed-integer model of the dispatch problem.

use std::fmt;

use serde::Serialize;

use crate::models::{Emergency, VehicleCost};
use crate::network::{Edge, EdgeId, NodeId};

/// Index of a decision variable (a column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarId(pub usize);

/// Binary variable `x_{ijk}`: commodity `commodity` uses `edge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlowVariable {
    /// Road segment.
    pub edge: EdgeId,
    /// Commodity index (position in the emergency set).
    pub commodity: usize,
}

/// Family a constraint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConstraintKind {
    /// Net outflow of `commodity` at `node` equals its supply.
    Conservation {
        /// Commodity index.
        commodity: usize,
        /// Node of the balance.
        node: NodeId,
    },
    /// Sum of required speeds on `edge` stays within its capacity.
    Capacity {
        /// Road segment.
        edge: EdgeId,
    },
}

/// A row `lower <= Σ coef * x <= upper`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinearConstraint {
    /// Constraint family and subject.
    pub kind: ConstraintKind,
    /// Sparse coefficients.
    pub terms: Vec<(VarId, f64)>,
    /// Lower bound, possibly `-inf`.
    pub lower: f64,
    /// Upper bound, possibly `+inf`.
    pub upper: f64,
}

impl LinearConstraint {
    /// Row activity under `values`.
    pub fn activity(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|&(v, c)| c * values[v.0]).sum()
    }

    /// Returns `true` if the activity lies within bounds up to `tol`.
    pub fn is_satisfied(&self, values: &[f64], tol: f64) -> bool {
        let a = self.activity(values);
        a >= self.lower - tol && a <= self.upper + tol
    }

    /// Row name, stable across builds of the same instance.
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for LinearConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ConstraintKind::Conservation { commodity, node } => {
                write!(f, "flow_k{}_n{}", commodity, node.0)
            }
            ConstraintKind::Capacity { edge } => write!(f, "cap_e{}", edge.0),
        }
    }
}

/// A commodity as seen by the formulation: the emergency and its resolved
/// cost profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Commodity {
    /// The emergency.
    pub emergency: Emergency,
    /// Cost profile after override resolution.
    pub cost: VehicleCost,
}

/// Multi-commodity flow formulation with shared edge capacities.
///
/// Variables are laid out commodity-major: the variable of commodity `k` on
/// edge slot `s` is column `k * num_edges + s`. The fixed activation costs
/// are a constant objective offset and multiply no variable.
#[derive(Debug, Clone, Serialize)]
pub struct Formulation {
    pub(crate) origin: NodeId,
    pub(crate) edges: Vec<Edge>,
    pub(crate) slot_of: Vec<Option<usize>>,
    pub(crate) out_slots: Vec<Vec<usize>>,
    pub(crate) commodities: Vec<Commodity>,
    pub(crate) variables: Vec<FlowVariable>,
    pub(crate) objective: Vec<f64>,
    pub(crate) objective_offset: f64,
    pub(crate) constraints: Vec<LinearConstraint>,
}

impl Formulation {
    /// Shared origin of all commodities.
    pub fn origin(&self) -> NodeId {
        self.origin
    }

    /// Edges carrying variables, in slot order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Commodities in index order.
    pub fn commodities(&self) -> &[Commodity] {
        &self.commodities
    }

    /// Decision variables in column order.
    pub fn variables(&self) -> &[FlowVariable] {
        &self.variables
    }

    /// Number of columns.
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    /// All rows: conservation rows first, then capacity rows.
    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    /// Number of rows.
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Flow-conservation rows.
    pub fn conservation_constraints(&self) -> impl Iterator<Item = &LinearConstraint> {
        self.constraints
            .iter()
            .filter(|c| matches!(c.kind, ConstraintKind::Conservation { .. }))
    }

    /// Shared-capacity rows.
    pub fn capacity_constraints(&self) -> impl Iterator<Item = &LinearConstraint> {
        self.constraints
            .iter()
            .filter(|c| matches!(c.kind, ConstraintKind::Capacity { .. }))
    }

    /// Objective coefficient per column.
    pub fn objective(&self) -> &[f64] {
        &self.objective
    }

    /// Constant objective term: the sum of fixed activation costs.
    pub fn objective_offset(&self) -> f64 {
        self.objective_offset
    }

    /// Slot of `edge`, if it carries variables.
    pub fn slot(&self, edge: EdgeId) -> Option<usize> {
        self.slot_of.get(edge.0).copied().flatten()
    }

    /// Column of commodity `k` on `edge`.
    pub fn var(&self, k: usize, edge: EdgeId) -> Option<VarId> {
        if k >= self.commodities.len() {
            return None;
        }
        self.slot(edge).map(|s| VarId(k * self.edges.len() + s))
    }

    pub(crate) fn var_at(&self, k: usize, slot: usize) -> VarId {
        VarId(k * self.edges.len() + slot)
    }

    /// Slots of edges leaving `node`.
    pub fn out_slots(&self, node: NodeId) -> &[usize] {
        self.out_slots.get(node.0).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Objective value of an assignment, offset included.
    pub fn evaluate_objective(&self, values: &[f64]) -> f64 {
        self.objective_offset
            + self
                .objective
                .iter()
                .zip(values)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }

    /// Rows violated by `values` beyond `tol`.
    ///
    /// Returns `None` when `values` has the wrong length.
    pub fn violations(&self, values: &[f64], tol: f64) -> Option<Vec<&LinearConstraint>> {
        if values.len() != self.variables.len() {
            return None;
        }
        Some(
            self.constraints
                .iter()
                .filter(|c| !c.is_satisfied(values, tol))
                .collect(),
        )
    }

    /// Returns `true` if `values` is a binary assignment satisfying every row.
    pub fn is_feasible(&self, values: &[f64], tol: f64) -> bool {
        let binary = values
            .iter()
            .all(|&x| x.abs() <= tol || (x - 1.0).abs() <= tol);
        binary
            && self
                .violations(values, tol)
                .is_some_and(|v| v.is_empty())
    }
}
