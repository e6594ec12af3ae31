//! Mixed-integer formulation of the dispatch problem.
//!
//! - [`FlowFormulationBuilder`] — Builds the multi-commodity flow model
//! - [`Formulation`] — Columns, objective and rows, independent of any solver

mod builder;
mod model;

pub use builder::{FlowFormulationBuilder, FormulationOptions};
pub use model::{
    Commodity, ConstraintKind, FlowVariable, Formulation, LinearConstraint, VarId,
};
