//! # emergency-dispatch
//!
//! Emergency vehicle dispatch from a single base, modelled as an integral
//! multi-commodity flow with shared edge capacities and solved as a MILP.
//!
//! Each emergency is a commodity that must travel from the origin to its
//! destination. A road segment may carry several vehicles at once as long as
//! their required speeds add up to no more than its capacity.
//!
//! ## Modules
//!
//! - [`network`] — Road graph normalisation, capacities, origin lookup
//! - [`models`] — Severities, vehicle classes, costs, emergencies, routes, solutions
//! - [`scenario`] — Random emergency generation
//! - [`formulation`] — Multi-commodity flow MILP construction
//! - [`solver`] — Solver adapter trait and HiGHS backend
//! - [`evaluation`] — Route extraction and edge utilization
//! - [`diagnostics`] — Hints for infeasible scenarios
//! - [`dispatch`] — End-to-end pipeline
//! - [`config`] — Layered TOML configuration
//! - [`error`] — Error taxonomy

pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod error;
pub mod evaluation;
pub mod formulation;
pub mod models;
pub mod network;
pub mod scenario;
pub mod solver;

pub use error::{DispatchError, Result};

#[cfg(test)]
pub(crate) fn init_test_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    tracing_subscriber::registry()
        .with(fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();
}
