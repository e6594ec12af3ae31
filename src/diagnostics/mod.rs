//! Hints for scenarios the solver reports as infeasible.
//!
//! - [`InfeasibilityAdvisor`] — Ranked static checks over speeds, capacities and connectivity
//! - [`Suggestion`] — One hint with its trigger data and message

mod advisor;
mod suggestion;

pub use advisor::{diagnose, InfeasibilityAdvisor};
pub use suggestion::{Suggestion, SuggestionKind};
