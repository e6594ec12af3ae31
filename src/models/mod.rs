//! Domain model types for emergency dispatch.
//!
//! Provides severities with their vehicle classes and speed ranges, cost
//! profiles with override resolution, emergencies as flow commodities, and
//! the routes and solutions read back after solving.

mod costs;
mod emergency;
mod route;
mod severity;
mod solution;

pub use costs::{CostOverrides, CostTable, VehicleCost};
pub use emergency::{Emergency, EmergencyId, EmergencySet};
pub use route::Route;
pub use severity::{Severity, SpeedRange, SpeedRanges, VehicleClass};
pub use solution::{EdgeUtilization, Solution};
