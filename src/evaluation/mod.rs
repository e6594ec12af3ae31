//! Reading solutions back from solved formulations.
//!
//! - [`RouteExtractor`] — Routes, costs, and edge utilization from variable values

mod extractor;

pub use extractor::{extract, RouteExtractor};
