//! Scenario generation: random emergency sets over a network.

mod generator;

pub use generator::{generate_emergencies, SeverityMix};
