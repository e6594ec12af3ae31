//! Layered configuration for a dispatch run.
//!
//! Every field has a default, so a TOML document only needs the values it
//! changes. Cost overrides are merged with the built-in cost table when the
//! formulation is built, not here.
//!
//! ```toml
//! seed = 7
//!
//! [network]
//! capacity_min = 40.0
//! capacity_max = 120.0
//!
//! [scenario]
//! count = 6
//!
//! [costs.high]
//! fixed_cost = 90000.0
//! cost_per_km = 21000.0
//!
//! [solver]
//! time_limit_s = 30.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};
use crate::formulation::FormulationOptions;
use crate::models::{CostOverrides, Severity, SpeedRanges};
use crate::network::NetworkConfig;
use crate::scenario::SeverityMix;
use crate::solver::SolverParams;

/// Parameters of random scenario generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    /// Number of emergencies.
    pub count: usize,
    /// Relative severity weights.
    pub severity_mix: SeverityMix,
    /// Required-speed range per severity in km/h.
    pub speed_ranges: SpeedRanges,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            count: 4,
            severity_mix: SeverityMix::uniform(),
            speed_ranges: SpeedRanges::default(),
        }
    }
}

/// Complete configuration of a dispatch run.
///
/// # Examples
///
/// ```
/// use emergency_dispatch::config::DispatchConfig;
/// use emergency_dispatch::models::Severity;
///
/// let config = DispatchConfig::from_toml_str(r#"
///     seed = 7
///     [costs.low]
///     fixed_cost = 1000.0
///     cost_per_km = 100.0
/// "#).unwrap();
/// assert_eq!(config.seed, 7);
/// assert_eq!(config.scenario.count, 4);
/// assert_eq!(config.costs.get(Severity::Low).unwrap().fixed_cost, 1000.0);
/// assert!(config.costs.get(Severity::High).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Network normalisation.
    pub network: NetworkConfig,
    /// Scenario generation.
    pub scenario: ScenarioConfig,
    /// Cost overrides per severity.
    pub costs: CostOverrides,
    /// Formulation options.
    pub formulation: FormulationOptions,
    /// Solver parameters.
    pub solver: SolverParams,
    /// Seed for capacity assignment and scenario generation.
    pub seed: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            scenario: ScenarioConfig::default(),
            costs: CostOverrides::default(),
            formulation: FormulationOptions::default(),
            solver: SolverParams::default(),
            seed: 42,
        }
    }
}

impl DispatchConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| {
            DispatchError::InvalidConfig(format!("failure reading {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&s)
    }

    /// Checks every section.
    pub fn validate(&self) -> Result<()> {
        self.network.validate()?;
        self.scenario.severity_mix.validate()?;
        for s in Severity::ALL {
            let range = self.scenario.speed_ranges.get(s);
            if !range.is_valid() {
                return Err(DispatchError::InvalidConfig(format!(
                    "speed range [{}, {}] for {s} must satisfy 0 < min <= max",
                    range.min(),
                    range.max()
                )));
            }
        }
        self.costs.validate()?;
        self.solver.validate()
    }
}
