//! Random emergency scenarios.
//!
//! Each emergency independently draws a severity from the configured mix, a
//! required speed uniformly from that severity's range, and a destination
//! uniformly from the well-connected nodes of the network (origin excluded).
//! Destinations are drawn with replacement: two emergencies may share one.
//!
//! # Complexity
//!
//! O(V + n) where V = number of nodes and n = number of emergencies.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{DispatchError, Result};
use crate::models::{Emergency, EmergencySet, Severity, SpeedRanges};
use crate::network::Network;

/// ChaCha stream used for scenario draws. Capacity assignment in
/// [`Network::build`] uses stream 0 of the same seed.
const SCENARIO_STREAM: u64 = 1;

fn scenario_rng(seed: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(SCENARIO_STREAM);
    rng
}

/// Relative weights of the three severities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityMix {
    /// Weight of [`Severity::Low`].
    pub low: f64,
    /// Weight of [`Severity::Medium`].
    pub medium: f64,
    /// Weight of [`Severity::High`].
    pub high: f64,
}

impl SeverityMix {
    /// All severities equally likely.
    pub fn uniform() -> Self {
        Self {
            low: 1.0,
            medium: 1.0,
            high: 1.0,
        }
    }

    /// Checks that weights are non-negative, finite, and not all zero.
    pub fn validate(&self) -> Result<()> {
        let w = [self.low, self.medium, self.high];
        if w.iter().any(|x| !x.is_finite() || *x < 0.0) || w.iter().sum::<f64>() <= 0.0 {
            return Err(DispatchError::InvalidConfig(format!(
                "severity mix {w:?} must be non-negative with a positive sum"
            )));
        }
        Ok(())
    }

    fn sample<R: Rng>(&self, rng: &mut R) -> Severity {
        let total = self.low + self.medium + self.high;
        let r = rng.random::<f64>() * total;
        if r < self.low {
            Severity::Low
        } else if r < self.low + self.medium || self.high == 0.0 {
            Severity::Medium
        } else {
            Severity::High
        }
    }
}

impl Default for SeverityMix {
    fn default() -> Self {
        Self::uniform()
    }
}

/// Generates `count` emergencies on `network`.
///
/// # Arguments
///
/// * `network` — Road network; its origin is never used as a destination
/// * `count` — Number of emergencies
/// * `mix` — Severity weights
/// * `speeds` — Required-speed range per severity
/// * `seed` — Seed for the random generator
///
/// # Errors
///
/// [`DispatchError::InsufficientNodes`] if fewer than `count` well-connected
/// nodes exist; [`DispatchError::InvalidConfig`] for an invalid mix or range.
///
/// # Examples
///
/// ```
/// use emergency_dispatch::models::SpeedRanges;
/// use emergency_dispatch::network::{GeoPoint, Network, NetworkConfig, RawGraph};
/// use emergency_dispatch::scenario::{generate_emergencies, SeverityMix};
///
/// // Complete digraph on 5 nodes: every node has 4 predecessors and successors.
/// let mut raw = RawGraph::directed();
/// for i in 0..5u64 {
///     raw.add_node(i, 0.0, 0.001 * i as f64);
/// }
/// for i in 0..5u64 {
///     for j in 0..5u64 {
///         if i != j {
///             raw.add_edge(i, j, 100.0);
///         }
///     }
/// }
/// let config = NetworkConfig { origin: GeoPoint::new(0.0, 0.0), ..NetworkConfig::default() };
/// let net = Network::build(&raw, &config, 1).unwrap();
///
/// let set = generate_emergencies(&net, 3, &SeverityMix::uniform(), &SpeedRanges::default(), 42).unwrap();
/// assert_eq!(set.len(), 3);
/// assert!(set.iter().all(|e| e.destination != net.origin()));
/// ```
#[instrument(level = "info", skip(network, mix, speeds))]
pub fn generate_emergencies(
    network: &Network,
    count: usize,
    mix: &SeverityMix,
    speeds: &SpeedRanges,
    seed: u64,
) -> Result<EmergencySet> {
    mix.validate()?;
    for s in Severity::ALL {
        if !speeds.get(s).is_valid() {
            return Err(DispatchError::InvalidConfig(format!(
                "speed range for {s} must satisfy 0 < min <= max"
            )));
        }
    }

    let candidates = network.destination_candidates();
    if candidates.len() < count {
        return Err(DispatchError::InsufficientNodes {
            required: count,
            available: candidates.len(),
        });
    }

    let mut rng = scenario_rng(seed);
    let mut emergencies = Vec::with_capacity(count);
    for i in 0..count {
        let severity = mix.sample(&mut rng);
        let range = speeds.get(severity);
        let required_speed = rng.random_range(range.min()..=range.max());
        let destination = candidates[rng.random_range(0..candidates.len())];
        debug!(id = i + 1, %severity, required_speed, destination = %destination, "emergency drawn");
        emergencies.push(Emergency::new(
            (i + 1) as u32,
            severity,
            required_speed,
            destination,
        ));
    }

    let set = EmergencySet::new(network, emergencies)?;
    info!(
        count = set.len(),
        candidates = candidates.len(),
        total_required_speed = set.total_required_speed(),
        "emergencies generated"
    );
    Ok(set)
}

impl EmergencySet {
    /// Generates a random scenario; see [`generate_emergencies`].
    pub fn generate(
        network: &Network,
        count: usize,
        mix: &SeverityMix,
        speeds: &SpeedRanges,
        seed: u64,
    ) -> Result<Self> {
        generate_emergencies(network, count, mix, speeds, seed)
    }
}
