//! Clinical severity classes and their associated vehicle classes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// Clinical severity of an emergency.
///
/// Each severity maps to exactly one [`VehicleClass`] and has a default
/// required-speed range.
///
/// # Examples
///
/// ```
/// use emergency_dispatch::models::{Severity, VehicleClass};
///
/// let s: Severity = "grave".parse().unwrap();
/// assert_eq!(s, Severity::High);
/// assert_eq!(s.vehicle_class(), VehicleClass::MedicalizedCritical);
/// assert_eq!(s.default_speed_range().min(), 70.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Low priority.
    Low,
    /// Medium priority.
    Medium,
    /// High priority.
    High,
}

impl Severity {
    /// All severities, lowest first.
    pub const ALL: [Severity; 3] = [Severity::Low, Severity::Medium, Severity::High];

    /// Dense index (0, 1, 2) used for table lookups.
    pub fn index(self) -> usize {
        match self {
            Severity::Low => 0,
            Severity::Medium => 1,
            Severity::High => 2,
        }
    }

    /// Vehicle class dispatched for this severity.
    pub fn vehicle_class(self) -> VehicleClass {
        match self {
            Severity::Low => VehicleClass::BasicTransport,
            Severity::Medium => VehicleClass::MedicalizedModerate,
            Severity::High => VehicleClass::MedicalizedCritical,
        }
    }

    /// Default required-speed range in km/h: the three thirds of [30, 90].
    pub fn default_speed_range(self) -> SpeedRange {
        match self {
            Severity::Low => SpeedRange::new_unchecked(30.0, 50.0),
            Severity::Medium => SpeedRange::new_unchecked(50.0, 70.0),
            Severity::High => SpeedRange::new_unchecked(70.0, 90.0),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(s)
    }
}

impl FromStr for Severity {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" | "leve" | "1" => Ok(Severity::Low),
            "medium" | "media" | "moderate" | "moderada" | "2" => Ok(Severity::Medium),
            "high" | "grave" | "critical" | "3" => Ok(Severity::High),
            other => Err(DispatchError::InvalidConfig(format!(
                "unknown severity '{other}'"
            ))),
        }
    }
}

/// Vehicle class dispatched to an emergency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    /// Basic assisted transport (driver + nursing assistant).
    BasicTransport,
    /// Medicalized transport staffed for moderate cases.
    MedicalizedModerate,
    /// Medicalized transport staffed for critical cases.
    MedicalizedCritical,
}

impl VehicleClass {
    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            VehicleClass::BasicTransport => "Basic assisted transport",
            VehicleClass::MedicalizedModerate => "Medicalized transport (moderate)",
            VehicleClass::MedicalizedCritical => "Medicalized transport (critical)",
        }
    }

    /// Care level, 1 (basic) through 3 (critical).
    pub fn level(self) -> u8 {
        match self {
            VehicleClass::BasicTransport => 1,
            VehicleClass::MedicalizedModerate => 2,
            VehicleClass::MedicalizedCritical => 3,
        }
    }
}

/// A closed interval of speeds in km/h.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedRange {
    min: f64,
    max: f64,
}

impl SpeedRange {
    /// Creates a range.
    ///
    /// Returns `None` if `min > max`, `min <= 0`, or either bound is non-finite.
    pub fn new(min: f64, max: f64) -> Option<Self> {
        if !min.is_finite() || !max.is_finite() || min <= 0.0 || min > max {
            return None;
        }
        Some(Self { min, max })
    }

    const fn new_unchecked(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Lower bound.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Upper bound.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Returns `true` if `speed` lies inside the range.
    pub fn contains(&self, speed: f64) -> bool {
        speed >= self.min && speed <= self.max
    }

    pub(crate) fn is_valid(&self) -> bool {
        Self::new(self.min, self.max).is_some()
    }
}

/// Required-speed range per severity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedRanges {
    /// Range for [`Severity::Low`].
    pub low: SpeedRange,
    /// Range for [`Severity::Medium`].
    pub medium: SpeedRange,
    /// Range for [`Severity::High`].
    pub high: SpeedRange,
}

impl SpeedRanges {
    /// Range configured for `severity`.
    pub fn get(&self, severity: Severity) -> SpeedRange {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
        }
    }

    /// Highest speed any severity may require.
    pub fn overall_max(&self) -> f64 {
        self.low.max.max(self.medium.max).max(self.high.max)
    }
}

impl Default for SpeedRanges {
    fn default() -> Self {
        Self {
            low: Severity::Low.default_speed_range(),
            medium: Severity::Medium.default_speed_range(),
            high: Severity::High.default_speed_range(),
        }
    }
}
