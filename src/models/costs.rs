//! Per-severity vehicle cost profiles with layered override resolution.

use serde::{Deserialize, Serialize};

use super::Severity;
use crate::error::{DispatchError, Result};

/// Fixed activation cost and per-kilometer cost of a vehicle class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleCost {
    /// Cost charged once per dispatched vehicle.
    pub fixed_cost: f64,
    /// Cost per kilometer traveled.
    pub cost_per_km: f64,
}

impl VehicleCost {
    /// Creates a cost profile.
    pub fn new(fixed_cost: f64, cost_per_km: f64) -> Self {
        Self {
            fixed_cost,
            cost_per_km,
        }
    }

    /// Cost of traveling `distance_m` meters, fixed part included.
    pub fn trip_cost(&self, distance_m: f64) -> f64 {
        self.fixed_cost + self.variable_cost(distance_m)
    }

    /// Distance-dependent part of the trip cost.
    pub fn variable_cost(&self, distance_m: f64) -> f64 {
        distance_m / 1000.0 * self.cost_per_km
    }

    /// Finite, non-negative fixed cost and a finite, strictly positive
    /// per-kilometer cost.
    pub(crate) fn is_valid(&self) -> bool {
        self.fixed_cost.is_finite()
            && self.cost_per_km.is_finite()
            && self.fixed_cost >= 0.0
            && self.cost_per_km > 0.0
    }
}

/// Caller-supplied cost overrides, one optional profile per severity.
///
/// Severities left unset fall back to [`CostTable::defaults`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostOverrides {
    /// Override for [`Severity::Low`].
    pub low: Option<VehicleCost>,
    /// Override for [`Severity::Medium`].
    pub medium: Option<VehicleCost>,
    /// Override for [`Severity::High`].
    pub high: Option<VehicleCost>,
}

impl CostOverrides {
    /// Creates an empty override set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the override for `severity`.
    pub fn insert(&mut self, severity: Severity, cost: VehicleCost) {
        *self.slot_mut(severity) = Some(cost);
    }

    /// Override for `severity`, if any.
    pub fn get(&self, severity: Severity) -> Option<VehicleCost> {
        match severity {
            Severity::Low => self.low,
            Severity::Medium => self.medium,
            Severity::High => self.high,
        }
    }

    /// Checks every profile that is set.
    ///
    /// # Errors
    ///
    /// [`DispatchError::InvalidConfig`] naming the first invalid severity.
    pub fn validate(&self) -> Result<()> {
        for s in Severity::ALL {
            if let Some(cost) = self.get(s) {
                if !cost.is_valid() {
                    return Err(DispatchError::InvalidConfig(format!(
                        "costs for {s} need a finite non-negative fixed cost and a positive per-km cost, got {cost:?}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn slot_mut(&mut self, severity: Severity) -> &mut Option<VehicleCost> {
        match severity {
            Severity::Low => &mut self.low,
            Severity::Medium => &mut self.medium,
            Severity::High => &mut self.high,
        }
    }
}

/// Fully resolved cost table, one profile per severity.
///
/// # Examples
///
/// ```
/// use emergency_dispatch::models::{CostOverrides, CostTable, Severity, VehicleCost};
///
/// let mut overrides = CostOverrides::new();
/// overrides.insert(Severity::Low, VehicleCost::new(40_000.0, 6_000.0));
///
/// let table = CostTable::resolve(&overrides);
/// assert_eq!(table.get(Severity::Low).fixed_cost, 40_000.0);
/// assert_eq!(table.get(Severity::High), CostTable::defaults().get(Severity::High));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CostTable {
    entries: [VehicleCost; 3],
}

impl CostTable {
    /// Built-in cost profiles (COP).
    pub fn defaults() -> Self {
        Self {
            entries: [
                VehicleCost::new(35_000.0, 5_585.0),
                VehicleCost::new(60_000.0, 10_534.0),
                VehicleCost::new(85_000.0, 20_396.0),
            ],
        }
    }

    /// Merges `overrides` over the built-in defaults.
    pub fn resolve(overrides: &CostOverrides) -> Self {
        let mut table = Self::defaults();
        for severity in Severity::ALL {
            if let Some(cost) = overrides.get(severity) {
                table.entries[severity.index()] = cost;
            }
        }
        table
    }

    /// Cost profile for `severity`.
    pub fn get(&self, severity: Severity) -> VehicleCost {
        self.entries[severity.index()]
    }
}

impl Default for CostTable {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_overrides_use_defaults() {
        let table = CostTable::resolve(&CostOverrides::new());
        assert_eq!(table, CostTable::defaults());
        assert_eq!(table.get(Severity::Medium).cost_per_km, 10_534.0);
    }

    #[test]
    fn test_override_only_touches_its_severity() {
        let mut overrides = CostOverrides::new();
        overrides.insert(Severity::High, VehicleCost::new(1.0, 2.0));
        let table = CostTable::resolve(&overrides);
        assert_eq!(table.get(Severity::High), VehicleCost::new(1.0, 2.0));
        assert_eq!(table.get(Severity::Low), CostTable::defaults().get(Severity::Low));
    }

    #[test]
    fn test_trip_cost() {
        let c = VehicleCost::new(100.0, 50.0);
        assert!((c.trip_cost(1500.0) - 175.0).abs() < 1e-9);
        assert!((c.variable_cost(0.0)).abs() < 1e-9);
    }

    #[test]
    fn test_validity() {
        assert!(VehicleCost::new(0.0, 1.0).is_valid());
        assert!(!VehicleCost::new(0.0, 0.0).is_valid());
        assert!(!VehicleCost::new(1.0, -5.0).is_valid());
        assert!(!VehicleCost::new(-1.0, 1.0).is_valid());
        assert!(!VehicleCost::new(1.0, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_validate_overrides() {
        let mut overrides = CostOverrides::new();
        assert!(overrides.validate().is_ok());
        overrides.insert(Severity::Low, VehicleCost::new(10.0, 1.0));
        assert!(overrides.validate().is_ok());
        overrides.insert(Severity::High, VehicleCost::new(10.0, 0.0));
        assert!(matches!(overrides.validate(), Err(DispatchError::InvalidConfig(_))));
    }
}
