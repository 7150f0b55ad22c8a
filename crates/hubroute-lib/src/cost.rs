//! Vehicle cost model.
//!
//! Turns a driven distance into fuel, toll and labour cost using a per-class
//! rate table. All amounts share one currency unit (VND in the default table).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default diesel price per litre.
pub const DEFAULT_FUEL_PRICE_PER_LITER: f64 = 24_000.0;

/// Vehicle classes with their own consumption and rate constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VehicleClass {
    #[default]
    Truck,
    Van,
    Car,
}

impl VehicleClass {
    pub const ALL: [VehicleClass; 3] = [VehicleClass::Truck, VehicleClass::Van, VehicleClass::Car];

    pub fn as_str(self) -> &'static str {
        match self {
            VehicleClass::Truck => "truck",
            VehicleClass::Van => "van",
            VehicleClass::Car => "car",
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VehicleClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "truck" => Ok(VehicleClass::Truck),
            "van" => Ok(VehicleClass::Van),
            "car" => Ok(VehicleClass::Car),
            other => Err(Error::validation(
                "vehicle",
                format!("unknown vehicle class '{other}'; expected truck, van or car"),
            )),
        }
    }
}

/// Consumption and rate constants for a single vehicle class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleProfile {
    pub liters_per_100km: f64,
    pub toll_rate_per_km: f64,
    pub labor_rate_per_km: f64,
    pub average_speed_kmh: f64,
}

impl VehicleProfile {
    fn validate(&self, class: VehicleClass) -> Result<()> {
        let rates = [
            (self.liters_per_100km, "liters_per_100km"),
            (self.toll_rate_per_km, "toll_rate_per_km"),
            (self.labor_rate_per_km, "labor_rate_per_km"),
        ];
        for (value, name) in rates {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::validation(
                    format!("cost.{class}.{name}"),
                    format!("must be finite and non-negative, got {value}"),
                ));
            }
        }

        if !self.average_speed_kmh.is_finite() || self.average_speed_kmh <= 0.0 {
            return Err(Error::validation(
                format!("cost.{class}.average_speed_kmh"),
                format!("must be finite and positive, got {}", self.average_speed_kmh),
            ));
        }

        Ok(())
    }
}

/// Rate table keyed by vehicle class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostTable {
    pub fuel_price_per_liter: f64,
    pub truck: VehicleProfile,
    pub van: VehicleProfile,
    pub car: VehicleProfile,
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            fuel_price_per_liter: DEFAULT_FUEL_PRICE_PER_LITER,
            truck: VehicleProfile {
                liters_per_100km: 25.0,
                toll_rate_per_km: 1_500.0,
                labor_rate_per_km: 2_500.0,
                average_speed_kmh: 50.0,
            },
            van: VehicleProfile {
                liters_per_100km: 12.0,
                toll_rate_per_km: 800.0,
                labor_rate_per_km: 1_800.0,
                average_speed_kmh: 60.0,
            },
            car: VehicleProfile {
                liters_per_100km: 8.0,
                toll_rate_per_km: 500.0,
                labor_rate_per_km: 1_200.0,
                average_speed_kmh: 70.0,
            },
        }
    }
}

impl CostTable {
    pub fn profile(&self, class: VehicleClass) -> &VehicleProfile {
        match class {
            VehicleClass::Truck => &self.truck,
            VehicleClass::Van => &self.van,
            VehicleClass::Car => &self.car,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.fuel_price_per_liter.is_finite() || self.fuel_price_per_liter <= 0.0 {
            return Err(Error::validation(
                "cost.fuel_price_per_liter",
                format!(
                    "must be finite and positive, got {}",
                    self.fuel_price_per_liter
                ),
            ));
        }
        for class in VehicleClass::ALL {
            self.profile(class).validate(class)?;
        }
        Ok(())
    }

    /// Cost of driving `distance_km` with a vehicle of the given class.
    pub fn cost_of(&self, distance_km: f64, class: VehicleClass) -> CostBreakdown {
        cost_of(distance_km, class, self)
    }

    /// Travel time in minutes at the class's average speed.
    pub fn drive_minutes(&self, distance_km: f64, class: VehicleClass) -> f64 {
        if !distance_km.is_finite() || distance_km <= 0.0 {
            return 0.0;
        }
        distance_km / self.profile(class).average_speed_kmh * 60.0
    }
}

/// Monetary cost split by component.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub fuel: f64,
    pub tolls: f64,
    pub labor: f64,
    pub total: f64,
}

impl CostBreakdown {
    pub fn new(fuel: f64, tolls: f64, labor: f64) -> Self {
        Self {
            fuel,
            tolls,
            labor,
            total: fuel + tolls + labor,
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Same breakdown with tolls removed, for toll-free routing.
    pub fn without_tolls(&self) -> Self {
        Self::new(self.fuel, 0.0, self.labor)
    }
}

/// Compute the cost of a trip.
///
/// Formula:
/// - fuel  = distance_km × liters_per_100km / 100 × fuel_price_per_liter
/// - tolls = distance_km × toll_rate_per_km
/// - labor = distance_km × labor_rate_per_km
/// - total = fuel + tolls + labor
///
/// Non-finite or negative distances cost nothing.
pub fn cost_of(distance_km: f64, class: VehicleClass, table: &CostTable) -> CostBreakdown {
    if !distance_km.is_finite() || distance_km <= 0.0 {
        return CostBreakdown::zero();
    }

    let profile = table.profile(class);
    let fuel = distance_km * profile.liters_per_100km / 100.0 * table.fuel_price_per_liter;
    let tolls = distance_km * profile.toll_rate_per_km;
    let labor = distance_km * profile.labor_rate_per_km;

    CostBreakdown::new(fuel, tolls, labor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truck_fuel_for_one_hundred_km() {
        let cost = cost_of(100.0, VehicleClass::Truck, &CostTable::default());
        assert!((cost.fuel - 600_000.0).abs() < 1e-6);
        assert!((cost.tolls - 150_000.0).abs() < 1e-6);
        assert!((cost.labor - 250_000.0).abs() < 1e-6);
        assert!(cost.total >= cost.fuel);
        assert!((cost.total - (cost.fuel + cost.tolls + cost.labor)).abs() < 1e-6);
    }

    #[test]
    fn overridden_table_changes_cost() {
        let mut table = CostTable::default();
        table.fuel_price_per_liter = 20_000.0;
        table.van.toll_rate_per_km = 0.0;
        let cost = table.cost_of(50.0, VehicleClass::Van);
        assert!((cost.fuel - 50.0 * 0.12 * 20_000.0).abs() < 1e-6);
        assert_eq!(cost.tolls, 0.0);
    }

    #[test]
    fn zero_and_invalid_distances_cost_nothing() {
        let table = CostTable::default();
        assert_eq!(cost_of(0.0, VehicleClass::Car, &table), CostBreakdown::zero());
        assert_eq!(cost_of(-5.0, VehicleClass::Car, &table), CostBreakdown::zero());
        assert_eq!(
            cost_of(f64::NAN, VehicleClass::Car, &table),
            CostBreakdown::zero()
        );
    }

    #[test]
    fn without_tolls_recomputes_total() {
        let cost = CostBreakdown::new(10.0, 5.0, 2.0).without_tolls();
        assert_eq!(cost.tolls, 0.0);
        assert_eq!(cost.total, 12.0);
    }

    #[test]
    fn drive_minutes_uses_class_speed() {
        let table = CostTable::default();
        assert!((table.drive_minutes(100.0, VehicleClass::Truck) - 120.0).abs() < 1e-9);
        assert!((table.drive_minutes(70.0, VehicleClass::Car) - 60.0).abs() < 1e-9);
        assert_eq!(table.drive_minutes(0.0, VehicleClass::Van), 0.0);
    }

    #[test]
    fn vehicle_class_parsing() {
        assert_eq!("Truck".parse::<VehicleClass>().unwrap(), VehicleClass::Truck);
        assert_eq!(" van ".parse::<VehicleClass>().unwrap(), VehicleClass::Van);
        let err = "bicycle".parse::<VehicleClass>().unwrap_err();
        assert!(err.to_string().contains("bicycle"));
    }

    #[test]
    fn validate_rejects_bad_rates() {
        assert!(CostTable::default().validate().is_ok());

        let mut table = CostTable::default();
        table.car.average_speed_kmh = 0.0;
        let err = table.validate().unwrap_err();
        assert!(err.to_string().contains("cost.car.average_speed_kmh"));

        let mut table = CostTable::default();
        table.truck.toll_rate_per_km = -1.0;
        assert!(table.validate().is_err());

        let mut table = CostTable::default();
        table.fuel_price_per_liter = f64::INFINITY;
        assert!(table.validate().is_err());
    }
}
