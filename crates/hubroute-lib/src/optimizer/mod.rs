//! Route optimisation between two points with an optional intermediate hub.
//!
//! This module provides:
//! - [`OptimizationRequest`] / [`RouteConstraints`] - caller-owned input
//! - [`OptimizationResult`] - immutable output, safe to share across threads
//! - [`RouteOptimizer`] - composes geometry, hub selection, cost and scoring
//!
//! # Example
//!
//! ```
//! use hubroute_lib::{OptimizationRequest, Point, RouteOptimizer, VehicleClass};
//!
//! let optimizer = RouteOptimizer::with_defaults();
//! let request = OptimizationRequest::new(
//!     Point::origin(10.8231, 106.6297, "Ho Chi Minh City"),
//!     Point::destination(21.0285, 105.8542, "Hanoi"),
//!     VehicleClass::Truck,
//! );
//! let result = optimizer.optimize(&request).unwrap();
//! assert_eq!(result.waypoints().len(), 2);
//! ```

mod scoring;

pub use scoring::{
    quality_score, RiskConfig, RiskLevel, SeasonWindow, QUALITY_PENALTY_HIGH,
    QUALITY_PENALTY_MEDIUM, QUALITY_PENALTY_PER_VIOLATION, RISK_DISTANCE_STEP_KM,
    RISK_HIGH_POINTS, RISK_MEDIUM_POINTS,
};

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::cost::{CostBreakdown, CostTable, VehicleClass};
use crate::error::{Error, Result};
use crate::geo::{distance_km, Point, PointRole};
use crate::hub::{select_best_hub, should_use_hub, DetourTolerance};

/// Constraints a route should respect.
///
/// Distance and duration limits are soft: exceeding them is reported in
/// [`OptimizationResult::unreachable`] rather than failing the call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteConstraints {
    pub max_distance_km: Option<f64>,
    pub max_duration_min: Option<f64>,
    pub avoid_tolls: bool,
    pub avoid_highways: bool,
}

impl RouteConstraints {
    fn validate(&self) -> Result<()> {
        let limits = [
            (self.max_distance_km, "constraints.max_distance_km"),
            (self.max_duration_min, "constraints.max_duration_min"),
        ];
        for (limit, field) in limits {
            if let Some(value) = limit {
                if !value.is_finite() || value < 0.0 {
                    return Err(Error::validation(
                        field,
                        format!("must be finite and non-negative, got {value}"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// High-level optimisation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub origin: Point,
    pub destination: Point,
    #[serde(default)]
    pub vehicle: VehicleClass,
    #[serde(default)]
    pub candidate_hubs: Vec<Point>,
    #[serde(default)]
    pub constraints: RouteConstraints,
    /// Planned departure date; drives the adverse-season risk rule.
    #[serde(default)]
    pub departure: Option<NaiveDate>,
}

impl OptimizationRequest {
    pub fn new(origin: Point, destination: Point, vehicle: VehicleClass) -> Self {
        Self {
            origin,
            destination,
            vehicle,
            candidate_hubs: Vec::new(),
            constraints: RouteConstraints::default(),
            departure: None,
        }
    }

    pub fn with_hubs(mut self, hubs: impl IntoIterator<Item = Point>) -> Self {
        self.candidate_hubs = hubs.into_iter().collect();
        self
    }

    pub fn with_constraints(mut self, constraints: RouteConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    pub fn with_departure(mut self, departure: NaiveDate) -> Self {
        self.departure = Some(departure);
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.origin.validate("origin")?;
        self.destination.validate("destination")?;
        for (idx, hub) in self.candidate_hubs.iter().enumerate() {
            hub.validate(&format!("candidate_hubs[{idx}]"))?;
        }
        self.constraints.validate()
    }
}

/// Which route limit was exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintLimit {
    MaxDistanceKm,
    MaxDurationMin,
}

impl fmt::Display for ConstraintLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            ConstraintLimit::MaxDistanceKm => "max_distance_km",
            ConstraintLimit::MaxDurationMin => "max_duration_min",
        };
        f.write_str(value)
    }
}

/// A soft failure: the best route found still breaks a caller limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Unreachable {
    pub limit: ConstraintLimit,
    pub limit_value: f64,
    pub actual: f64,
}

/// Optimised route returned by [`RouteOptimizer::optimize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    waypoints: Vec<Point>,
    distance_km: f64,
    direct_distance_km: f64,
    duration_min: f64,
    cost: CostBreakdown,
    risk_level: RiskLevel,
    quality_score: f64,
    recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    unreachable: Vec<Unreachable>,
}

impl OptimizationResult {
    fn degenerate(origin: &Point, destination: &Point) -> Self {
        Self {
            waypoints: vec![origin.clone(), destination.clone()],
            distance_km: 0.0,
            direct_distance_km: 0.0,
            duration_min: 0.0,
            cost: CostBreakdown::zero(),
            risk_level: RiskLevel::Low,
            quality_score: 100.0,
            recommendations: vec!["Origin and destination coincide; no travel required".to_string()],
            unreachable: Vec::new(),
        }
    }

    /// Origin, optional hub, destination.
    pub fn waypoints(&self) -> &[Point] {
        &self.waypoints
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    /// Great-circle distance had the route gone direct.
    pub fn direct_distance_km(&self) -> f64 {
        self.direct_distance_km
    }

    pub fn duration_min(&self) -> f64 {
        self.duration_min
    }

    pub fn cost(&self) -> &CostBreakdown {
        &self.cost
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    pub fn quality_score(&self) -> f64 {
        self.quality_score
    }

    pub fn recommendations(&self) -> &[String] {
        &self.recommendations
    }

    /// Limits the route breaks; empty for a fully compliant route.
    pub fn unreachable(&self) -> &[Unreachable] {
        &self.unreachable
    }

    pub fn is_unreachable(&self) -> bool {
        !self.unreachable.is_empty()
    }

    /// The hub between origin and destination, when one is used.
    pub fn hub(&self) -> Option<&Point> {
        if self.waypoints.len() == 3 {
            self.waypoints.get(1)
        } else {
            None
        }
    }

    pub fn hub_used(&self) -> bool {
        self.hub().is_some()
    }
}

/// Tunables for [`RouteOptimizer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    pub detour_tolerance: DetourTolerance,
    pub risk: RiskConfig,
    /// Distance a vehicle covers between refuelling stops.
    pub refuel_interval_km: f64,
    /// Loading/unloading time added when routing through a hub.
    pub hub_handling_min: f64,
    /// Travel-time multiplier when toll roads are avoided.
    pub toll_avoidance_slowdown: f64,
    /// Travel-time multiplier when highways are avoided.
    pub highway_avoidance_slowdown: f64,
    /// Fail the request when no acceptable hub is available.
    pub require_hub: bool,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            detour_tolerance: DetourTolerance::STRICT,
            risk: RiskConfig::default(),
            refuel_interval_km: 400.0,
            hub_handling_min: 45.0,
            toll_avoidance_slowdown: 1.15,
            highway_avoidance_slowdown: 1.25,
            require_hub: false,
        }
    }
}

impl OptimizerConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.refuel_interval_km.is_finite() || self.refuel_interval_km <= 0.0 {
            return Err(Error::validation(
                "optimizer.refuel_interval_km",
                format!("must be finite and positive, got {}", self.refuel_interval_km),
            ));
        }
        if !self.hub_handling_min.is_finite() || self.hub_handling_min < 0.0 {
            return Err(Error::validation(
                "optimizer.hub_handling_min",
                format!("must be finite and non-negative, got {}", self.hub_handling_min),
            ));
        }
        let slowdowns = [
            (self.toll_avoidance_slowdown, "optimizer.toll_avoidance_slowdown"),
            (
                self.highway_avoidance_slowdown,
                "optimizer.highway_avoidance_slowdown",
            ),
        ];
        for (value, field) in slowdowns {
            if !value.is_finite() || value < 1.0 {
                return Err(Error::validation(
                    field,
                    format!("must be a finite factor >= 1.0, got {value}"),
                ));
            }
        }
        self.risk.validate()
    }
}

/// Deterministic route optimiser.
///
/// Holds only configuration; `optimize` has no hidden state, randomness or
/// wall-clock dependence, so one instance can be shared freely.
#[derive(Debug, Clone)]
pub struct RouteOptimizer {
    config: OptimizerConfig,
    costs: CostTable,
}

impl RouteOptimizer {
    pub fn new(config: OptimizerConfig, costs: CostTable) -> Result<Self> {
        config.validate()?;
        costs.validate()?;
        Ok(Self { config, costs })
    }

    /// Optimiser using the reference cost table and default tunables.
    pub fn with_defaults() -> Self {
        Self {
            config: OptimizerConfig::default(),
            costs: CostTable::default(),
        }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    pub fn cost_table(&self) -> &CostTable {
        &self.costs
    }

    /// Optimise a single origin/destination request.
    ///
    /// 1. Validate coordinates and constraints
    /// 2. Short-circuit when origin and destination coincide
    /// 3. Pick the best candidate hub and keep it if the detour is tolerated
    /// 4. Derive duration, cost, risk and quality for the chosen path
    /// 5. Record broken limits and assemble recommendations
    pub fn optimize(&self, request: &OptimizationRequest) -> Result<OptimizationResult> {
        request.validate()?;

        let origin = &request.origin;
        let destination = &request.destination;

        if origin.same_location(destination) {
            tracing::debug!(origin = %origin, "origin equals destination; returning zero route");
            return Ok(OptimizationResult::degenerate(origin, destination));
        }

        let direct = distance_km(origin, destination);

        let chosen_hub = select_best_hub(origin, destination, &request.candidate_hubs)
            .map(|hub| {
                let via = distance_km(origin, hub) + distance_km(hub, destination);
                (hub, via)
            })
            .filter(|&(hub, via)| {
                let accepted = should_use_hub(direct, via, self.config.detour_tolerance);
                tracing::debug!(
                    hub = %hub,
                    direct_km = direct,
                    via_km = via,
                    tolerance = %self.config.detour_tolerance,
                    accepted,
                    "evaluated best candidate hub"
                );
                accepted
            });

        if self.config.require_hub && chosen_hub.is_none() {
            return Err(Error::computation(if request.candidate_hubs.is_empty() {
                "hub routing is mandatory but no candidate hubs were supplied".to_string()
            } else {
                format!(
                    "hub routing is mandatory but no candidate hub is within a {} detour",
                    self.config.detour_tolerance
                )
            }));
        }

        let constraints = &request.constraints;

        // A tolerated hub still yields to the direct route when only the hub
        // path breaks a limit, unless hub routing is mandatory.
        let mut skipped_hub = None;
        let chosen_hub = match chosen_hub {
            Some((hub, via)) if !self.config.require_hub => {
                let hub_fits =
                    check_limits(constraints, via, self.drive_duration(via, request, true)).is_empty();
                let direct_fits = check_limits(
                    constraints,
                    direct,
                    self.drive_duration(direct, request, false),
                )
                .is_empty();
                if !hub_fits && direct_fits {
                    tracing::debug!(
                        hub = %hub,
                        via_km = via,
                        direct_km = direct,
                        "hub path breaks a route limit the direct path meets; routing direct"
                    );
                    skipped_hub = Some(hub);
                    None
                } else {
                    Some((hub, via))
                }
            }
            other => other,
        };

        let distance = chosen_hub.map(|(_, via)| via).unwrap_or(direct);
        let duration = self.drive_duration(distance, request, chosen_hub.is_some());

        let mut cost = self.costs.cost_of(distance, request.vehicle);
        if constraints.avoid_tolls {
            cost = cost.without_tolls();
        }

        let season = request
            .departure
            .and_then(|date| self.config.risk.season_for(date).map(|s| (date, s)));
        let points = self
            .config
            .risk
            .points(distance, chosen_hub.is_some(), season.is_some());
        let risk_level = self.config.risk.level(points);

        let unreachable = check_limits(constraints, distance, duration);
        let quality = quality_score(distance, direct, risk_level, unreachable.len());

        let mut recommendations = Vec::new();
        if distance > self.config.refuel_interval_km {
            let stops = (distance / self.config.refuel_interval_km).ceil() as u32;
            recommendations.push(format!(
                "Plan {stops} refuelling stop{} (one every {:.0} km)",
                if stops == 1 { "" } else { "s" },
                self.config.refuel_interval_km
            ));
        }
        if let Some((date, window)) = season {
            recommendations.push(format!(
                "Weather advisory: departure on {date} falls within {}; allow buffer time and check forecasts",
                window.name
            ));
        }
        if let Some((hub, via)) = chosen_hub {
            recommendations.push(format!(
                "Route via hub {} (+{:.1} km over direct)",
                display_name(hub),
                via - direct
            ));
        }
        if let Some(hub) = skipped_hub {
            recommendations.push(format!(
                "Hub {} skipped: routing through it would break a route limit the direct route meets",
                display_name(hub)
            ));
        }
        if constraints.avoid_tolls {
            recommendations.push(format!(
                "Toll roads avoided: tolls removed from cost, travel time x{:.2}",
                self.config.toll_avoidance_slowdown
            ));
        }
        if constraints.avoid_highways {
            recommendations.push(format!(
                "Highways avoided: travel time x{:.2}",
                self.config.highway_avoidance_slowdown
            ));
        }
        for limit in &unreachable {
            recommendations.push(match limit.limit {
                ConstraintLimit::MaxDistanceKm => format!(
                    "Distance {:.1} km exceeds the {:.1} km limit; split the shipment or relax the constraint",
                    limit.actual, limit.limit_value
                ),
                ConstraintLimit::MaxDurationMin => format!(
                    "Duration {:.0} min exceeds the {:.0} min limit; add a relay driver or relax the constraint",
                    limit.actual, limit.limit_value
                ),
            });
        }
        if risk_level == RiskLevel::High {
            recommendations
                .push("High risk route: assign an experienced driver and schedule rest breaks".to_string());
        }

        let mut waypoints = Vec::with_capacity(3);
        waypoints.push(origin.clone());
        if let Some((hub, _)) = chosen_hub {
            waypoints.push(hub.with_role(PointRole::Hub));
        }
        waypoints.push(destination.clone());

        tracing::debug!(
            distance_km = distance,
            duration_min = duration,
            risk = %risk_level,
            quality,
            hub_used = chosen_hub.is_some(),
            "route optimised"
        );

        Ok(OptimizationResult {
            waypoints,
            distance_km: distance,
            direct_distance_km: direct,
            duration_min: duration,
            cost,
            risk_level,
            quality_score: quality,
            recommendations,
            unreachable,
        })
    }
}

impl RouteOptimizer {
    /// Drive time for `distance_km` under the request's avoidance flags, plus
    /// hub handling when routed through a hub.
    fn drive_duration(&self, distance_km: f64, request: &OptimizationRequest, via_hub: bool) -> f64 {
        let constraints = &request.constraints;
        let mut duration = self.costs.drive_minutes(distance_km, request.vehicle);
        if constraints.avoid_tolls {
            duration *= self.config.toll_avoidance_slowdown;
        }
        if constraints.avoid_highways {
            duration *= self.config.highway_avoidance_slowdown;
        }
        if via_hub {
            duration += self.config.hub_handling_min;
        }
        duration
    }
}

fn check_limits(constraints: &RouteConstraints, distance: f64, duration: f64) -> Vec<Unreachable> {
    let mut broken = Vec::new();
    if let Some(limit) = constraints.max_distance_km {
        if distance > limit {
            broken.push(Unreachable {
                limit: ConstraintLimit::MaxDistanceKm,
                limit_value: limit,
                actual: distance,
            });
        }
    }
    if let Some(limit) = constraints.max_duration_min {
        if duration > limit {
            broken.push(Unreachable {
                limit: ConstraintLimit::MaxDurationMin,
                limit_value: limit,
                actual: duration,
            });
        }
    }
    broken
}

fn display_name(point: &Point) -> String {
    if point.label().is_empty() {
        point.to_string()
    } else {
        point.label().to_string()
    }
}
