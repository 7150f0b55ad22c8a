//! Intermediate hub selection.
//!
//! A hub is worth using when the detour it introduces stays within a
//! [`DetourTolerance`] of the direct distance. Two presets exist because the
//! decision is made in two places with different appetites for detours: the
//! optimiser defaults to [`DetourTolerance::STRICT`] and the consolidation
//! scanner to [`DetourTolerance::RELAXED`]. Both are plain configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::geo::{distance_km, Point};

/// Maximum accepted ratio of via-hub distance to direct distance.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct DetourTolerance(f64);

impl DetourTolerance {
    /// Accept at most a 15% detour.
    pub const STRICT: DetourTolerance = DetourTolerance(1.15);
    /// Accept at most a 30% detour.
    pub const RELAXED: DetourTolerance = DetourTolerance(1.30);

    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || value < 1.0 {
            return Err(Error::validation(
                "detour_tolerance",
                format!("must be a finite ratio >= 1.0, got {value}"),
            ));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    /// Parse a preset name (`strict`, `relaxed`) or a numeric ratio.
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Self::STRICT),
            "relaxed" => Ok(Self::RELAXED),
            other => {
                let value = other.parse::<f64>().map_err(|_| {
                    Error::validation(
                        "detour_tolerance",
                        format!("expected 'strict', 'relaxed' or a number, got '{s}'"),
                    )
                })?;
                Self::new(value)
            }
        }
    }
}

impl TryFrom<f64> for DetourTolerance {
    type Error = Error;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<DetourTolerance> for f64 {
    fn from(value: DetourTolerance) -> Self {
        value.0
    }
}

impl fmt::Display for DetourTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// A candidate hub annotated with the distance of routing through it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubCandidate {
    pub hub: Point,
    pub via_distance_km: f64,
    /// `via_distance_km / direct`; 1.0 when origin and destination coincide.
    pub detour_ratio: f64,
}

fn via_distance(origin: &Point, hub: &Point, destination: &Point) -> f64 {
    distance_km(origin, hub) + distance_km(hub, destination)
}

/// Pick the candidate minimising `d(origin, hub) + d(hub, destination)`.
///
/// Ties keep the earliest candidate.
pub fn select_best_hub<'a>(
    origin: &Point,
    destination: &Point,
    candidates: &'a [Point],
) -> Option<&'a Point> {
    let mut best: Option<(&Point, f64)> = None;
    for candidate in candidates {
        let total = via_distance(origin, candidate, destination);
        match best {
            Some((_, best_total)) if total >= best_total => {}
            _ => best = Some((candidate, total)),
        }
    }
    best.map(|(hub, _)| hub)
}

/// Relative slack on the detour bound so a route exactly at the tolerance
/// survives the rounding of `direct * tolerance` (`100.0 * 1.15 < 115.0`).
const BOUND_SLACK: f64 = 1e-9;

/// Whether a via-hub route is acceptable relative to the direct route.
///
/// The bound is inclusive: `via_hub == direct * tolerance` is accepted.
pub fn should_use_hub(direct_km: f64, via_hub_km: f64, tolerance: DetourTolerance) -> bool {
    let bound = direct_km * tolerance.value();
    via_hub_km <= bound + bound.abs() * BOUND_SLACK
}

/// All candidates ordered by via-hub distance, shortest first (stable).
pub fn rank_hubs(origin: &Point, destination: &Point, candidates: &[Point]) -> Vec<HubCandidate> {
    let direct = distance_km(origin, destination);
    let mut ranked: Vec<HubCandidate> = candidates
        .iter()
        .map(|hub| {
            let via = via_distance(origin, hub, destination);
            HubCandidate {
                hub: hub.clone(),
                via_distance_km: via,
                detour_ratio: if direct > 0.0 { via / direct } else { 1.0 },
            }
        })
        .collect();
    ranked.sort_by(|a, b| a.via_distance_km.total_cmp(&b.via_distance_km));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hcmc() -> Point {
        Point::origin(10.8231, 106.6297, "Ho Chi Minh City")
    }

    fn hanoi() -> Point {
        Point::destination(21.0285, 105.8542, "Hanoi")
    }

    fn vinh() -> Point {
        Point::hub(18.6796, 105.6813, "Vinh")
    }

    fn da_nang() -> Point {
        Point::hub(16.0544, 108.2022, "Da Nang")
    }

    fn nha_trang() -> Point {
        Point::hub(12.2388, 109.1967, "Nha Trang")
    }

    #[test]
    fn empty_candidates_yield_none() {
        assert!(select_best_hub(&hcmc(), &hanoi(), &[]).is_none());
    }

    #[test]
    fn picks_hub_with_shortest_total() {
        let hubs = [nha_trang(), da_nang(), vinh()];
        let best = select_best_hub(&hcmc(), &hanoi(), &hubs).unwrap();
        assert_eq!(best.label(), "Vinh");
    }

    #[test]
    fn ties_keep_first_occurrence() {
        let a = Point::hub(16.0, 106.0, "first");
        let b = Point::hub(16.0, 106.0, "second");
        let hubs = [a, b];
        let best = select_best_hub(&hcmc(), &hanoi(), &hubs).unwrap();
        assert_eq!(best.label(), "first");
    }

    #[test]
    fn tolerance_presets_disagree_on_nha_trang() {
        let direct = distance_km(&hcmc(), &hanoi());
        let via = via_distance(&hcmc(), &nha_trang(), &hanoi());
        assert!(!should_use_hub(direct, via, DetourTolerance::STRICT));
        assert!(should_use_hub(direct, via, DetourTolerance::RELAXED));
    }

    #[test]
    fn boundary_is_inclusive() {
        assert!(should_use_hub(100.0, 115.0, DetourTolerance::STRICT));
        assert!(!should_use_hub(100.0, 115.1, DetourTolerance::STRICT));
        assert!(should_use_hub(1000.0, 1150.0, DetourTolerance::STRICT));
        assert!(should_use_hub(100.0, 130.0, DetourTolerance::RELAXED));
        assert!(!should_use_hub(100.0, 130.001, DetourTolerance::RELAXED));
    }

    #[test]
    fn tolerance_parsing_and_validation() {
        assert_eq!(DetourTolerance::parse("strict").unwrap(), DetourTolerance::STRICT);
        assert_eq!(DetourTolerance::parse("RELAXED").unwrap(), DetourTolerance::RELAXED);
        assert_eq!(DetourTolerance::parse("1.2").unwrap().value(), 1.2);
        assert!(DetourTolerance::parse("0.9").is_err());
        assert!(DetourTolerance::parse("wide").is_err());
        assert!(DetourTolerance::new(f64::NAN).is_err());
    }

    #[test]
    fn tolerance_serde_round_trips_as_number() {
        let json = serde_json::to_string(&DetourTolerance::STRICT).unwrap();
        assert_eq!(json, "1.15");
        let back: DetourTolerance = serde_json::from_str("1.3").unwrap();
        assert_eq!(back, DetourTolerance::RELAXED);
        assert!(serde_json::from_str::<DetourTolerance>("0.5").is_err());
    }

    #[test]
    fn rank_orders_by_via_distance() {
        let ranked = rank_hubs(&hcmc(), &hanoi(), &[nha_trang(), da_nang(), vinh()]);
        let labels: Vec<&str> = ranked.iter().map(|c| c.hub.label()).collect();
        assert_eq!(labels, vec!["Vinh", "Da Nang", "Nha Trang"]);
        assert!(ranked[0].detour_ratio >= 1.0);
        assert!(ranked[2].detour_ratio > 1.15 && ranked[2].detour_ratio < 1.3);
    }
}
