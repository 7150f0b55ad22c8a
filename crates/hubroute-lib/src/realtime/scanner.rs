//! Consolidation opportunity scan over recently optimised routes.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::update::{OpportunityAlert, OpportunityKind};
use crate::geo::{distance_km, Point};
use crate::hub::DetourTolerance;
use crate::optimizer::OptimizationResult;

/// How the scanner decides whether two routes can share a hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidationConfig {
    /// The consolidated run may be at most this factor of the longer direct route.
    pub detour_tolerance: DetourTolerance,
    /// Hubs considered for every pair, in addition to the pair's own candidates.
    pub hubs: Vec<Point>,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            detour_tolerance: DetourTolerance::RELAXED,
            hubs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RecentRoute {
    pub(crate) key: String,
    pub(crate) candidate_hubs: Vec<Point>,
    pub(crate) result: Arc<OptimizationResult>,
}

/// Bounded window of the latest distinct results, plus the pairs already
/// alerted on so each opportunity is raised once.
#[derive(Debug)]
pub(crate) struct RecentWindow {
    capacity: usize,
    routes: VecDeque<RecentRoute>,
    alerted: HashSet<(String, String)>,
}

impl RecentWindow {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            routes: VecDeque::new(),
            alerted: HashSet::new(),
        }
    }

    /// Record a route; a key already present moves to the newest slot.
    pub(crate) fn push(&mut self, route: RecentRoute) {
        self.routes.retain(|r| r.key != route.key);
        self.routes.push_back(route);
        let mut dropped = false;
        while self.routes.len() > self.capacity {
            self.routes.pop_front();
            dropped = true;
        }
        if dropped {
            self.forget_stale_pairs();
        }
    }

    /// Drop routes whose key fails `is_live`, e.g. results that expired or
    /// were evicted from the cache. Returns how many were dropped.
    pub(crate) fn retain_live(&mut self, is_live: impl Fn(&str) -> bool) -> usize {
        let before = self.routes.len();
        self.routes.retain(|route| is_live(&route.key));
        let dropped = before - self.routes.len();
        if dropped > 0 {
            self.forget_stale_pairs();
        }
        dropped
    }

    fn forget_stale_pairs(&mut self) {
        let routes = &self.routes;
        self.alerted.retain(|(a, b)| {
            routes.iter().any(|r| &r.key == a) && routes.iter().any(|r| &r.key == b)
        });
    }

    pub(crate) fn len(&self) -> usize {
        self.routes.len()
    }

    pub(crate) fn clear(&mut self) {
        self.routes.clear();
        self.alerted.clear();
    }

    /// Find opportunities among pairs not alerted before and mark them.
    pub(crate) fn scan(&mut self, config: &ConsolidationConfig) -> Vec<OpportunityAlert> {
        let usable: Vec<&RecentRoute> = self
            .routes
            .iter()
            .filter(|route| {
                let ok = is_well_formed(&route.result);
                if !ok {
                    tracing::warn!(cache_key = %route.key, "skipping malformed route in opportunity scan");
                }
                ok
            })
            .collect();

        let mut alerts = Vec::new();
        for (i, first) in usable.iter().enumerate() {
            for second in &usable[i + 1..] {
                let pair = pair_key(&first.key, &second.key);
                if self.alerted.contains(&pair) {
                    continue;
                }
                if let Some(alert) = find_opportunity(first, second, config) {
                    self.alerted.insert(pair);
                    alerts.push(alert);
                }
            }
        }
        alerts
    }
}

fn is_well_formed(result: &OptimizationResult) -> bool {
    result.waypoints().len() >= 2 && result.distance_km().is_finite()
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

fn endpoints(result: &OptimizationResult) -> Option<(&Point, &Point)> {
    let waypoints = result.waypoints();
    Some((waypoints.first()?, waypoints.last()?))
}

fn find_opportunity(
    first: &RecentRoute,
    second: &RecentRoute,
    config: &ConsolidationConfig,
) -> Option<OpportunityAlert> {
    if let (Some(a), Some(b)) = (first.result.hub(), second.result.hub()) {
        if a.same_location(b) {
            return Some(OpportunityAlert {
                kind: OpportunityKind::SharedHub,
                first_key: first.key.clone(),
                second_key: second.key.clone(),
                hub: a.clone(),
                estimated_savings_km: 0.0,
            });
        }
    }

    let (origin_a, dest_a) = endpoints(&first.result)?;
    let (origin_b, dest_b) = endpoints(&second.result)?;
    let direct_a = distance_km(origin_a, dest_a);
    let direct_b = distance_km(origin_b, dest_b);
    let separate = direct_a + direct_b;
    let ceiling = config.detour_tolerance.value() * direct_a.max(direct_b);
    let drop_leg = distance_km(dest_a, dest_b);

    let mut best: Option<(&Point, f64)> = None;
    let candidates = config
        .hubs
        .iter()
        .chain(first.candidate_hubs.iter())
        .chain(second.candidate_hubs.iter());
    for hub in candidates {
        let consolidated =
            distance_km(origin_a, hub) + distance_km(origin_b, hub) + distance_km(hub, dest_a) + drop_leg;
        if consolidated >= separate || consolidated > ceiling {
            continue;
        }
        if best.map_or(true, |(_, d)| consolidated < d) {
            best = Some((hub, consolidated));
        }
    }

    best.map(|(hub, consolidated)| OpportunityAlert {
        kind: OpportunityKind::Consolidation,
        first_key: first.key.clone(),
        second_key: second.key.clone(),
        hub: hub.clone(),
        estimated_savings_km: separate - consolidated,
    })
}
