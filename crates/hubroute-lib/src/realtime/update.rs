//! Typed updates pushed to subscribers.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::geo::Point;
use crate::optimizer::OptimizationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdatePriority {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for UpdatePriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            UpdatePriority::Low => "low",
            UpdatePriority::Medium => "medium",
            UpdatePriority::High => "high",
            UpdatePriority::Critical => "critical",
        };
        f.write_str(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    RouteUpdate,
    OptimizationComplete,
    OpportunityAlert,
}

impl fmt::Display for UpdateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            UpdateKind::RouteUpdate => "route_update",
            UpdateKind::OptimizationComplete => "optimization_complete",
            UpdateKind::OpportunityAlert => "opportunity_alert",
        };
        f.write_str(value)
    }
}

/// Cache-level events about a route.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RouteUpdate {
    /// A request was answered from the cache.
    CacheHit {
        cache_key: String,
        result: Arc<OptimizationResult>,
    },
    /// The result cache was emptied.
    CacheCleared { removed: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityKind {
    /// Two recent routes already pass through the same hub.
    SharedHub,
    /// Two recent routes could be merged through a common hub.
    Consolidation,
}

impl OpportunityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OpportunityKind::SharedHub => "shared_hub",
            OpportunityKind::Consolidation => "consolidation",
        }
    }
}

impl fmt::Display for OpportunityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A pairing found by the background scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpportunityAlert {
    pub kind: OpportunityKind,
    pub first_key: String,
    pub second_key: String,
    pub hub: Point,
    /// Kilometres saved against running both routes separately. Zero for
    /// shared hubs, where the routes are already merged geographically.
    pub estimated_savings_km: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum UpdatePayload {
    Route(RouteUpdate),
    OptimizationComplete {
        cache_key: String,
        result: Arc<OptimizationResult>,
    },
    OpportunityAlert(OpportunityAlert),
}

/// One broadcast message.
///
/// `sequence` increases by one per update emitted by a service, so every
/// subscriber sees the same total order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Update {
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub priority: UpdatePriority,
    pub action_required: bool,
    pub payload: UpdatePayload,
}

impl Update {
    pub fn kind(&self) -> UpdateKind {
        match self.payload {
            UpdatePayload::Route(_) => UpdateKind::RouteUpdate,
            UpdatePayload::OptimizationComplete { .. } => UpdateKind::OptimizationComplete,
            UpdatePayload::OpportunityAlert(_) => UpdateKind::OpportunityAlert,
        }
    }

    /// Result carried by the update, if any.
    pub fn result(&self) -> Option<&Arc<OptimizationResult>> {
        match &self.payload {
            UpdatePayload::Route(RouteUpdate::CacheHit { result, .. })
            | UpdatePayload::OptimizationComplete { result, .. } => Some(result),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alert() -> Update {
        Update {
            sequence: 7,
            timestamp: Utc::now(),
            priority: UpdatePriority::Medium,
            action_required: true,
            payload: UpdatePayload::OpportunityAlert(OpportunityAlert {
                kind: OpportunityKind::SharedHub,
                first_key: "route:a".into(),
                second_key: "route:b".into(),
                hub: Point::hub(18.6796, 105.6813, "Vinh"),
                estimated_savings_km: 0.0,
            }),
        }
    }

    #[test]
    fn kind_follows_payload() {
        let update = alert();
        assert_eq!(update.kind(), UpdateKind::OpportunityAlert);
        assert!(update.result().is_none());

        let cleared = Update {
            payload: UpdatePayload::Route(RouteUpdate::CacheCleared { removed: 3 }),
            ..alert()
        };
        assert_eq!(cleared.kind(), UpdateKind::RouteUpdate);
    }

    #[test]
    fn serializes_with_tagged_payload() {
        let json = serde_json::to_value(alert()).unwrap();
        assert_eq!(json["priority"], "medium");
        assert_eq!(json["payload"]["type"], "opportunity_alert");
        assert_eq!(json["payload"]["data"]["kind"], "shared_hub");
        assert_eq!(json["payload"]["data"]["hub"]["label"], "Vinh");
    }

    #[test]
    fn priorities_are_ordered() {
        assert!(UpdatePriority::Critical > UpdatePriority::High);
        assert!(UpdatePriority::High > UpdatePriority::Medium);
        assert!(UpdatePriority::Medium > UpdatePriority::Low);
    }
}
