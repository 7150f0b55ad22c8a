//! Hubroute library entry points.
//!
//! This crate computes distance, duration, cost and risk for road shipments
//! between geographic points, optionally via an intermediate hub; memoises
//! results in a priority-aware TTL cache; and runs a real-time service that
//! broadcasts typed updates and periodically looks for consolidation
//! opportunities. Higher-level consumers (the CLI, embedding services) should
//! depend on the items exported here instead of reimplementing behavior.
//!

pub mod cache;
pub mod config;
pub mod cost;
pub mod error;
pub mod geo;
pub mod hub;
pub mod metrics;
pub mod optimizer;
pub mod periodic;
pub mod realtime;

pub use cache::{CacheConfig, CacheEntry, CachePriority, CacheStats, SmartCache};
pub use config::EngineConfig;
pub use cost::{cost_of, CostBreakdown, CostTable, VehicleClass, VehicleProfile};
pub use error::{Error, Result};
pub use geo::{distance_km, initial_bearing_deg, path_distance_km, Point, PointRole};
pub use hub::{rank_hubs, select_best_hub, should_use_hub, DetourTolerance, HubCandidate};
pub use optimizer::{
    OptimizationRequest, OptimizationResult, OptimizerConfig, RiskLevel, RouteConstraints,
    RouteOptimizer, Unreachable,
};
pub use realtime::{
    cache_key, OpportunityAlert, OpportunityKind, RealTimeOptimizationService, RouteUpdate,
    ServiceConfig, ServiceStatus, Subscription, Update, UpdateKind, UpdatePayload,
    UpdatePriority,
};
