//! Business metric helpers over the `metrics` facade.
//!
//! The library only records; installing an exporter (Prometheus or otherwise)
//! is left to the host process. Without a recorder every call is a no-op.

/// Record a successful optimisation.
///
/// Increments `hubroute_optimizations_total` and records the route length to
/// the `hubroute_route_distance_km` histogram.
///
/// # Arguments
///
/// * `hub_used` - Whether the route goes through a hub
/// * `distance_km` - Length of the chosen route
pub fn record_optimization(hub_used: bool, distance_km: f64) {
    let hub = if hub_used { "true" } else { "false" };
    ::metrics::counter!("hubroute_optimizations_total", "hub_used" => hub).increment(1);
    ::metrics::histogram!("hubroute_route_distance_km").record(distance_km);
}

/// Record a failed optimisation.
///
/// # Arguments
///
/// * `reason` - Failure category (e.g., "validation", "computation")
pub fn record_optimization_failed(reason: &str) {
    ::metrics::counter!(
        "hubroute_optimizations_failed_total",
        "reason" => reason.to_string()
    )
    .increment(1);
}

/// Record one cache lookup as a hit or a miss.
pub fn record_cache_lookup(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    ::metrics::counter!("hubroute_cache_lookups_total", "outcome" => outcome).increment(1);
}

pub fn record_cache_eviction() {
    ::metrics::counter!("hubroute_cache_evictions_total").increment(1);
}

/// Record an opportunity alert raised by the background scan.
///
/// # Arguments
///
/// * `kind` - The opportunity kind (e.g., "shared_hub", "consolidation")
pub fn record_opportunity(kind: &str) {
    ::metrics::counter!(
        "hubroute_opportunities_total",
        "kind" => kind.to_string()
    )
    .increment(1);
}

pub fn record_subscriber_failure() {
    ::metrics::counter!("hubroute_subscriber_failures_total").increment(1);
}
