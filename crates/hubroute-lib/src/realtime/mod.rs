//! Real-time optimisation service.
//!
//! [`RealTimeOptimizationService`] wraps a [`RouteOptimizer`] with a
//! [`SmartCache`] of results, a periodic consolidation scan and a subscriber
//! fan-out of typed [`Update`]s.
//!
//! Lifecycle is two-state: `start` spawns the scanner and the cache sweeper on
//! the service's runtime, `stop` cancels and joins them and releases every
//! subscriber. Both are idempotent.
//!
//! Locking: the result cache, the recent-route window and the subscriber
//! registry are independent. Updates are published after the cache and window
//! locks have been released, and callbacks always run on their own tasks.

mod key;
mod scanner;
mod subscribers;
mod update;

pub use key::{cache_key, ROUTE_KEY_PREFIX};
pub use scanner::ConsolidationConfig;
pub use subscribers::Subscription;
pub use update::{
    OpportunityAlert, OpportunityKind, RouteUpdate, Update, UpdateKind, UpdatePayload,
    UpdatePriority,
};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::cache::{self, CacheConfig, CachePriority, CacheStats, SmartCache};
use crate::error::{Error, Result};
use crate::metrics;
use crate::optimizer::{OptimizationRequest, OptimizationResult, RouteOptimizer};
use crate::periodic::PeriodicTask;
use scanner::{RecentRoute, RecentWindow};
use subscribers::Subscribers;

/// Result cache shared by the service and its sweeper.
pub type ResultCache = SmartCache<String, Arc<OptimizationResult>>;

/// Service tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    #[serde(with = "cache::duration_secs")]
    pub scan_interval: Duration,
    /// TTL of cached optimisation results.
    #[serde(with = "cache::duration_secs")]
    pub result_ttl: Duration,
    /// Number of recent distinct results the scanner looks at.
    pub recent_window: usize,
    /// Quality at or above which a fresh result is high priority.
    pub high_priority_quality: f64,
    pub consolidation: ConsolidationConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(30),
            result_ttl: Duration::from_secs(5 * 60),
            recent_window: 20,
            high_priority_quality: 80.0,
            consolidation: ConsolidationConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval.is_zero() {
            return Err(Error::validation(
                "service.scan_interval",
                "must be greater than zero",
            ));
        }
        if self.recent_window < 2 {
            return Err(Error::validation(
                "service.recent_window",
                format!("must hold at least 2 routes, got {}", self.recent_window),
            ));
        }
        if !(0.0..=100.0).contains(&self.high_priority_quality) {
            return Err(Error::validation(
                "service.high_priority_quality",
                format!("must be within [0, 100], got {}", self.high_priority_quality),
            ));
        }
        for (idx, hub) in self.consolidation.hubs.iter().enumerate() {
            hub.validate(&format!("service.consolidation.hubs[{idx}]"))?;
        }
        Ok(())
    }
}

/// Snapshot of service counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub running: bool,
    pub subscriber_count: usize,
    pub cache_entry_count: usize,
    pub subscriber_failures: u64,
    pub scans_completed: u64,
    pub alerts_emitted: u64,
}

struct Shared {
    optimizer: RouteOptimizer,
    config: ServiceConfig,
    cache: Arc<ResultCache>,
    recent: Mutex<RecentWindow>,
    subscribers: Subscribers,
    running: AtomicBool,
    scans_completed: AtomicU64,
    alerts_emitted: AtomicU64,
}

impl Shared {
    fn scan(&self) -> Vec<OpportunityAlert> {
        let alerts = {
            let mut recent = self.recent.lock();
            let dropped = recent.retain_live(|key| self.cache.has(&key.to_string()));
            if dropped > 0 {
                tracing::debug!(dropped, "routes no longer cached left the scan window");
            }
            recent.scan(&self.config.consolidation)
        };
        self.scans_completed.fetch_add(1, Ordering::Relaxed);

        for alert in &alerts {
            metrics::record_opportunity(alert.kind.as_str());
            tracing::info!(
                kind = %alert.kind,
                hub = %alert.hub,
                savings_km = alert.estimated_savings_km,
                "opportunity found"
            );
            self.subscribers.publish(
                UpdatePriority::Medium,
                true,
                UpdatePayload::OpportunityAlert(alert.clone()),
            );
        }
        self.alerts_emitted
            .fetch_add(alerts.len() as u64, Ordering::Relaxed);
        alerts
    }
}

struct BackgroundTasks {
    scanner: PeriodicTask,
    sweeper: PeriodicTask,
}

pub struct RealTimeOptimizationService {
    shared: Arc<Shared>,
    runtime: Handle,
    tasks: Mutex<Option<BackgroundTasks>>,
}

impl std::fmt::Debug for RealTimeOptimizationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealTimeOptimizationService")
            .field("status", &self.status())
            .finish()
    }
}

impl RealTimeOptimizationService {
    /// Build a stopped service on the current tokio runtime.
    ///
    /// Fails with [`Error::RuntimeUnavailable`] outside a runtime; use
    /// [`RealTimeOptimizationService::with_runtime`] to pass a handle instead.
    pub fn new(
        optimizer: RouteOptimizer,
        cache_config: CacheConfig,
        config: ServiceConfig,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| Error::RuntimeUnavailable)?;
        Self::with_runtime(optimizer, cache_config, config, runtime)
    }

    pub fn with_runtime(
        optimizer: RouteOptimizer,
        cache_config: CacheConfig,
        config: ServiceConfig,
        runtime: Handle,
    ) -> Result<Self> {
        cache_config.validate()?;
        config.validate()?;

        let shared = Shared {
            optimizer,
            cache: Arc::new(SmartCache::new(cache_config)),
            recent: Mutex::new(RecentWindow::new(config.recent_window)),
            subscribers: Subscribers::new(runtime.clone()),
            config,
            running: AtomicBool::new(false),
            scans_completed: AtomicU64::new(0),
            alerts_emitted: AtomicU64::new(0),
        };

        Ok(Self {
            shared: Arc::new(shared),
            runtime,
            tasks: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.shared.config
    }

    pub fn optimizer(&self) -> &RouteOptimizer {
        &self.shared.optimizer
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Spawn the periodic scanner and cache sweeper. No-op when running.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();
        if tasks.is_some() {
            tracing::debug!("service already running");
            return;
        }

        let shared = Arc::clone(&self.shared);
        let scanner = PeriodicTask::spawn(
            &self.runtime,
            "opportunity-scanner",
            self.shared.config.scan_interval,
            move || {
                shared.scan();
            },
        );
        let sweeper = cache::spawn_sweeper(Arc::clone(&self.shared.cache), &self.runtime);

        *tasks = Some(BackgroundTasks { scanner, sweeper });
        self.shared.running.store(true, Ordering::SeqCst);
        tracing::info!(
            scan_interval_s = self.shared.config.scan_interval.as_secs_f64(),
            "real-time optimisation service started"
        );
    }

    /// Cancel and join background tasks, then release all subscribers.
    /// No-op when already stopped.
    pub async fn stop(&self) {
        let tasks = self.tasks.lock().take();
        let Some(tasks) = tasks else {
            tracing::debug!("service already stopped");
            return;
        };

        self.shared.running.store(false, Ordering::SeqCst);
        tasks.scanner.shutdown().await;
        tasks.sweeper.shutdown().await;
        let released = self.shared.subscribers.clear();
        tracing::info!(released, "real-time optimisation service stopped");
    }

    /// Register a callback invoked for every update, in publish order.
    ///
    /// A panicking callback is logged and counted; it keeps receiving later
    /// updates and never affects other subscribers.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Update) + Send + 'static,
    {
        self.shared.subscribers.subscribe(callback)
    }

    /// Register a channel subscriber for async consumers.
    pub fn subscribe_channel(&self) -> (Subscription, UnboundedReceiver<Arc<Update>>) {
        self.shared.subscribers.subscribe_channel()
    }

    /// Optimise through the result cache.
    ///
    /// A hit publishes a low-priority [`RouteUpdate::CacheHit`]. A miss runs
    /// the optimiser, caches the result and publishes
    /// [`UpdatePayload::OptimizationComplete`]. Failures propagate and nothing
    /// is cached.
    pub fn optimize_with_cache(
        &self,
        request: &OptimizationRequest,
    ) -> Result<Arc<OptimizationResult>> {
        let shared = &self.shared;
        let key = cache_key(request);

        if let Some(result) = shared.cache.get(&key) {
            tracing::debug!(cache_key = %key, "optimisation served from cache");
            shared.subscribers.publish(
                UpdatePriority::Low,
                false,
                UpdatePayload::Route(RouteUpdate::CacheHit {
                    cache_key: key,
                    result: Arc::clone(&result),
                }),
            );
            return Ok(result);
        }

        let result = match shared.optimizer.optimize(request) {
            Ok(result) => Arc::new(result),
            Err(err) => {
                let reason = if err.is_validation() {
                    "validation"
                } else {
                    "computation"
                };
                metrics::record_optimization_failed(reason);
                return Err(err);
            }
        };
        metrics::record_optimization(result.hub_used(), result.distance_km());

        let high_quality = result.quality_score() >= shared.config.high_priority_quality;
        let cache_priority = if high_quality {
            CachePriority::High
        } else {
            CachePriority::Medium
        };
        shared.cache.set(
            key.clone(),
            Arc::clone(&result),
            shared.config.result_ttl,
            cache_priority,
        );
        shared.recent.lock().push(RecentRoute {
            key: key.clone(),
            candidate_hubs: request.candidate_hubs.clone(),
            result: Arc::clone(&result),
        });

        let unreachable = result.is_unreachable();
        let priority = if unreachable {
            UpdatePriority::Critical
        } else if high_quality {
            UpdatePriority::High
        } else {
            UpdatePriority::Medium
        };
        shared.subscribers.publish(
            priority,
            unreachable,
            UpdatePayload::OptimizationComplete {
                cache_key: key,
                result: Arc::clone(&result),
            },
        );
        Ok(result)
    }

    /// Run one consolidation scan immediately and return the new alerts.
    pub fn scan_now(&self) -> Vec<OpportunityAlert> {
        self.shared.scan()
    }

    /// Empty the result cache and the recent window; returns entries removed.
    pub fn clear_cache(&self) -> usize {
        let removed = self.shared.cache.clear();
        self.shared.recent.lock().clear();
        self.shared.subscribers.publish(
            UpdatePriority::Low,
            false,
            UpdatePayload::Route(RouteUpdate::CacheCleared { removed }),
        );
        tracing::info!(removed, "result cache cleared");
        removed
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.shared.cache.stats()
    }

    pub fn status(&self) -> ServiceStatus {
        let shared = &self.shared;
        ServiceStatus {
            running: self.is_running(),
            subscriber_count: shared.subscribers.count(),
            cache_entry_count: shared.cache.len(),
            subscriber_failures: shared.subscribers.failures(),
            scans_completed: shared.scans_completed.load(Ordering::Relaxed),
            alerts_emitted: shared.alerts_emitted.load(Ordering::Relaxed),
        }
    }
}
