//! Engine-wide configuration.
//!
//! Every section has defaults, so a JSON file only needs the keys it changes:
//!
//! ```json
//! { "cost": { "fuel_price_per_liter": 25500.0 },
//!   "service": { "scan_interval": 10.0 } }
//! ```
//!
//! Durations are written in seconds.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::cost::CostTable;
use crate::error::{Error, Result};
use crate::hub::DetourTolerance;
use crate::optimizer::{OptimizerConfig, RouteOptimizer};
use crate::realtime::{RealTimeOptimizationService, ServiceConfig};

pub const ENV_FUEL_PRICE: &str = "HUBROUTE_FUEL_PRICE";
pub const ENV_DETOUR_TOLERANCE: &str = "HUBROUTE_DETOUR_TOLERANCE";
pub const ENV_CACHE_MAX_ENTRIES: &str = "HUBROUTE_CACHE_MAX_ENTRIES";
pub const ENV_CACHE_TTL_SECS: &str = "HUBROUTE_CACHE_TTL_SECS";
pub const ENV_SCAN_INTERVAL_SECS: &str = "HUBROUTE_SCAN_INTERVAL_SECS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cost: CostTable,
    pub optimizer: OptimizerConfig,
    pub cache: CacheConfig,
    pub service: ServiceConfig,
}

impl EngineConfig {
    /// Load a JSON configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| Error::ConfigLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| Error::ConfigLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply `HUBROUTE_*` environment overrides on top of the current values.
    ///
    /// - `HUBROUTE_FUEL_PRICE`: fuel price per litre
    /// - `HUBROUTE_DETOUR_TOLERANCE`: optimiser tolerance (`strict`, `relaxed` or a factor)
    /// - `HUBROUTE_CACHE_MAX_ENTRIES`: result cache capacity
    /// - `HUBROUTE_CACHE_TTL_SECS`: TTL of cached results
    /// - `HUBROUTE_SCAN_INTERVAL_SECS`: background scan period
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    pub(crate) fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<()> {
        if let Some(raw) = lookup(ENV_FUEL_PRICE) {
            self.cost.fuel_price_per_liter = parse_number(ENV_FUEL_PRICE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DETOUR_TOLERANCE) {
            self.optimizer.detour_tolerance = DetourTolerance::parse(&raw)?;
        }
        if let Some(raw) = lookup(ENV_CACHE_MAX_ENTRIES) {
            self.cache.max_entries = raw.trim().parse().map_err(|_| {
                Error::validation(ENV_CACHE_MAX_ENTRIES, format!("expected an integer, got {raw:?}"))
            })?;
        }
        if let Some(raw) = lookup(ENV_CACHE_TTL_SECS) {
            let ttl = parse_secs(ENV_CACHE_TTL_SECS, &raw)?;
            self.cache.default_ttl = ttl;
            self.service.result_ttl = ttl;
        }
        if let Some(raw) = lookup(ENV_SCAN_INTERVAL_SECS) {
            self.service.scan_interval = parse_secs(ENV_SCAN_INTERVAL_SECS, &raw)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.cost.validate()?;
        self.optimizer.validate()?;
        self.cache.validate()?;
        self.service.validate()
    }

    /// Optimiser built from the `cost` and `optimizer` sections.
    pub fn build_optimizer(&self) -> Result<RouteOptimizer> {
        RouteOptimizer::new(self.optimizer.clone(), self.cost.clone())
    }

    /// Stopped service on the current tokio runtime.
    pub fn build_service(&self) -> Result<RealTimeOptimizationService> {
        RealTimeOptimizationService::new(
            self.build_optimizer()?,
            self.cache.clone(),
            self.service.clone(),
        )
    }
}

fn parse_number(field: &str, raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::validation(field, format!("expected a number, got {raw:?}")))
}

fn parse_secs(field: &str, raw: &str) -> Result<Duration> {
    let secs = parse_number(field, raw)?;
    Duration::try_from_secs_f64(secs)
        .map_err(|_| Error::validation(field, format!("expected non-negative seconds, got {raw:?}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"cost": {{"fuel_price_per_liter": 25500.0}}, "service": {{"scan_interval": 10.0}}}}"#
        )
        .unwrap();

        let config = EngineConfig::from_path(file.path()).unwrap();
        assert_eq!(config.cost.fuel_price_per_liter, 25_500.0);
        assert_eq!(config.service.scan_interval, Duration::from_secs(10));
        assert_eq!(config.service.result_ttl, Duration::from_secs(300));
        assert_eq!(config.cache, CacheConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_file_is_config_load_error() {
        let err = EngineConfig::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, Error::ConfigLoad { .. }));
    }

    #[test]
    fn malformed_file_is_config_load_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = EngineConfig::from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("failed to load configuration"));
    }

    #[test]
    fn overrides_apply_and_validate() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_FUEL_PRICE, "26000"),
            (ENV_DETOUR_TOLERANCE, "relaxed"),
            (ENV_CACHE_MAX_ENTRIES, "50"),
            (ENV_CACHE_TTL_SECS, "90"),
            (ENV_SCAN_INTERVAL_SECS, "5"),
        ]);
        let mut config = EngineConfig::default();
        config
            .apply_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.cost.fuel_price_per_liter, 26_000.0);
        assert_eq!(config.optimizer.detour_tolerance, DetourTolerance::RELAXED);
        assert_eq!(config.cache.max_entries, 50);
        assert_eq!(config.service.result_ttl, Duration::from_secs(90));
        assert_eq!(config.service.scan_interval, Duration::from_secs(5));
    }

    #[test]
    fn bad_override_names_variable() {
        let mut config = EngineConfig::default();
        let err = config
            .apply_overrides(|name| (name == ENV_CACHE_MAX_ENTRIES).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_CACHE_MAX_ENTRIES));
    }

    #[test]
    fn build_service_requires_runtime() {
        let err = EngineConfig::default().build_service().unwrap_err();
        assert!(matches!(err, Error::RuntimeUnavailable));
    }
}
