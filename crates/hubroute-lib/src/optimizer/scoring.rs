//! Risk classification, adverse-season windows and route quality scoring.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Distance covered by one risk point beyond the first step.
pub const RISK_DISTANCE_STEP_KM: f64 = 500.0;
/// Points at or above which a route is high risk.
pub const RISK_HIGH_POINTS: u32 = 2;
/// Points at or above which a route is medium risk.
pub const RISK_MEDIUM_POINTS: u32 = 1;

/// Quality deducted for a medium-risk route.
pub const QUALITY_PENALTY_MEDIUM: f64 = 10.0;
/// Quality deducted for a high-risk route.
pub const QUALITY_PENALTY_HIGH: f64 = 25.0;
/// Quality deducted for each violated route constraint.
pub const QUALITY_PENALTY_PER_VIOLATION: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        };
        f.write_str(value)
    }
}

/// A recurring calendar window (inclusive on both ends), e.g. a typhoon season.
///
/// Windows whose end precedes their start wrap across the new year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonWindow {
    pub name: String,
    pub start_month: u32,
    pub start_day: u32,
    pub end_month: u32,
    pub end_day: u32,
}

impl SeasonWindow {
    pub fn new(
        name: impl Into<String>,
        (start_month, start_day): (u32, u32),
        (end_month, end_day): (u32, u32),
    ) -> Self {
        Self {
            name: name.into(),
            start_month,
            start_day,
            end_month,
            end_day,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let day = (date.month(), date.day());
        let start = (self.start_month, self.start_day);
        let end = (self.end_month, self.end_day);
        if start <= end {
            start <= day && day <= end
        } else {
            day >= start || day <= end
        }
    }

    fn validate(&self) -> Result<()> {
        for (month, day, field) in [
            (self.start_month, self.start_day, "start"),
            (self.end_month, self.end_day, "end"),
        ] {
            if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
                return Err(Error::validation(
                    format!("risk.adverse_seasons.{}.{field}", self.name),
                    format!("month/day {month}/{day} is not a calendar date"),
                ));
            }
        }
        Ok(())
    }
}

/// Parameters of the risk heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub distance_step_km: f64,
    pub high_threshold: u32,
    pub medium_threshold: u32,
    pub adverse_seasons: Vec<SeasonWindow>,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            distance_step_km: RISK_DISTANCE_STEP_KM,
            high_threshold: RISK_HIGH_POINTS,
            medium_threshold: RISK_MEDIUM_POINTS,
            adverse_seasons: vec![SeasonWindow::new("typhoon season", (9, 1), (11, 30))],
        }
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.distance_step_km.is_finite() || self.distance_step_km <= 0.0 {
            return Err(Error::validation(
                "risk.distance_step_km",
                format!("must be finite and positive, got {}", self.distance_step_km),
            ));
        }
        if self.medium_threshold > self.high_threshold {
            return Err(Error::validation(
                "risk.medium_threshold",
                "must not exceed risk.high_threshold",
            ));
        }
        for season in &self.adverse_seasons {
            season.validate()?;
        }
        Ok(())
    }

    /// First adverse season containing `date`, if any.
    pub fn season_for(&self, date: NaiveDate) -> Option<&SeasonWindow> {
        self.adverse_seasons.iter().find(|s| s.contains(date))
    }

    /// Risk points for a route.
    ///
    /// One point per started `distance_step_km` beyond the first step, one if a
    /// hub is used, one if departure falls in an adverse season.
    pub fn points(&self, distance_km: f64, hub_used: bool, adverse_season: bool) -> u32 {
        let mut points = 0;
        if distance_km > self.distance_step_km {
            points += ((distance_km - self.distance_step_km) / self.distance_step_km).ceil() as u32;
        }
        if hub_used {
            points += 1;
        }
        if adverse_season {
            points += 1;
        }
        points
    }

    pub fn level(&self, points: u32) -> RiskLevel {
        if points >= self.high_threshold {
            RiskLevel::High
        } else if points >= self.medium_threshold {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Synthetic 0-100 route quality.
///
/// `100 - 100 × (chosen / direct - 1) - risk_penalty - 15 × violations`, clamped
/// to `[0, 100]`, where risk_penalty is 0 / 10 / 25 for low / medium / high.
/// The score never increases as the detour ratio, the risk level or the number
/// of violated constraints grows.
pub fn quality_score(chosen_km: f64, direct_km: f64, risk: RiskLevel, violations: usize) -> f64 {
    let detour_ratio = if direct_km > 0.0 {
        (chosen_km / direct_km).max(1.0)
    } else {
        1.0
    };
    let risk_penalty = match risk {
        RiskLevel::Low => 0.0,
        RiskLevel::Medium => QUALITY_PENALTY_MEDIUM,
        RiskLevel::High => QUALITY_PENALTY_HIGH,
    };

    let score = 100.0
        - 100.0 * (detour_ratio - 1.0)
        - risk_penalty
        - QUALITY_PENALTY_PER_VIOLATION * violations as f64;
    score.clamp(0.0, 100.0)
}
