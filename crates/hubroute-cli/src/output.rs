//! Rendering of library results as text or JSON.

use std::fmt::Write as _;

use clap::ValueEnum;
use serde::Serialize;

use hubroute_lib::{
    CostBreakdown, DetourTolerance, HubCandidate, OptimizationResult, Point, PointRole,
    RiskLevel, ServiceStatus, Update, UpdatePayload, UpdatePriority, VehicleClass,
};

use crate::terminal::{format_money, ColorPalette};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

/// Serialize `value` as pretty JSON.
pub fn to_json<T: Serialize>(value: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn name(point: &Point) -> String {
    if point.label().is_empty() {
        format!("{:.4},{:.4}", point.latitude(), point.longitude())
    } else {
        point.label().to_string()
    }
}

fn risk_color(risk: RiskLevel, palette: &ColorPalette) -> &'static str {
    match risk {
        RiskLevel::Low => palette.green,
        RiskLevel::Medium => palette.yellow,
        RiskLevel::High => palette.red,
    }
}

/// Minutes as `XhYYm`.
pub fn format_duration(minutes: f64) -> String {
    let total = minutes.max(0.0).round() as u64;
    format!("{}h{:02}m", total / 60, total % 60)
}

pub fn render_cost(cost: &CostBreakdown) -> String {
    format!(
        "{} VND (fuel {}, tolls {}, labor {})",
        format_money(cost.total),
        format_money(cost.fuel),
        format_money(cost.tolls),
        format_money(cost.labor)
    )
}

pub fn render_result(result: &OptimizationResult, palette: &ColorPalette) -> String {
    let p = palette;
    let mut out = String::new();

    let path: Vec<String> = result
        .waypoints()
        .iter()
        .map(|wp| match wp.role() {
            PointRole::Hub => format!("{}{}{} (hub)", p.cyan, name(wp), p.reset),
            _ => format!("{}{}{}", p.white_bold, name(wp), p.reset),
        })
        .collect();
    let _ = writeln!(out, "Route: {}", path.join(" -> "));

    let _ = writeln!(
        out,
        "  distance: {:.1} km {}(direct {:.1} km){}",
        result.distance_km(),
        p.gray,
        result.direct_distance_km(),
        p.reset
    );
    if let Some(hub) = result.hub() {
        let _ = writeln!(out, "  via hub: {}", name(hub));
    }
    let _ = writeln!(out, "  duration: {}", format_duration(result.duration_min()));
    let _ = writeln!(out, "  cost: {}", render_cost(result.cost()));
    let risk = result.risk_level();
    let _ = writeln!(out, "  risk: {}{}{}", risk_color(risk, p), risk, p.reset);
    let _ = writeln!(out, "  quality: {:.1}/100", result.quality_score());

    if !result.unreachable().is_empty() {
        let _ = writeln!(out, "{}Limits exceeded:{}", p.red, p.reset);
        for limit in result.unreachable() {
            let _ = writeln!(
                out,
                "  - {}: {:.1} > {:.1}",
                limit.limit, limit.actual, limit.limit_value
            );
        }
    }

    if !result.recommendations().is_empty() {
        let _ = writeln!(out, "Recommendations:");
        for line in result.recommendations() {
            let _ = writeln!(out, "  - {line}");
        }
    }
    out
}

pub fn render_hubs(
    origin: &Point,
    destination: &Point,
    ranked: &[HubCandidate],
    tolerance: DetourTolerance,
    palette: &ColorPalette,
) -> String {
    let p = palette;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Hubs for {} -> {} (tolerance {}):",
        name(origin),
        name(destination),
        tolerance
    );
    if ranked.is_empty() {
        let _ = writeln!(out, "  (no candidates)");
        return out;
    }
    for (idx, candidate) in ranked.iter().enumerate() {
        let accepted = candidate.detour_ratio <= tolerance.value();
        let (color, verdict) = if accepted {
            (p.green, "accepted")
        } else {
            (p.red, "rejected")
        };
        let _ = writeln!(
            out,
            "  {}. {} {:.1} km (x{:.3}) {}{}{}",
            idx + 1,
            name(&candidate.hub),
            candidate.via_distance_km,
            candidate.detour_ratio,
            color,
            verdict,
            p.reset
        );
    }
    out
}

/// Cost command output, shared by both formats.
#[derive(Debug, Serialize)]
pub struct CostReport {
    pub distance_km: f64,
    pub vehicle: VehicleClass,
    pub duration_min: f64,
    pub cost: CostBreakdown,
}

pub fn render_cost_report(report: &CostReport) -> String {
    format!(
        "{} for {:.1} km: {}\n  duration: {}\n",
        report.vehicle,
        report.distance_km,
        render_cost(&report.cost),
        format_duration(report.duration_min)
    )
}

/// One line per update.
pub fn render_update(update: &Update, palette: &ColorPalette) -> String {
    let p = palette;
    let color = match update.priority {
        UpdatePriority::Low => p.gray,
        UpdatePriority::Medium => p.reset,
        UpdatePriority::High => p.green,
        UpdatePriority::Critical => p.red,
    };
    let detail = match &update.payload {
        UpdatePayload::Route(hubroute_lib::RouteUpdate::CacheHit { result, .. }) => {
            format!("cache hit ({:.1} km)", result.distance_km())
        }
        UpdatePayload::Route(hubroute_lib::RouteUpdate::CacheCleared { removed }) => {
            format!("cache cleared ({removed} removed)")
        }
        UpdatePayload::OptimizationComplete { result, .. } => format!(
            "optimised {} ({:.1} km, quality {:.1})",
            result
                .waypoints()
                .iter()
                .map(name)
                .collect::<Vec<_>>()
                .join(" -> "),
            result.distance_km(),
            result.quality_score()
        ),
        UpdatePayload::OpportunityAlert(alert) => format!(
            "{} opportunity at {} (saves {:.1} km)",
            alert.kind,
            name(&alert.hub),
            alert.estimated_savings_km
        ),
    };
    let action = if update.action_required {
        " [action required]"
    } else {
        ""
    };
    format!(
        "#{} {}{}{} {}: {}{}",
        update.sequence,
        color,
        update.priority,
        p.reset,
        update.kind(),
        detail,
        action
    )
}

pub fn render_status(status: &ServiceStatus) -> String {
    format!(
        "scans: {}, alerts: {}, cached results: {}, subscriber failures: {}",
        status.scans_completed,
        status.alerts_emitted,
        status.cache_entry_count,
        status.subscriber_failures
    )
}
