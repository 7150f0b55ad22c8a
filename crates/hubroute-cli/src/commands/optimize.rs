//! `optimize`: plan one route.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;

use hubroute_lib::{
    DetourTolerance, OptimizationRequest, PointRole, RouteConstraints, RouteOptimizer,
    VehicleClass,
};

use super::CommandContext;
use crate::args::{parse_tolerance, PointArg};
use crate::output::{self, OutputFormat};

#[derive(Debug, Clone, Args)]
pub struct OptimizeArgs {
    /// Origin as LAT,LON[,LABEL].
    #[arg(long = "from")]
    pub from: PointArg,
    /// Destination as LAT,LON[,LABEL].
    #[arg(long = "to")]
    pub to: PointArg,
    /// Candidate hub as LAT,LON[,LABEL]; repeat for several.
    #[arg(long = "hub")]
    pub hubs: Vec<PointArg>,
    /// Vehicle class: truck, van or car.
    #[arg(long, default_value = "truck")]
    pub vehicle: VehicleClass,
    /// Maximum route distance in kilometres.
    #[arg(long)]
    pub max_distance: Option<f64>,
    /// Maximum route duration in minutes.
    #[arg(long)]
    pub max_duration: Option<f64>,
    #[arg(long)]
    pub avoid_tolls: bool,
    #[arg(long)]
    pub avoid_highways: bool,
    /// Departure date (YYYY-MM-DD) for seasonal risk.
    #[arg(long)]
    pub departure: Option<NaiveDate>,
    /// Hub detour tolerance: strict, relaxed or a ratio such as 1.2.
    #[arg(long, value_parser = parse_tolerance)]
    pub tolerance: Option<DetourTolerance>,
}

impl OptimizeArgs {
    pub fn to_request(&self) -> OptimizationRequest {
        let mut request = OptimizationRequest::new(
            self.from.clone().into_point(PointRole::Origin),
            self.to.clone().into_point(PointRole::Destination),
            self.vehicle,
        )
        .with_hubs(self.hubs.iter().cloned().map(|h| h.into_point(PointRole::Hub)))
        .with_constraints(RouteConstraints {
            max_distance_km: self.max_distance,
            max_duration_min: self.max_duration,
            avoid_tolls: self.avoid_tolls,
            avoid_highways: self.avoid_highways,
        });
        if let Some(date) = self.departure {
            request = request.with_departure(date);
        }
        request
    }
}

pub fn handle_optimize(ctx: &CommandContext, args: &OptimizeArgs) -> Result<()> {
    let mut optimizer_config = ctx.config.optimizer.clone();
    if let Some(tolerance) = args.tolerance {
        optimizer_config.detour_tolerance = tolerance;
    }
    let optimizer = RouteOptimizer::new(optimizer_config, ctx.config.cost.clone())
        .context("invalid optimiser configuration")?;

    let request = args.to_request();
    let result = optimizer
        .optimize(&request)
        .context("failed to optimise route")?;

    match ctx.format {
        OutputFormat::Json => println!("{}", output::to_json(&result)?),
        OutputFormat::Text => print!("{}", output::render_result(&result, &ctx.palette)),
    }
    Ok(())
}
