//! `cost`: price a distance for a vehicle class.

use anyhow::{bail, Result};
use clap::Args;

use hubroute_lib::VehicleClass;

use super::CommandContext;
use crate::output::{self, CostReport, OutputFormat};

#[derive(Debug, Clone, Args)]
pub struct CostArgs {
    /// Distance in kilometres.
    #[arg(long)]
    pub distance: f64,
    #[arg(long, default_value = "truck")]
    pub vehicle: VehicleClass,
}

pub fn handle_cost(ctx: &CommandContext, args: &CostArgs) -> Result<()> {
    if !args.distance.is_finite() || args.distance < 0.0 {
        bail!("--distance must be a non-negative number, got {}", args.distance);
    }
    let table = &ctx.config.cost;
    let report = CostReport {
        distance_km: args.distance,
        vehicle: args.vehicle,
        duration_min: table.drive_minutes(args.distance, args.vehicle),
        cost: table.cost_of(args.distance, args.vehicle),
    };

    match ctx.format {
        OutputFormat::Json => println!("{}", output::to_json(&report)?),
        OutputFormat::Text => print!("{}", output::render_cost_report(&report)),
    }
    Ok(())
}
