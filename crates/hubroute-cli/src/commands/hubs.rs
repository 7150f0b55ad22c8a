//! `hubs`: rank candidate hubs for an origin/destination pair.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use hubroute_lib::{rank_hubs, DetourTolerance, HubCandidate, PointRole};

use super::CommandContext;
use crate::args::{parse_tolerance, PointArg};
use crate::output::{self, OutputFormat};

#[derive(Debug, Clone, Args)]
pub struct HubsArgs {
    #[arg(long = "from")]
    pub from: PointArg,
    #[arg(long = "to")]
    pub to: PointArg,
    /// Candidate hub as LAT,LON[,LABEL]; repeat for several.
    #[arg(long = "hub", required = true)]
    pub hubs: Vec<PointArg>,
    /// Tolerance used to mark candidates accepted or rejected.
    #[arg(long, value_parser = parse_tolerance)]
    pub tolerance: Option<DetourTolerance>,
}

#[derive(Debug, Serialize)]
struct RankedHub<'a> {
    #[serde(flatten)]
    candidate: &'a HubCandidate,
    accepted: bool,
}

pub fn handle_hubs(ctx: &CommandContext, args: &HubsArgs) -> Result<()> {
    let origin = args.from.clone().into_point(PointRole::Origin);
    let destination = args.to.clone().into_point(PointRole::Destination);
    origin.validate("from")?;
    destination.validate("to")?;
    let hubs: Vec<_> = args
        .hubs
        .iter()
        .cloned()
        .map(|h| h.into_point(PointRole::Hub))
        .collect();
    for (idx, hub) in hubs.iter().enumerate() {
        hub.validate(&format!("hub[{idx}]"))?;
    }

    let tolerance = args
        .tolerance
        .unwrap_or(ctx.config.optimizer.detour_tolerance);
    let ranked = rank_hubs(&origin, &destination, &hubs);

    match ctx.format {
        OutputFormat::Json => {
            let rows: Vec<RankedHub<'_>> = ranked
                .iter()
                .map(|candidate| RankedHub {
                    candidate,
                    accepted: candidate.detour_ratio <= tolerance.value(),
                })
                .collect();
            println!("{}", output::to_json(&rows)?);
        }
        OutputFormat::Text => print!(
            "{}",
            output::render_hubs(&origin, &destination, &ranked, tolerance, &ctx.palette)
        ),
    }
    Ok(())
}
