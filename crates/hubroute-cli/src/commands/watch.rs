//! `watch`: drive the real-time service with a batch of requests.
//!
//! Every request is submitted twice (a miss, then a cache hit), one
//! opportunity scan runs, and every update the service broadcast is printed.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use hubroute_lib::OptimizationRequest;

use super::CommandContext;
use crate::output::{self, OutputFormat};

#[derive(Debug, Clone, Args)]
pub struct WatchArgs {
    /// JSON file holding an array of optimisation requests.
    #[arg(long)]
    pub requests: PathBuf,
}

pub fn load_requests(path: &Path) -> Result<Vec<OptimizationRequest>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read requests from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse requests in {}", path.display()))
}

pub async fn handle_watch(ctx: &CommandContext, args: &WatchArgs) -> Result<()> {
    let requests = load_requests(&args.requests)?;
    let service = ctx
        .config
        .build_service()
        .context("failed to start the real-time service")?;
    let (_subscription, mut updates) = service.subscribe_channel();
    service.start();

    let mut rejected = 0usize;
    for (idx, request) in requests.iter().enumerate() {
        for _ in 0..2 {
            if let Err(err) = service.optimize_with_cache(request) {
                tracing::warn!(request = idx, error = %err, "request rejected");
                eprintln!("request {idx}: {err}");
                rejected += 1;
                break;
            }
        }
    }
    service.scan_now();
    let status = service.status();
    service.stop().await;

    // stop() released the subscription, so the channel ends after the backlog.
    while let Some(update) = updates.recv().await {
        match ctx.format {
            OutputFormat::Json => println!("{}", serde_json::to_string(update.as_ref())?),
            OutputFormat::Text => println!("{}", output::render_update(&update, &ctx.palette)),
        }
    }
    if ctx.format == OutputFormat::Text {
        println!("{}", output::render_status(&status));
    }
    if rejected > 0 {
        bail!("{rejected} of {} requests were rejected", requests.len());
    }
    Ok(())
}
