use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use hubroute_cli::commands::cost::{handle_cost, CostArgs};
use hubroute_cli::commands::hubs::{handle_hubs, HubsArgs};
use hubroute_cli::commands::optimize::{handle_optimize, OptimizeArgs};
use hubroute_cli::commands::watch::{handle_watch, WatchArgs};
use hubroute_cli::commands::CommandContext;
use hubroute_cli::logging::{init_logging, LoggingConfig};
use hubroute_cli::output::OutputFormat;
use hubroute_lib::EngineConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Hub-aware route optimisation")]
struct Cli {
    /// JSON configuration file; HUBROUTE_* environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Optimise a route between two points, optionally via a hub.
    Optimize(OptimizeArgs),
    /// Rank candidate hubs by via-hub distance.
    Hubs(HubsArgs),
    /// Price a distance for a vehicle class.
    Cost(CostArgs),
    /// Run the real-time service over a batch of requests and print its updates.
    Watch(WatchArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&LoggingConfig::from_env().verbose(cli.verbose));

    let config = load_config(cli.config.as_ref())?;
    let ctx = CommandContext::new(config, cli.format, !cli.no_color);

    match &cli.command {
        Command::Optimize(args) => handle_optimize(&ctx, args),
        Command::Hubs(args) => handle_hubs(&ctx, args),
        Command::Cost(args) => handle_cost(&ctx, args),
        Command::Watch(args) => handle_watch(&ctx, args).await,
    }
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("invalid HUBROUTE_* environment override")?;
    config.validate().context("invalid configuration")?;
    tracing::debug!(?config, "configuration loaded");
    Ok(config)
}
