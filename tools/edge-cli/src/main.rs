//! edge-cache - Command line tool for a persisted offline response cache.
//!
//! Commands:
//! - `edge-cache regions` - List regions with entry counts
//! - `edge-cache inspect` - Show the entries of one region
//! - `edge-cache sweep` - Delete regions from other build versions
//! - `edge-cache fetch` - Run one request through the cache manager
//! - `edge-cache config` - Manage configuration

mod commands;
mod config;
mod context;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use edge_observability::{init_logging, LogFormat, LogLevel};

use commands::{ConfigArgs, FetchArgs, InspectArgs, RegionsArgs, SweepArgs};

/// edge-cache - Inspect and maintain an offline response cache
#[derive(Parser)]
#[command(name = "edge-cache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Cache store directory (overrides the config file)
    #[arg(short, long, global = true)]
    store: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List cache regions
    Regions(RegionsArgs),

    /// Show the entries of a region
    Inspect(InspectArgs),

    /// Delete regions left by other build versions
    Sweep(SweepArgs),

    /// Run a request through the cache manager
    Fetch(FetchArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { LogLevel::Debug } else { LogLevel::Warn };
    let format = if cli.json { LogFormat::Json } else { LogFormat::Human };
    init_logging(format, level)?;

    let output = output::Output::new(cli.verbose, cli.json);
    let ctx = context::Context::load(cli.config.as_deref(), cli.store.as_deref(), output)?;

    let result = match cli.command {
        Commands::Regions(args) => commands::regions::run(args, &ctx).await,
        Commands::Inspect(args) => commands::inspect::run(args, &ctx).await,
        Commands::Sweep(args) => commands::sweep::run(args, &ctx).await,
        Commands::Fetch(args) => commands::fetch::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
