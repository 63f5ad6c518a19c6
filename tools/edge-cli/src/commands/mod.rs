//! CLI command implementations.

pub mod config;
pub mod fetch;
pub mod inspect;
pub mod regions;
pub mod sweep;

use clap::{Args, Subcommand};

/// Arguments for the regions command.
#[derive(Args)]
pub struct RegionsArgs {
    /// Only list regions from other build versions.
    #[arg(long)]
    pub stale: bool,
}

/// Arguments for the inspect command.
#[derive(Args)]
pub struct InspectArgs {
    /// Region name (e.g. `pages-v4`) or logical name (e.g. `pages`).
    pub region: String,

    /// Show only the first N entries.
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Arguments for the sweep command.
#[derive(Args)]
pub struct SweepArgs {
    /// Version to keep (default: configured build version).
    #[arg(long)]
    pub keep: Option<String>,

    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,

    /// Dry run (list what would be deleted).
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the fetch command.
#[derive(Args)]
pub struct FetchArgs {
    /// Absolute URL or site-relative path.
    pub url: String,

    /// HTTP method.
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,

    /// Declared resource type (script, style, image, document).
    #[arg(short = 't', long = "type")]
    pub resource_type: Option<String>,

    /// Treat the request as a top-level navigation.
    #[arg(short, long)]
    pub navigate: bool,

    /// Simulate a network outage.
    #[arg(long)]
    pub offline: bool,

    /// Transport timeout in seconds.
    #[arg(long, default_value = "30")]
    pub timeout: u64,

    /// Print the response body.
    #[arg(short, long)]
    pub body: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Origin the cache serves.
        #[arg(long, default_value = "http://localhost")]
        origin: String,

        /// Build version.
        #[arg(long, default_value = "v1")]
        build_version: String,

        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}
