//! Configuration management commands.

use std::fs;

use anyhow::{bail, Result};

use super::{ConfigArgs, ConfigCommand};
use crate::config::generate_default_config;
use crate::context::{Context, CONFIG_NAMES};

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx).await,
        ConfigCommand::Init {
            origin,
            build_version,
            force,
        } => init_config(&origin, &build_version, force, ctx).await,
        ConfigCommand::Validate => validate_config(ctx).await,
    }
}

async fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match ctx.config_file {
        Some(ref path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }

    let cache = &ctx.config.cache;
    ctx.output.info("");
    ctx.output.info("[cache]");
    ctx.output.kv("build_version", &cache.build_version);
    ctx.output.kv("origin", &cache.origin);
    ctx.output.kv("sensitive_prefixes", &cache.sensitive_prefixes.join(", "));
    ctx.output.kv("api_prefix", &cache.api_prefix);
    ctx.output.kv("fonts_prefix", &cache.fonts_prefix);
    ctx.output.kv("ttl_ms", &cache.ttl_ms.to_string());
    ctx.output.kv("precache_list", &cache.precache_list.join(", "));

    ctx.output.info("");
    ctx.output.info("[cache.caps]");
    ctx.output.kv("pages", &cache.caps.pages.to_string());
    ctx.output.kv("images", &cache.caps.images.to_string());
    ctx.output.kv("api", &cache.caps.api.to_string());

    ctx.output.info("");
    ctx.output.info("[store]");
    ctx.output.kv("dir", &ctx.store_dir().display().to_string());

    Ok(())
}

async fn init_config(origin: &str, build_version: &str, force: bool, ctx: &Context) -> Result<()> {
    let config_path = ctx.cwd.join(CONFIG_NAMES[0]);

    if config_path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let content = generate_default_config(origin, build_version);
    fs::write(&config_path, content)?;

    ctx.output.success(&format!("Created: {}", config_path.display()));

    Ok(())
}

async fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    let mut warnings: Vec<String> = Vec::new();
    let cache = &ctx.config.cache;

    if let Err(e) = cache.validate() {
        bail!("Invalid configuration: {}", e);
    }

    if cache.sensitive_prefixes.is_empty() {
        warnings.push("sensitive_prefixes is empty; every route may be cached".to_string());
    }
    if cache.precache_list.is_empty() {
        warnings.push("precache_list is empty; offline navigation has no fallback page".to_string());
    }
    for path in &cache.precache_list {
        if let Err(e) = cache.resolve(path) {
            warnings.push(format!("precache path '{}' does not resolve: {}", path, e));
        }
    }

    if warnings.is_empty() {
        ctx.output.success("Configuration is valid");
        return Ok(());
    }

    for warning in &warnings {
        ctx.output.warn(&format!("Warning: {}", warning));
    }
    ctx.output.success("Configuration is valid (with warnings)");

    Ok(())
}
