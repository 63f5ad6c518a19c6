//! Delete regions from other build versions.

use anyhow::{Context as _, Result};
use dialoguer::Confirm;
use edge_cache::{stale_regions, sweep};

use super::SweepArgs;
use crate::context::Context;

/// Run the sweep command.
pub async fn run(args: SweepArgs, ctx: &Context) -> Result<()> {
    let keep = args
        .keep
        .clone()
        .unwrap_or_else(|| ctx.config.cache.build_version.clone());
    let store = ctx.open_store().await?;

    ctx.output.header(&format!("Sweep (keeping version {})", keep));

    let stale = stale_regions(&*store, &keep)
        .await
        .context("Failed to list regions")?;

    if stale.is_empty() {
        ctx.output.success("No stale regions");
        if ctx.output.is_json() {
            ctx.output.json(&edge_cache::SweepReport::default());
        }
        return Ok(());
    }

    for name in &stale {
        ctx.output.list_item(name);
    }

    if args.dry_run {
        ctx.output.info("Dry run - no changes made");
        if ctx.output.is_json() {
            ctx.output.json(&stale);
        }
        return Ok(());
    }

    if !args.yes && !ctx.output.is_json() {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete {} region(s)?", stale.len()))
            .default(false)
            .interact()?;

        if !confirmed {
            ctx.output.warn("Sweep cancelled");
            return Ok(());
        }
    }

    let spinner = ctx.output.spinner("Deleting stale regions...");
    let report = sweep(&*store, &keep)
        .await
        .context("Failed to sweep regions")?;
    spinner.finish_and_clear();

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    for (name, error) in &report.failed {
        ctx.output.warn(&format!("Could not delete {}: {}", name, error));
    }
    ctx.output.success(&format!("Deleted {} region(s)", report.deleted.len()));

    Ok(())
}
