//! List cache regions.

use anyhow::{Context as _, Result};
use edge_cache::{is_stale_region, version_suffix, Region, RegionStore};
use serde::Serialize;

use super::RegionsArgs;
use crate::context::Context;
use crate::output::region_badge;

#[derive(Debug, Serialize)]
struct RegionRow {
    name: String,
    version: Option<String>,
    entries: usize,
    stale: bool,
}

/// Run the regions command.
pub async fn run(args: RegionsArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store().await?;
    let current = &ctx.config.cache.build_version;

    let names = store
        .list_regions()
        .await
        .context("Failed to list regions")?;

    let mut rows = Vec::new();
    for name in names {
        let stale = is_stale_region(&name, current);
        if args.stale && !stale {
            continue;
        }
        let entries = Region::new(store.clone(), name.as_str())
            .len()
            .await
            .with_context(|| format!("Failed to read region: {}", name))?;
        rows.push(RegionRow {
            version: version_suffix(&name).map(str::to_string),
            name,
            entries,
            stale,
        });
    }

    if ctx.output.is_json() {
        ctx.output.json(&rows);
        return Ok(());
    }

    ctx.output.header(&format!(
        "Regions in {} (current version: {})",
        ctx.store_dir().display(),
        current
    ));

    if rows.is_empty() {
        ctx.output.info("No regions found");
        return Ok(());
    }

    let widths = [20, 10, 8, 8];
    ctx.output.table_row(&["REGION", "VERSION", "ENTRIES", "STATE"], &widths);
    for row in &rows {
        let entries = row.entries.to_string();
        let badge = region_badge(row.stale);
        ctx.output.table_row(
            &[
                row.name.as_str(),
                row.version.as_deref().unwrap_or("-"),
                entries.as_str(),
                badge.as_str(),
            ],
            &widths,
        );
    }

    let stale = rows.iter().filter(|r| r.stale).count();
    if stale > 0 {
        ctx.output.warn(&format!(
            "{} stale region(s). Run `edge-cache sweep` to delete them.",
            stale
        ));
    }

    Ok(())
}
