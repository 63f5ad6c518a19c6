//! Show the entries of one region.

use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use chrono::{DateTime, Utc};
use edge_cache::{captured_at, FreshnessTagger, Region, RegionKind, RegionStore};
use serde::Serialize;

use super::InspectArgs;
use crate::context::Context;
use crate::output::{format_age, format_bytes};

#[derive(Debug, Serialize)]
struct EntryRow {
    key: String,
    status: u16,
    size: usize,
    captured_at: Option<String>,
    age_secs: Option<u64>,
    fresh: Option<bool>,
}

/// Run the inspect command.
pub async fn run(args: InspectArgs, ctx: &Context) -> Result<()> {
    let store = ctx.open_store().await?;
    let name = resolve_region_name(&args.region, &ctx.config.cache.build_version);

    let regions = store.list_regions().await.context("Failed to list regions")?;
    if !regions.contains(&name) {
        bail!("Region not found: {}", name);
    }

    let region = Region::new(store, name.as_str());
    let tagger = FreshnessTagger::default();
    let ttl = ctx.config.cache.ttl();

    let keys = region.keys().await.context("Failed to read region keys")?;
    let total = keys.len();
    let mut rows = Vec::new();
    for key in keys.into_iter().take(args.limit.unwrap_or(usize::MAX)) {
        let Some(entry) = region.get(&key).await? else {
            continue;
        };
        let captured = captured_at(&entry);
        rows.push(EntryRow {
            key: key.as_str().to_string(),
            status: entry.status,
            size: entry.body.len(),
            captured_at: captured
                .and_then(|ms| DateTime::<Utc>::from_timestamp_millis(ms as i64))
                .map(|at| at.to_rfc3339()),
            age_secs: tagger.age(&entry).map(|age| age.as_secs()),
            fresh: captured.map(|_| tagger.is_fresh(&entry, ttl)),
        });
    }

    if ctx.output.is_json() {
        ctx.output.json(&rows);
        return Ok(());
    }

    ctx.output.header(&format!("Region {} ({} entries)", name, total));
    for row in &rows {
        ctx.output.list_item(&row.key);
        ctx.output.kv("status", &row.status.to_string());
        ctx.output.kv("size", &format_bytes(row.size as u64));
        if let (Some(at), Some(age)) = (&row.captured_at, row.age_secs) {
            let freshness = if row.fresh == Some(true) { "fresh" } else { "stale" };
            ctx.output.kv(
                "captured",
                &format!("{} ({} ago, {})", at, format_age(Duration::from_secs(age)), freshness),
            );
        }
    }
    if rows.len() < total {
        ctx.output.info(&format!("... {} more", total - rows.len()));
    }

    Ok(())
}

/// Logical names (`pages`) expand to the current version's region.
fn resolve_region_name(input: &str, version: &str) -> String {
    match RegionKind::from_logical_name(input) {
        Some(kind) => kind.region_name(version),
        None => input.to_string(),
    }
}
