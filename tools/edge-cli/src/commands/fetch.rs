//! Run one request through the cache manager.

use std::time::Duration;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use edge_cache::CacheManager;
use edge_core::{RequestDescriptor, ResourceType, ResponseEntry};
use edge_data::{FetchError, Fetcher, HttpFetcher, TimeoutConfig};
use http::Method;
use serde::Serialize;

use super::FetchArgs;
use crate::context::Context;
use crate::output::format_bytes;

/// Fetcher that behaves like a disconnected network.
struct OfflineFetcher;

#[async_trait]
impl Fetcher for OfflineFetcher {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseEntry, FetchError> {
        Err(FetchError::Offline(request.url().to_string()))
    }
}

#[derive(Debug, Serialize)]
struct FetchReport {
    key: String,
    classification: String,
    status: String,
    http_status: u16,
    region: Option<String>,
    size: usize,
    headers: Vec<(String, String)>,
}

/// Run the fetch command.
pub async fn run(args: FetchArgs, ctx: &Context) -> Result<()> {
    let request = build_request(&args, ctx)?;
    tracing::debug!(key = %request.identity_key(), "built request");

    let online;
    let fetcher: &dyn Fetcher = if args.offline {
        &OfflineFetcher
    } else {
        let timeouts = TimeoutConfig::from_total(Duration::from_secs(args.timeout));
        online = HttpFetcher::with_timeouts(timeouts).context("Failed to build HTTP client")?;
        &online
    };

    let store = ctx.open_store().await?;
    let spinner = ctx.output.spinner("Starting cache manager...");
    let (manager, startup) = CacheManager::builder(ctx.config.cache.clone(), store)
        .start(fetcher)
        .await
        .context("Invalid cache configuration")?;
    spinner.finish_and_clear();

    for (path, reason) in &startup.precache.failed {
        ctx.output.warn(&format!("Precache failed for {}: {}", path, reason));
    }
    if !startup.sweep.deleted.is_empty() {
        ctx.output.debug(&format!(
            "Swept stale regions: {}",
            startup.sweep.deleted.join(", ")
        ));
    }

    let outcome = manager
        .handle(&request, fetcher)
        .await
        .with_context(|| format!("Request failed: {}", request.identity_key()))?;
    let explain = manager.explain(&outcome);

    let report = FetchReport {
        key: request.identity_key().to_string(),
        classification: outcome.classification.to_string(),
        status: outcome.status.to_string(),
        http_status: outcome.response.status,
        region: outcome.region.clone(),
        size: outcome.response.body.len(),
        headers: explain.to_headers(),
    };

    if ctx.output.is_json() {
        ctx.output.json(&report);
        return Ok(());
    }

    ctx.output.outcome(
        &report.key,
        outcome.status,
        outcome.response.status,
        &outcome.response.status_text,
    );
    ctx.output.kv("size", &format_bytes(report.size as u64));
    for (name, value) in &report.headers {
        ctx.output.kv(name, value);
    }
    if args.body {
        println!();
        println!("{}", outcome.response.body_text());
    }

    Ok(())
}

fn build_request(args: &FetchArgs, ctx: &Context) -> Result<RequestDescriptor> {
    let method: Method = args
        .method
        .to_ascii_uppercase()
        .parse()
        .with_context(|| format!("Invalid method: {}", args.method))?;

    let url = if args.url.starts_with('/') {
        ctx.config
            .cache
            .resolve(&args.url)
            .context("Failed to resolve path against origin")?
    } else {
        args.url
            .parse()
            .with_context(|| format!("Invalid URL: {}", args.url))?
    };

    let mut request = RequestDescriptor::from_url(method, url);
    if let Some(ref resource_type) = args.resource_type {
        let resource_type: ResourceType = resource_type.parse()?;
        request = request.with_resource_type(resource_type);
    }
    if args.navigate {
        request = request.navigate();
    }
    Ok(request)
}
