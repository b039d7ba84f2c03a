// src/ingest/providers/mod.rs
//! Fetch-strategy boundary: every error stops here.
pub mod feed;
pub mod html_scrape;
pub mod json_api;

use metrics::{counter, histogram};
use std::time::Duration;

use crate::ingest::error::FetchError;
use crate::ingest::http::{FetchRequest, HttpFetch};
use crate::ingest::types::{RawItem, SourceDescriptor, Strategy};

/// Transport settings for one source call.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions<'a> {
    pub timeout: Duration,
    pub user_agent: &'a str,
}

/// What one source produced. `error` is set when it produced nothing
/// because of a failure rather than an empty listing.
#[derive(Debug)]
pub struct SourceOutcome {
    pub items: Vec<RawItem>,
    pub error: Option<FetchError>,
}

/// Run the source's strategy under its own timeout. Never fails: errors
/// are logged with the source name and turned into an empty outcome.
pub async fn fetch_source(
    http: &dyn HttpFetch,
    source: &SourceDescriptor,
    limit: usize,
    opts: FetchOptions<'_>,
) -> SourceOutcome {
    let t0 = std::time::Instant::now();
    let res = match tokio::time::timeout(opts.timeout, dispatch(http, source, limit, opts)).await {
        Ok(r) => r,
        Err(_) => Err(FetchError::transient(format!(
            "timed out after {}s",
            opts.timeout.as_secs_f32()
        ))),
    };
    histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

    match res {
        Ok(items) => {
            counter!("ingest_events_total").increment(items.len() as u64);
            tracing::debug!(
                target: "ingest",
                source = %source.name,
                items = items.len(),
                "source fetched"
            );
            SourceOutcome { items, error: None }
        }
        Err(e) => {
            tracing::warn!(
                target: "ingest",
                source = %source.name,
                endpoint = %source.endpoint,
                kind = e.label(),
                error = %e,
                "source failed, contributing no items"
            );
            counter!("ingest_provider_errors_total", "kind" => e.label()).increment(1);
            SourceOutcome {
                items: Vec::new(),
                error: Some(e),
            }
        }
    }
}

async fn dispatch(
    http: &dyn HttpFetch,
    source: &SourceDescriptor,
    limit: usize,
    opts: FetchOptions<'_>,
) -> Result<Vec<RawItem>, FetchError> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let req = FetchRequest {
        url: &source.endpoint,
        timeout: opts.timeout,
        user_agent: Some(opts.user_agent),
    };
    match &source.strategy {
        Strategy::JsonApi => json_api::fetch(http, req, limit).await,
        Strategy::Feed { .. } => feed::fetch(http, req, limit).await,
        Strategy::HtmlScrape {
            pattern,
            link_template,
        } => html_scrape::fetch(http, req, pattern, link_template, limit).await,
    }
}
