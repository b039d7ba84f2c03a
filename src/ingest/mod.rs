// src/ingest/mod.rs
pub mod dedup;
pub mod error;
pub mod http;
pub mod normalize;
pub mod providers;
pub mod shuffle;
pub mod slug;
pub mod tags;
pub mod types;
pub mod url_norm;

use crate::config::sources::sources_for;
use crate::config::AggregatorConfig;
use crate::ingest::dedup::DedupSet;
use crate::ingest::http::HttpFetch;
use crate::ingest::normalize::{normalize_item, Candidate, NormalizeCtx};
use crate::ingest::providers::{fetch_source, FetchOptions};
use crate::ingest::tags::{TagClassifier, TagContext};
use crate::ingest::types::{CanonicalRecord, ContentKind, SourceDescriptor};
use futures::StreamExt;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Raw items asked from a source per run. Known items are skipped before
/// the per-source limit counts, so strategies read past the limit.
const MIN_RAW_WINDOW: usize = 50;

fn raw_window(per_source_limit: usize) -> usize {
    if per_source_limit == 0 {
        0
    } else {
        per_source_limit.max(MIN_RAW_WINDOW)
    }
}

/// One-time metrics registration (so series show up in the exposition).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_events_total", "Raw items returned by fetch strategies.");
        describe_counter!("ingest_kept_total", "Records kept after dedup.");
        describe_counter!(
            "ingest_dedup_total",
            "Records dropped because their normalized key was already known."
        );
        describe_counter!(
            "ingest_dropped_total",
            "Raw items dropped during normalization (no usable dedup key)."
        );
        describe_counter!(
            "ingest_provider_errors_total",
            "Source fetch/parse errors, labelled by kind."
        );
        describe_histogram!("ingest_fetch_ms", "Per-source fetch time in milliseconds.");
        describe_histogram!("ingest_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when an aggregation run last finished."
        );
    });
}

/// Clean markup-ish text: decode entities, strip tags, fold whitespace,
/// cap at `max_chars` characters.
pub fn clean_text(s: &str, max_chars: usize) -> String {
    let decoded = html_escape::decode_html_entities(s);

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)<[^>]*>").unwrap());
    let stripped = re_tags.replace_all(&decoded, " ");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    let out = re_ws.replace_all(&stripped, " ");
    let out = out.trim();

    if out.chars().count() > max_chars {
        out.chars().take(max_chars).collect::<String>().trim_end().to_string()
    } else {
        out.to_string()
    }
}

/// Counters for one run, also logged as the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub sources: usize,
    pub failed_sources: usize,
    pub fetched: usize,
    /// Raw items without a usable dedup key.
    pub dropped: usize,
    pub duplicates: usize,
    /// Records left unread once their source reached its limit.
    pub over_limit: usize,
    /// Accepted before truncation to the total limit.
    pub accepted: usize,
    pub returned: usize,
}

/// What one source contributes to the reducer.
struct SourceBatch<'a> {
    source: &'a str,
    failed: bool,
    fetched: usize,
    dropped: usize,
    records: Vec<CanonicalRecord>,
}

/// Owns the HTTP context, the tag rules and the source registry.
/// Holds no state between runs.
pub struct Aggregator {
    http: Arc<dyn HttpFetch>,
    classifier: Arc<TagClassifier>,
    registry: Vec<SourceDescriptor>,
    cfg: AggregatorConfig,
}

impl Aggregator {
    pub fn new(
        http: Arc<dyn HttpFetch>,
        classifier: Arc<TagClassifier>,
        registry: Vec<SourceDescriptor>,
        cfg: AggregatorConfig,
    ) -> Self {
        Self {
            http,
            classifier,
            registry,
            cfg,
        }
    }

    pub fn registry(&self) -> &[SourceDescriptor] {
        &self.registry
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.cfg
    }

    /// Enabled sources of `kind`, default per-source limit for `kind`.
    pub async fn aggregate<I, S>(
        &self,
        kind: ContentKind,
        total_limit: usize,
        existing_keys: I,
    ) -> Vec<CanonicalRecord>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let descriptors = sources_for(&self.registry, kind);
        let per_source = self.cfg.per_source_limit(kind);
        self.run(&descriptors, per_source, total_limit, existing_keys)
            .await
    }

    pub async fn run<I, S>(
        &self,
        descriptors: &[SourceDescriptor],
        per_source_limit: usize,
        total_limit: usize,
        existing_keys: I,
    ) -> Vec<CanonicalRecord>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.run_with_stats(descriptors, per_source_limit, total_limit, existing_keys)
            .await
            .0
    }

    /// Fetch, normalize and tag sources concurrently; dedup in registry
    /// order in a single reducer, taking at most `per_source_limit` new
    /// records per source; sort newest first (stable) and truncate.
    pub async fn run_with_stats<I, S>(
        &self,
        descriptors: &[SourceDescriptor],
        per_source_limit: usize,
        total_limit: usize,
        existing_keys: I,
    ) -> (Vec<CanonicalRecord>, RunStats)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        ensure_metrics_described();

        let now = chrono::Utc::now();
        let mut dedup = DedupSet::new_run(existing_keys);
        let mut stats = RunStats {
            sources: descriptors.len(),
            ..Default::default()
        };

        // `buffered` yields in input order, which keeps dedup in registry order.
        let batches = futures::stream::iter(descriptors)
            .map(|src| self.process_source(src, raw_window(per_source_limit), now))
            .buffered(self.cfg.concurrency.max(1));
        let mut batches = std::pin::pin!(batches);

        let mut out = Vec::new();
        while let Some(batch) = batches.next().await {
            stats.fetched += batch.fetched;
            stats.dropped += batch.dropped;
            if batch.failed {
                stats.failed_sources += 1;
            }
            let mut taken = 0usize;
            let mut records = batch.records.into_iter();
            for rec in records.by_ref() {
                if taken >= per_source_limit {
                    stats.over_limit += 1;
                    break;
                }
                if dedup.try_accept(&rec) {
                    taken += 1;
                    out.push(rec);
                } else {
                    stats.duplicates += 1;
                    tracing::debug!(
                        target: "ingest",
                        source = batch.source,
                        key = rec.dedup_key(),
                        "duplicate skipped"
                    );
                }
            }
            stats.over_limit += records.len();
        }
        stats.accepted = out.len();

        // Stable: equal timestamps keep registry order.
        out.sort_by(|a, b| b.timestamp().cmp(&a.timestamp()));
        out.truncate(total_limit);
        stats.returned = out.len();

        counter!("ingest_kept_total").increment(stats.accepted as u64);
        counter!("ingest_dedup_total").increment(stats.duplicates as u64);
        counter!("ingest_dropped_total").increment(stats.dropped as u64);
        gauge!("ingest_pipeline_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

        tracing::info!(
            target: "ingest",
            sources = stats.sources,
            failed_sources = stats.failed_sources,
            fetched = stats.fetched,
            dropped = stats.dropped,
            duplicates = stats.duplicates,
            over_limit = stats.over_limit,
            kept = stats.returned,
            "aggregation run finished"
        );

        (out, stats)
    }

    async fn process_source<'a>(
        &self,
        src: &'a SourceDescriptor,
        limit: usize,
        now: chrono::DateTime<chrono::Utc>,
    ) -> SourceBatch<'a> {
        let opts = FetchOptions {
            timeout: self.cfg.timeout_for(src.strategy_kind()),
            user_agent: &self.cfg.user_agent,
        };
        let outcome = fetch_source(self.http.as_ref(), src, limit, opts).await;
        let fetched = outcome.items.len();

        let ctx = NormalizeCtx {
            source: src,
            now,
            summary_max_chars: self.cfg.summary_max_chars,
        };
        let mut dropped = 0usize;
        let mut records = Vec::with_capacity(fetched);
        for raw in outcome.items {
            match normalize_item(raw, &ctx) {
                Some(c) => records.push(self.tag(c, src)),
                None => {
                    dropped += 1;
                    tracing::debug!(target: "ingest", source = %src.name, "item without dedup key dropped");
                }
            }
        }

        SourceBatch {
            source: &src.name,
            failed: outcome.error.is_some(),
            fetched,
            dropped,
            records,
        }
    }

    /// Classifier tags plus the source's static tags. The generic fallback
    /// only stays when nothing else applies.
    fn tag(&self, candidate: Candidate, src: &SourceDescriptor) -> CanonicalRecord {
        let Candidate {
            mut record,
            tag_hints,
        } = candidate;

        let mut tags = {
            let (title, body) = record.classify_text();
            let body = if tag_hints.is_empty() {
                body.to_string()
            } else {
                format!("{} {}", body, tag_hints.join(" "))
            };
            self.classifier.classify(
                title,
                &body,
                TagContext {
                    kind: src.kind,
                    source: Some(&src.name),
                },
            )
        };

        let only_fallback = tags.len() == 1 && tags.contains(self.classifier.fallback());
        if only_fallback && !src.static_tags.is_empty() {
            tags.clear();
        }
        tags.extend(src.static_tags.iter().cloned());
        *record.tags_mut() = tags;
        record
    }
}
