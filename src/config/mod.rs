// src/config/mod.rs
//! Runtime knobs for the aggregator, read from env with clamped defaults.

pub mod sources;

use crate::ingest::types::{ContentKind, StrategyKind};
use std::time::Duration;

pub const ENV_CONCURRENCY: &str = "AGGREGATOR_CONCURRENCY";
pub const ENV_USER_AGENT: &str = "AGGREGATOR_USER_AGENT";
pub const ENV_JSON_TIMEOUT: &str = "AGGREGATOR_JSON_TIMEOUT_SECS";
pub const ENV_FEED_TIMEOUT: &str = "AGGREGATOR_FEED_TIMEOUT_SECS";
pub const ENV_HTML_TIMEOUT: &str = "AGGREGATOR_HTML_TIMEOUT_SECS";
pub const ENV_SUMMARY_MAX: &str = "AGGREGATOR_SUMMARY_MAX_CHARS";
pub const ENV_LIMIT_ARTICLE: &str = "AGGREGATOR_LIMIT_ARTICLE";
pub const ENV_LIMIT_JOB: &str = "AGGREGATOR_LIMIT_JOB";
pub const ENV_LIMIT_VIDEO: &str = "AGGREGATOR_LIMIT_VIDEO";

/// Some feed hosts reject default client agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Sources fetched at once.
    pub concurrency: usize,
    pub user_agent: String,
    pub json_timeout: Duration,
    pub feed_timeout: Duration,
    /// Scraped pages are slower; keep this the longest.
    pub html_timeout: Duration,
    pub summary_max_chars: usize,
    pub limit_article: usize,
    pub limit_job: usize,
    pub limit_video: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            json_timeout: Duration::from_secs(10),
            feed_timeout: Duration::from_secs(15),
            html_timeout: Duration::from_secs(20),
            summary_max_chars: 1000,
            limit_article: 1,
            limit_job: 5,
            limit_video: 5,
        }
    }
}

impl AggregatorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as `from_env`, with an injectable lookup for tests.
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = Self::default();
        Self {
            concurrency: parse_usize(get(ENV_CONCURRENCY))
                .map(|v| v.clamp(1, 64))
                .unwrap_or(d.concurrency),
            user_agent: get(ENV_USER_AGENT)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or(d.user_agent),
            json_timeout: parse_secs(get(ENV_JSON_TIMEOUT)).unwrap_or(d.json_timeout),
            feed_timeout: parse_secs(get(ENV_FEED_TIMEOUT)).unwrap_or(d.feed_timeout),
            html_timeout: parse_secs(get(ENV_HTML_TIMEOUT)).unwrap_or(d.html_timeout),
            summary_max_chars: parse_usize(get(ENV_SUMMARY_MAX))
                .filter(|v| *v > 0)
                .unwrap_or(d.summary_max_chars),
            limit_article: parse_usize(get(ENV_LIMIT_ARTICLE))
                .filter(|v| *v > 0)
                .unwrap_or(d.limit_article),
            limit_job: parse_usize(get(ENV_LIMIT_JOB))
                .filter(|v| *v > 0)
                .unwrap_or(d.limit_job),
            limit_video: parse_usize(get(ENV_LIMIT_VIDEO))
                .filter(|v| *v > 0)
                .unwrap_or(d.limit_video),
        }
    }

    pub fn timeout_for(&self, strategy: StrategyKind) -> Duration {
        match strategy {
            StrategyKind::JsonApi => self.json_timeout,
            StrategyKind::Feed => self.feed_timeout,
            StrategyKind::HtmlScrape => self.html_timeout,
        }
    }

    pub fn per_source_limit(&self, kind: ContentKind) -> usize {
        match kind {
            ContentKind::Article => self.limit_article,
            ContentKind::Job => self.limit_job,
            ContentKind::Video => self.limit_video,
        }
    }
}

fn parse_usize(raw: Option<String>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
}

// whole seconds, clamped to <1..=120>
fn parse_secs(raw: Option<String>) -> Option<Duration> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .map(|v| Duration::from_secs(v.clamp(1, 120)))
}
