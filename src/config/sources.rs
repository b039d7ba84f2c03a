// src/config/sources.rs
//! Source registry: static descriptors loaded from TOML.
use crate::ingest::types::{ContentKind, SourceDescriptor, Strategy, StrategyKind};
use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "SOURCES_CONFIG_PATH";
const LOCAL_PATH: &str = "config/sources.toml";
const EMBEDDED_SOURCES_TOML: &str = include_str!("../../config/sources.toml");

pub const YOUTUBE_CHANNEL_FEED: &str = "https://www.youtube.com/feeds/videos.xml?channel_id=";

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    sources: Vec<SourceEntry>,
}

/// One `[[sources]]` table as written by the operator.
#[derive(Debug, Deserialize)]
struct SourceEntry {
    name: String,
    kind: ContentKind,
    strategy: StrategyKind,
    #[serde(default)]
    endpoint: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
    #[serde(default)]
    channel_id: Option<String>,
    #[serde(default)]
    pattern: Option<String>,
    #[serde(default)]
    link_template: Option<String>,
}

fn default_enabled() -> bool {
    true
}

/// Registry shipped with the crate.
pub fn embedded_sources() -> Result<Vec<SourceDescriptor>> {
    parse_sources(EMBEDDED_SOURCES_TOML).context("parsing embedded source registry")
}

/// Load from an explicit path.
pub fn load_sources_from(path: &Path) -> Result<Vec<SourceDescriptor>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading source registry from {}", path.display()))?;
    parse_sources(&content).with_context(|| format!("parsing {}", path.display()))
}

/// Load using env var + fallbacks:
/// 1) $SOURCES_CONFIG_PATH
/// 2) config/sources.toml
/// 3) the embedded registry
pub fn load_sources_default() -> Result<Vec<SourceDescriptor>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        } else {
            return Err(anyhow!("SOURCES_CONFIG_PATH points to non-existent path"));
        }
    }
    let local = PathBuf::from(LOCAL_PATH);
    if local.exists() {
        return load_sources_from(&local);
    }
    embedded_sources()
}

pub fn parse_sources(s: &str) -> Result<Vec<SourceDescriptor>> {
    let file: RegistryFile = toml::from_str(s)?;
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(file.sources.len());
    for entry in file.sources {
        let name = entry.name.trim().to_string();
        if name.is_empty() {
            bail!("source with empty name");
        }
        if !seen.insert(name.to_ascii_lowercase()) {
            bail!("duplicate source name `{name}`");
        }
        let desc = into_descriptor(name.clone(), entry)
            .with_context(|| format!("invalid source `{name}`"))?;
        out.push(desc);
    }
    Ok(out)
}

fn into_descriptor(name: String, e: SourceEntry) -> Result<SourceDescriptor> {
    let endpoint = e
        .endpoint
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let (strategy, endpoint) = match e.strategy {
        StrategyKind::JsonApi => (
            Strategy::JsonApi,
            endpoint.ok_or_else(|| anyhow!("json_api source needs an endpoint"))?,
        ),
        StrategyKind::Feed => {
            let channel_id = e
                .channel_id
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty());
            let endpoint = match (endpoint, &channel_id) {
                (Some(ep), _) => ep,
                (None, Some(id)) => format!("{YOUTUBE_CHANNEL_FEED}{id}"),
                (None, None) => bail!("feed source needs an endpoint or a channel_id"),
            };
            (Strategy::Feed { channel_id }, endpoint)
        }
        StrategyKind::HtmlScrape => {
            let pattern = e
                .pattern
                .ok_or_else(|| anyhow!("html_scrape source needs a pattern"))?;
            let pattern = Regex::new(&pattern).map_err(|err| anyhow!("pattern regex error: {err}"))?;
            if pattern.captures_len() < 2 {
                bail!("pattern must have a capture group for the slug");
            }
            let link_template = e
                .link_template
                .ok_or_else(|| anyhow!("html_scrape source needs a link_template"))?;
            if !link_template.contains("{slug}") {
                bail!("link_template must contain `{{slug}}`");
            }
            (
                Strategy::HtmlScrape {
                    pattern,
                    link_template,
                },
                endpoint.ok_or_else(|| anyhow!("html_scrape source needs an endpoint"))?,
            )
        }
    };

    match (strategy.kind(), e.kind) {
        (StrategyKind::JsonApi, ContentKind::Video) | (StrategyKind::HtmlScrape, ContentKind::Video) => {
            bail!("{:?} cannot produce video records", strategy.kind())
        }
        _ => {}
    }

    let static_tags: BTreeSet<String> = e
        .tags
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    Ok(SourceDescriptor {
        name,
        kind: e.kind,
        endpoint,
        static_tags,
        strategy,
        enabled: e.enabled,
    })
}

/// Enabled sources for one content kind, in registry order.
pub fn sources_for(all: &[SourceDescriptor], kind: ContentKind) -> Vec<SourceDescriptor> {
    all.iter()
        .filter(|s| s.enabled && s.kind == kind)
        .cloned()
        .collect()
}
