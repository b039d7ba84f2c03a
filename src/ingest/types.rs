// src/ingest/types.rs
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Which canonical record shape (and taxonomy) a source feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Article,
    Job,
    Video,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Article => "article",
            ContentKind::Job => "job",
            ContentKind::Video => "video",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "article" | "articles" | "news" => Ok(ContentKind::Article),
            "job" | "jobs" => Ok(ContentKind::Job),
            "video" | "videos" => Ok(ContentKind::Video),
            other => Err(anyhow::anyhow!("unknown content kind `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    JsonApi,
    Feed,
    HtmlScrape,
}

/// Strategy-specific parameters of a source.
#[derive(Debug, Clone)]
pub enum Strategy {
    JsonApi,
    Feed {
        channel_id: Option<String>,
    },
    HtmlScrape {
        /// First capture group yields the slug.
        pattern: Regex,
        /// Absolute link with a `{slug}` placeholder.
        link_template: String,
    },
}

impl Strategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            Strategy::JsonApi => StrategyKind::JsonApi,
            Strategy::Feed { .. } => StrategyKind::Feed,
            Strategy::HtmlScrape { .. } => StrategyKind::HtmlScrape,
        }
    }
}

/// Immutable description of one external source.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub name: String,
    pub kind: ContentKind,
    pub endpoint: String,
    pub static_tags: BTreeSet<String>,
    pub strategy: Strategy,
    pub enabled: bool,
}

impl SourceDescriptor {
    pub fn strategy_kind(&self) -> StrategyKind {
        self.strategy.kind()
    }
}

/* ----------------------------
Raw items, straight off the wire
---------------------------- */

/// One element of a JSON API array. Field names cover the job-board
/// shape (`position`, `apply_url`, `salary_*`) and the blog-API shape
/// (`title`, `published_at`, `cover_image`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonRawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
    pub description: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub author: Option<String>,
}

/// One RSS `<item>` or Atom `<entry>`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedRawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
    pub summary: Option<String>,
    pub author: Option<String>,
    pub media_content: Option<String>,
    pub media_thumbnail: Option<String>,
    /// First `<link>`/`<enclosure>` whose type is `image/*`.
    pub image_link: Option<String>,
    pub video_id: Option<String>,
    pub categories: Vec<String>,
}

impl FeedRawItem {
    /// media:content, then media:thumbnail, then an image-typed link.
    pub fn best_image(&self) -> Option<&str> {
        [&self.media_content, &self.media_thumbnail, &self.image_link]
            .into_iter()
            .filter_map(|s| s.as_deref())
            .find(|s| !s.trim().is_empty())
    }
}

/// One slug extracted from a scraped HTML page.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlRawItem {
    pub slug: String,
    pub link: String,
    pub title: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawItem {
    Json(JsonRawItem),
    Feed(FeedRawItem),
    Html(HtmlRawItem),
}

/* ----------------------------
Canonical, persistence-ready records
---------------------------- */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub link: String,
    pub summary: String,
    pub source_name: String,
    pub content_kind: ContentKind,
    pub original_published_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub title: String,
    pub company: String,
    pub location: String,
    pub salary: String,
    pub apply_url: String,
    pub tags: BTreeSet<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub title: String,
    pub description: String,
    pub video_url: String,
    pub thumbnail_url: String,
    pub author_channel: String,
    pub published_at: DateTime<Utc>,
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CanonicalRecord {
    Article(Article),
    Job(Job),
    Video(Video),
}

impl CanonicalRecord {
    pub fn kind(&self) -> ContentKind {
        match self {
            CanonicalRecord::Article(_) => ContentKind::Article,
            CanonicalRecord::Job(_) => ContentKind::Job,
            CanonicalRecord::Video(_) => ContentKind::Video,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            CanonicalRecord::Article(a) => &a.title,
            CanonicalRecord::Job(j) => &j.title,
            CanonicalRecord::Video(v) => &v.title,
        }
    }

    /// Un-normalized dedup key (link / applyUrl / videoUrl).
    pub fn dedup_key(&self) -> &str {
        match self {
            CanonicalRecord::Article(a) => &a.link,
            CanonicalRecord::Job(j) => &j.apply_url,
            CanonicalRecord::Video(v) => &v.video_url,
        }
    }

    /// Recency field used for ranking.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            CanonicalRecord::Article(a) => a.original_published_at,
            CanonicalRecord::Job(j) => j.created_at,
            CanonicalRecord::Video(v) => v.published_at,
        }
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        match self {
            CanonicalRecord::Article(a) => &a.tags,
            CanonicalRecord::Job(j) => &j.tags,
            CanonicalRecord::Video(v) => &v.tags,
        }
    }

    pub fn tags_mut(&mut self) -> &mut BTreeSet<String> {
        match self {
            CanonicalRecord::Article(a) => &mut a.tags,
            CanonicalRecord::Job(j) => &mut j.tags,
            CanonicalRecord::Video(v) => &mut v.tags,
        }
    }

    /// Text the tag classifier looks at: title plus summary/description.
    pub fn classify_text(&self) -> (&str, &str) {
        match self {
            CanonicalRecord::Article(a) => (&a.title, &a.summary),
            CanonicalRecord::Job(j) => (&j.title, ""),
            CanonicalRecord::Video(v) => (&v.title, &v.description),
        }
    }
}
