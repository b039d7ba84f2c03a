// src/ingest/normalize.rs
//! RawItem → CanonicalRecord, one mapping per (strategy variant, content kind).
//!
//! Missing optional fields become sentinels. A record without a usable
//! dedup key is dropped here (`None`) and never reaches the dedup stage.

use crate::ingest::clean_text;
use crate::ingest::url_norm::{normalize_url, EMPTY_KEY};
use crate::ingest::types::{
    Article, CanonicalRecord, ContentKind, FeedRawItem, HtmlRawItem, Job, JsonRawItem, RawItem,
    SourceDescriptor, Video,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::BTreeSet;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

pub const NOT_AVAILABLE: &str = "N/A";
pub const REMOTE: &str = "Remote";
pub const SALARY_NEGOTIABLE: &str = "Negotiable";
pub const DEFAULT_SUMMARY_MAX_CHARS: usize = 1000;

const YOUTUBE_WATCH: &str = "https://www.youtube.com/watch?v=";

/// A normalized record plus wire-level hints (API tags, feed categories)
/// that only feed the tag classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub record: CanonicalRecord,
    pub tag_hints: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct NormalizeCtx<'a> {
    pub source: &'a SourceDescriptor,
    pub now: DateTime<Utc>,
    pub summary_max_chars: usize,
}

/// Map one raw item to the record shape of the source's content kind.
pub fn normalize_item(raw: RawItem, ctx: &NormalizeCtx<'_>) -> Option<Candidate> {
    let tag_hints = match &raw {
        RawItem::Json(it) => it.tags.clone(),
        RawItem::Feed(it) => it.categories.clone(),
        RawItem::Html(_) => Vec::new(),
    };
    let record = match (raw, ctx.source.kind) {
        (RawItem::Json(it), ContentKind::Job) => CanonicalRecord::Job(json_job(it, ctx)?),
        (RawItem::Json(it), ContentKind::Article) => {
            CanonicalRecord::Article(json_article(it, ctx)?)
        }
        (RawItem::Feed(it), ContentKind::Article) => {
            CanonicalRecord::Article(feed_article(it, ctx)?)
        }
        (RawItem::Feed(it), ContentKind::Video) => CanonicalRecord::Video(feed_video(it, ctx)?),
        (RawItem::Feed(it), ContentKind::Job) => CanonicalRecord::Job(feed_job(it, ctx)?),
        (RawItem::Html(it), ContentKind::Job) => CanonicalRecord::Job(html_job(it, ctx)?),
        (RawItem::Html(it), ContentKind::Article) => {
            CanonicalRecord::Article(html_article(it, ctx)?)
        }
        (raw, kind) => {
            tracing::debug!(
                target: "ingest",
                source = %ctx.source.name,
                %kind,
                raw = ?raw,
                "no mapping for raw item into content kind"
            );
            return None;
        }
    };
    // "/" and friends are non-blank but still no key
    if normalize_url(record.dedup_key()) == EMPTY_KEY {
        return None;
    }
    Some(Candidate { record, tag_hints })
}

/* ---------- JSON API ---------- */

fn json_job(it: JsonRawItem, ctx: &NormalizeCtx<'_>) -> Option<Job> {
    let apply_url = non_empty(it.link)?;
    Some(Job {
        title: non_empty(it.title.map(|t| clean_text(&t, usize::MAX)))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        company: non_empty(it.company).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        location: non_empty(it.location).unwrap_or_else(|| REMOTE.to_string()),
        salary: format_salary(it.salary_min, it.salary_max),
        apply_url,
        tags: BTreeSet::new(),
        created_at: parse_timestamp(it.published.as_deref(), ctx.now),
    })
}

fn json_article(it: JsonRawItem, ctx: &NormalizeCtx<'_>) -> Option<Article> {
    let link = non_empty(it.link)?;
    Some(Article {
        title: non_empty(it.title.map(|t| clean_text(&t, usize::MAX)))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        link,
        summary: clean_text(
            it.description.as_deref().unwrap_or_default(),
            ctx.summary_max_chars,
        ),
        source_name: ctx.source.name.clone(),
        content_kind: ContentKind::Article,
        original_published_at: parse_timestamp(it.published.as_deref(), ctx.now),
        image_url: non_empty(it.image),
        tags: BTreeSet::new(),
    })
}

/// `"$60k - $100k"` when both bounds are positive, else the sentinel.
pub fn format_salary(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(lo), Some(hi)) if lo > 0.0 && hi > 0.0 => {
            format!("${}k - ${}k", thousands(lo), thousands(hi))
        }
        _ => SALARY_NEGOTIABLE.to_string(),
    }
}

fn thousands(v: f64) -> String {
    let k = (v / 100.0).round() / 10.0;
    if k.fract() == 0.0 {
        format!("{}", k as i64)
    } else {
        format!("{k:.1}")
    }
}

/* ---------- RSS / Atom ---------- */

fn feed_article(it: FeedRawItem, ctx: &NormalizeCtx<'_>) -> Option<Article> {
    let link = non_empty(it.link.clone())?;
    let image_url = it.best_image().map(str::to_string);
    Some(Article {
        title: feed_title(&it),
        link,
        summary: clean_text(
            it.summary.as_deref().unwrap_or_default(),
            ctx.summary_max_chars,
        ),
        source_name: ctx.source.name.clone(),
        content_kind: ContentKind::Article,
        original_published_at: parse_timestamp(it.published.as_deref(), ctx.now),
        image_url,
        tags: BTreeSet::new(),
    })
}

fn feed_video(it: FeedRawItem, ctx: &NormalizeCtx<'_>) -> Option<Video> {
    let video_id = non_empty(it.video_id.clone());
    let video_url = match &video_id {
        Some(id) => format!("{YOUTUBE_WATCH}{id}"),
        None => non_empty(it.link.clone())?,
    };
    let thumbnail_url = non_empty(it.media_thumbnail.clone())
        .or_else(|| it.best_image().map(str::to_string))
        .or_else(|| {
            video_id
                .as_ref()
                .map(|id| format!("https://img.youtube.com/vi/{id}/hqdefault.jpg"))
        })
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    Some(Video {
        title: feed_title(&it),
        description: clean_text(
            it.summary.as_deref().unwrap_or_default(),
            ctx.summary_max_chars,
        ),
        video_url,
        thumbnail_url,
        // Registry name is the channel's display name; the feed's author is
        // the fallback for ad-hoc sources.
        author_channel: if ctx.source.name.trim().is_empty() {
            non_empty(it.author).unwrap_or_else(|| NOT_AVAILABLE.to_string())
        } else {
            ctx.source.name.clone()
        },
        published_at: parse_timestamp(it.published.as_deref(), ctx.now),
        tags: BTreeSet::new(),
    })
}

/// Job boards that publish RSS: "Company: Position" titles are common.
fn feed_job(it: FeedRawItem, ctx: &NormalizeCtx<'_>) -> Option<Job> {
    let apply_url = non_empty(it.link.clone())?;
    let raw_title = feed_title(&it);
    let (company, title) = match raw_title.split_once(": ") {
        Some((c, t)) if !c.trim().is_empty() && !t.trim().is_empty() => {
            (c.trim().to_string(), t.trim().to_string())
        }
        _ => (
            non_empty(it.author.clone()).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            raw_title,
        ),
    };
    Some(Job {
        title,
        company,
        location: REMOTE.to_string(),
        salary: SALARY_NEGOTIABLE.to_string(),
        apply_url,
        tags: BTreeSet::new(),
        created_at: parse_timestamp(it.published.as_deref(), ctx.now),
    })
}

fn feed_title(it: &FeedRawItem) -> String {
    non_empty(it.title.as_deref().map(|t| clean_text(t, usize::MAX)))
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/* ---------- HTML scrape ---------- */

fn html_job(it: HtmlRawItem, ctx: &NormalizeCtx<'_>) -> Option<Job> {
    let apply_url = non_empty(Some(it.link))?;
    Some(Job {
        title: it.title,
        company: NOT_AVAILABLE.to_string(),
        location: it.location.unwrap_or_else(|| REMOTE.to_string()),
        salary: SALARY_NEGOTIABLE.to_string(),
        apply_url,
        tags: BTreeSet::new(),
        created_at: ctx.now,
    })
}

fn html_article(it: HtmlRawItem, ctx: &NormalizeCtx<'_>) -> Option<Article> {
    let link = non_empty(Some(it.link))?;
    Some(Article {
        title: it.title,
        link,
        summary: String::new(),
        source_name: ctx.source.name.clone(),
        content_kind: ContentKind::Article,
        original_published_at: ctx.now,
        image_url: None,
        tags: BTreeSet::new(),
    })
}

/* ---------- helpers ---------- */

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Best-effort date parsing (RFC 2822, RFC 3339, a few naive layouts,
/// unix seconds). Unparseable or absent input yields `now`.
pub fn parse_timestamp(raw: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(parse_date_str)
        .unwrap_or(now)
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    let from_time = OffsetDateTime::parse(s, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(s, &Rfc3339))
        .ok()
        .and_then(|dt| DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond()));
    if from_time.is_some() {
        return from_time;
    }

    // Obsolete zone names ("GMT", "EST") that the strict grammar rejects.
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    for layout in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
    }
    s.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
}
