// src/ingest/providers/html_scrape.rs
//! Listing pages scraped with a regex: one capture group = one slug.
use regex::Regex;
use std::collections::HashSet;

use crate::ingest::error::FetchError;
use crate::ingest::http::{FetchRequest, HttpFetch};
use crate::ingest::slug::parse_slug;
use crate::ingest::types::{HtmlRawItem, RawItem};

pub async fn fetch(
    http: &dyn HttpFetch,
    req: FetchRequest<'_>,
    pattern: &Regex,
    link_template: &str,
    limit: usize,
) -> Result<Vec<RawItem>, FetchError> {
    let body = http.get_text(req).await?;
    parse_items_from_str(&body, pattern, link_template, limit)
}

/// Slugs in page order, repeats removed (listing pages link each job
/// several times: title, logo, "apply" button).
pub fn extract_slugs(html: &str, pattern: &Regex) -> Vec<String> {
    let mut seen = HashSet::new();
    pattern
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}

pub fn parse_items_from_str(
    html: &str,
    pattern: &Regex,
    link_template: &str,
    limit: usize,
) -> Result<Vec<RawItem>, FetchError> {
    if pattern.captures_len() < 2 {
        return Err(FetchError::parse("scrape pattern has no capture group"));
    }

    let mut out = Vec::new();
    for slug in extract_slugs(html, pattern) {
        if out.len() >= limit {
            break;
        }
        let Some(parts) = parse_slug(&slug) else {
            tracing::debug!(target: "ingest", %slug, "slug empty after cleaning, skipped");
            continue;
        };
        if parts.location.is_none() {
            tracing::debug!(target: "ingest", %slug, "no known location token in slug");
        }
        out.push(RawItem::Html(HtmlRawItem {
            link: link_template.replace("{slug}", &slug),
            slug,
            title: parts.title,
            location: parts.location,
        }));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern() -> Regex {
        Regex::new(r#"href="/job/([a-z0-9-]+)""#).unwrap()
    }

    #[test]
    fn slugs_deduplicated_in_page_order() {
        let html = r#"
            <a href="/job/vue-dev-curitiba-11111">Vue Dev</a>
            <a href="/job/php-dev-22222">PHP Dev</a>
            <a href="/job/vue-dev-curitiba-11111">Apply</a>
        "#;
        assert_eq!(
            extract_slugs(html, &pattern()),
            vec!["vue-dev-curitiba-11111".to_string(), "php-dev-22222".to_string()]
        );
    }

    #[test]
    fn builds_links_and_skips_empty_slugs() {
        let html = r#"
            <a href="/job/123456">?</a>
            <a href="/job/senior-nuxt-engineer-sao-paulo-sp-99999">x</a>
        "#;
        let items = parse_items_from_str(html, &pattern(), "https://jobs.test/job/{slug}", 10).unwrap();
        assert_eq!(items.len(), 1);
        match &items[0] {
            RawItem::Html(h) => {
                assert_eq!(
                    h.link,
                    "https://jobs.test/job/senior-nuxt-engineer-sao-paulo-sp-99999"
                );
                assert_eq!(h.title, "Senior Nuxt Engineer");
                assert_eq!(h.location.as_deref(), Some("São Paulo, SP"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn limit_counts_kept_items() {
        let html = r#"<a href="/job/a-dev-11111"></a><a href="/job/b-dev-22222"></a><a href="/job/c-dev-33333"></a>"#;
        let items = parse_items_from_str(html, &pattern(), "https://j.test/{slug}", 2).unwrap();
        assert_eq!(items.len(), 2);
    }
}
