// src/ingest/providers/feed.rs
//! RSS 2.0 / Atom feeds, YouTube channel feeds included.
//!
//! Streaming parse over qualified element names, so `media:content`,
//! `media:thumbnail` and `yt:videoId` are told apart from the plain
//! RSS/Atom elements sharing their local names.
use metrics::histogram;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::ingest::error::FetchError;
use crate::ingest::http::{FetchRequest, HttpFetch};
use crate::ingest::types::{FeedRawItem, RawItem};

pub async fn fetch(
    http: &dyn HttpFetch,
    req: FetchRequest<'_>,
    limit: usize,
) -> Result<Vec<RawItem>, FetchError> {
    let body = http.get_text(req).await?;
    parse_items_from_str(&body, limit)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Published,
    Updated,
    Summary,
    Content,
    MediaDescription,
    Author,
    VideoId,
    Category,
}

fn field_for(name: &[u8]) -> Option<Field> {
    Some(match name {
        b"title" => Field::Title,
        b"link" => Field::Link,
        b"pubDate" | b"published" | b"dc:date" => Field::Published,
        b"updated" => Field::Updated,
        b"description" | b"summary" => Field::Summary,
        b"content:encoded" | b"content" => Field::Content,
        b"media:description" => Field::MediaDescription,
        b"author" | b"dc:creator" | b"name" => Field::Author,
        b"yt:videoId" => Field::VideoId,
        b"category" => Field::Category,
        _ => return None,
    })
}

/// Entry being assembled, with the lower-priority fallbacks kept apart.
#[derive(Default)]
struct Pending {
    item: FeedRawItem,
    updated: Option<String>,
    content: Option<String>,
    media_description: Option<String>,
}

impl Pending {
    fn finish(self) -> FeedRawItem {
        let mut item = self.item;
        if item.published.is_none() {
            item.published = self.updated;
        }
        if item.summary.is_none() {
            item.summary = self.content.or(self.media_description);
        }
        item
    }

    fn assign(&mut self, field: Field, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }
        let it = &mut self.item;
        let slot = match field {
            Field::Title => &mut it.title,
            Field::Link => &mut it.link,
            Field::Published => &mut it.published,
            Field::Updated => &mut self.updated,
            Field::Summary => &mut it.summary,
            Field::Content => &mut self.content,
            Field::MediaDescription => &mut self.media_description,
            Field::Author => &mut it.author,
            Field::VideoId => &mut it.video_id,
            Field::Category => {
                it.categories.push(text);
                return;
            }
        };
        if slot.is_none() {
            *slot = Some(text);
        }
    }

    fn absorb_attrs(&mut self, e: &BytesStart<'_>) {
        let it = &mut self.item;
        match e.name().as_ref() {
            b"link" => {
                let Some(href) = attr(e, b"href") else {
                    return;
                };
                let ty = attr(e, b"type").unwrap_or_default();
                let rel = attr(e, b"rel");
                if ty.starts_with("image/") {
                    it.image_link.get_or_insert(href);
                } else if matches!(rel.as_deref(), None | Some("alternate")) {
                    it.link.get_or_insert(href);
                }
            }
            b"enclosure" => {
                let ty = attr(e, b"type").unwrap_or_default();
                if let (true, Some(url)) = (ty.starts_with("image/"), attr(e, b"url")) {
                    it.image_link.get_or_insert(url);
                }
            }
            b"media:content" => {
                // YouTube puts the flash player URL here; only keep images.
                let ty = attr(e, b"type");
                let medium = attr(e, b"medium");
                let is_image = medium.as_deref() == Some("image")
                    || ty.as_deref().map_or(medium.is_none(), |t| t.starts_with("image/"));
                if let (true, Some(url)) = (is_image, attr(e, b"url")) {
                    it.media_content.get_or_insert(url);
                }
            }
            b"media:thumbnail" => {
                if let Some(url) = attr(e, b"url") {
                    it.media_thumbnail.get_or_insert(url);
                }
            }
            b"category" => {
                if let Some(term) = attr(e, b"term") {
                    it.categories.push(term);
                }
            }
            _ => {}
        }
    }
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.trim().to_string()))
        .filter(|v| !v.is_empty())
}

fn is_entry(name: &[u8]) -> bool {
    matches!(name, b"item" | b"entry")
}

fn is_root(name: &[u8]) -> bool {
    matches!(name, b"rss" | b"feed" | b"rdf:RDF")
}

/// Parse up to `limit` entries out of an RSS or Atom document.
pub fn parse_items_from_str(s: &str, limit: usize) -> Result<Vec<RawItem>, FetchError> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(s);
    let mut reader = Reader::from_str(&xml_clean);

    let mut out = Vec::new();
    let mut saw_root = false;
    let mut pending: Option<Pending> = None;
    // (field, nesting depth inside it, text so far)
    let mut open: Option<(Field, usize, String)> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| FetchError::parse(format!("feed xml at {}: {e}", reader.buffer_position())))?;
        match event {
            Event::Start(e) => {
                let name = e.name();
                if is_root(name.as_ref()) {
                    saw_root = true;
                }
                if is_entry(name.as_ref()) {
                    pending = Some(Pending::default());
                    open = None;
                    continue;
                }
                let Some(p) = pending.as_mut() else {
                    continue;
                };
                match open.as_ref().map(|(f, _, _)| *f) {
                    // Atom <author> is a container; let <name> take over.
                    Some(Field::Author) => open = None,
                    Some(_) => {
                        if let Some((_, depth, _)) = open.as_mut() {
                            *depth += 1;
                        }
                        continue;
                    }
                    None => {}
                }
                p.absorb_attrs(&e);
                if let Some(f) = field_for(name.as_ref()) {
                    open = Some((f, 0, String::new()));
                }
            }
            Event::Empty(e) => {
                if let (Some(p), None) = (pending.as_mut(), open.as_ref()) {
                    p.absorb_attrs(&e);
                }
            }
            Event::Text(t) => {
                if let Some((_, _, buf)) = open.as_mut() {
                    let decoded = t.unescape().map(|c| c.into_owned());
                    match decoded {
                        Ok(s) => buf.push_str(&s),
                        Err(_) => buf.push_str(&String::from_utf8_lossy(&t.into_inner())),
                    }
                }
            }
            Event::CData(c) => {
                if let Some((_, _, buf)) = open.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => {
                if let Some((field, depth, buf)) = open.as_mut() {
                    if *depth > 0 {
                        *depth -= 1;
                        continue;
                    }
                    let (field, text) = (*field, std::mem::take(buf));
                    open = None;
                    if let Some(p) = pending.as_mut() {
                        p.assign(field, text);
                    }
                    continue;
                }
                if is_entry(e.name().as_ref()) {
                    if let Some(p) = pending.take() {
                        out.push(RawItem::Feed(p.finish()));
                    }
                    if out.len() >= limit {
                        break;
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(FetchError::parse("not an RSS/Atom document"));
    }
    out.truncate(limit);

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    Ok(out)
}

/// Replace HTML-only entities that XML parsers reject.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&hellip;", "...")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_items(v: Vec<RawItem>) -> Vec<FeedRawItem> {
        v.into_iter()
            .map(|r| match r {
                RawItem::Feed(f) => f,
                other => panic!("unexpected: {other:?}"),
            })
            .collect()
    }

    #[test]
    fn rss_item_with_media_and_cdata() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Blog</title>
    <item>
      <title>Nuxt&nbsp;4 &amp; you</title>
      <link>https://blog.test/nuxt-4?utm_source=rss</link>
      <pubDate>Tue, 06 Jan 2026 10:00:00 +0000</pubDate>
      <description><![CDATA[<p>Big <b>release</b></p>]]></description>
      <dc:creator>Seb</dc:creator>
      <category>nuxt</category>
      <media:thumbnail url="https://img.test/thumb.jpg"/>
      <media:content url="https://img.test/full.jpg" medium="image"/>
    </item>
  </channel>
</rss>"#;
        let items = feed_items(parse_items_from_str(xml, 10).unwrap());
        assert_eq!(items.len(), 1);
        let it = &items[0];
        assert_eq!(it.title.as_deref(), Some("Nuxt 4 & you"));
        assert_eq!(it.link.as_deref(), Some("https://blog.test/nuxt-4?utm_source=rss"));
        assert_eq!(it.summary.as_deref(), Some("<p>Big <b>release</b></p>"));
        assert_eq!(it.author.as_deref(), Some("Seb"));
        assert_eq!(it.categories, vec!["nuxt".to_string()]);
        assert_eq!(it.best_image(), Some("https://img.test/full.jpg"));
    }

    #[test]
    fn atom_links_pick_alternate_and_image_type() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <title>Vue 3.5</title>
    <link rel="enclosure" type="image/png" href="https://img.test/v.png"/>
    <link rel="alternate" href="https://vue.test/posts/35"/>
    <updated>2026-01-05T08:30:00Z</updated>
    <content type="html">&lt;p&gt;Faster&lt;/p&gt;</content>
    <author><name>Evan</name></author>
  </entry>
</feed>"#;
        let items = feed_items(parse_items_from_str(xml, 10).unwrap());
        let it = &items[0];
        assert_eq!(it.link.as_deref(), Some("https://vue.test/posts/35"));
        assert_eq!(it.image_link.as_deref(), Some("https://img.test/v.png"));
        assert_eq!(it.published.as_deref(), Some("2026-01-05T08:30:00Z"));
        assert_eq!(it.summary.as_deref(), Some("<p>Faster</p>"));
        assert_eq!(it.author.as_deref(), Some("Evan"));
    }

    #[test]
    fn stops_at_limit() {
        let xml = r#"<rss><channel>
<item><title>a</title><link>https://x.test/a</link></item>
<item><title>b</title><link>https://x.test/b</link></item>
<item><title>c</title><link>https://x.test/c</link></item>
</channel></rss>"#;
        assert_eq!(parse_items_from_str(xml, 2).unwrap().len(), 2);
        assert!(parse_items_from_str(xml, 0).unwrap().is_empty());
    }

    #[test]
    fn non_feed_documents_are_parse_errors() {
        assert!(matches!(
            parse_items_from_str("<html><body>503</body></html>", 5),
            Err(FetchError::Parse(_))
        ));
        assert!(matches!(
            parse_items_from_str("<rss><channel><item></channel></rss>", 5),
            Err(FetchError::Parse(_))
        ));
    }
}
