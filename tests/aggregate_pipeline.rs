// tests/aggregate_pipeline.rs
use std::sync::Arc;

use techhub_aggregator::config::sources::parse_sources;
use techhub_aggregator::ingest::http::StaticFetcher;
use techhub_aggregator::ingest::tags::TagClassifier;
use techhub_aggregator::ingest::url_norm::normalize_url;
use techhub_aggregator::{Aggregator, AggregatorConfig, CanonicalRecord};

const DEVTO_XML: &str = include_str!("fixtures/devto_vue.xml");
const VUE_POINT_XML: &str = include_str!("fixtures/vue_point_atom.xml");
const YOUTUBE_XML: &str = include_str!("fixtures/youtube_channel.xml");
const REMOTEOK_JSON: &str = include_str!("fixtures/remoteok.json");
const REMOTAR_HTML: &str = include_str!("fixtures/remotar_listing.html");

const NO_KEYS: [&str; 0] = [];

fn aggregator(http: StaticFetcher, registry_toml: &str) -> Aggregator {
    let registry = parse_sources(registry_toml).expect("registry");
    let classifier = TagClassifier::embedded().expect("tag rules");
    Aggregator::new(
        Arc::new(http),
        Arc::new(classifier),
        registry,
        AggregatorConfig::default(),
    )
}

const ARTICLE_REGISTRY: &str = r#"
[[sources]]
name = "DEV Community (Vue)"
kind = "article"
strategy = "feed"
endpoint = "https://fx.test/devto.xml"

[[sources]]
name = "The Vue Point"
kind = "article"
strategy = "feed"
endpoint = "https://fx.test/vuepoint.xml"
"#;

fn article_fetcher() -> StaticFetcher {
    StaticFetcher::new()
        .with_body("https://fx.test/devto.xml", DEVTO_XML)
        .with_body("https://fx.test/vuepoint.xml", VUE_POINT_XML)
}

#[tokio::test]
async fn same_article_from_two_sources_survives_once_first_source_wins() {
    let agg = aggregator(article_fetcher(), ARTICLE_REGISTRY);
    let (out, stats) = agg.run_with_stats(agg.registry(), 10, 10, NO_KEYS).await;

    let key = normalize_url("https://dev.to/analima/vue-35-released-1abc");
    let hits: Vec<_> = out
        .iter()
        .filter(|r| normalize_url(r.dedup_key()) == key)
        .collect();
    assert_eq!(hits.len(), 1, "exactly one copy must survive");
    match hits[0] {
        CanonicalRecord::Article(a) => {
            assert_eq!(a.source_name, "DEV Community (Vue)");
            assert_eq!(a.title, "Vue 3.5 released with new Composition API features");
        }
        other => panic!("unexpected: {other:?}"),
    }

    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.dropped, 1, "the linkless RSS item");
    assert_eq!(stats.failed_sources, 0);
    assert_eq!(out.len(), 3);
}

#[tokio::test]
async fn output_is_newest_first_and_bounded() {
    let agg = aggregator(article_fetcher(), ARTICLE_REGISTRY);

    let all = agg.run(agg.registry(), 10, 10, NO_KEYS).await;
    let titles: Vec<_> = all.iter().map(|r| r.title().to_string()).collect();
    assert_eq!(
        titles,
        vec![
            "Vapor mode preview".to_string(),
            "Vue 3.5 released with new Composition API features".to_string(),
            "Building a Pinia store the boring way".to_string(),
        ]
    );
    assert!(all.windows(2).all(|w| w[0].timestamp() >= w[1].timestamp()));

    let two = agg.run(agg.registry(), 10, 2, NO_KEYS).await;
    assert_eq!(two.len(), 2);
    assert_eq!(two[0].title(), "Vapor mode preview");

    assert!(agg.run(agg.registry(), 10, 0, NO_KEYS).await.is_empty());
}

#[tokio::test]
async fn equal_timestamps_keep_registry_order() {
    let feed = |slug: &str| {
        format!(
            r#"<rss><channel><item><title>{slug}</title><link>https://{slug}.test/post</link>
<pubDate>Mon, 05 Jan 2026 09:00:00 +0000</pubDate></item></channel></rss>"#
        )
    };
    let http = StaticFetcher::new()
        .with_body("https://one.test/rss", feed("one"))
        .with_body("https://two.test/rss", feed("two"))
        .with_body("https://three.test/rss", feed("three"));
    let agg = aggregator(
        http,
        r#"
[[sources]]
name = "Three"
kind = "article"
strategy = "feed"
endpoint = "https://three.test/rss"
[[sources]]
name = "One"
kind = "article"
strategy = "feed"
endpoint = "https://one.test/rss"
[[sources]]
name = "Two"
kind = "article"
strategy = "feed"
endpoint = "https://two.test/rss"
"#,
    );

    let out = agg.run(agg.registry(), 5, 10, NO_KEYS).await;
    let titles: Vec<_> = out.iter().map(|r| r.title()).collect();
    assert_eq!(titles, vec!["three", "one", "two"]);
}

#[tokio::test]
async fn per_source_limit_caps_each_source() {
    let agg = aggregator(article_fetcher(), ARTICLE_REGISTRY);
    let (out, stats) = agg.run_with_stats(agg.registry(), 1, 10, NO_KEYS).await;
    // the Vue Point's first entry is the duplicate, so its second one counts
    let titles: Vec<_> = out.iter().map(|r| r.title()).collect();
    assert_eq!(
        titles,
        vec![
            "Vapor mode preview",
            "Vue 3.5 released with new Composition API features",
        ]
    );
    assert_eq!(stats.duplicates, 1);
    assert_eq!(stats.over_limit, 1, "DEV's Pinia post");
}

#[tokio::test]
async fn jobs_from_json_and_scraped_listing() {
    let http = StaticFetcher::new()
        .with_body("https://fx.test/remoteok.json", REMOTEOK_JSON)
        .with_body("https://fx.test/remotar", REMOTAR_HTML);
    let agg = aggregator(
        http,
        r#"
[[sources]]
name = "RemoteOK"
kind = "job"
strategy = "json_api"
endpoint = "https://fx.test/remoteok.json"

[[sources]]
name = "Remotar (Vue)"
kind = "job"
strategy = "html_scrape"
endpoint = "https://fx.test/remotar"
pattern = 'href="/job/([a-z0-9-]+-[0-9]+)"'
link_template = "https://remotar.test/job/{slug}"
tags = ["Vue.js"]
"#,
    );

    let out = agg.run(agg.registry(), 10, 20, NO_KEYS).await;
    let jobs: Vec<_> = out
        .iter()
        .map(|r| match r {
            CanonicalRecord::Job(j) => j.clone(),
            other => panic!("unexpected: {other:?}"),
        })
        .collect();

    // 2 usable RemoteOK entries (legal marker skipped, one without URL) + 3 slugs
    assert_eq!(jobs.len(), 5);

    let vue = jobs.iter().find(|j| j.company == "Acme").expect("acme job");
    assert_eq!(vue.title, "Senior Vue Developer");
    assert_eq!(vue.salary, "$60k - $100k");
    assert_eq!(vue.apply_url, "https://remoteok.com/l/1001?ref=api");
    assert!(vue.tags.contains("Vue.js"));

    let laravel = jobs.iter().find(|j| j.company == "Globex").expect("globex job");
    assert_eq!(laravel.location, "Remote");
    assert_eq!(laravel.salary, "Negotiable");
    assert!(laravel.tags.contains("Laravel"));

    let curitiba = jobs
        .iter()
        .find(|j| j.apply_url.ends_with("desenvolvedor-vue-pleno-curitiba-pr-48213"))
        .expect("scraped job");
    assert_eq!(curitiba.title, "Desenvolvedor Vue Pleno");
    assert_eq!(curitiba.location, "Curitiba, PR");
    assert_eq!(curitiba.company, "N/A");

    let php = jobs
        .iter()
        .find(|j| j.title == "PHP Laravel Developer")
        .expect("acronym kept");
    assert_eq!(php.location, "Recife");
    assert!(php.tags.contains("Vue.js"), "static source tag");
    assert!(!php.tags.contains("Tech"));
}

#[tokio::test]
async fn videos_from_channel_feed() {
    let http = StaticFetcher::new().with_body("https://fx.test/yt.xml", YOUTUBE_XML);
    let agg = aggregator(
        http,
        r#"
[[sources]]
name = "Code Channel"
kind = "video"
strategy = "feed"
endpoint = "https://fx.test/yt.xml"
tags = ["Video"]
"#,
    );

    let out = agg.run(agg.registry(), 5, 5, NO_KEYS).await;
    assert_eq!(out.len(), 2);
    match &out[0] {
        CanonicalRecord::Video(v) => {
            assert_eq!(v.title, "Nuxt 4 in 10 minutes");
            assert_eq!(v.video_url, "https://www.youtube.com/watch?v=aaa111");
            assert_eq!(v.thumbnail_url, "https://i2.ytimg.com/vi/aaa111/hqdefault.jpg");
            assert_eq!(v.description, "Everything new in Nuxt 4, live coded.");
            assert_eq!(v.author_channel, "Code Channel");
            assert!(v.tags.contains("Nuxt") && v.tags.contains("Video"));
        }
        other => panic!("unexpected: {other:?}"),
    }
    match &out[1] {
        CanonicalRecord::Video(v) => {
            assert_eq!(v.thumbnail_url, "https://img.youtube.com/vi/bbb222/hqdefault.jpg");
            assert!(v.tags.contains("Career"));
        }
        other => panic!("unexpected: {other:?}"),
    }
}

#[tokio::test]
async fn vue_release_title_gets_only_the_vue_tag() {
    let http = StaticFetcher::new().with_body(
        "https://plain.test/rss",
        r#"<rss><channel><item>
<title>Vue 3.5 released with new Composition API features</title>
<link>https://plain.test/vue-35</link><description></description>
</item></channel></rss>"#,
    );
    let agg = aggregator(
        http,
        r#"
[[sources]]
name = "Plain Feed"
kind = "article"
strategy = "feed"
endpoint = "https://plain.test/rss"
"#,
    );
    let out = agg.run(agg.registry(), 1, 1, NO_KEYS).await;
    let tags: Vec<_> = out[0].tags().iter().cloned().collect();
    assert_eq!(tags, vec!["Vue.js".to_string()]);
}

#[tokio::test]
async fn slash_only_link_is_dropped_not_counted_as_duplicate() {
    let http = StaticFetcher::new().with_body(
        "https://slash.test/api",
        r#"[
  {"position": "Root Link", "company": "Acme", "apply_url": "/"},
  {"position": "Real Job", "company": "Acme", "apply_url": "https://slash.test/job/9"}
]"#,
    );
    let agg = aggregator(
        http,
        r#"
[[sources]]
name = "Slash"
kind = "job"
strategy = "json_api"
endpoint = "https://slash.test/api"
"#,
    );
    let (out, stats) = agg.run_with_stats(agg.registry(), 5, 5, NO_KEYS).await;
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].title(), "Real Job");
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.duplicates, 0);
}
