// src/ingest/url_norm.rs
//! Canonical form of a URL for dedup comparison.

use url::Url;

/// Key for empty/absent input; never equal to a real URL key.
pub const EMPTY_KEY: &str = " ";

/// Query parameters that identify the resource itself on a given host
/// (everything else in the query string is tracking noise).
const IDENTITY_PARAMS: &[(&str, &str)] = &[("youtube.com", "v")];

/// Canonicalize `raw` for dedup: drop query and fragment, keep
/// scheme + host (+ non-default port) + path, strip trailing slashes.
/// Never fails: unparseable input comes back trimmed of trailing slashes.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return EMPTY_KEY.to_string();
    }

    let parsed = match Url::parse(trimmed) {
        Ok(u) => u,
        Err(_) => return fallback(trimmed),
    };
    let host = match parsed.host_str() {
        Some(h) if !h.is_empty() => h,
        _ => return fallback(trimmed),
    };

    let mut out = String::with_capacity(trimmed.len());
    out.push_str(parsed.scheme());
    out.push_str("://");
    out.push_str(host);
    if let Some(port) = parsed.port() {
        out.push(':');
        out.push_str(&port.to_string());
    }
    out.push_str(parsed.path().trim_end_matches('/'));

    if let Some(query) = identity_query(&parsed, host) {
        out.push('?');
        out.push_str(&query);
    }
    out
}

fn fallback(trimmed: &str) -> String {
    let out = trimmed.trim_end_matches('/');
    if out.is_empty() {
        EMPTY_KEY.to_string()
    } else {
        out.to_string()
    }
}

fn identity_query(parsed: &Url, host: &str) -> Option<String> {
    let (_, param) = IDENTITY_PARAMS
        .iter()
        .find(|(h, _)| host == *h || host.ends_with(&format!(".{h}")))?;
    let value = parsed
        .query_pairs()
        .find(|(k, v)| k == *param && !v.is_empty())
        .map(|(_, v)| v.into_owned())?;
    Some(
        url::form_urlencoded::Serializer::new(String::new())
            .append_pair(param, &value)
            .finish(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_query_fragment_and_trailing_slash() {
        assert_eq!(normalize_url("https://a.com/x?utm=1"), "https://a.com/x");
        assert_eq!(normalize_url("https://a.com/x/"), "https://a.com/x");
        assert_eq!(normalize_url("https://a.com/x#top"), "https://a.com/x");
        assert_eq!(normalize_url("https://A.com/"), "https://a.com");
    }

    #[test]
    fn keeps_non_default_port() {
        assert_eq!(normalize_url("http://a.com:8080/p/"), "http://a.com:8080/p");
        assert_eq!(normalize_url("https://a.com:443/p"), "https://a.com/p");
    }

    #[test]
    fn malformed_input_is_trimmed_not_rejected() {
        assert_eq!(normalize_url("not a url/"), "not a url");
        assert_eq!(normalize_url("/jobs/42//"), "/jobs/42");
        assert_eq!(normalize_url("mailto:team@x.com"), "mailto:team@x.com");
    }

    #[test]
    fn empty_input_maps_to_sentinel() {
        assert_eq!(normalize_url(""), EMPTY_KEY);
        assert_eq!(normalize_url("   "), EMPTY_KEY);
        assert_eq!(normalize_url("///"), EMPTY_KEY);
    }

    #[test]
    fn youtube_watch_urls_keep_the_video_id() {
        assert_eq!(
            normalize_url("https://www.youtube.com/watch?v=abc123&t=42s&utm_source=x"),
            "https://www.youtube.com/watch?v=abc123"
        );
        assert_ne!(
            normalize_url("https://www.youtube.com/watch?v=a"),
            normalize_url("https://www.youtube.com/watch?v=b")
        );
    }

    #[test]
    fn idempotent_on_mixed_inputs() {
        for u in [
            "https://a.com/x?utm=1",
            "https://a.com/",
            "https://a.com",
            "http://a.com:8080//x//",
            "https://www.youtube.com/watch?v=abc&list=PL1",
            "garbage//",
            "",
            "https://a.com/caf%C3%A9/",
        ] {
            let once = normalize_url(u);
            assert_eq!(normalize_url(&once), once, "input: {u}");
        }
    }
}
