// src/ingest/slug.rs
//! Title/location heuristics for slugs scraped out of listing pages.
//!
//! `senior-vue-developer-sao-paulo-sp-a81f93` → title "Senior Vue Developer",
//! location "São Paulo, SP". Pure and table-driven; no I/O.
//!
//! Locations outside `KNOWN_CITIES` come back as `None` and the normalizer
//! files them under "Remote". That is a coverage gap of the table, not a
//! claim that the job is remote.

/// (slug form, display form). Longest entries first so that
/// `rio-de-janeiro` wins over a hypothetical `janeiro`.
pub const KNOWN_CITIES: &[(&str, &str)] = &[
    ("rio-de-janeiro", "Rio de Janeiro"),
    ("belo-horizonte", "Belo Horizonte"),
    ("sao-jose-dos-campos", "São José dos Campos"),
    ("porto-alegre", "Porto Alegre"),
    ("sao-paulo", "São Paulo"),
    ("florianopolis", "Florianópolis"),
    ("campinas", "Campinas"),
    ("curitiba", "Curitiba"),
    ("brasilia", "Brasília"),
    ("recife", "Recife"),
    ("salvador", "Salvador"),
    ("fortaleza", "Fortaleza"),
    ("goiania", "Goiânia"),
    ("lisboa", "Lisboa"),
    ("lisbon", "Lisbon"),
    ("porto", "Porto"),
    ("london", "London"),
    ("berlin", "Berlin"),
    ("new-york", "New York"),
    ("toronto", "Toronto"),
];

/// Second segment of a two-segment location (`sao-paulo-sp`).
pub const KNOWN_REGIONS: &[&str] = &[
    "ac", "al", "am", "ap", "ba", "ce", "df", "es", "go", "ma", "mg", "ms", "mt", "pa", "pb",
    "pe", "pi", "pr", "rj", "rn", "ro", "rr", "rs", "sc", "se", "sp", "to", "ny", "uk", "pt",
];

const REMOTE_TOKENS: &[&str] = &["remote", "remoto", "anywhere", "worldwide"];

/// Words kept upper-case when title-casing.
const ACRONYMS: &[&str] = &[
    "ai", "api", "aws", "css", "devops", "gcp", "html", "ia", "ios", "js", "llm", "ml", "php",
    "qa", "sql", "sre", "ui", "ux",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlugParts {
    pub title: String,
    /// `None` when no known location token closes the slug.
    pub location: Option<String>,
}

/// Drop a trailing platform id (`-a81f93`, `-123456`): at least five
/// alphanumerics with a digit among them. A slug that *is* an id
/// cleans to the empty string.
pub fn strip_id_suffix(slug: &str) -> &str {
    let slug = slug.trim_matches(|c| c == '-' || c == '/');
    match slug.rsplit_once('-') {
        Some((head, tail)) if is_platform_id(tail) => head.trim_end_matches('-'),
        None if is_platform_id(slug) => "",
        _ => slug,
    }
}

fn is_platform_id(token: &str) -> bool {
    token.len() >= 5
        && token.chars().all(|c| c.is_ascii_alphanumeric())
        && token.chars().any(|c| c.is_ascii_digit())
}

/// Split a slug into a human title and an optional location.
/// Returns `None` when nothing usable is left after cleaning.
pub fn parse_slug(slug: &str) -> Option<SlugParts> {
    let lowered = slug.trim().to_ascii_lowercase();
    let cleaned = strip_id_suffix(&lowered);
    if cleaned.is_empty() {
        return None;
    }

    let tokens: Vec<&str> = cleaned.split('-').filter(|t| !t.is_empty()).collect();
    if tokens.is_empty() {
        return None;
    }

    let (title_tokens, location) = match split_location(&tokens) {
        Some((n, loc)) if n < tokens.len() => (&tokens[..tokens.len() - n], Some(loc)),
        _ => (&tokens[..], None),
    };

    Some(SlugParts {
        title: title_case(title_tokens),
        location,
    })
}

/// Number of trailing tokens consumed by a location, and its display form.
fn split_location(tokens: &[&str]) -> Option<(usize, String)> {
    let last = *tokens.last()?;
    if REMOTE_TOKENS.contains(&last) {
        return Some((1, "Remote".to_string()));
    }

    if KNOWN_REGIONS.contains(&last) && tokens.len() > 1 {
        if let Some((n, city)) = match_city(&tokens[..tokens.len() - 1]) {
            return Some((n + 1, format!("{}, {}", city, last.to_ascii_uppercase())));
        }
    }

    match_city(tokens).map(|(n, city)| (n, city.to_string()))
}

fn match_city(tokens: &[&str]) -> Option<(usize, &'static str)> {
    KNOWN_CITIES.iter().find_map(|(slug, display)| {
        let n = slug.split('-').count();
        if n > tokens.len() {
            return None;
        }
        let tail = tokens[tokens.len() - n..].join("-");
        (tail == *slug).then_some((n, *display))
    })
}

pub fn title_case(words: &[&str]) -> String {
    words
        .iter()
        .map(|w| {
            if ACRONYMS.contains(w) {
                return w.to_ascii_uppercase();
            }
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
