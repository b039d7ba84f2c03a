// src/ingest/tags.rs
//! Keyword tag classifier: rules compiled from TOML, a per-source channel
//! rule, and a fallback tag so the output is never empty.
//!
//! Matching runs on the lower-cased `title + " " + body`. Keywords made of
//! word characters (and spaces) match on word boundaries; keywords holding
//! anything else (`c#`, `vue.js`, `node.js`) match as plain substrings.

use crate::ingest::types::ContentKind;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_TAGS_CONFIG_PATH: &str = "config/tags.toml";
pub const ENV_TAGS_CONFIG_PATH: &str = "TAGS_CONFIG_PATH";

const EMBEDDED_TAGS_TOML: &str = include_str!("../../config/tags.toml");

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct TagsRoot {
    pub classifier: ClassifierSection,
    #[serde(default)]
    pub rules: Vec<TagRuleCfg>,
    #[serde(default)]
    pub channels: Vec<ChannelRuleCfg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierSection {
    pub fallback: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagRuleCfg {
    pub tag: String,
    pub keywords: Vec<String>,
    /// Restrict the rule to some content kinds; empty = all.
    #[serde(default)]
    pub kinds: Vec<ContentKind>,
}

/// "Everything from this source is about X, unless a stronger tag fired."
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelRuleCfg {
    pub source: String,
    pub tag: String,
    #[serde(default)]
    pub unless: Vec<String>,
}

/* ----------------------------
Compiled classifier
---------------------------- */

#[derive(Debug)]
enum Matcher {
    Word(Regex),
    Substring(String),
}

impl Matcher {
    fn compile(keyword: &str) -> anyhow::Result<Self> {
        let kw = keyword.trim().to_lowercase();
        if kw.is_empty() {
            anyhow::bail!("empty keyword");
        }
        let wordy = kw.chars().all(|c| c.is_alphanumeric() || c == '_' || c == ' ');
        if wordy {
            let re = Regex::new(&format!(r"\b{}\b", regex::escape(&kw)))?;
            Ok(Matcher::Word(re))
        } else {
            Ok(Matcher::Substring(kw))
        }
    }

    fn is_match(&self, haystack: &str) -> bool {
        match self {
            Matcher::Word(re) => re.is_match(haystack),
            Matcher::Substring(s) => haystack.contains(s.as_str()),
        }
    }
}

#[derive(Debug)]
struct CompiledRule {
    tag: String,
    kinds: Vec<ContentKind>,
    matchers: Vec<Matcher>,
}

impl CompiledRule {
    fn applies_to(&self, kind: ContentKind) -> bool {
        self.kinds.is_empty() || self.kinds.contains(&kind)
    }
}

/// Classifier input beyond the text itself.
#[derive(Debug, Clone, Copy)]
pub struct TagContext<'a> {
    pub kind: ContentKind,
    /// Source/channel name, matched case-insensitively against channel rules.
    pub source: Option<&'a str>,
}

#[derive(Debug)]
pub struct TagClassifier {
    fallback: String,
    rules: Vec<CompiledRule>,
    channels: Vec<ChannelRuleCfg>,
}

impl TagClassifier {
    /// Rules shipped with the crate.
    pub fn embedded() -> anyhow::Result<Self> {
        Self::from_toml_str(EMBEDDED_TAGS_TOML)
    }

    /// `$TAGS_CONFIG_PATH` if set, else `config/tags.toml` if present,
    /// else the embedded rules.
    pub fn from_default_location() -> anyhow::Result<Self> {
        if let Ok(p) = std::env::var(ENV_TAGS_CONFIG_PATH) {
            let path = PathBuf::from(p);
            let content = fs::read_to_string(&path).map_err(|e| {
                anyhow::anyhow!("Failed to read tag rules at {}: {}", path.display(), e)
            })?;
            return Self::from_toml_str(&content);
        }
        let local = PathBuf::from(DEFAULT_TAGS_CONFIG_PATH);
        if local.exists() {
            let content = fs::read_to_string(&local)?;
            return Self::from_toml_str(&content);
        }
        Self::embedded()
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let cfg: TagsRoot = toml::from_str(toml_str)?;
        let fallback = cfg.classifier.fallback.trim().to_string();
        if fallback.is_empty() {
            anyhow::bail!("classifier.fallback must not be empty");
        }

        let rules = cfg
            .rules
            .into_iter()
            .map(|r| {
                let matchers = r
                    .keywords
                    .iter()
                    .map(|k| {
                        Matcher::compile(k)
                            .map_err(|e| anyhow::anyhow!("rule `{}` keyword `{}`: {}", r.tag, k, e))
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?;
                if matchers.is_empty() {
                    anyhow::bail!("rule `{}` has no keywords", r.tag);
                }
                Ok(CompiledRule {
                    tag: r.tag,
                    kinds: r.kinds,
                    matchers,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Self {
            fallback,
            rules,
            channels: cfg.channels,
        })
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Tags for one item. Never empty.
    pub fn classify(&self, title: &str, body: &str, ctx: TagContext<'_>) -> BTreeSet<String> {
        let haystack = format!("{} {}", title, body).to_lowercase();

        let mut tags: BTreeSet<String> = self
            .rules
            .iter()
            .filter(|r| r.applies_to(ctx.kind))
            .filter(|r| r.matchers.iter().any(|m| m.is_match(&haystack)))
            .map(|r| r.tag.clone())
            .collect();

        if let Some(source) = ctx.source {
            for ch in &self.channels {
                if !ch.source.eq_ignore_ascii_case(source.trim()) {
                    continue;
                }
                let suppressed = ch.unless.iter().any(|u| tags.contains(u));
                if !suppressed {
                    tags.insert(ch.tag.clone());
                }
            }
        }

        if tags.is_empty() {
            tags.insert(self.fallback.clone());
        }
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_TOML: &str = r#"
[classifier]
fallback = "Tech"

[[rules]]
tag = "Vue.js"
keywords = ["vue", "vue.js", "composition api"]

[[rules]]
tag = "C#"
keywords = ["c#", ".net"]

[[rules]]
tag = "AI"
keywords = ["ai", "llm"]

[[rules]]
tag = "Remote"
keywords = ["remote"]
kinds = ["job"]

[[channels]]
source = "Nuxt"
tag = "Nuxt"
unless = ["AI"]
"#;

    fn article() -> TagContext<'static> {
        TagContext {
            kind: ContentKind::Article,
            source: None,
        }
    }

    fn set(tags: &[&str]) -> BTreeSet<String> {
        tags.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn word_boundaries_for_plain_keywords() {
        let c = TagClassifier::from_toml_str(TEST_TOML).unwrap();
        assert_eq!(c.classify("Vuex is dead", "", article()), set(&["Tech"]));
        assert_eq!(c.classify("Vue 3.5 released", "", article()), set(&["Vue.js"]));
        // "ai" must not fire inside "maintain"
        assert_eq!(c.classify("How to maintain forks", "", article()), set(&["Tech"]));
    }

    #[test]
    fn substring_for_keywords_with_symbols() {
        let c = TagClassifier::from_toml_str(TEST_TOML).unwrap();
        assert_eq!(c.classify("What's new in C# 13", "", article()), set(&["C#"]));
        assert_eq!(c.classify("Moving to ASP.NET", "", article()), set(&["C#"]));
    }

    #[test]
    fn kind_restricted_rules() {
        let c = TagClassifier::from_toml_str(TEST_TOML).unwrap();
        let job = TagContext {
            kind: ContentKind::Job,
            source: None,
        };
        assert_eq!(c.classify("Remote Vue dev", "", job), set(&["Remote", "Vue.js"]));
        assert_eq!(c.classify("Remote Vue dev", "", article()), set(&["Vue.js"]));
    }

    #[test]
    fn channel_rule_applies_unless_stronger_signal() {
        let c = TagClassifier::from_toml_str(TEST_TOML).unwrap();
        let nuxt = TagContext {
            kind: ContentKind::Video,
            source: Some("nuxt"),
        };
        assert_eq!(c.classify("Release party", "", nuxt), set(&["Nuxt"]));
        assert_eq!(c.classify("Building an LLM chat", "", nuxt), set(&["AI"]));
    }

    #[test]
    fn bad_config_is_reported_with_rule_name() {
        let err = TagClassifier::from_toml_str(
            r#"
[classifier]
fallback = "Tech"
[[rules]]
tag = "Empty"
keywords = []
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Empty"));
    }

    #[test]
    fn embedded_rules_compile() {
        let c = TagClassifier::embedded().unwrap();
        assert_eq!(c.fallback(), "Tech");
    }
}
