// src/ingest/providers/json_api.rs
//! JSON array APIs: job boards (RemoteOK shape) and blog APIs (DEV shape).
use serde_json::Value;

use crate::ingest::error::FetchError;
use crate::ingest::http::{FetchRequest, HttpFetch};
use crate::ingest::types::{JsonRawItem, RawItem};

/// Present on metadata/legal entries some APIs prepend to the array.
const NON_ITEM_MARKERS: &[&str] = &["legal"];

pub async fn fetch(
    http: &dyn HttpFetch,
    req: FetchRequest<'_>,
    limit: usize,
) -> Result<Vec<RawItem>, FetchError> {
    let body = http.get_text(req).await?;
    parse_items_from_str(&body, limit)
}

pub fn parse_items_from_str(s: &str, limit: usize) -> Result<Vec<RawItem>, FetchError> {
    let root: Value = serde_json::from_str(s).map_err(|e| FetchError::parse(format!("json: {e}")))?;
    let arr = match root {
        Value::Array(a) => a,
        other => {
            return Err(FetchError::parse(format!(
                "expected a JSON array, got {}",
                kind_name(&other)
            )))
        }
    };

    let mut out = Vec::with_capacity(arr.len().min(limit));
    for v in arr {
        if out.len() >= limit {
            break;
        }
        let Some(obj) = v.as_object() else {
            continue;
        };
        if NON_ITEM_MARKERS.iter().any(|m| obj.contains_key(*m)) {
            continue;
        }
        out.push(RawItem::Json(item_from_value(&v)));
    }
    Ok(out)
}

fn item_from_value(v: &Value) -> JsonRawItem {
    JsonRawItem {
        title: first_str(v, &["position", "title"]),
        link: first_str(v, &["apply_url", "url"]),
        published: first_str(v, &["date", "published_at", "published_timestamp"]),
        description: first_str(v, &["description"]),
        company: first_str(v, &["company"]),
        location: first_str(v, &["location"]),
        salary_min: number(v.get("salary_min")),
        salary_max: number(v.get("salary_max")),
        tags: strings(v.get("tags")).or_else(|| strings(v.get("tag_list"))).unwrap_or_default(),
        image: first_str(v, &["cover_image", "company_logo", "social_image", "logo"]),
        author: v
            .get("user")
            .and_then(|u| u.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

/// First key holding a non-blank string.
fn first_str(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| v.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Numbers may arrive as JSON numbers or numeric strings.
fn number(v: Option<&Value>) -> Option<f64> {
    let n = match v? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|v| v.is_finite())
}

/// Array of strings, or a comma-separated string.
fn strings(v: Option<&Value>) -> Option<Vec<String>> {
    let out: Vec<String> = match v? {
        Value::Array(a) => a
            .iter()
            .filter_map(Value::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        _ => return None,
    };
    (!out.is_empty()).then_some(out)
}

fn kind_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
