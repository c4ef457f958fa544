//! schema.org `Product` discovery in `application/ld+json` blocks.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

static JSONLD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<script\b[^>]*type\s*=\s*["']?application/ld\+json["']?[^>]*>(.*?)</script>"#,
    )
    .expect("valid json-ld regex")
});

/// A `{value, unitCode}` quantity as written on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Measure {
    pub value: String,
    pub unit: Option<String>,
}

/// The fields of a JSON-LD `Product` the pipeline cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StructuredProduct {
    /// The `name` field, verbatim.
    pub name: String,
    pub description: Option<String>,
    /// Every image URL in document order.
    pub images: Vec<String>,
    pub weight: Option<Measure>,
    pub width: Option<Measure>,
    pub height: Option<Measure>,
    pub depth: Option<Measure>,
    /// `gtin13`/`gtin12`/`gtin`/`sku`, whichever appears first.
    pub gtin: Option<String>,
}

impl StructuredProduct {
    #[must_use]
    pub fn image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// First `Product` found across all JSON-LD blocks, in document order.
///
/// A block may hold a single object, an array, or an object with `@graph`.
/// Blocks that do not parse are skipped.
pub(crate) fn find_product(html: &str) -> Option<StructuredProduct> {
    JSONLD_RE
        .captures_iter(html)
        .filter_map(|cap| cap.get(1))
        .filter_map(|m| parse_block(m.as_str()))
        .find_map(|value| first_product(&value).map(product_from_value))
}

fn parse_block(raw: &str) -> Option<Value> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("<!--")
        .and_then(|s| s.strip_suffix("-->"))
        .map_or(trimmed, str::trim);
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "skipping malformed json-ld block");
            None
        }
    }
}

fn first_product(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(items) => items.iter().find(|item| is_product(item)),
        Value::Object(map) => {
            if is_product(value) {
                return Some(value);
            }
            map.get("@graph")
                .and_then(Value::as_array)
                .and_then(|items| items.iter().find(|item| is_product(item)))
        }
        _ => None,
    }
}

fn is_product(value: &Value) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => type_is_product(t),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(type_is_product),
        _ => false,
    }
}

fn type_is_product(t: &str) -> bool {
    t == "Product" || t == "http://schema.org/Product" || t == "https://schema.org/Product"
}

fn product_from_value(value: &Value) -> StructuredProduct {
    let text = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let gtin = ["gtin13", "gtin12", "gtin14", "gtin", "sku"]
        .iter()
        .find_map(|key| scalar_string(value.get(*key)?));

    StructuredProduct {
        name: value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        description: text("description"),
        images: value.get("image").map(collect_images).unwrap_or_default(),
        weight: value.get("weight").and_then(measure),
        width: value.get("width").and_then(measure),
        height: value.get("height").and_then(measure),
        depth: value.get("depth").and_then(measure),
        gtin,
    }
}

fn collect_images(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    let mut push = |v: &Value| {
        let url = match v {
            Value::String(s) => Some(s.as_str()),
            Value::Object(_) => v
                .get("url")
                .or_else(|| v.get("contentUrl"))
                .and_then(Value::as_str),
            _ => None,
        };
        if let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) {
            out.push(url.to_string());
        }
    };
    match value {
        Value::Array(items) => items.iter().for_each(&mut push),
        other => push(other),
    }
    out
}

fn measure(value: &Value) -> Option<Measure> {
    let (raw_value, unit) = match value {
        Value::Object(_) => (
            value.get("value")?,
            value
                .get("unitCode")
                .or_else(|| value.get("unitText"))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string),
        ),
        scalar => (scalar, None),
    };
    let value = scalar_string(raw_value)?;
    Some(Measure { value, unit })
}

fn scalar_string(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}
