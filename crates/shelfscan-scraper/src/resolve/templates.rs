//! URL templates and search-query expansion.

use std::sync::LazyLock;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use shelfscan_core::{slugify, Identifier};

/// Tried in order when a site has no `search_url`.
pub const DEFAULT_SEARCH_TEMPLATES: &[&str] = &[
    "{base}/search?q={query}",
    "{base}/search?q={query}&type=product",
    "{base}/products?q={query}",
    "{base}/?s={query}",
    "{base}/shop/?s={query}",
];

/// Unreserved characters stay readable; everything else is escaped.
const QUERY_ENCODE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z_]+)\}").expect("valid placeholder regex"));

fn encode(value: &str) -> String {
    utf8_percent_encode(value, QUERY_ENCODE).to_string()
}

/// Replace every placeholder using `lookup`. Returns `None` if any
/// placeholder is unknown or resolves to an empty value.
fn expand(template: &str, base: &str, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    let template = template.trim();
    let template = if template.starts_with('/') {
        format!("{base}{template}")
    } else {
        template.to_string()
    };

    let mut out = String::with_capacity(template.len() + 32);
    let mut last = 0;
    for caps in PLACEHOLDER_RE.captures_iter(&template) {
        let whole = caps.get(0)?;
        let value = match &caps[1] {
            "base" | "base_url" => base.to_string(),
            other => lookup(other)?,
        };
        if value.is_empty() {
            return None;
        }
        out.push_str(&template[last..whole.start()]);
        out.push_str(&value);
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Some(out)
}

/// Product URL from a site's `url_pattern`.
///
/// Placeholders: `{base}`/`{base_url}`, `{code}`/`{upc}`, `{number}`,
/// `{name_slug}` and `{name}` (percent-encoded).
#[must_use]
pub fn expand_url_template(template: &str, base: &str, ident: &Identifier) -> Option<String> {
    expand(template, base, |key| match key {
        "code" | "upc" => Some(ident.code.clone()),
        "number" => Some(ident.number.clone()),
        "name_slug" => Some(slugify(&ident.name)),
        "name" => Some(encode(&ident.name)),
        _ => None,
    })
}

/// Search URL with `{query}`/`{q}` replaced by the encoded query.
#[must_use]
pub fn expand_search_template(template: &str, base: &str, query: &str) -> Option<String> {
    let encoded = encode(query.trim());
    expand(template, base, |key| match key {
        "query" | "q" => Some(encoded.clone()),
        _ => None,
    })
}

/// The full query, then its first 3, 2 and 1 words when it is longer.
#[must_use]
pub fn search_queries(query: &str) -> Vec<String> {
    let words: Vec<&str> = query.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    let mut queries = vec![words.join(" ")];
    for n in [3, 2, 1] {
        if words.len() > n {
            queries.push(words[..n].join(" "));
        }
    }
    queries
}
