//! Regex-level HTML helpers shared by the classifier, link scanner and extractors.
//!
//! These work on raw markup so they behave the same for plain HTTP bodies and
//! browser-serialized DOMs. Anything needing real selector matching lives in
//! [`crate::links`] and [`crate::extract`].

use std::sync::LazyLock;

use regex::Regex;
use reqwest::Url;

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").expect("valid title regex"));
static META_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid meta regex"));
static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<[^>]+>").expect("valid tags regex"));
static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(script|style|noscript)>")
        .expect("valid script regex")
});
static ENTITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]{2,8});").expect("valid entity regex")
});
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)([\w:.-]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("valid attribute regex")
});

pub(crate) const MAX_PAGE_TITLE_CHARS: usize = 200;

/// Value of `attr` inside a single tag, quote-aware. `src` never matches `data-src`.
pub(crate) fn extract_attr(tag: &str, attr: &str) -> Option<String> {
    ATTR_RE
        .captures_iter(tag)
        .find(|caps| caps[1].eq_ignore_ascii_case(attr))
        .and_then(|caps| {
            caps.get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map(|m| m.as_str().trim().to_string())
        })
}

/// Content of the first `<meta>` whose `property` or `name` equals `key`.
///
/// Attribute order does not matter. Tags with an empty `content` are ignored.
pub(crate) fn find_meta_content(html: &str, key: &str) -> Option<String> {
    META_TAG_RE.find_iter(html).find_map(|m| {
        let tag = m.as_str();
        let matches_key = ["property", "name", "itemprop"].iter().any(|attr| {
            extract_attr(tag, attr).is_some_and(|v| v.eq_ignore_ascii_case(key))
        });
        if !matches_key {
            return None;
        }
        let content = decode_entities(&extract_attr(tag, "content")?);
        let content = collapse_whitespace(&content);
        (!content.is_empty()).then_some(content)
    })
}

/// Text of the first `<title>`, entity-decoded, whitespace-collapsed and bounded.
pub(crate) fn page_title(html: &str) -> String {
    let Some(raw) = TITLE_RE.captures(html).and_then(|c| c.get(1)) else {
        return String::new();
    };
    let mut title = collapse_whitespace(&decode_entities(&strip_tags(raw.as_str())));
    shelfscan_core::record::truncate_chars(&mut title, MAX_PAGE_TITLE_CHARS);
    title
}

/// Visible text of an HTML fragment: scripts dropped, tags removed,
/// entities decoded and whitespace collapsed.
#[must_use]
pub fn clean_text(input: &str) -> String {
    let no_scripts = SCRIPT_STYLE_RE.replace_all(input, " ");
    collapse_whitespace(&decode_entities(&strip_tags(&no_scripts)))
}

fn strip_tags(input: &str) -> String {
    TAG_RE.replace_all(input, " ").into_owned()
}

pub(crate) fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode numeric entities and the named entities common in storefront copy.
/// Unknown entities are left as written.
pub(crate) fn decode_entities(input: &str) -> String {
    if !input.contains('&') {
        return input.to_string();
    }
    ENTITY_RE
        .replace_all(input, |caps: &regex::Captures<'_>| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body
                .strip_prefix("#x")
                .or_else(|| body.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                named_entity(body)
            };
            decoded.map_or_else(|| caps[0].to_string(), |c| c.to_string())
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<char> {
    let c = match name {
        "amp" => '&',
        "lt" => '<',
        "gt" => '>',
        "quot" => '"',
        "apos" => '\'',
        "nbsp" => ' ',
        "ndash" => '–',
        "mdash" => '—',
        "lsquo" => '‘',
        "rsquo" => '’',
        "ldquo" => '“',
        "rdquo" => '”',
        "hellip" => '…',
        "trade" => '™',
        "reg" => '®',
        "copy" => '©',
        "deg" => '°',
        "times" => '×',
        _ => return None,
    };
    Some(c)
}

/// Resolve `candidate` against `base_url`.
///
/// Protocol-relative URLs (`//cdn...`) resolve to `https:`. Fragments-only,
/// `javascript:`, `mailto:`, `tel:` and `data:` references yield `None`.
pub(crate) fn absolutize_url(base_url: &str, candidate: &str) -> Option<String> {
    let candidate = decode_entities(candidate.trim());
    if candidate.is_empty() || candidate.starts_with('#') {
        return None;
    }
    let lower = candidate.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }
    if let Some(rest) = candidate.strip_prefix("//") {
        return Url::parse(&format!("https://{rest}")).ok().map(String::from);
    }
    let base = Url::parse(base_url).ok()?;
    let joined = base.join(&candidate).ok()?;
    matches!(joined.scheme(), "http" | "https").then(|| joined.to_string())
}

/// Dedup key for a URL: scheme, host and path only, trailing slash removed,
/// lowercased. Falls back to stripping `?`/`#` by hand for unparseable input.
#[must_use]
pub fn canonical_key(url: &str) -> String {
    if let Ok(mut parsed) = Url::parse(url) {
        parsed.set_query(None);
        parsed.set_fragment(None);
        let path = parsed.path().to_string();
        if path.len() > 1 && path.ends_with('/') {
            parsed.set_path(path.trim_end_matches('/'));
        }
        return parsed.as_str().to_lowercase();
    }
    let stripped = url.split(['?', '#']).next().unwrap_or(url);
    stripped.trim_end_matches('/').to_lowercase()
}

/// First host label with `www.` stripped: `https://www.acmetoys.com` → `acmetoys`.
#[must_use]
pub fn host_token(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    host.split('.')
        .next()
        .filter(|label| !label.is_empty())
        .map(str::to_string)
}

pub(crate) fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}
