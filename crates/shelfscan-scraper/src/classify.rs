//! Page classification on static markup.
//!
//! [`classify`] decides what a fetched page is and captures every structured
//! signal it carries, so later stages never re-parse the HTML for them.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use shelfscan_core::PageType;

use crate::html::{find_meta_content, page_title};
use crate::jsonld::{find_product, StructuredProduct};

/// Bodies shorter than this are error stubs or challenge shells.
pub const MIN_VIABLE_LEN: usize = 200;

const STATUS_WINDOW: usize = 1500;
const FORBIDDEN_WINDOW: usize = 2000;
const CAPTCHA_WINDOW: usize = 3000;
const INDEX_WINDOW: usize = 12_000;

const CHALLENGE_MARKERS: &[&str] = &[
    "just a moment",
    "/cdn-cgi/challenge-platform/",
    "cf-chl",
    "attention required",
];

const NOT_FOUND_PHRASES: &[&str] = &[
    "404",
    "not found",
    "page not found",
    "doesn't exist",
    "does not exist",
    "no longer available",
];

static STATUS_403_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b403\b").expect("valid 403 regex"));
static HREF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)\bhref\s*=\s*["']([^"']+)["']"#).expect("valid href regex")
});
static SHOPIFY_INDEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)["']?pageType["']?\s*:\s*["']index["']"#).expect("valid page type regex")
});

/// Open Graph values, captured whatever the final page type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OgFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub image_secure: Option<String>,
}

/// Everything the pipeline learns from one fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PageSignature {
    pub page_type: PageType,
    /// First `<title>`, whitespace-collapsed and bounded. Empty when absent.
    pub title: String,
    pub structured_product: Option<StructuredProduct>,
    pub og: OgFields,
    pub meta_description: Option<String>,
    /// Anchors whose href looks like a product page.
    pub product_link_count: usize,
    pub raw_size: usize,
    /// Why the page was classified blocked, when it was.
    pub block_reason: Option<String>,
}

impl PageSignature {
    /// Title used for genericity checks: `<title>`, else `og:title`.
    #[must_use]
    pub fn effective_title(&self) -> &str {
        if self.title.is_empty() {
            self.og.title.as_deref().unwrap_or("")
        } else {
            &self.title
        }
    }

    /// The image a share preview would show.
    #[must_use]
    pub fn og_image(&self) -> Option<&str> {
        self.og
            .image_secure
            .as_deref()
            .or(self.og.image.as_deref())
    }

    /// Page-level description: `og:description`, else meta description.
    #[must_use]
    pub fn page_description(&self) -> Option<&str> {
        self.og
            .description
            .as_deref()
            .or(self.meta_description.as_deref())
    }

    #[must_use]
    pub fn is_product(&self) -> bool {
        self.page_type == PageType::Product
    }
}

/// Classify with the default product-path heuristic.
#[must_use]
pub fn classify(html: &str) -> PageSignature {
    classify_with_markers(html, &[])
}

/// Classify, counting hrefs that contain any of `extra_markers` as product
/// links in addition to `/product/` and `/products/`.
#[must_use]
pub fn classify_with_markers(html: &str, extra_markers: &[String]) -> PageSignature {
    let mut sig = PageSignature {
        raw_size: html.len(),
        title: page_title(html),
        ..PageSignature::default()
    };

    if let Some(reason) = block_reason(html) {
        sig.page_type = PageType::Blocked;
        sig.block_reason = Some(reason);
        return sig;
    }

    sig.og = OgFields {
        title: find_meta_content(html, "og:title"),
        description: find_meta_content(html, "og:description"),
        image: find_meta_content(html, "og:image"),
        image_secure: find_meta_content(html, "og:image:secure_url"),
    };
    sig.meta_description = find_meta_content(html, "description");
    sig.structured_product = find_product(html);
    sig.product_link_count = count_product_links(html, extra_markers);

    sig.page_type = if sig.structured_product.is_some()
        || (sig.og.title.is_some() && sig.og.image.is_some())
    {
        PageType::Product
    } else if is_not_found_title(&sig.title) {
        PageType::NotFound
    } else if is_shopify_index(html) {
        PageType::Index
    } else if sig.product_link_count > 0 {
        PageType::Search
    } else {
        PageType::Unknown
    };

    sig
}

fn block_reason(html: &str) -> Option<String> {
    if html.trim().chars().count() < MIN_VIABLE_LEN {
        return Some(format!("body shorter than {MIN_VIABLE_LEN} chars"));
    }
    if STATUS_403_RE.is_match(prefix(html, STATUS_WINDOW)) {
        return Some("403 marker".to_string());
    }
    let head = prefix(html, FORBIDDEN_WINDOW);
    if head.contains("Forbidden") {
        return Some("Forbidden marker".to_string());
    }
    if head.to_ascii_lowercase().contains("sgcaptcha") {
        return Some("sgcaptcha challenge".to_string());
    }
    let wide = prefix(html, CAPTCHA_WINDOW).to_ascii_lowercase();
    if wide.contains("captcha") {
        return Some("captcha marker".to_string());
    }
    CHALLENGE_MARKERS
        .iter()
        .find(|marker| wide.contains(*marker))
        .map(|marker| format!("bot challenge ({marker})"))
}

/// The first `max_chars` characters of `s`.
fn prefix(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn is_not_found_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    NOT_FOUND_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

fn is_shopify_index(html: &str) -> bool {
    SHOPIFY_INDEX_RE.is_match(prefix(html, INDEX_WINDOW))
}

pub(crate) fn is_product_href(href: &str, extra_markers: &[String]) -> bool {
    let lower = href.to_ascii_lowercase();
    lower.contains("/product/")
        || lower.contains("/products/")
        || extra_markers
            .iter()
            .any(|m| !m.is_empty() && lower.contains(&m.to_ascii_lowercase()))
}

fn count_product_links(html: &str, extra_markers: &[String]) -> usize {
    HREF_RE
        .captures_iter(html)
        .filter_map(|cap| cap.get(1))
        .filter(|m| is_product_href(m.as_str(), extra_markers))
        .count()
}

#[cfg(test)]
#[path = "classify_test.rs"]
mod tests;
