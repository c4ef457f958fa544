//! Guards against accepting storefront boilerplate as product data.
//!
//! Many sites answer any unknown URL with the home page, or with a page that
//! carries only site-wide Open Graph tags. Without this filter every row of a
//! run would receive the same title and image.

use std::collections::HashMap;

use serde::Serialize;

use crate::classify::PageSignature;
use crate::html::host_token;

/// Titles at least this long are never treated as a bare store name.
const SHORT_TITLE_CHARS: usize = 50;

const GENERIC_SUFFIXES: &[&str] = &[
    " toy shop",
    " store",
    " shop",
    " distribution",
    " productions",
    " games, inc.",
    " - official",
];

/// Reference values taken from the site's home page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Baseline {
    pub title: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
}

impl Baseline {
    #[must_use]
    pub fn from_signature(sig: &PageSignature) -> Self {
        let non_empty = |s: &str| {
            let t = s.trim();
            (!t.is_empty()).then(|| t.to_string())
        };
        Self {
            title: non_empty(sig.effective_title()),
            image: sig.og_image().and_then(non_empty),
            description: sig.page_description().and_then(non_empty),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.image.is_none() && self.description.is_none()
    }

    #[must_use]
    pub fn matches_title(&self, title: &str) -> bool {
        self.title
            .as_deref()
            .is_some_and(|b| b.trim().to_lowercase() == title.trim().to_lowercase())
    }

    #[must_use]
    pub fn matches_image(&self, image: &str) -> bool {
        self.image.as_deref().is_some_and(|b| b.trim() == image.trim())
    }

    #[must_use]
    pub fn matches_description(&self, description: &str) -> bool {
        self.description
            .as_deref()
            .is_some_and(|b| b.trim() == description.trim())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenericReason {
    BaselineTitle,
    RepeatedTitle,
    BaselineImage,
    DenylistedTitle,
    HostnameTitle,
}

/// Per-site genericity state. Owned by one site run; never shared.
#[derive(Debug, Clone)]
pub struct GenericityFilter {
    baseline: Baseline,
    host_token: Option<String>,
    /// Accepted title → product id that first claimed it.
    seen_titles: HashMap<String, String>,
}

impl GenericityFilter {
    #[must_use]
    pub fn new(baseline: Baseline, base_url: &str) -> Self {
        Self {
            baseline,
            host_token: host_token(base_url),
            seen_titles: HashMap::new(),
        }
    }

    #[must_use]
    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen_titles.len()
    }

    /// Record a title accepted outside this filter (e.g. a resumed row).
    pub fn remember(&mut self, title: &str, product_id: &str) {
        let title = title.trim();
        if !title.is_empty() {
            self.seen_titles
                .entry(title.to_string())
                .or_insert_with(|| product_id.to_string());
        }
    }

    #[must_use]
    pub fn is_generic(&mut self, sig: &PageSignature, product_id: &str) -> bool {
        self.check(sig, product_id).is_some()
    }

    /// Decide whether `sig` is boilerplate for `product_id`.
    ///
    /// Rules, first applicable wins:
    /// 1. no title: not generic
    /// 2. title equals the baseline title: generic
    /// 3. title already accepted for a different product: generic
    /// 4. JSON-LD product present: not generic
    /// 5. image equals the baseline image and the description is absent or
    ///    equals the baseline description: generic
    /// 6. short title ending in a store-like suffix or naming the host: generic
    ///
    /// A title that passes is remembered for later rows.
    pub fn check(&mut self, sig: &PageSignature, product_id: &str) -> Option<GenericReason> {
        let title = sig.effective_title().trim();
        if title.is_empty() {
            return None;
        }

        if self.baseline.matches_title(title) {
            return Some(GenericReason::BaselineTitle);
        }

        if let Some(owner) = self.seen_titles.get(title) {
            if owner != product_id {
                return Some(GenericReason::RepeatedTitle);
            }
        }

        if sig.structured_product.is_none() {
            if let Some(reason) = self.boilerplate_reason(sig, title) {
                return Some(reason);
            }
        }

        self.remember(title, product_id);
        None
    }

    fn boilerplate_reason(&self, sig: &PageSignature, title: &str) -> Option<GenericReason> {
        let image_matches = sig
            .og_image()
            .is_some_and(|img| self.baseline.matches_image(img));
        if image_matches {
            let description_matches = sig
                .page_description()
                .is_none_or(|d| self.baseline.matches_description(d));
            if description_matches {
                return Some(GenericReason::BaselineImage);
            }
        }

        if title.chars().count() < SHORT_TITLE_CHARS {
            let lower = title.to_lowercase();
            if GENERIC_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
                return Some(GenericReason::DenylistedTitle);
            }
            if let Some(host) = &self.host_token {
                if lower.contains(host.as_str()) {
                    return Some(GenericReason::HostnameTitle);
                }
            }
        }

        None
    }
}

#[cfg(test)]
#[path = "generic_test.rs"]
mod tests;
