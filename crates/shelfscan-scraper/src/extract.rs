//! Extraction adapters: a verified product page to the output fields.
//!
//! [`GenericAdapter`] prefers JSON-LD, then Open Graph, then the meta
//! description. [`SelectorAdapter`] layers per-site CSS overrides from
//! `sites.yaml` on top of it.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use shelfscan_core::{ExtractOverrides, ExtractionRecord, RecordStatus, SiteConfig};

use crate::classify::PageSignature;
use crate::error::ScraperError;
use crate::generic::Baseline;
use crate::html::{absolutize_url, canonical_key, clean_text, collapse_whitespace, decode_entities};
use crate::jsonld::{Measure, StructuredProduct};

const DEFAULT_WEIGHT_UNIT: &str = "g";
const IMAGE_ATTRS: &[&str] = &["src", "data-src", "data-zoom-image", "data-large_image"];

static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("valid img selector"));

/// The five output fields plus where they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedFields {
    pub title: String,
    pub description: String,
    pub image_urls: Vec<String>,
    pub dimensions: String,
    pub description_from_jsonld: bool,
    pub image_from_jsonld: bool,
}

impl ExtractedFields {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.description.is_empty() && self.image_urls.is_empty()
    }

    /// Drop a description or primary image that merely repeats the home
    /// page's, unless JSON-LD supplied it.
    pub fn scrub(&mut self, baseline: &Baseline) {
        if !self.description_from_jsonld && baseline.matches_description(&self.description) {
            self.description.clear();
        }
        if !self.image_from_jsonld {
            let primary_is_boilerplate = self
                .image_urls
                .first()
                .is_some_and(|img| baseline.matches_image(img));
            if primary_is_boilerplate {
                self.image_urls.remove(0);
            }
        }
    }

    #[must_use]
    pub fn into_record(
        self,
        product_id: &str,
        page_type: &str,
        product_url: &str,
        strategy: &str,
    ) -> ExtractionRecord {
        let mut record = ExtractionRecord {
            product_id: product_id.to_string(),
            title: self.title,
            description: self.description,
            image_url: String::new(),
            image_urls: self.image_urls,
            dimensions: self.dimensions,
            page_type: page_type.to_string(),
            product_url: product_url.to_string(),
            strategy: strategy.to_string(),
            status: RecordStatus::Resolved,
        };
        record.apply_limits();
        record
    }
}

/// Maps a verified product page to output fields.
pub trait ExtractionAdapter: Send + Sync {
    fn extract(&self, sig: &PageSignature, html: &str, page_url: &str) -> ExtractedFields;
}

/// Structured data first, then Open Graph, then meta tags. Never invents values.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericAdapter;

impl ExtractionAdapter for GenericAdapter {
    fn extract(&self, sig: &PageSignature, _html: &str, page_url: &str) -> ExtractedFields {
        let product = sig.structured_product.as_ref();
        let mut fields = ExtractedFields::default();

        fields.title = product
            .map(|p| clean_inline(&p.name))
            .filter(|t| !t.is_empty())
            .or_else(|| sig.og.title.clone())
            .unwrap_or_else(|| sig.title.clone());

        match product.and_then(|p| p.description.as_deref()).map(clean_text) {
            Some(d) if !d.is_empty() => {
                fields.description = d;
                fields.description_from_jsonld = true;
            }
            _ => fields.description = sig.page_description().unwrap_or_default().to_string(),
        }

        let jsonld_images: Vec<String> = product
            .map(|p| p.images.iter().filter_map(|u| absolutize_url(page_url, u)).collect())
            .unwrap_or_default();
        if jsonld_images.is_empty() {
            fields.image_urls = sig
                .og_image()
                .and_then(|u| absolutize_url(page_url, u))
                .into_iter()
                .collect();
        } else {
            fields.image_urls = dedupe_urls(jsonld_images);
            fields.image_from_jsonld = true;
        }

        fields.dimensions = product.map(format_dimensions).unwrap_or_default();
        fields
    }
}

/// Generic extraction with per-site CSS overrides.
#[derive(Debug, Clone)]
pub struct SelectorAdapter {
    description: Option<Selector>,
    images: Option<Selector>,
    exclude_markers: Vec<String>,
}

impl SelectorAdapter {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidSelector`] if either selector does not parse.
    pub fn new(overrides: &ExtractOverrides) -> Result<Self, ScraperError> {
        let parse = |raw: &Option<String>| -> Result<Option<Selector>, ScraperError> {
            raw.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    Selector::parse(s).map_err(|e| ScraperError::InvalidSelector {
                        selector: s.to_string(),
                        reason: format!("{e:?}"),
                    })
                })
                .transpose()
        };
        Ok(Self {
            description: parse(&overrides.description_selector)?,
            images: parse(&overrides.image_selector)?,
            exclude_markers: overrides
                .exclude_image_markers
                .iter()
                .map(|m| m.to_ascii_lowercase())
                .filter(|m| !m.is_empty())
                .collect(),
        })
    }

    fn excluded(&self, haystack: &str) -> bool {
        let lower = haystack.to_ascii_lowercase();
        self.exclude_markers.iter().any(|m| lower.contains(m.as_str()))
    }

    fn selector_images(&self, document: &Html, page_url: &str) -> Vec<String> {
        let Some(selector) = &self.images else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for matched in document.select(selector) {
            let candidates: Vec<_> = if matched.value().name() == "img" {
                vec![matched]
            } else {
                matched.select(&IMG_SELECTOR).collect()
            };
            for element in candidates {
                let el = element.value();
                let context = format!(
                    "{} {}",
                    el.attr("class").unwrap_or_default(),
                    el.attr("alt").unwrap_or_default()
                );
                let Some(raw) = IMAGE_ATTRS.iter().find_map(|a| el.attr(a)) else {
                    continue;
                };
                if self.excluded(raw) || self.excluded(&context) {
                    continue;
                }
                if let Some(url) = absolutize_url(page_url, raw) {
                    out.push(url);
                }
            }
        }
        out
    }
}

impl ExtractionAdapter for SelectorAdapter {
    fn extract(&self, sig: &PageSignature, html: &str, page_url: &str) -> ExtractedFields {
        let mut fields = GenericAdapter.extract(sig, html, page_url);
        if self.description.is_none() && self.images.is_none() {
            return fields;
        }
        let document = Html::parse_document(html);

        if let Some(selector) = &self.description {
            let text = document
                .select(selector)
                .map(|el| clean_text(&el.inner_html()))
                .find(|t| !t.is_empty());
            if let Some(text) = text {
                fields.description = text;
                fields.description_from_jsonld = false;
            }
        }

        let extra = self.selector_images(&document, page_url);
        if !extra.is_empty() {
            let mut all = std::mem::take(&mut fields.image_urls);
            all.extend(extra);
            fields.image_urls = dedupe_urls(all);
        }
        fields
    }
}

/// The adapter a site's configuration asks for.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidSelector`] for unparseable override selectors.
pub fn adapter_for(site: &SiteConfig) -> Result<Box<dyn ExtractionAdapter>, ScraperError> {
    match &site.extract {
        Some(overrides) => Ok(Box::new(SelectorAdapter::new(overrides)?)),
        None => Ok(Box::new(GenericAdapter)),
    }
}

/// Deduplicate by canonical key, keeping first-seen order.
#[must_use]
pub fn dedupe_urls(urls: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    urls.into_iter()
        .filter(|u| seen.insert(canonical_key(u)))
        .collect()
}

fn clean_inline(text: &str) -> String {
    collapse_whitespace(&decode_entities(text))
}

/// `Weight: 250 g; Size: 10 x 20 x 5 cm` from whatever JSON-LD carries.
#[must_use]
pub fn format_dimensions(product: &StructuredProduct) -> String {
    let mut parts = Vec::new();
    if let Some(weight) = &product.weight {
        parts.push(format_weight(weight));
    }
    let sizes: Vec<&Measure> = [&product.width, &product.height, &product.depth]
        .into_iter()
        .flatten()
        .collect();
    if !sizes.is_empty() {
        let values = sizes.iter().map(|m| m.value.as_str()).collect::<Vec<_>>().join(" x ");
        match sizes.iter().find_map(|m| m.unit.as_deref()) {
            Some(unit) => parts.push(format!("Size: {values} {unit}")),
            None => parts.push(format!("Size: {values}")),
        }
    }
    parts.join("; ")
}

fn format_weight(weight: &Measure) -> String {
    let numeric = weight.value.parse::<f64>().is_ok();
    match (&weight.unit, numeric) {
        (Some(unit), _) => format!("Weight: {} {unit}", weight.value),
        // Scalar strings such as "1.2 lbs" already carry their unit.
        (None, true) => format!("Weight: {} {DEFAULT_WEIGHT_UNIT}", weight.value),
        (None, false) => format!("Weight: {}", weight.value),
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
