//! WooCommerce Store API and WordPress REST product listings.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use super::catalog_description;
use crate::catalog::CatalogEntry;
use crate::error::ScraperError;
use crate::fetch::{FetchKind, Fetcher};
use crate::html::clean_text;

pub const PER_PAGE: usize = 100;
pub const MAX_PAGES: usize = 200;

pub const STORE_API_PATH: &str = "/wp-json/wc/store/v1/products";
pub const WP_REST_PATH: &str = "/wp-json/wp/v2/product";

#[derive(Debug, Clone, Deserialize)]
pub struct StoreApiProduct {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub images: Vec<StoreApiImage>,
    #[serde(default)]
    pub sku: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreApiImage {
    pub src: String,
}

impl StoreApiProduct {
    #[must_use]
    pub fn into_entry(self) -> CatalogEntry {
        let mut entry = CatalogEntry::new(&clean_text(&self.name), &self.permalink);
        let description = if self.description.trim().is_empty() {
            &self.short_description
        } else {
            &self.description
        };
        entry.description = catalog_description(description);
        entry.image_urls = self
            .images
            .into_iter()
            .map(|img| img.src)
            .filter(|src| !src.trim().is_empty())
            .collect();
        entry.add_barcode(&self.sku);
        entry
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WpProduct {
    pub title: Rendered,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub excerpt: Option<Rendered>,
    #[serde(default)]
    pub content: Option<Rendered>,
    #[serde(default, rename = "_embedded")]
    pub embedded: Option<Value>,
}

impl WpProduct {
    #[must_use]
    pub fn into_entry(self) -> CatalogEntry {
        let mut entry = CatalogEntry::new(&clean_text(&self.title.rendered), &self.link);
        let excerpt = self.excerpt.map(|r| r.rendered).unwrap_or_default();
        let description = if clean_text(&excerpt).is_empty() {
            self.content.map(|r| r.rendered).unwrap_or_default()
        } else {
            excerpt
        };
        entry.description = catalog_description(&description);
        if let Some(src) = self
            .embedded
            .as_ref()
            .and_then(|e| e.get("wp:featuredmedia"))
            .and_then(|media| media.get(0))
            .and_then(|m| m.get("source_url"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
        {
            entry.image_urls.push(src.to_string());
        }
        entry
    }
}

/// Which WordPress listing a site exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WpFlavor {
    StoreApi,
    WpRest,
}

impl WpFlavor {
    fn page_url(self, base: &str, page: usize, per_page: usize) -> String {
        match self {
            WpFlavor::StoreApi => format!("{base}{STORE_API_PATH}?per_page={per_page}&page={page}"),
            WpFlavor::WpRest => {
                format!("{base}{WP_REST_PATH}?per_page={per_page}&page={page}&_embed")
            }
        }
    }

    fn parse(self, body: &str, url: &str) -> Result<Vec<CatalogEntry>, ScraperError> {
        let wrap = |e| ScraperError::Deserialize {
            context: format!("product listing {url}"),
            source: e,
        };
        Ok(match self {
            WpFlavor::StoreApi => serde_json::from_str::<Vec<StoreApiProduct>>(body)
                .map_err(wrap)?
                .into_iter()
                .map(StoreApiProduct::into_entry)
                .collect(),
            WpFlavor::WpRest => serde_json::from_str::<Vec<WpProduct>>(body)
                .map_err(wrap)?
                .into_iter()
                .map(WpProduct::into_entry)
                .collect(),
        })
    }
}

/// `true` when the first single-item page parses as a product list.
pub async fn probe<F: Fetcher>(fetcher: &F, base: &str, flavor: WpFlavor) -> bool {
    let url = flavor.page_url(base, 1, 1);
    match fetcher.fetch(&url, FetchKind::Resource).await {
        Ok(page) => flavor.parse(&page.body, &url).is_ok(),
        Err(e) => {
            tracing::debug!(url, error = %e, "wordpress probe failed");
            false
        }
    }
}

/// Every product page by page until a short or empty page.
///
/// WordPress answers 400 past the last page; a client error after the first
/// page ends the listing rather than failing it.
///
/// # Errors
///
/// Propagates fetch and parse errors, and returns
/// [`ScraperError::PaginationLimit`] after [`MAX_PAGES`] pages.
pub async fn fetch_catalog<F: Fetcher>(
    fetcher: &F,
    base: &str,
    flavor: WpFlavor,
    inter_request_delay: Duration,
) -> Result<Vec<CatalogEntry>, ScraperError> {
    let mut entries = Vec::new();
    for page in 1..=MAX_PAGES {
        if page > 1 && !inter_request_delay.is_zero() {
            tokio::time::sleep(inter_request_delay).await;
        }
        let url = flavor.page_url(base, page, PER_PAGE);
        let fetched = match fetcher.fetch(&url, FetchKind::Resource).await {
            Ok(fetched) => fetched,
            Err(e) if page > 1 && e.is_missing() => break,
            Err(e) => return Err(e),
        };
        let batch = flavor.parse(&fetched.body, &url)?;
        let count = batch.len();
        entries.extend(batch);
        if count < PER_PAGE {
            return Ok(entries);
        }
    }
    if entries.len() >= PER_PAGE * MAX_PAGES {
        return Err(ScraperError::PaginationLimit {
            url: flavor.page_url(base, MAX_PAGES + 1, PER_PAGE),
            max_pages: MAX_PAGES,
        });
    }
    Ok(entries)
}
