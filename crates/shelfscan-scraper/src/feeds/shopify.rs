//! Shopify's public `products.json` feed.

use std::collections::HashSet;
use std::time::Duration;

use serde::Deserialize;

use super::pagination::extract_next_cursor;
use super::{catalog_description, store_origin};
use crate::catalog::CatalogEntry;
use crate::error::ScraperError;
use crate::fetch::{FetchKind, Fetcher};

/// Products requested per page; Shopify's maximum.
pub const PAGE_LIMIT: u32 = 250;
/// Hard stop against stores that cycle cursors or ignore `page`.
pub const MAX_PAGES: usize = 200;

#[derive(Debug, Deserialize)]
pub struct ShopifyProductsResponse {
    pub products: Vec<ShopifyProduct>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyProduct {
    pub id: i64,
    pub title: String,
    pub handle: String,
    #[serde(default)]
    pub body_html: Option<String>,
    #[serde(default)]
    pub images: Vec<ShopifyImage>,
    #[serde(default)]
    pub variants: Vec<ShopifyVariant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyImage {
    pub src: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ShopifyVariant {
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub barcode: Option<String>,
}

impl ShopifyProduct {
    #[must_use]
    pub fn into_entry(self, origin: &str) -> CatalogEntry {
        let mut entry = CatalogEntry::new(&self.title, &format!("{origin}/products/{}", self.handle));
        entry.description = catalog_description(self.body_html.as_deref().unwrap_or_default());
        entry.image_urls = self
            .images
            .into_iter()
            .map(|img| img.src.trim().to_string())
            .filter(|src| !src.is_empty())
            .map(|src| match src.strip_prefix("//") {
                Some(rest) => format!("https://{rest}"),
                None => src,
            })
            .collect();
        for variant in &self.variants {
            for code in [&variant.barcode, &variant.sku].into_iter().flatten() {
                entry.add_barcode(code);
            }
        }
        entry
    }
}

fn parse_page(body: &str, url: &str) -> Result<ShopifyProductsResponse, ScraperError> {
    serde_json::from_str(body).map_err(|e| ScraperError::Deserialize {
        context: format!("products page {url}"),
        source: e,
    })
}

/// `true` when `{origin}/products.json?limit=1` answers with a product list.
pub async fn probe<F: Fetcher>(fetcher: &F, base_url: &str) -> bool {
    let url = format!("{}/products.json?limit=1", store_origin(base_url));
    match fetcher.fetch(&url, FetchKind::Resource).await {
        Ok(page) => parse_page(&page.body, &url).is_ok(),
        Err(e) => {
            tracing::debug!(url, error = %e, "shopify probe failed");
            false
        }
    }
}

fn page_url(origin: &str, cursor: Option<&str>, page: usize) -> String {
    match cursor {
        Some(cursor) => match reqwest::Url::parse(&format!("{origin}/products.json")) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("limit", &PAGE_LIMIT.to_string())
                    .append_pair("page_info", cursor);
                url.to_string()
            }
            Err(_) => format!("{origin}/products.json?limit={PAGE_LIMIT}&page_info={cursor}"),
        },
        None if page > 1 => format!("{origin}/products.json?limit={PAGE_LIMIT}&page={page}"),
        None => format!("{origin}/products.json?limit={PAGE_LIMIT}"),
    }
}

/// Every product in the store.
///
/// Follows `Link` cursors when the store sends them and falls back to
/// `&page=N` otherwise. Stops on an empty page or on a page that adds no new
/// product ids.
///
/// # Errors
///
/// Propagates fetch and parse errors from any page, and returns
/// [`ScraperError::PaginationLimit`] after [`MAX_PAGES`] pages.
pub async fn fetch_all<F: Fetcher>(
    fetcher: &F,
    base_url: &str,
    inter_request_delay: Duration,
) -> Result<Vec<ShopifyProduct>, ScraperError> {
    let origin = store_origin(base_url);
    let mut products = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut cursor: Option<String> = None;
    let mut page = 1usize;

    loop {
        if page > MAX_PAGES {
            return Err(ScraperError::PaginationLimit {
                url: origin,
                max_pages: MAX_PAGES,
            });
        }
        if page > 1 && !inter_request_delay.is_zero() {
            tokio::time::sleep(inter_request_delay).await;
        }

        let url = page_url(&origin, cursor.as_deref(), page);
        let fetched = fetcher.fetch(&url, FetchKind::Resource).await?;
        let batch = parse_page(&fetched.body, &url)?.products;
        if batch.is_empty() {
            break;
        }

        let before = products.len();
        for product in batch {
            if seen_ids.insert(product.id) {
                products.push(product);
            }
        }
        if products.len() == before {
            tracing::debug!(url, "page repeated earlier products; stopping");
            break;
        }

        cursor = extract_next_cursor(fetched.link_header.as_deref());
        page += 1;
    }

    tracing::debug!(origin, count = products.len(), pages = page, "shopify feed read");
    Ok(products)
}

/// The whole store as catalog entries.
///
/// # Errors
///
/// See [`fetch_all`].
pub async fn fetch_catalog<F: Fetcher>(
    fetcher: &F,
    base_url: &str,
    inter_request_delay: Duration,
) -> Result<Vec<CatalogEntry>, ScraperError> {
    let origin = store_origin(base_url);
    let products = fetch_all(fetcher, base_url, inter_request_delay).await?;
    Ok(products.into_iter().map(|p| p.into_entry(&origin)).collect())
}
