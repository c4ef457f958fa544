//! Bulk catalog feeds exposed by common storefront platforms.
//!
//! A platform is detected by a fixed-path probe; its full listing is then
//! read once per site run and handed to the catalog matcher.

pub mod pagination;
pub mod shopify;
pub mod woo;

use std::time::Duration;

use serde::Serialize;
use shelfscan_core::record::truncate_chars;

use crate::catalog::CatalogEntry;
use crate::error::ScraperError;
use crate::fetch::Fetcher;
use crate::html::clean_text;
use woo::WpFlavor;

/// Catalog descriptions are shortened to this many characters.
pub const MAX_CATALOG_DESCRIPTION_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Shopify,
    WooCommerce,
    WordPress,
}

impl Platform {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Shopify => "shopify",
            Platform::WooCommerce => "woocommerce",
            Platform::WordPress => "wordpress",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scheme and host of `url`: `https://toys.example/collections/all` →
/// `https://toys.example`.
pub(crate) fn store_origin(url: &str) -> String {
    reqwest::Url::parse(url).map_or_else(
        |_| url.trim_end_matches('/').splitn(4, '/').take(3).collect::<Vec<_>>().join("/"),
        |u| u.origin().ascii_serialization(),
    )
}

pub(crate) fn catalog_description(html: &str) -> String {
    let mut text = clean_text(html);
    truncate_chars(&mut text, MAX_CATALOG_DESCRIPTION_CHARS);
    text
}

/// Probe each supported platform in turn.
pub async fn detect_platform<F: Fetcher>(fetcher: &F, base: &str) -> Option<Platform> {
    if shopify::probe(fetcher, base).await {
        return Some(Platform::Shopify);
    }
    if woo::probe(fetcher, base, WpFlavor::StoreApi).await {
        return Some(Platform::WooCommerce);
    }
    if woo::probe(fetcher, base, WpFlavor::WpRest).await {
        return Some(Platform::WordPress);
    }
    None
}

/// Read the platform's complete listing.
///
/// # Errors
///
/// Propagates fetch, parse and pagination errors from the platform reader.
pub async fn fetch_catalog<F: Fetcher>(
    fetcher: &F,
    base: &str,
    platform: Platform,
    inter_request_delay: Duration,
) -> Result<Vec<CatalogEntry>, ScraperError> {
    match platform {
        Platform::Shopify => shopify::fetch_catalog(fetcher, base, inter_request_delay).await,
        Platform::WooCommerce => {
            woo::fetch_catalog(fetcher, base, WpFlavor::StoreApi, inter_request_delay).await
        }
        Platform::WordPress => {
            woo::fetch_catalog(fetcher, base, WpFlavor::WpRest, inter_request_delay).await
        }
    }
}
