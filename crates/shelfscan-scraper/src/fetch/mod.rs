//! Page fetching behind one capability trait.
//!
//! The resolver only sees [`Fetcher`]. A site configured for plain HTTP gets
//! an [`HttpFetcher`]; a site configured for the scripted browser gets a
//! [`BrowserFetcher`] for pages and still uses HTTP for feeds, sitemaps and
//! robots.txt.

mod http;

#[cfg(feature = "browser")]
mod browser;

use std::future::Future;
use std::time::Duration;

use shelfscan_core::{AppConfig, FetcherKind, SiteConfig};

use crate::error::ScraperError;

#[cfg(feature = "browser")]
pub use browser::BrowserFetcher;
pub use http::HttpFetcher;

/// What the caller intends to do with the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// An HTML page that will be classified.
    Page,
    /// A machine-readable resource: JSON feed, sitemap XML, robots.txt.
    Resource,
}

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub body: String,
    /// Raw `Link` header, used for cursor pagination.
    pub link_header: Option<String>,
}

/// Fetch capability consumed by the resolver and the feed readers.
///
/// Implementations map non-2xx answers onto [`ScraperError`] variants:
/// 404 is `NotFound`, 403 is `Blocked`, 429 is `RateLimited`, other 4xx are
/// `ClientError`, 5xx are `UnexpectedStatus`.
pub trait Fetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        kind: FetchKind,
    ) -> impl Future<Output = Result<FetchedPage, ScraperError>> + Send;
}

impl<T: Fetcher> Fetcher for &T {
    fn fetch(
        &self,
        url: &str,
        kind: FetchKind,
    ) -> impl Future<Output = Result<FetchedPage, ScraperError>> + Send {
        (**self).fetch(url, kind)
    }
}

/// Reject anything that is not an absolute http(s) URL before it reaches
/// the network, e.g. a bare `www.example.com/p/1` from a sheet.
pub(crate) fn check_url(url: &str) -> Result<(), ScraperError> {
    let lower = url.trim_start().to_ascii_lowercase();
    let rest = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"));
    match rest {
        Some(rest) if !rest.is_empty() && !rest.starts_with('/') => Ok(()),
        _ => Err(ScraperError::InvalidUrl {
            url: url.to_owned(),
            reason: "expected an absolute http(s) URL".to_owned(),
        }),
    }
}

/// Connection settings shared by both fetcher implementations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub verify_tls: bool,
    pub settle: Duration,
}

impl FetchSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig, site: &SiteConfig) -> Self {
        Self {
            timeout_secs: config.request_timeout_secs,
            user_agent: config.user_agent.clone(),
            max_retries: config.max_retries,
            backoff_base_ms: config.retry_backoff_base_ms,
            verify_tls: site.verify_tls,
            settle: Duration::from_millis(config.browser_settle_ms),
        }
    }
}

/// The fetcher one site run owns for its whole duration.
pub enum SiteFetcher {
    Http(HttpFetcher),
    #[cfg(feature = "browser")]
    Browser(BrowserFetcher),
}

impl SiteFetcher {
    /// Build the fetcher a site asked for.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built,
    /// [`ScraperError::Browser`] if Chrome fails to launch, and
    /// [`ScraperError::BrowserUnavailable`] when a browser is requested from a
    /// build without the `browser` feature.
    pub async fn for_site(kind: FetcherKind, settings: &FetchSettings) -> Result<Self, ScraperError> {
        match kind {
            FetcherKind::Http => Ok(Self::Http(HttpFetcher::new(settings)?)),
            #[cfg(feature = "browser")]
            FetcherKind::Browser => Ok(Self::Browser(BrowserFetcher::launch(settings).await?)),
            #[cfg(not(feature = "browser"))]
            FetcherKind::Browser => Err(ScraperError::BrowserUnavailable),
        }
    }

    #[must_use]
    pub fn kind(&self) -> FetcherKind {
        match self {
            Self::Http(_) => FetcherKind::Http,
            #[cfg(feature = "browser")]
            Self::Browser(_) => FetcherKind::Browser,
        }
    }
}

impl Fetcher for SiteFetcher {
    async fn fetch(&self, url: &str, kind: FetchKind) -> Result<FetchedPage, ScraperError> {
        match self {
            Self::Http(http) => http.get(url).await,
            #[cfg(feature = "browser")]
            Self::Browser(browser) => browser.fetch(url, kind).await,
        }
        .inspect_err(|e| tracing::debug!(url, ?kind, error = %e, "fetch failed"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_http_urls_pass() {
        assert!(check_url("https://shop.test/products/1").is_ok());
        assert!(check_url("HTTP://shop.test").is_ok());
    }

    #[test]
    fn relative_and_schemeless_urls_are_invalid() {
        for url in ["www.shop.test/p/1", "/products/1", "https://", "ftp://shop.test/x"] {
            assert!(
                matches!(check_url(url), Err(ScraperError::InvalidUrl { .. })),
                "{url} should be rejected"
            );
        }
    }

    #[test]
    fn invalid_urls_count_as_missing() {
        let err = check_url("www.shop.test").expect_err("schemeless url");
        assert!(err.is_missing());
        assert!(!err.is_blocked());
    }
}
