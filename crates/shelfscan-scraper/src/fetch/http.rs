use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};

use super::{check_url, FetchKind, FetchSettings, FetchedPage, Fetcher};
use crate::error::ScraperError;
use crate::html::host_of;
use crate::retry::retry_with_backoff;

const CONNECT_TIMEOUT_SECS: u64 = 10;
/// `Retry-After` assumed when a 429 carries none.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Plain request/response fetcher with browser-like headers.
///
/// Transient failures are retried through [`retry_with_backoff`]; 4xx answers
/// are returned immediately.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl HttpFetcher {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(settings: &FetchSettings) -> Result<Self, ScraperError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(settings.user_agent.as_str())
            .default_headers(headers)
            .danger_accept_invalid_certs(!settings.verify_tls)
            .build()?;
        Ok(Self {
            client,
            max_retries: settings.max_retries,
            backoff_base_ms: settings.backoff_base_ms,
        })
    }

    /// GET `url` with retries on transient failures.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::NotFound`] for 404.
    /// - [`ScraperError::Blocked`] for 403.
    /// - [`ScraperError::ClientError`] for any other 4xx.
    /// - [`ScraperError::RateLimited`] for 429 after all retries.
    /// - [`ScraperError::UnexpectedStatus`] for 5xx after all retries.
    /// - [`ScraperError::Http`] for network failures after all retries.
    /// - [`ScraperError::InvalidUrl`] when `url` is not absolute http(s).
    pub async fn get(&self, url: &str) -> Result<FetchedPage, ScraperError> {
        check_url(url)?;
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || self.get_once(url)).await
    }

    async fn get_once(&self, url: &str) -> Result<FetchedPage, ScraperError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(ScraperError::RateLimited {
                domain: host_of(url),
                retry_after_secs,
            });
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ScraperError::NotFound {
                url: url.to_owned(),
            });
        }
        if status == StatusCode::FORBIDDEN {
            return Err(ScraperError::Blocked {
                url: url.to_owned(),
                reason: "HTTP 403".to_owned(),
            });
        }
        if status.is_client_error() {
            return Err(ScraperError::ClientError {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let final_url = response.url().to_string();
        let link_header = response
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response.text().await?;

        Ok(FetchedPage {
            url: final_url,
            status: status.as_u16(),
            body,
            link_header,
        })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, _kind: FetchKind) -> Result<FetchedPage, ScraperError> {
        self.get(url).await
    }
}
