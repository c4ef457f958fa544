use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("page not found: {url}")]
    NotFound { url: String },

    #[error("blocked at {url}: {reason}")]
    Blocked { url: String, reason: String },

    #[error("client error {status} from {url}")]
    ClientError { status: u16, url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("pagination limit reached for {url}: exceeded {max_pages} pages")]
    PaginationLimit { url: String, max_pages: usize },

    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid CSS selector \"{selector}\": {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("browser error: {0}")]
    Browser(String),

    #[error("browser fetching is not available in this build (enable the `browser` feature)")]
    BrowserUnavailable,
}

impl ScraperError {
    /// The site refused to serve the page (403, captcha or challenge).
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        matches!(self, ScraperError::Blocked { .. })
    }

    /// Definitive answers that say there is nothing to fetch at this URL.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            ScraperError::NotFound { .. }
                | ScraperError::ClientError { .. }
                | ScraperError::InvalidUrl { .. }
        )
    }
}
