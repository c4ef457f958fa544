//! The per-identifier output unit and its status vocabulary.

use serde::{Deserialize, Serialize};

pub const MAX_TITLE_CHARS: usize = 500;
pub const MAX_DESCRIPTION_CHARS: usize = 5000;
pub const MAX_IMAGE_URLS: usize = 20;
pub const IMAGE_URL_SEPARATOR: char = '|';

/// What a fetched page turned out to be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Product,
    Search,
    Index,
    NotFound,
    Blocked,
    #[default]
    Unknown,
}

impl PageType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PageType::Product => "product",
            PageType::Search => "search",
            PageType::Index => "index",
            PageType::NotFound => "not_found",
            PageType::Blocked => "blocked",
            PageType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome tag written next to every output row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordStatus {
    #[serde(rename = "resolved")]
    Resolved,
    #[serde(rename = "generic (not saved)")]
    Generic,
    #[serde(rename = "blocked")]
    Blocked,
    #[serde(rename = "not_found")]
    NotFound,
    #[serde(rename = "no_url")]
    NoUrl,
    #[serde(rename = "no_match")]
    NoMatch,
    #[serde(rename = "network_error")]
    NetworkError,
    #[serde(rename = "skipped")]
    Skipped,
}

impl RecordStatus {
    pub const ALL: [RecordStatus; 8] = [
        RecordStatus::Resolved,
        RecordStatus::Generic,
        RecordStatus::Blocked,
        RecordStatus::NotFound,
        RecordStatus::NoUrl,
        RecordStatus::NoMatch,
        RecordStatus::NetworkError,
        RecordStatus::Skipped,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RecordStatus::Resolved => "resolved",
            RecordStatus::Generic => "generic (not saved)",
            RecordStatus::Blocked => "blocked",
            RecordStatus::NotFound => "not_found",
            RecordStatus::NoUrl => "no_url",
            RecordStatus::NoMatch => "no_match",
            RecordStatus::NetworkError => "network_error",
            RecordStatus::Skipped => "skipped",
        }
    }

    /// Inverse of [`RecordStatus::as_str`], used when reloading a previous table.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw.trim())
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One output row. Failed lookups keep every data field empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRecord {
    pub product_id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub image_urls: Vec<String>,
    pub dimensions: String,
    pub page_type: String,
    pub product_url: String,
    pub strategy: String,
    pub status: RecordStatus,
}

impl ExtractionRecord {
    /// An all-empty record carrying only the id and the reason.
    #[must_use]
    pub fn failed(product_id: &str, status: RecordStatus) -> Self {
        Self {
            product_id: product_id.to_string(),
            title: String::new(),
            description: String::new(),
            image_url: String::new(),
            image_urls: Vec::new(),
            dimensions: String::new(),
            page_type: String::new(),
            product_url: String::new(),
            strategy: String::new(),
            status,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.status == RecordStatus::Resolved
    }

    /// Enforce output bounds and keep `image_url` consistent with the list.
    pub fn apply_limits(&mut self) {
        truncate_chars(&mut self.title, MAX_TITLE_CHARS);
        truncate_chars(&mut self.description, MAX_DESCRIPTION_CHARS);
        self.image_urls.truncate(MAX_IMAGE_URLS);
        if self.image_url.is_empty() {
            if let Some(first) = self.image_urls.first() {
                self.image_url.clone_from(first);
            }
        }
    }

    #[must_use]
    pub fn image_urls_joined(&self) -> String {
        self.image_urls.join(&IMAGE_URL_SEPARATOR.to_string())
    }

    #[must_use]
    pub fn split_image_urls(joined: &str) -> Vec<String> {
        joined
            .split(IMAGE_URL_SEPARATOR)
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Truncate to at most `max` characters without splitting a code point.
pub fn truncate_chars(value: &mut String, max: usize) {
    if let Some((idx, _)) = value.char_indices().nth(max) {
        value.truncate(idx);
    }
}
