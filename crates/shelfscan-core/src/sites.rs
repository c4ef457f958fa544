use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ConfigError;

const URL_PLACEHOLDERS: &[&str] = &["base", "base_url", "code", "upc", "number", "name_slug", "name"];
const SEARCH_PLACEHOLDERS: &[&str] = &["base", "base_url", "query", "q"];
const DEFAULT_EXCLUDE_IMAGE_MARKERS: &[&str] = &["logo", "gfx", "footer", "icon"];

/// One way of turning an identifier into a verified product page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    DirectPattern,
    Sitemap,
    PlatformFeed,
    Search,
    ListingCrawl,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 5] = [
        StrategyKind::DirectPattern,
        StrategyKind::Sitemap,
        StrategyKind::PlatformFeed,
        StrategyKind::Search,
        StrategyKind::ListingCrawl,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::DirectPattern => "direct_pattern",
            StrategyKind::Sitemap => "sitemap",
            StrategyKind::PlatformFeed => "platform_feed",
            StrategyKind::Search => "search",
            StrategyKind::ListingCrawl => "listing_crawl",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherKind {
    #[default]
    Http,
    Browser,
}

/// Explicit header names that take precedence over the built-in alias lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnOverrides {
    pub code: Option<String>,
    pub name: Option<String>,
    pub number: Option<String>,
    pub product_url: Option<String>,
}

/// Per-site extraction quirks expressed as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOverrides {
    /// CSS selector whose text replaces the description when non-empty.
    pub description_selector: Option<String>,
    /// CSS selector for containers (or `<img>` elements) holding gallery images.
    pub image_selector: Option<String>,
    /// Substrings that disqualify a selector image URL or its class/alt text.
    pub exclude_image_markers: Vec<String>,
}

impl Default for ExtractOverrides {
    fn default() -> Self {
        Self {
            description_selector: None,
            image_selector: None,
            exclude_image_markers: DEFAULT_EXCLUDE_IMAGE_MARKERS
                .iter()
                .map(|m| (*m).to_string())
                .collect(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub id: String,
    pub base_url: String,
    /// Input sheet, relative to the data directory. Defaults to `input/{id}.csv`.
    #[serde(default)]
    pub sheet: Option<PathBuf>,
    #[serde(default)]
    pub url_pattern: Option<String>,
    #[serde(default)]
    pub search_url: Option<String>,
    #[serde(default)]
    pub strategies: Vec<StrategyKind>,
    #[serde(default)]
    pub listing_urls: Vec<String>,
    #[serde(default)]
    pub product_path_markers: Vec<String>,
    #[serde(default)]
    pub columns: ColumnOverrides,
    #[serde(default = "default_true")]
    pub verify_tls: bool,
    #[serde(default)]
    pub fetcher: FetcherKind,
    #[serde(default)]
    pub extract: Option<ExtractOverrides>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SiteConfig {
    /// Minimal HTTP site with no templates; fields are filled in by callers.
    #[must_use]
    pub fn new(id: &str, base_url: &str) -> Self {
        Self {
            id: id.to_string(),
            base_url: base_url.to_string(),
            sheet: None,
            url_pattern: None,
            search_url: None,
            strategies: Vec::new(),
            listing_urls: Vec::new(),
            product_path_markers: Vec::new(),
            columns: ColumnOverrides::default(),
            verify_tls: true,
            fetcher: FetcherKind::Http,
            extract: None,
            notes: None,
        }
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base(&self) -> &str {
        self.base_url.trim().trim_end_matches('/')
    }

    #[must_use]
    pub fn sheet_path(&self, data_dir: &Path) -> PathBuf {
        match &self.sheet {
            Some(sheet) if sheet.is_absolute() => sheet.clone(),
            Some(sheet) => data_dir.join(sheet),
            None => data_dir.join("input").join(format!("{}.csv", self.id)),
        }
    }

    /// Strategies to try, in order.
    ///
    /// An explicit `strategies` list is used as given (duplicates dropped).
    /// Otherwise the order is direct pattern (when a template exists), sitemap,
    /// platform feed, search, and listing crawl (when listing URLs exist).
    #[must_use]
    pub fn strategy_order(&self) -> Vec<StrategyKind> {
        if !self.strategies.is_empty() {
            let mut seen = HashSet::new();
            return self
                .strategies
                .iter()
                .copied()
                .filter(|kind| seen.insert(*kind))
                .collect();
        }

        let mut order = Vec::with_capacity(StrategyKind::ALL.len());
        if self.url_pattern.is_some() {
            order.push(StrategyKind::DirectPattern);
        }
        order.push(StrategyKind::Sitemap);
        order.push(StrategyKind::PlatformFeed);
        order.push(StrategyKind::Search);
        if !self.listing_urls.is_empty() {
            order.push(StrategyKind::ListingCrawl);
        }
        order
    }

    /// Per-site validation. A failure here disables this site only.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |reason: String| {
            Err(ConfigError::Validation(format!(
                "site '{}': {reason}",
                self.id
            )))
        };

        let base = self.base();
        let Some(rest) = base
            .strip_prefix("https://")
            .or_else(|| base.strip_prefix("http://"))
        else {
            return fail(format!("base_url '{}' must be an absolute http(s) URL", self.base_url));
        };
        if rest.is_empty() || rest.starts_with('/') {
            return fail(format!("base_url '{}' has no host", self.base_url));
        }

        if let Some(pattern) = &self.url_pattern {
            if let Some(bad) = unknown_placeholder(pattern, URL_PLACEHOLDERS) {
                return fail(format!("url_pattern uses unknown placeholder '{{{bad}}}'"));
            }
        }
        if let Some(search) = &self.search_url {
            if let Some(bad) = unknown_placeholder(search, SEARCH_PLACEHOLDERS) {
                return fail(format!("search_url uses unknown placeholder '{{{bad}}}'"));
            }
            if !search.contains("{query}") && !search.contains("{q}") {
                return fail("search_url must contain {query} or {q}".to_string());
            }
        }

        let order = self.strategy_order();
        if order.contains(&StrategyKind::DirectPattern) && self.url_pattern.is_none() {
            return fail("direct_pattern strategy requires url_pattern".to_string());
        }
        if order.contains(&StrategyKind::ListingCrawl) && self.listing_urls.is_empty() {
            return fail("listing_crawl strategy requires listing_urls".to_string());
        }

        Ok(())
    }
}

/// Returns the first `{placeholder}` in `template` not listed in `known`.
fn unknown_placeholder<'a>(template: &'a str, known: &[&str]) -> Option<&'a str> {
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let close = after.find('}')?;
        let name = &after[..close];
        if !known.contains(&name) {
            return Some(name);
        }
        rest = &after[close + 1..];
    }
    None
}

#[derive(Debug, Deserialize)]
pub struct SitesFile {
    pub sites: Vec<SiteConfig>,
}

impl SitesFile {
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&SiteConfig> {
        self.sites.iter().find(|s| s.id.eq_ignore_ascii_case(id))
    }
}

/// Load the per-site configuration from a YAML file.
///
/// Only file-level problems (I/O, parse, empty or duplicate ids) fail here;
/// per-site problems are reported by [`SiteConfig::validate`] so one bad entry
/// does not stop the others.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or has empty or duplicate ids.
pub fn load_sites(path: &Path) -> Result<SitesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SitesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let sites_file: SitesFile = serde_yaml::from_str(&content)?;
    validate_sites_file(&sites_file)?;

    Ok(sites_file)
}

fn validate_sites_file(sites_file: &SitesFile) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for site in &sites_file.sites {
        let id = site.id.trim();
        if id.is_empty() {
            return Err(ConfigError::Validation(
                "site id must be non-empty".to_string(),
            ));
        }
        if id.contains(['/', '\\']) || id.starts_with('.') {
            return Err(ConfigError::Validation(format!(
                "site id '{id}' must be usable as a directory name"
            )));
        }
        if !seen_ids.insert(id.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate site id: '{id}'"
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "sites_test.rs"]
mod tests;
