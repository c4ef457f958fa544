//! The strategy resolver: one identifier in, one verified product out.
//!
//! A [`Resolver`] is owned by one site run. It holds the site's fetcher, the
//! genericity filter and every per-site cache (sitemap URLs, platform
//! catalog, listing index, dead search templates), so nothing is shared
//! between sites and nothing outlives the run.

mod strategies;
mod templates;

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;
use shelfscan_core::{
    AppConfig, ExtractionRecord, Identifier, MatchThresholds, PageType, RecordStatus, SiteConfig,
    StrategyKind,
};
use tokio::time::Instant;

use crate::catalog::{CatalogEntry, CatalogIndex};
use crate::classify::{classify_with_markers, PageSignature};
use crate::error::ScraperError;
use crate::extract::{adapter_for, ExtractionAdapter};
use crate::fetch::{FetchKind, FetchedPage, Fetcher};
use crate::generic::{Baseline, GenericityFilter};
use crate::html::canonical_key;

pub use templates::{
    expand_search_template, expand_url_template, search_queries, DEFAULT_SEARCH_TEMPLATES,
};

/// Strategy label for a URL taken straight from the sheet.
pub const ROW_URL_LABEL: &str = "row_url";

const MAX_FAILURE_NOTES: usize = 4;

/// Tunables the resolver reads from [`AppConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverSettings {
    pub inter_request_delay: Duration,
    pub min_link_score: u32,
    pub thresholds: MatchThresholds,
}

impl ResolverSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            inter_request_delay: Duration::from_millis(config.inter_request_delay_ms),
            min_link_score: config.min_link_score,
            thresholds: config.match_thresholds,
        }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            inter_request_delay: Duration::ZERO,
            min_link_score: 1,
            thresholds: MatchThresholds::default(),
        }
    }
}

/// Why no strategy produced a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    NoUrl,
    NotFound,
    Blocked,
    Generic,
    NoMatch,
    Network,
}

impl FailureReason {
    #[must_use]
    pub fn status(self) -> RecordStatus {
        match self {
            FailureReason::NoUrl => RecordStatus::NoUrl,
            FailureReason::NotFound => RecordStatus::NotFound,
            FailureReason::Blocked => RecordStatus::Blocked,
            FailureReason::Generic => RecordStatus::Generic,
            FailureReason::NoMatch => RecordStatus::NoMatch,
            FailureReason::Network => RecordStatus::NetworkError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveFailure {
    pub reason: FailureReason,
    /// Short human-readable trail of what was tried.
    pub detail: String,
}

/// What a resolution was verified against.
#[derive(Debug, Clone)]
pub enum Evidence {
    /// A fetched product page.
    Page {
        signature: Box<PageSignature>,
        html: String,
    },
    /// A platform feed entry; no page was fetched.
    Catalog(CatalogEntry),
}

#[derive(Debug, Clone)]
pub struct ResolvedProduct {
    pub record: ExtractionRecord,
    pub evidence: Evidence,
}

impl ResolvedProduct {
    /// The verified page markup, for snapshots.
    #[must_use]
    pub fn html(&self) -> Option<&str> {
        match &self.evidence {
            Evidence::Page { html, .. } => Some(html),
            Evidence::Catalog(_) => None,
        }
    }

    #[must_use]
    pub fn has_structured_product(&self) -> bool {
        matches!(&self.evidence, Evidence::Page { signature, .. } if signature.structured_product.is_some())
    }
}

#[derive(Debug, Clone)]
pub enum ResolveOutcome {
    Resolved(Box<ResolvedProduct>),
    Failed(ResolveFailure),
}

impl ResolveOutcome {
    /// The output row: the extracted record, or an all-empty one tagged
    /// with the failure status.
    #[must_use]
    pub fn into_record(self, product_id: &str) -> ExtractionRecord {
        match self {
            ResolveOutcome::Resolved(found) => found.record,
            ResolveOutcome::Failed(failure) => {
                ExtractionRecord::failed(product_id, failure.reason.status())
            }
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, ResolveOutcome::Resolved(_))
    }
}

/// Everything one `resolve` call observed, folded into a failure reason.
#[derive(Debug, Default)]
struct AttemptLog {
    fetches: usize,
    network_failures: usize,
    candidates: usize,
    generic: usize,
    blocked: usize,
    missed: bool,
    tried: HashSet<String>,
    notes: Vec<String>,
}

impl AttemptLog {
    fn note(&mut self, note: String) {
        if self.notes.len() < MAX_FAILURE_NOTES {
            self.notes.push(note);
        }
    }

    fn record_error(&mut self, url: &str, err: &ScraperError) {
        if err.is_blocked() {
            self.blocked += 1;
        } else if !err.is_missing() {
            self.network_failures += 1;
        }
        self.note(format!("{url}: {err}"));
    }

    /// Generic beats blocked beats network; with no candidate URL at all
    /// a lookup miss is `no_match`, otherwise `no_url`.
    fn failure(self) -> ResolveFailure {
        let reason = if self.generic > 0 {
            FailureReason::Generic
        } else if self.blocked > 0 {
            FailureReason::Blocked
        } else if self.fetches > 0 && self.network_failures == self.fetches {
            FailureReason::Network
        } else if self.candidates == 0 && self.missed {
            FailureReason::NoMatch
        } else if self.candidates == 0 {
            FailureReason::NoUrl
        } else {
            FailureReason::NotFound
        };
        ResolveFailure {
            reason,
            detail: self.notes.join("; "),
        }
    }
}

/// Per-site resolver. See the module docs.
pub struct Resolver<F: Fetcher> {
    site: SiteConfig,
    fetcher: F,
    settings: ResolverSettings,
    adapter: Box<dyn ExtractionAdapter>,
    filter: GenericityFilter,
    sitemap_urls: Option<Vec<String>>,
    /// Outer `None`: not loaded yet. Inner `None`: no usable feed.
    feed: Option<Option<CatalogIndex>>,
    listing: Option<Option<CatalogIndex>>,
    dead_search_templates: HashSet<String>,
    last_fetch: Option<Instant>,
}

impl<F: Fetcher> Resolver<F> {
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidSelector`] when the site's extraction
    /// overrides carry a selector that does not parse.
    pub fn new(site: SiteConfig, fetcher: F, settings: ResolverSettings) -> Result<Self, ScraperError> {
        let adapter = adapter_for(&site)?;
        let filter = GenericityFilter::new(Baseline::default(), site.base());
        Ok(Self {
            site,
            fetcher,
            settings,
            adapter,
            filter,
            sitemap_urls: None,
            feed: None,
            listing: None,
            dead_search_templates: HashSet::new(),
            last_fetch: None,
        })
    }

    #[must_use]
    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    #[must_use]
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    #[must_use]
    pub fn baseline(&self) -> &Baseline {
        self.filter.baseline()
    }

    /// Replace the baseline. Titles remembered so far are dropped, so call
    /// this before [`Resolver::remember_title`].
    pub fn set_baseline(&mut self, baseline: Baseline) {
        self.filter = GenericityFilter::new(baseline, self.site.base());
    }

    /// Fetch and classify the home page as the site's baseline.
    ///
    /// A failed or blocked fetch leaves the baseline empty; the filter then
    /// relies on seen titles and the denylist.
    pub async fn capture_baseline(&mut self) -> &Baseline {
        let url = format!("{}/", self.site.base());
        self.throttle().await;
        let baseline = match self.fetcher.fetch(&url, FetchKind::Page).await {
            Ok(page) => {
                let sig = classify_with_markers(&page.body, &self.site.product_path_markers);
                if sig.page_type == PageType::Blocked {
                    tracing::warn!(site = %self.site.id, url, reason = ?sig.block_reason, "home page blocked; no baseline");
                    Baseline::default()
                } else {
                    Baseline::from_signature(&sig)
                }
            }
            Err(e) => {
                tracing::warn!(site = %self.site.id, url, error = %e, "baseline fetch failed");
                Baseline::default()
            }
        };
        tracing::debug!(site = %self.site.id, title = ?baseline.title, "baseline captured");
        self.set_baseline(baseline);
        self.filter.baseline()
    }

    /// Seed the seen-title set with a title accepted in an earlier run.
    pub fn remember_title(&mut self, title: &str, product_id: &str) {
        self.filter.remember(title, product_id);
    }

    /// Resolve with the site's configured strategy order, trying the row's
    /// own product URL first.
    pub async fn resolve(&mut self, ident: &Identifier, product_id: &str) -> ResolveOutcome {
        let order = self.site.strategy_order();
        self.run(ident, product_id, &order, true).await
    }

    /// Resolve with an explicit strategy order and no row URL.
    pub async fn resolve_with(
        &mut self,
        ident: &Identifier,
        product_id: &str,
        order: &[StrategyKind],
    ) -> ResolveOutcome {
        self.run(ident, product_id, order, false).await
    }

    async fn run(
        &mut self,
        ident: &Identifier,
        product_id: &str,
        order: &[StrategyKind],
        use_row_url: bool,
    ) -> ResolveOutcome {
        let mut log = AttemptLog::default();

        if use_row_url && !ident.product_url.is_empty() {
            let url = ident.product_url.clone();
            if let Some(found) = self.try_candidate(ROW_URL_LABEL, &url, product_id, &mut log).await {
                return self.accept(found);
            }
        }

        for &kind in order {
            tracing::debug!(site = %self.site.id, product_id, strategy = %kind, "trying strategy");
            let found = match kind {
                StrategyKind::DirectPattern => self.direct_pattern(ident, product_id, &mut log).await,
                StrategyKind::Sitemap => self.sitemap(ident, product_id, &mut log).await,
                StrategyKind::PlatformFeed => self.platform_feed(ident, product_id, &mut log).await,
                StrategyKind::Search => self.search(ident, product_id, &mut log).await,
                StrategyKind::ListingCrawl => self.listing_crawl(ident, product_id, &mut log).await,
            };
            if let Some(found) = found {
                return self.accept(found);
            }
        }

        let failure = log.failure();
        tracing::info!(
            site = %self.site.id,
            product_id,
            reason = ?failure.reason,
            detail = %failure.detail,
            "unresolved"
        );
        ResolveOutcome::Failed(failure)
    }

    fn accept(&self, found: ResolvedProduct) -> ResolveOutcome {
        tracing::info!(
            site = %self.site.id,
            product_id = %found.record.product_id,
            strategy = %found.record.strategy,
            url = %found.record.product_url,
            "resolved"
        );
        ResolveOutcome::Resolved(Box::new(found))
    }

    /// Wait out the inter-request delay since the previous fetch.
    async fn throttle(&mut self) {
        if let Some(last) = self.last_fetch {
            tokio::time::sleep_until(last + self.settings.inter_request_delay).await;
        }
        self.last_fetch = Some(Instant::now());
    }

    /// Throttled page fetch; errors are folded into `log`.
    async fn fetch_page(&mut self, url: &str, log: &mut AttemptLog) -> Option<FetchedPage> {
        self.throttle().await;
        log.fetches += 1;
        match self.fetcher.fetch(url, FetchKind::Page).await {
            Ok(page) => Some(page),
            Err(e) => {
                log.record_error(url, &e);
                None
            }
        }
    }

    /// Fetch `url` once per resolve call and verify it as a product page.
    async fn try_candidate(
        &mut self,
        label: &'static str,
        url: &str,
        product_id: &str,
        log: &mut AttemptLog,
    ) -> Option<ResolvedProduct> {
        if !log.tried.insert(canonical_key(url)) {
            return None;
        }
        log.candidates += 1;
        let page = self.fetch_page(url, log).await?;
        let sig = classify_with_markers(&page.body, &self.site.product_path_markers);
        self.verify(label, page, sig, product_id, log)
    }

    /// Accept a classified page only if it is a non-generic product page
    /// that yields at least one field.
    fn verify(
        &mut self,
        label: &'static str,
        page: FetchedPage,
        sig: PageSignature,
        product_id: &str,
        log: &mut AttemptLog,
    ) -> Option<ResolvedProduct> {
        match sig.page_type {
            PageType::Product => {}
            PageType::Blocked => {
                log.blocked += 1;
                log.note(format!(
                    "{label}: {} blocked ({})",
                    page.url,
                    sig.block_reason.as_deref().unwrap_or("unknown")
                ));
                return None;
            }
            other => {
                log.note(format!("{label}: {} is {other}", page.url));
                return None;
            }
        }

        if let Some(reason) = self.filter.check(&sig, product_id) {
            tracing::debug!(site = %self.site.id, product_id, url = %page.url, ?reason, "generic page rejected");
            log.generic += 1;
            log.note(format!("{label}: {} generic ({reason:?})", page.url));
            return None;
        }

        let mut fields = self.adapter.extract(&sig, &page.body, &page.url);
        fields.scrub(self.filter.baseline());
        if fields.is_empty() {
            log.note(format!("{label}: {} has no product fields", page.url));
            return None;
        }

        let record = fields.into_record(product_id, sig.page_type.as_str(), &page.url, label);
        Some(ResolvedProduct {
            record,
            evidence: Evidence::Page {
                signature: Box::new(sig),
                html: page.body,
            },
        })
    }
}

#[cfg(test)]
#[path = "resolve_test.rs"]
mod tests;
