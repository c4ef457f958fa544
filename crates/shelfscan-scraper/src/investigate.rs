//! Site investigation: run each strategy alone against a few sample rows
//! and rank the strategies for the site's `strategies:` list.

use std::collections::HashSet;

use serde::Serialize;
use shelfscan_core::{Identifier, SiteConfig, StrategyKind};

use crate::error::ScraperError;
use crate::feeds::{shopify, woo};
use crate::fetch::Fetcher;
use crate::generic::Baseline;
use crate::resolve::{FailureReason, ResolveOutcome, Resolver, ResolverSettings};
use crate::sitemap;

const NON_GENERIC_WEIGHT: usize = 10;
const UNIQUE_TITLE_WEIGHT: usize = 5;
const UNIQUE_IMAGE_WEIGHT: usize = 3;
const DESCRIPTION_WEIGHT: usize = 2;
const JSONLD_WEIGHT: usize = 8;
const SAMPLE_URLS: usize = 3;

/// What the site exposes before any identifier is looked up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SiteProbe {
    pub robots_sitemaps: Vec<String>,
    pub sitemap_product_urls: usize,
    pub shopify_feed: bool,
    pub woocommerce_store_api: bool,
    pub wordpress_rest: bool,
    pub baseline_title: Option<String>,
}

/// One strategy run alone over the samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StrategyReport {
    pub strategy: StrategyKind,
    pub attempted: usize,
    pub resolved: usize,
    pub generic: usize,
    pub blocked: usize,
    pub unique_titles: usize,
    pub unique_images: usize,
    pub descriptions: usize,
    pub jsonld: usize,
    pub score: usize,
    pub sample_urls: Vec<String>,
}

impl StrategyReport {
    fn new(strategy: StrategyKind) -> Self {
        Self {
            strategy,
            attempted: 0,
            resolved: 0,
            generic: 0,
            blocked: 0,
            unique_titles: 0,
            unique_images: 0,
            descriptions: 0,
            jsonld: 0,
            score: 0,
            sample_urls: Vec::new(),
        }
    }

    /// Resolved rows dominate; distinct titles and images reward strategies
    /// that are not returning the same page over and over.
    #[must_use]
    pub fn compute_score(&self) -> usize {
        self.resolved * NON_GENERIC_WEIGHT
            + self.unique_titles * UNIQUE_TITLE_WEIGHT
            + self.unique_images * UNIQUE_IMAGE_WEIGHT
            + self.descriptions * DESCRIPTION_WEIGHT
            + self.jsonld * JSONLD_WEIGHT
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteReport {
    pub site: String,
    pub base_url: String,
    pub samples: usize,
    pub probe: SiteProbe,
    pub strategies: Vec<StrategyReport>,
    pub recommended_order: Vec<StrategyKind>,
}

#[derive(Default)]
struct Tally {
    titles: HashSet<String>,
    images: HashSet<String>,
}

impl Tally {
    fn record(&mut self, report: &mut StrategyReport, outcome: &ResolveOutcome) {
        report.attempted += 1;
        match outcome {
            ResolveOutcome::Resolved(found) => {
                let record = &found.record;
                report.resolved += 1;
                if !record.title.is_empty() {
                    self.titles.insert(record.title.clone());
                }
                if !record.image_url.is_empty() {
                    self.images.insert(record.image_url.clone());
                }
                if !record.description.is_empty() {
                    report.descriptions += 1;
                }
                if found.has_structured_product() {
                    report.jsonld += 1;
                }
                if report.sample_urls.len() < SAMPLE_URLS {
                    report.sample_urls.push(record.product_url.clone());
                }
            }
            ResolveOutcome::Failed(failure) => match failure.reason {
                FailureReason::Generic => report.generic += 1,
                FailureReason::Blocked => report.blocked += 1,
                _ => {}
            },
        }
    }

    fn finish(self, mut report: StrategyReport) -> StrategyReport {
        report.unique_titles = self.titles.len();
        report.unique_images = self.images.len();
        report.score = report.compute_score();
        report
    }
}

/// Strategies that can run for `site` at all.
#[must_use]
pub fn applicable_strategies(site: &SiteConfig) -> Vec<StrategyKind> {
    StrategyKind::ALL
        .into_iter()
        .filter(|kind| match kind {
            StrategyKind::DirectPattern => site.url_pattern.is_some(),
            StrategyKind::ListingCrawl => !site.listing_urls.is_empty(),
            _ => true,
        })
        .collect()
}

/// Strategies that resolved anything, best score first. Ties keep the
/// default strategy order.
#[must_use]
pub fn recommend(reports: &[StrategyReport]) -> Vec<StrategyKind> {
    let mut useful: Vec<&StrategyReport> = reports.iter().filter(|r| r.resolved > 0).collect();
    useful.sort_by(|a, b| b.score.cmp(&a.score));
    useful.into_iter().map(|r| r.strategy).collect()
}

/// Robots, sitemap and platform-feed probes.
pub async fn probe_site<F: Fetcher>(
    fetcher: &F,
    site: &SiteConfig,
    settings: &ResolverSettings,
    baseline: &Baseline,
) -> SiteProbe {
    let base = site.base();
    let discovery = sitemap::discover(
        fetcher,
        base,
        &site.product_path_markers,
        settings.inter_request_delay,
    )
    .await;
    SiteProbe {
        robots_sitemaps: discovery.robots_sitemaps,
        sitemap_product_urls: discovery.product_urls.len(),
        shopify_feed: shopify::probe(fetcher, base).await,
        woocommerce_store_api: woo::probe(fetcher, base, woo::WpFlavor::StoreApi).await,
        wordpress_rest: woo::probe(fetcher, base, woo::WpFlavor::WpRest).await,
        baseline_title: baseline.title.clone(),
    }
}

/// Probe `site`, then run every applicable strategy alone against
/// `samples` (product id, identifier) and rank them.
///
/// Each strategy gets a fresh resolver so seen titles and catalog claims
/// from one strategy do not affect another.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidSelector`] when the site's extraction
/// overrides do not parse.
pub async fn investigate<F: Fetcher>(
    site: &SiteConfig,
    fetcher: &F,
    settings: &ResolverSettings,
    samples: &[(String, Identifier)],
) -> Result<SiteReport, ScraperError> {
    let mut home = Resolver::new(site.clone(), fetcher, settings.clone())?;
    let baseline = home.capture_baseline().await.clone();
    let probe = probe_site(fetcher, site, settings, &baseline).await;
    tracing::info!(
        site = %site.id,
        sitemap_product_urls = probe.sitemap_product_urls,
        shopify = probe.shopify_feed,
        woocommerce = probe.woocommerce_store_api,
        wordpress = probe.wordpress_rest,
        "site probed"
    );

    let mut strategies = Vec::new();
    for kind in applicable_strategies(site) {
        let mut resolver = Resolver::new(site.clone(), fetcher, settings.clone())?;
        resolver.set_baseline(baseline.clone());
        let mut report = StrategyReport::new(kind);
        let mut tally = Tally::default();
        for (product_id, ident) in samples {
            let outcome = resolver.resolve_with(ident, product_id, &[kind]).await;
            tally.record(&mut report, &outcome);
        }
        let report = tally.finish(report);
        tracing::info!(
            site = %site.id,
            strategy = %kind,
            resolved = report.resolved,
            generic = report.generic,
            blocked = report.blocked,
            score = report.score,
            "strategy evaluated"
        );
        strategies.push(report);
    }

    let recommended_order = recommend(&strategies);
    Ok(SiteReport {
        site: site.id.clone(),
        base_url: site.base().to_string(),
        samples: samples.len(),
        probe,
        strategies,
        recommended_order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(strategy: StrategyKind, resolved: usize, score: usize) -> StrategyReport {
        StrategyReport {
            resolved,
            score,
            ..StrategyReport::new(strategy)
        }
    }

    #[test]
    fn score_weights() {
        let r = StrategyReport {
            resolved: 2,
            unique_titles: 2,
            unique_images: 1,
            descriptions: 2,
            jsonld: 1,
            ..StrategyReport::new(StrategyKind::Search)
        };
        assert_eq!(r.compute_score(), 20 + 10 + 3 + 4 + 8);
    }

    #[test]
    fn recommend_orders_by_score_and_drops_useless() {
        let reports = vec![
            report(StrategyKind::DirectPattern, 0, 0),
            report(StrategyKind::Sitemap, 1, 30),
            report(StrategyKind::PlatformFeed, 3, 80),
            report(StrategyKind::Search, 1, 30),
        ];
        assert_eq!(
            recommend(&reports),
            vec![
                StrategyKind::PlatformFeed,
                StrategyKind::Sitemap,
                StrategyKind::Search
            ]
        );
    }

    #[test]
    fn applicable_strategies_need_their_config() {
        let mut site = SiteConfig::new("acme", "https://shop.test");
        assert_eq!(
            applicable_strategies(&site),
            vec![
                StrategyKind::Sitemap,
                StrategyKind::PlatformFeed,
                StrategyKind::Search
            ]
        );
        site.url_pattern = Some("{base}/p/{code}".to_string());
        site.listing_urls = vec!["https://shop.test/all".to_string()];
        assert_eq!(applicable_strategies(&site), StrategyKind::ALL.to_vec());
    }
}
