use std::collections::HashSet;

use shelfscan_core::{Identifier, PageType, StrategyKind};

use super::templates::{
    expand_search_template, expand_url_template, search_queries, DEFAULT_SEARCH_TEMPLATES,
};
use super::{AttemptLog, Evidence, ResolvedProduct, Resolver};
use crate::catalog::{CatalogEntry, CatalogIndex};
use crate::classify::classify_with_markers;
use crate::extract::{dedupe_urls, ExtractedFields};
use crate::feeds;
use crate::fetch::{FetchKind, Fetcher};
use crate::html::canonical_key;
use crate::links::{best_link, collect_product_links};
use crate::sitemap;

impl<F: Fetcher> Resolver<F> {
    pub(super) async fn direct_pattern(
        &mut self,
        ident: &Identifier,
        product_id: &str,
        log: &mut AttemptLog,
    ) -> Option<ResolvedProduct> {
        let pattern = self.site.url_pattern.clone()?;
        let Some(url) = expand_url_template(&pattern, self.site.base(), ident) else {
            log.note(format!("direct_pattern: no URL from {pattern}"));
            return None;
        };
        self.try_candidate(StrategyKind::DirectPattern.as_str(), &url, product_id, log)
            .await
    }

    pub(super) async fn sitemap(
        &mut self,
        ident: &Identifier,
        product_id: &str,
        log: &mut AttemptLog,
    ) -> Option<ResolvedProduct> {
        if self.sitemap_urls.is_none() {
            let discovery = sitemap::discover(
                &self.fetcher,
                self.site.base(),
                &self.site.product_path_markers,
                self.settings.inter_request_delay,
            )
            .await;
            tracing::info!(
                site = %self.site.id,
                sitemaps = discovery.sitemaps_read.len(),
                product_urls = discovery.product_urls.len(),
                "sitemap discovery finished"
            );
            self.sitemap_urls = Some(discovery.product_urls);
        }

        let urls = self.sitemap_urls.as_deref().unwrap_or_default();
        if urls.is_empty() {
            return None;
        }
        let candidates = sitemap::candidate_urls(urls, ident, &self.settings.thresholds);
        if candidates.is_empty() {
            log.missed = true;
            return None;
        }
        for url in candidates {
            let found = self
                .try_candidate(StrategyKind::Sitemap.as_str(), &url, product_id, log)
                .await;
            if found.is_some() {
                return found;
            }
        }
        None
    }

    pub(super) async fn platform_feed(
        &mut self,
        ident: &Identifier,
        product_id: &str,
        log: &mut AttemptLog,
    ) -> Option<ResolvedProduct> {
        if self.feed.is_none() {
            let index = self.load_feed().await;
            self.feed = Some(index);
        }
        let Some(Some(index)) = self.feed.as_mut() else {
            return None;
        };

        let Some(found) = index.find_best_match(product_id, &ident.name, &ident.code) else {
            log.missed = true;
            log.note("platform_feed: no catalog match".to_string());
            return None;
        };
        tracing::debug!(
            site = %self.site.id,
            product_id,
            kind = ?found.kind,
            score = found.score,
            title = %found.entry.title,
            "catalog match"
        );
        self.filter.remember(&found.entry.title, product_id);
        Some(catalog_product(found.entry, product_id))
    }

    async fn load_feed(&self) -> Option<CatalogIndex> {
        let base = self.site.base();
        let Some(platform) = feeds::detect_platform(&self.fetcher, base).await else {
            tracing::info!(site = %self.site.id, "no platform feed detected");
            return None;
        };
        match feeds::fetch_catalog(&self.fetcher, base, platform, self.settings.inter_request_delay)
            .await
        {
            Ok(entries) => {
                tracing::info!(site = %self.site.id, %platform, entries = entries.len(), "platform catalog loaded");
                Some(CatalogIndex::build(entries, self.settings.thresholds))
            }
            Err(e) => {
                tracing::warn!(site = %self.site.id, %platform, error = %e, "platform catalog failed");
                None
            }
        }
    }

    /// Each query (full, then truncated) against each live template. A
    /// template answering 4xx is dead for the rest of the run. The first
    /// results page ends the template loop for that query.
    pub(super) async fn search(
        &mut self,
        ident: &Identifier,
        product_id: &str,
        log: &mut AttemptLog,
    ) -> Option<ResolvedProduct> {
        let label = StrategyKind::Search.as_str();
        let query = ident.query().to_string();
        let templates: Vec<String> = match &self.site.search_url {
            Some(template) => vec![template.clone()],
            None => DEFAULT_SEARCH_TEMPLATES.iter().map(ToString::to_string).collect(),
        };

        for q in search_queries(&query) {
            for template in &templates {
                if self.dead_search_templates.contains(template) {
                    continue;
                }
                let Some(url) = expand_search_template(template, self.site.base(), &q) else {
                    continue;
                };

                self.throttle().await;
                log.fetches += 1;
                let page = match self.fetcher.fetch(&url, FetchKind::Page).await {
                    Ok(page) => page,
                    Err(e) => {
                        if e.is_missing() {
                            tracing::debug!(site = %self.site.id, template = %template, "search template is dead");
                            self.dead_search_templates.insert(template.clone());
                        }
                        log.record_error(&url, &e);
                        continue;
                    }
                };

                let sig = classify_with_markers(&page.body, &self.site.product_path_markers);
                match sig.page_type {
                    // Some storefronts redirect an exact hit straight to the product.
                    PageType::Product => {
                        if log.tried.insert(canonical_key(&page.url)) {
                            log.candidates += 1;
                            let found = self.verify(label, page, sig, product_id, log);
                            if found.is_some() {
                                return found;
                            }
                        }
                        break;
                    }
                    PageType::Search => {
                        let links = collect_product_links(
                            &page.body,
                            &page.url,
                            &self.site.product_path_markers,
                        );
                        match best_link(&query, &links, self.settings.min_link_score) {
                            Some((link, score)) => {
                                tracing::debug!(site = %self.site.id, product_id, url = %link.url, score, "best search link");
                                let link_url = link.url.clone();
                                let found = self.try_candidate(label, &link_url, product_id, log).await;
                                if found.is_some() {
                                    return found;
                                }
                            }
                            None => {
                                log.missed = true;
                                log.note(format!("search: no link for \"{q}\" scored above threshold"));
                            }
                        }
                        break;
                    }
                    PageType::Blocked => {
                        log.blocked += 1;
                        log.note(format!("search: {url} blocked"));
                    }
                    // No results, a 404 page or the home page: try the next template.
                    _ => log.missed = true,
                }
            }
        }
        None
    }

    pub(super) async fn listing_crawl(
        &mut self,
        ident: &Identifier,
        product_id: &str,
        log: &mut AttemptLog,
    ) -> Option<ResolvedProduct> {
        if self.listing.is_none() {
            let index = self.load_listing().await;
            self.listing = Some(index);
        }
        let Some(Some(index)) = self.listing.as_mut() else {
            return None;
        };
        let Some(found) = index.find_best_match(product_id, &ident.name, &ident.code) else {
            log.missed = true;
            log.note("listing_crawl: no listing match".to_string());
            return None;
        };
        let url = found.entry.product_url;
        let result = self
            .try_candidate(StrategyKind::ListingCrawl.as_str(), &url, product_id, log)
            .await;
        // Only a verified page keeps the listing entry claimed.
        if result.is_none() {
            if let Some(Some(index)) = self.listing.as_mut() {
                index.release(product_id);
            }
        }
        result
    }

    /// Product links across every configured listing page, indexed by name.
    async fn load_listing(&mut self) -> Option<CatalogIndex> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        let listing_urls = self.site.listing_urls.clone();
        for listing_url in &listing_urls {
            self.throttle().await;
            let page = match self.fetcher.fetch(listing_url, FetchKind::Page).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(site = %self.site.id, url = %listing_url, error = %e, "listing page failed");
                    continue;
                }
            };
            for link in collect_product_links(&page.body, &page.url, &self.site.product_path_markers)
            {
                if seen.insert(canonical_key(&link.url)) {
                    entries.push(CatalogEntry::new(&link.display_name(), &link.url));
                }
            }
        }
        tracing::info!(site = %self.site.id, pages = listing_urls.len(), links = entries.len(), "listing crawl indexed");
        (!entries.is_empty()).then(|| CatalogIndex::build(entries, self.settings.thresholds))
    }
}

/// A feed entry turned into an output row. No page is fetched.
fn catalog_product(entry: CatalogEntry, product_id: &str) -> ResolvedProduct {
    let fields = ExtractedFields {
        title: entry.title.clone(),
        description: entry.description.clone(),
        image_urls: dedupe_urls(entry.image_urls.clone()),
        ..ExtractedFields::default()
    };
    let record = fields.into_record(
        product_id,
        PageType::Product.as_str(),
        &entry.product_url,
        StrategyKind::PlatformFeed.as_str(),
    );
    ResolvedProduct {
        record,
        evidence: Evidence::Catalog(entry),
    }
}
