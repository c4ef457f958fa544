//! `investigate`: rank a site's strategies against its first few rows.

use std::path::{Path, PathBuf};

use anyhow::Context;
use shelfscan_core::{AppConfig, Identifier, SiteConfig, StrategyKind};
use shelfscan_scraper::{FetchSettings, ResolverSettings, SiteFetcher, SiteReport};

use crate::run::read_rows;

pub(crate) fn report_path(data_dir: &Path, site_id: &str) -> PathBuf {
    data_dir.join("reports").join(format!("{site_id}.json"))
}

/// Investigate `site` with its first `samples` rows, write the JSON report
/// and print a summary.
pub(crate) async fn run_investigate(
    config: &AppConfig,
    site: &SiteConfig,
    samples: usize,
) -> anyhow::Result<()> {
    site.validate()
        .with_context(|| format!("site '{}' has invalid configuration", site.id))?;

    let rows = read_rows(&site.sheet_path(&config.data_dir), &site.columns)?;
    let sample_rows: Vec<(String, Identifier)> = rows
        .into_iter()
        .take(samples.max(1))
        .map(|row| (row.product_id, row.identifier))
        .collect();
    if sample_rows.is_empty() {
        anyhow::bail!("site '{}' has no processable rows to sample", site.id);
    }

    let fetcher = SiteFetcher::for_site(site.fetcher, &FetchSettings::from_config(config, site))
        .await
        .with_context(|| format!("failed to start {:?} fetcher for '{}'", site.fetcher, site.id))?;
    let report = shelfscan_scraper::investigate(
        site,
        &fetcher,
        &ResolverSettings::from_config(config),
        &sample_rows,
    )
    .await?;

    let path = report_path(&config.data_dir, &site.id);
    write_report(&path, &report)?;
    for line in report_lines(&report) {
        println!("{line}");
    }
    println!("report written to {}", path.display());
    Ok(())
}

fn write_report(path: &Path, report: &SiteReport) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

fn report_lines(report: &SiteReport) -> Vec<String> {
    let probe = &report.probe;
    let mut lines = vec![
        format!(
            "{} ({}), {} samples",
            report.site, report.base_url, report.samples
        ),
        format!(
            "  baseline title: {}",
            probe.baseline_title.as_deref().unwrap_or("-")
        ),
        format!(
            "  robots sitemaps: {} | sitemap product urls: {}",
            probe.robots_sitemaps.len(),
            probe.sitemap_product_urls
        ),
        format!(
            "  shopify feed: {} | woocommerce store api: {} | wordpress rest: {}",
            yes_no(probe.shopify_feed),
            yes_no(probe.woocommerce_store_api),
            yes_no(probe.wordpress_rest)
        ),
    ];
    for s in &report.strategies {
        lines.push(format!(
            "  {:<14} score {:>4} | resolved {}/{} | generic {} | blocked {} | titles {} | images {} | jsonld {}",
            s.strategy.as_str(),
            s.score,
            s.resolved,
            s.attempted,
            s.generic,
            s.blocked,
            s.unique_titles,
            s.unique_images,
            s.jsonld
        ));
    }
    lines.push(format!(
        "  recommended strategies: {}",
        strategy_list(&report.recommended_order)
    ));
    lines
}

fn strategy_list(order: &[StrategyKind]) -> String {
    if order.is_empty() {
        return "none resolved anything".to_string();
    }
    let names: Vec<&str> = order.iter().map(|k| k.as_str()).collect();
    format!("[{}]", names.join(", "))
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}
