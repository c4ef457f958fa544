//! `run`: resolve every row of each selected site and write the site's
//! result table, summary, snapshots and images.
//!
//! Sites run concurrently up to `max_concurrent_sites`; rows inside a site
//! run one at a time. Per-row failures become empty records and per-site
//! failures are logged and skipped, so one bad site does not abort the batch.

mod images;
mod lock;
pub(crate) mod output;
mod rows;

use std::collections::{HashMap, HashSet};

use anyhow::Context;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use shelfscan_core::{AppConfig, ExtractionRecord, RecordStatus, SiteConfig};
use shelfscan_scraper::{
    FetchSettings, ResolveOutcome, ResolvedProduct, Resolver, ResolverSettings, SiteFetcher,
};

use self::images::ImageStore;
use self::lock::SiteLock;
use self::output::{RunSummary, SitePaths};
pub(crate) use self::rows::read_rows;
use self::rows::SheetRow;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RunOptions {
    pub force: bool,
    pub limit: Option<usize>,
    pub dry_run: bool,
}

/// Outcome of one site run. `Err` wraps configuration and I/O failures that
/// stopped the site before or while writing its output.
enum SiteOutcome {
    Done(RunSummary),
    Locked,
    Err(anyhow::Error),
}

/// Run every site in `sites` and print one summary line per site.
///
/// # Errors
///
/// Returns an error only when every selected site failed.
pub(crate) async fn run_sites(
    config: &AppConfig,
    sites: &[SiteConfig],
    options: &RunOptions,
) -> anyhow::Result<()> {
    let max_concurrent = config.max_concurrent_sites.max(1);
    let site_count = sites.len();

    let results: Vec<(&SiteConfig, SiteOutcome)> = stream::iter(sites)
        .map(|site| async move {
            let outcome = match run_site(config, site, options).await {
                Ok(Some(summary)) => SiteOutcome::Done(summary),
                Ok(None) => SiteOutcome::Locked,
                Err(e) => SiteOutcome::Err(e),
            };
            (site, outcome)
        })
        .buffer_unordered(max_concurrent)
        .collect()
        .await;

    let mut failed_sites = 0usize;
    for (site, outcome) in &results {
        match outcome {
            SiteOutcome::Done(summary) => println!("{}", summary.human_line()),
            SiteOutcome::Locked => println!("{}: skipped, another run holds the lock", site.id),
            SiteOutcome::Err(e) => {
                tracing::error!(site = %site.id, error = %format!("{e:#}"), "site run failed");
                println!("{}: failed: {e:#}", site.id);
                failed_sites += 1;
            }
        }
    }

    if failed_sites > 0 {
        tracing::warn!(failed_sites, total_sites = site_count, "some sites failed");
    }
    if site_count > 0 && failed_sites == site_count {
        anyhow::bail!("all {failed_sites} sites failed");
    }
    Ok(())
}

/// Process one site end to end. `Ok(None)` means the site lock was held.
async fn run_site(
    config: &AppConfig,
    site: &SiteConfig,
    options: &RunOptions,
) -> anyhow::Result<Option<RunSummary>> {
    site.validate()
        .with_context(|| format!("site '{}' has invalid configuration", site.id))?;
    let paths = SitePaths::new(&config.data_dir, &site.id);

    let _lock = if options.dry_run {
        None
    } else {
        std::fs::create_dir_all(&paths.output_dir)
            .with_context(|| format!("failed to create {}", paths.output_dir.display()))?;
        let Some(lock) = SiteLock::acquire(&paths.lock)? else {
            tracing::warn!(site = %site.id, path = %paths.lock.display(), "site is locked by another run");
            return Ok(None);
        };
        Some(lock)
    };

    let started_at = Utc::now();
    let mut rows = read_rows(&site.sheet_path(&config.data_dir), &site.columns)?;
    let held_back = match options.limit {
        Some(limit) if limit < rows.len() => rows.split_off(limit),
        _ => Vec::new(),
    };

    let previous = output::load_previous(&paths.table)?;
    let carried: HashMap<String, ExtractionRecord> = if options.force {
        HashMap::new()
    } else {
        previous
            .iter()
            .filter(|(_, record)| is_reusable(record, &paths))
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    };
    // Rows past `--limit` keep whatever the previous table had for them.
    let kept = kept_records(&rows, &held_back, &previous);

    let fetcher = SiteFetcher::for_site(site.fetcher, &FetchSettings::from_config(config, site))
        .await
        .with_context(|| format!("failed to start {:?} fetcher for '{}'", site.fetcher, site.id))?;
    let mut resolver = Resolver::new(site.clone(), fetcher, ResolverSettings::from_config(config))?;
    let images = ImageStore::new(config, site.verify_tls)?;

    tracing::info!(
        site = %site.id,
        rows = rows.len(),
        carried = carried.len(),
        dry_run = options.dry_run,
        "site run started"
    );

    resolver.capture_baseline().await;
    for record in carried.values().chain(kept.iter().filter(|r| r.is_resolved())) {
        resolver.remember_title(&record.title, &record.product_id);
    }

    let mut records = Vec::with_capacity(rows.len());
    let mut seen_ids = HashSet::new();
    let mut reused = 0usize;
    for row in &rows {
        if !seen_ids.insert(row.product_id.clone()) {
            tracing::warn!(site = %site.id, product_id = %row.product_id, row = row.row_number, "duplicate product id");
            records.push(ExtractionRecord::failed(&row.product_id, RecordStatus::Skipped));
            continue;
        }
        if let Some(record) = carried.get(&row.product_id) {
            records.push(record.clone());
            reused += 1;
            continue;
        }

        let outcome = resolver.resolve(&row.identifier, &row.product_id).await;
        match &outcome {
            ResolveOutcome::Resolved(found) => {
                if !options.dry_run {
                    save_artifacts(&paths, &images, found).await;
                }
            }
            ResolveOutcome::Failed(failure) => tracing::info!(
                site = %site.id,
                product_id = %row.product_id,
                status = %failure.reason.status(),
                detail = %failure.detail,
                "row not resolved"
            ),
        }
        records.push(outcome.into_record(&row.product_id));
    }

    let summary = RunSummary::tally(&site.id, started_at, &records, reused, options.dry_run);
    if !options.dry_run {
        records.extend(kept);
        output::write_table(&paths.table, &records)?;
        output::write_summary(&paths.summary, &summary)?;
    }
    tracing::info!(
        site = %site.id,
        rows = summary.total_rows,
        reused,
        resolved = summary.count(RecordStatus::Resolved),
        generic = summary.count(RecordStatus::Generic),
        blocked = summary.count(RecordStatus::Blocked),
        "site run finished"
    );
    Ok(Some(summary))
}

/// Previous records for `held_back` rows, in sheet order, skipping ids that
/// also appear among the rows processed this run.
fn kept_records(
    rows: &[SheetRow],
    held_back: &[SheetRow],
    previous: &HashMap<String, ExtractionRecord>,
) -> Vec<ExtractionRecord> {
    let mut seen: HashSet<&str> = rows.iter().map(|r| r.product_id.as_str()).collect();
    held_back
        .iter()
        .filter(|row| seen.insert(row.product_id.as_str()))
        .filter_map(|row| previous.get(&row.product_id).cloned())
        .collect()
}

/// A previous row is carried over when it resolved and its image, if it
/// recorded one, is already on disk.
fn is_reusable(record: &ExtractionRecord, paths: &SitePaths) -> bool {
    record.is_resolved()
        && (record.image_url.is_empty()
            || images::image_path(&paths.image_dir, &record.product_id, &record.image_url)
                .exists())
}

/// Snapshot and primary image for an accepted row. Failures are logged only.
async fn save_artifacts(paths: &SitePaths, images: &ImageStore, found: &ResolvedProduct) {
    let record = &found.record;
    if let Some(html) = found.html() {
        if let Err(e) = output::write_snapshot(&paths.html_dir, &record.product_id, html) {
            tracing::warn!(product_id = %record.product_id, error = %e, "failed to save snapshot");
        }
    }
    if !record.image_url.is_empty() {
        let dest = images::image_path(&paths.image_dir, &record.product_id, &record.image_url);
        if images.save(&record.image_url, &dest).await {
            tracing::debug!(product_id = %record.product_id, path = %dest.display(), "image saved");
        }
    }
}


#[cfg(test)]
#[path = "run_test.rs"]
mod tests;
