//! Per-site output: the result table, the run summary and HTML snapshots.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shelfscan_core::{sanitize_file_stem, ExtractionRecord, RecordStatus};
use uuid::Uuid;

use super::lock::LOCK_FILE_NAME;

pub(super) const TABLE_COLUMNS: [&str; 10] = [
    "product_id",
    "title",
    "description",
    "image_url",
    "image_urls",
    "dimensions",
    "page_type",
    "product_url",
    "strategy",
    "status",
];

/// Every file a site run reads or writes under the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SitePaths {
    pub output_dir: PathBuf,
    pub table: PathBuf,
    pub summary: PathBuf,
    pub lock: PathBuf,
    pub html_dir: PathBuf,
    pub image_dir: PathBuf,
}

impl SitePaths {
    pub(crate) fn new(data_dir: &Path, site_id: &str) -> Self {
        let output_dir = data_dir.join("output").join(site_id);
        Self {
            table: output_dir.join("products.csv"),
            summary: output_dir.join("summary.json"),
            lock: output_dir.join(LOCK_FILE_NAME),
            html_dir: data_dir.join("html").join(site_id),
            image_dir: data_dir.join("images").join(site_id),
            output_dir,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct TableRow {
    product_id: String,
    title: String,
    description: String,
    image_url: String,
    image_urls: String,
    dimensions: String,
    page_type: String,
    product_url: String,
    strategy: String,
    status: String,
}

impl From<&ExtractionRecord> for TableRow {
    fn from(record: &ExtractionRecord) -> Self {
        Self {
            product_id: record.product_id.clone(),
            title: record.title.clone(),
            description: record.description.clone(),
            image_url: record.image_url.clone(),
            image_urls: record.image_urls_joined(),
            dimensions: record.dimensions.clone(),
            page_type: record.page_type.clone(),
            product_url: record.product_url.clone(),
            strategy: record.strategy.clone(),
            status: record.status.as_str().to_string(),
        }
    }
}

impl TableRow {
    fn into_record(self) -> Option<ExtractionRecord> {
        let status = RecordStatus::parse(&self.status)?;
        Some(ExtractionRecord {
            image_urls: ExtractionRecord::split_image_urls(&self.image_urls),
            product_id: self.product_id,
            title: self.title,
            description: self.description,
            image_url: self.image_url,
            dimensions: self.dimensions,
            page_type: self.page_type,
            product_url: self.product_url,
            strategy: self.strategy,
            status,
        })
    }
}

/// Write the whole table to a temp file, then rename it over `path`.
pub(crate) fn write_table(path: &Path, records: &[ExtractionRecord]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&tmp)
            .with_context(|| format!("failed to create {}", tmp.display()))?;
        writer.write_record(TABLE_COLUMNS)?;
        for record in records {
            writer.serialize(TableRow::from(record))?;
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to move {} into place", tmp.display()))?;
    Ok(())
}

/// Records from a previous run keyed by product id. A missing table is an
/// empty map; rows that do not parse are skipped.
pub(crate) fn load_previous(path: &Path) -> anyhow::Result<HashMap<String, ExtractionRecord>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;

    let mut previous = HashMap::new();
    for (index, row) in reader.deserialize::<TableRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(path = %path.display(), row = index + 1, error = %e, "skipping unreadable previous row");
                continue;
            }
        };
        if let Some(record) = row.into_record() {
            previous.insert(record.product_id.clone(), record);
        }
    }
    Ok(previous)
}

/// Save the page an accepted record came from, for later inspection.
pub(crate) fn write_snapshot(html_dir: &Path, product_id: &str, html: &str) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(html_dir)?;
    let path = html_dir.join(format!("{}.html", sanitize_file_stem(product_id)));
    std::fs::write(&path, html)?;
    Ok(path)
}

/// What one site run produced, written next to the table as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct RunSummary {
    pub run_id: Uuid,
    pub site: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_rows: usize,
    /// Rows carried over from the previous table without refetching.
    pub reused: usize,
    pub dry_run: bool,
    /// Every status, including those with a zero count.
    pub counts: BTreeMap<String, usize>,
}

impl RunSummary {
    pub(super) fn tally(
        site: &str,
        started_at: DateTime<Utc>,
        records: &[ExtractionRecord],
        reused: usize,
        dry_run: bool,
    ) -> Self {
        let mut counts: BTreeMap<String, usize> = RecordStatus::ALL
            .iter()
            .map(|s| (s.as_str().to_string(), 0))
            .collect();
        for record in records {
            *counts.entry(record.status.as_str().to_string()).or_default() += 1;
        }
        Self {
            run_id: Uuid::new_v4(),
            site: site.to_string(),
            started_at,
            finished_at: Utc::now(),
            total_rows: records.len(),
            reused,
            dry_run,
            counts,
        }
    }

    #[must_use]
    pub(crate) fn count(&self, status: RecordStatus) -> usize {
        self.counts.get(status.as_str()).copied().unwrap_or(0)
    }

    /// One line for the terminal. `not_found` includes the rows that never
    /// produced a candidate.
    pub(crate) fn human_line(&self) -> String {
        let no_match = self.count(RecordStatus::NoMatch);
        let no_url = self.count(RecordStatus::NoUrl);
        let not_found = self.count(RecordStatus::NotFound) + no_match + no_url;
        let mut line = format!(
            "{}: {} rows ({} reused) | resolved {} | generic {} | blocked {} | not_found {} (no_match {}, no_url {})",
            self.site,
            self.total_rows,
            self.reused,
            self.count(RecordStatus::Resolved),
            self.count(RecordStatus::Generic),
            self.count(RecordStatus::Blocked),
            not_found,
            no_match,
            no_url,
        );
        let network = self.count(RecordStatus::NetworkError);
        if network > 0 {
            line.push_str(&format!(" | network_error {network}"));
        }
        if self.dry_run {
            line.push_str(" [dry run]");
        }
        line
    }
}

pub(super) fn write_summary(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(summary)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
#[path = "output_test.rs"]
mod tests;
