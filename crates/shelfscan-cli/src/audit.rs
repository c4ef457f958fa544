//! `audit`: check what a previous run left behind for each site.
//!
//! The result table passes when it has rows and no two rows share a title.
//! Saved snapshots are re-classified and counted by page type; they are
//! reported but do not decide the outcome.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::Context;
use shelfscan_core::{AppConfig, ExtractionRecord, PageType, SiteConfig};

use crate::run::output::{load_previous, SitePaths};

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct TableAudit {
    pub rows: usize,
    pub titled: usize,
    pub unique_titles: usize,
    pub described: usize,
    pub imaged: usize,
    pub dimensioned: usize,
    /// Rows carrying title, description and image together.
    pub complete: usize,
}

impl TableAudit {
    pub(crate) fn from_records<'a>(records: impl IntoIterator<Item = &'a ExtractionRecord>) -> Self {
        let mut audit = Self::default();
        let mut titles = HashSet::new();
        for record in records {
            audit.rows += 1;
            let title = record.title.trim();
            let has_title = !title.is_empty();
            let has_description = !record.description.trim().is_empty();
            let has_image = !record.image_url.trim().is_empty();
            if has_title {
                audit.titled += 1;
                titles.insert(title.to_lowercase());
            }
            audit.described += usize::from(has_description);
            audit.imaged += usize::from(has_image);
            audit.dimensioned += usize::from(!record.dimensions.trim().is_empty());
            audit.complete += usize::from(has_title && has_description && has_image);
        }
        audit.unique_titles = titles.len();
        audit
    }

    /// Every titled row has its own title, and at least one row is titled.
    pub(crate) fn distinct_titles(&self) -> bool {
        self.titled > 0 && self.unique_titles == self.titled
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct SnapshotAudit {
    pub files: usize,
    pub page_types: BTreeMap<&'static str, usize>,
    /// Snapshots that still classify as product pages.
    pub product_pages: usize,
}

/// Classify every `*.html` file in `dir`. A missing directory is empty.
pub(crate) fn audit_snapshots(dir: &Path) -> anyhow::Result<SnapshotAudit> {
    let mut audit = SnapshotAudit::default();
    if !dir.is_dir() {
        return Ok(audit);
    }
    let mut files: Vec<_> = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "html"))
        .collect();
    files.sort();

    for path in files {
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable snapshot");
                continue;
            }
        };
        let signature = shelfscan_scraper::classify(&String::from_utf8_lossy(&bytes));
        audit.files += 1;
        *audit
            .page_types
            .entry(signature.page_type.as_str())
            .or_default() += 1;
        if signature.page_type == PageType::Product {
            audit.product_pages += 1;
        }
    }
    Ok(audit)
}

#[derive(Debug)]
pub(crate) struct SiteAudit {
    pub site: String,
    pub table: TableAudit,
    pub snapshots: SnapshotAudit,
}

impl SiteAudit {
    pub(crate) fn passed(&self) -> bool {
        self.table.rows > 0 && self.table.distinct_titles()
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        let t = &self.table;
        let s = &self.snapshots;
        let page_types: Vec<String> = s
            .page_types
            .iter()
            .map(|(kind, n)| format!("{kind} {n}"))
            .collect();
        vec![
            format!(
                "{}: {}",
                self.site,
                if self.passed() { "ok" } else { "FAILED" }
            ),
            format!(
                "  table: {} rows | titles {} ({} unique) | descriptions {} | images {} | dimensions {} | complete {}",
                t.rows, t.titled, t.unique_titles, t.described, t.imaged, t.dimensioned, t.complete
            ),
            format!(
                "  snapshots: {} files | product pages {} | {}",
                s.files,
                s.product_pages,
                if page_types.is_empty() {
                    "-".to_string()
                } else {
                    page_types.join(", ")
                }
            ),
        ]
    }
}

pub(crate) fn audit_site(data_dir: &Path, site_id: &str) -> anyhow::Result<SiteAudit> {
    let paths = SitePaths::new(data_dir, site_id);
    let previous = load_previous(&paths.table)?;
    Ok(SiteAudit {
        site: site_id.to_string(),
        table: TableAudit::from_records(previous.values()),
        snapshots: audit_snapshots(&paths.html_dir)?,
    })
}

/// Audit every site in `sites` and print a short report per site.
///
/// # Errors
///
/// Returns an error when any site has an empty table or repeated titles.
pub(crate) fn run_audit(config: &AppConfig, sites: &[SiteConfig]) -> anyhow::Result<()> {
    let mut failed = 0usize;
    for site in sites {
        let audit = audit_site(&config.data_dir, &site.id)
            .with_context(|| format!("failed to audit '{}'", site.id))?;
        if !audit.passed() {
            tracing::warn!(site = %site.id, rows = audit.table.rows, unique_titles = audit.table.unique_titles, "audit failed");
            failed += 1;
        }
        for line in audit.lines() {
            println!("{line}");
        }
    }
    if failed > 0 {
        anyhow::bail!("{failed} of {} sites failed the audit", sites.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use shelfscan_core::RecordStatus;

    use crate::run::output::{write_snapshot, write_table};
    use crate::run::test_support::{temp_dir, test_config};

    fn record(product_id: &str, title: &str, image: &str) -> ExtractionRecord {
        ExtractionRecord {
            product_id: product_id.to_string(),
            title: title.to_string(),
            description: format!("About {title}"),
            image_url: image.to_string(),
            image_urls: Vec::new(),
            dimensions: String::new(),
            page_type: "product".to_string(),
            product_url: format!("https://shop.test/products/{product_id}"),
            strategy: "direct_pattern".to_string(),
            status: RecordStatus::Resolved,
        }
    }

    #[test]
    fn table_counts_fields_and_unique_titles() {
        let records = vec![
            record("A1", "Blue Widget", "https://cdn.test/a.jpg"),
            record("A2", "Red Widget", ""),
            ExtractionRecord::failed("A3", RecordStatus::NotFound),
        ];
        let audit = TableAudit::from_records(&records);
        assert_eq!(audit.rows, 3);
        assert_eq!(audit.titled, 2);
        assert_eq!(audit.unique_titles, 2);
        assert_eq!(audit.described, 2);
        assert_eq!(audit.imaged, 1);
        assert_eq!(audit.complete, 1);
        assert!(audit.distinct_titles());
    }

    #[test]
    fn repeated_titles_are_not_distinct() {
        let records = vec![
            record("A1", "Acme Toys", "https://cdn.test/logo.jpg"),
            record("A2", "acme toys", "https://cdn.test/logo.jpg"),
        ];
        let audit = TableAudit::from_records(&records);
        assert_eq!(audit.unique_titles, 1);
        assert!(!audit.distinct_titles());
        assert!(!TableAudit::default().distinct_titles());
    }

    #[test]
    fn snapshots_are_classified_by_page_type() {
        let dir = temp_dir();
        let html_dir = dir.join("html");
        let html = format!(
            r#"<html><head><title>Blue Widget</title><script type="application/ld+json">{{"@type":"Product","name":"Blue Widget"}}</script></head><body><h1>Blue Widget</h1><footer>{}</footer></body></html>"#,
            "Free delivery on orders over fifty dollars. ".repeat(6)
        );
        write_snapshot(&html_dir, "A1", &html).expect("snapshot");
        std::fs::write(html_dir.join("notes.txt"), "not a snapshot").expect("write notes");

        let audit = audit_snapshots(&html_dir).expect("audit");
        assert_eq!(audit.files, 1);
        assert_eq!(audit.product_pages, 1);
        assert_eq!(audit.page_types.get("product"), Some(&1));

        let missing = audit_snapshots(&dir.join("nope")).expect("missing dir is fine");
        assert_eq!(missing, SnapshotAudit::default());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn audit_fails_for_missing_or_repetitive_tables() {
        let dir = temp_dir();
        let config = test_config(&dir);
        let good = SiteConfig::new("good", "https://good.test");
        let same = SiteConfig::new("same", "https://same.test");
        let paths = SitePaths::new(&dir, "good");
        write_table(
            &paths.table,
            &[
                record("A1", "Blue Widget", "https://cdn.test/a.jpg"),
                record("A2", "Red Widget", "https://cdn.test/b.jpg"),
            ],
        )
        .expect("table written");
        let paths = SitePaths::new(&dir, "same");
        write_table(
            &paths.table,
            &[
                record("A1", "Acme Toys", "https://cdn.test/logo.jpg"),
                record("A2", "Acme Toys", "https://cdn.test/logo.jpg"),
            ],
        )
        .expect("table written");

        let audit = audit_site(&dir, "good").expect("audit");
        assert!(audit.passed());
        assert_eq!(audit.lines()[0], "good: ok");
        run_audit(&config, std::slice::from_ref(&good)).expect("good site passes");

        let err = run_audit(&config, &[good, same]).expect_err("repeated titles fail");
        assert_eq!(err.to_string(), "1 of 2 sites failed the audit");

        let err = run_audit(&config, &[SiteConfig::new("empty", "https://empty.test")])
            .expect_err("a site without a table fails");
        assert!(err.to_string().contains("1 of 1"));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
