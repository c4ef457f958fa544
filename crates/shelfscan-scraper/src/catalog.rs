//! Name-based matching against a site's bulk catalog.
//!
//! Titles are normalized to lowercase alphanumeric tokens. A target name
//! matches an entry when enough of its significant tokens (filler words
//! removed) appear in the entry, with the required share depending on how
//! many significant tokens the target has.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;
use shelfscan_core::MatchThresholds;

/// Words that carry no identity: determiners, connectors, pack-size words.
pub const FILLER_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "of", "for", "with", "by", "in", "to", "set", "kit", "pack",
    "ct", "pcs", "pc", "piece", "pieces",
];

/// Barcodes and SKUs shorter than this are too ambiguous to index.
pub const MIN_BARCODE_LEN: usize = 5;

/// One product from a bulk listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub title: String,
    /// Significant tokens of the normalized title.
    pub tokens: BTreeSet<String>,
    pub description: String,
    pub image_urls: Vec<String>,
    pub product_url: String,
    pub barcodes: BTreeSet<String>,
}

impl CatalogEntry {
    #[must_use]
    pub fn new(title: &str, product_url: &str) -> Self {
        Self {
            title: title.trim().to_string(),
            tokens: significant_tokens(title),
            product_url: product_url.to_string(),
            ..Self::default()
        }
    }

    /// Adds a barcode or SKU if it is long enough to be meaningful.
    pub fn add_barcode(&mut self, raw: &str) {
        let code = raw.trim();
        if code.chars().count() >= MIN_BARCODE_LEN {
            self.barcodes.insert(code.to_string());
        }
    }
}

/// Lowercase, every character outside `[a-z0-9 ]` replaced by a space,
/// whitespace collapsed.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let replaced: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                ' '
            }
        })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized tokens without filler words. Falls back to every token when
/// the name consists only of filler.
#[must_use]
pub fn significant_tokens(name: &str) -> BTreeSet<String> {
    let normalized = normalize_name(name);
    let all: BTreeSet<String> = normalized.split_whitespace().map(str::to_string).collect();
    let significant: BTreeSet<String> = all
        .iter()
        .filter(|t| !FILLER_WORDS.contains(&t.as_str()))
        .cloned()
        .collect();
    if significant.is_empty() {
        all
    } else {
        significant
    }
}

/// Share of `target` tokens found in `candidate`, in `0.0..=1.0`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn overlap_ratio(target: &BTreeSet<String>, candidate: &BTreeSet<String>) -> f64 {
    if target.is_empty() {
        return 0.0;
    }
    let shared = target.intersection(candidate).count();
    shared as f64 / target.len() as f64
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Barcode,
    ExactName,
    Tokens,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogMatch {
    pub entry: CatalogEntry,
    pub score: f64,
    pub kind: MatchKind,
}

/// In-memory index over one site's catalog, owned by one site run.
///
/// An entry can be claimed by one product id only, so near-duplicate sheet
/// rows do not collapse onto the same catalog item. Asking again for the
/// same product id returns the same entry.
#[derive(Debug, Clone)]
pub struct CatalogIndex {
    entries: Vec<CatalogEntry>,
    by_name: HashMap<String, usize>,
    by_barcode: HashMap<String, usize>,
    claimed: HashMap<usize, String>,
    thresholds: MatchThresholds,
}

impl CatalogIndex {
    #[must_use]
    pub fn build(entries: Vec<CatalogEntry>, thresholds: MatchThresholds) -> Self {
        let mut by_name = HashMap::new();
        let mut by_barcode = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            let normalized = normalize_name(&entry.title);
            if !normalized.is_empty() {
                by_name.entry(normalized).or_insert(idx);
            }
            for code in &entry.barcodes {
                by_barcode.entry(code.clone()).or_insert(idx);
            }
        }
        Self {
            entries,
            by_name,
            by_barcode,
            claimed: HashMap::new(),
            thresholds,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Best entry for `product_id`, by barcode first, then exact normalized
    /// name, then token overlap above the threshold for the name's length.
    /// The winning entry is claimed for `product_id`.
    pub fn find_best_match(&mut self, product_id: &str, name: &str, code: &str) -> Option<CatalogMatch> {
        let (idx, score, kind) = self.best_candidate(product_id, name, code)?;
        self.claimed.entry(idx).or_insert_with(|| product_id.to_string());
        Some(CatalogMatch {
            entry: self.entries[idx].clone(),
            score,
            kind,
        })
    }

    /// Drop every claim held by `product_id`, making those entries available
    /// to other rows again.
    pub fn release(&mut self, product_id: &str) {
        self.claimed.retain(|_, owner| owner != product_id);
    }

    fn available(&self, idx: usize, product_id: &str) -> bool {
        self.claimed.get(&idx).is_none_or(|owner| owner == product_id)
    }

    fn best_candidate(&self, product_id: &str, name: &str, code: &str) -> Option<(usize, f64, MatchKind)> {
        let code = code.trim();
        if !code.is_empty() {
            if let Some(&idx) = self.by_barcode.get(code) {
                if self.available(idx, product_id) {
                    return Some((idx, 1.0, MatchKind::Barcode));
                }
            }
        }

        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return None;
        }
        if let Some(&idx) = self.by_name.get(&normalized) {
            if self.available(idx, product_id) {
                return Some((idx, 1.0, MatchKind::ExactName));
            }
        }

        let target = significant_tokens(name);
        let threshold = self.thresholds.for_token_count(target.len());
        let mut best: Option<(usize, f64)> = None;
        for (idx, entry) in self.entries.iter().enumerate() {
            if !self.available(idx, product_id) {
                continue;
            }
            let score = overlap_ratio(&target, &entry.tokens);
            if score >= threshold && best.is_none_or(|(_, top)| score > top) {
                best = Some((idx, score));
            }
        }
        best.map(|(idx, score)| (idx, score, MatchKind::Tokens))
    }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
