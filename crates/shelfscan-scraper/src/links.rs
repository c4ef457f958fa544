//! Product-link collection and scoring for search and listing pages.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use shelfscan_core::slugify;

use crate::classify::is_product_href;
use crate::html::{absolutize_url, canonical_key, collapse_whitespace};

/// Likely result containers, most specific first.
pub const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main",
    "#MainContent",
    "#main-content",
    "#content",
    "[role='main']",
    ".main-content",
    ".search-results",
    ".search-result",
    "#shopify-section-search-template",
    ".collection-products",
    ".product-list",
    ".results",
];

const URL_MATCH_SCORE: u32 = 10;
const TEXT_MATCH_SCORE: u32 = 5;

static CONTAINER_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    MAIN_CONTENT_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("valid content selector"))
        .collect()
});
static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid anchor selector"));
static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[alt]").expect("valid img selector"));

/// A product-looking anchor found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductLink {
    /// Absolute URL, fragment removed.
    pub url: String,
    /// Visible text, or `title`/image `alt` when the anchor has no text.
    pub text: String,
}

impl ProductLink {
    /// Human-readable name for catalog matching: the link text, else the
    /// last path segment with dashes turned into spaces.
    #[must_use]
    pub fn display_name(&self) -> String {
        if !self.text.is_empty() {
            return self.text.clone();
        }
        let path = self.url.split(['?', '#']).next().unwrap_or(&self.url);
        path.trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .trim_end_matches(".html")
            .replace(['-', '_'], " ")
    }
}

/// Product links from the first content container that holds any, falling
/// back to the whole document. Deduplicated by canonical URL, first seen wins.
#[must_use]
pub fn collect_product_links(html: &str, page_url: &str, extra_markers: &[String]) -> Vec<ProductLink> {
    let document = Html::parse_document(html);

    for selector in CONTAINER_SELECTORS.iter() {
        let mut seen = HashSet::new();
        let links: Vec<ProductLink> = document
            .select(selector)
            .flat_map(|container| links_in(container, page_url, extra_markers, &mut seen))
            .collect();
        if !links.is_empty() {
            return links;
        }
    }

    let mut seen = HashSet::new();
    links_in(document.root_element(), page_url, extra_markers, &mut seen)
}

fn links_in(
    root: ElementRef<'_>,
    page_url: &str,
    extra_markers: &[String],
    seen: &mut HashSet<String>,
) -> Vec<ProductLink> {
    let mut out = Vec::new();
    for anchor in root.select(&ANCHOR_SELECTOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !is_product_href(href, extra_markers) {
            continue;
        }
        let Some(absolute) = absolutize_url(page_url, href) else {
            continue;
        };
        if !seen.insert(canonical_key(&absolute)) {
            continue;
        }
        let url = absolute.split('#').next().unwrap_or(&absolute).to_string();
        out.push(ProductLink {
            url,
            text: anchor_text(anchor),
        });
    }
    out
}

fn anchor_text(anchor: ElementRef<'_>) -> String {
    let text = collapse_whitespace(&anchor.text().collect::<Vec<_>>().join(" "));
    if !text.is_empty() {
        return text;
    }
    if let Some(title) = anchor.value().attr("title") {
        return collapse_whitespace(title);
    }
    anchor
        .select(&IMG_SELECTOR)
        .find_map(|img| img.value().attr("alt"))
        .map(collapse_whitespace)
        .unwrap_or_default()
}

/// Query words worth matching on: split on runs of non-word characters,
/// longer than one character, lowercased.
#[must_use]
pub fn significant_words(query: &str) -> Vec<String> {
    query
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| w.chars().count() > 1)
        .map(str::to_lowercase)
        .collect()
}

/// Relevance of `link` to `query`.
///
/// +10 when the whole query (or its slug form) appears in the URL, +5 when
/// it appears in the link text, +1 for each significant word found in
/// either. Case-insensitive.
#[must_use]
pub fn score_link(query: &str, link: &ProductLink) -> u32 {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return 0;
    }
    let url = link.url.to_lowercase();
    let text = link.text.to_lowercase();
    let slug = slugify(&query);

    let mut score = 0;
    if url.contains(&query) || (!slug.is_empty() && url.contains(&slug)) {
        score += URL_MATCH_SCORE;
    }
    if text.contains(&query) {
        score += TEXT_MATCH_SCORE;
    }
    for word in significant_words(&query) {
        if url.contains(&word) || text.contains(&word) {
            score += 1;
        }
    }
    score
}

/// Highest-scoring link at or above `min_score`. Ties keep the earliest link.
#[must_use]
pub fn best_link<'a>(query: &str, links: &'a [ProductLink], min_score: u32) -> Option<(&'a ProductLink, u32)> {
    let mut best: Option<(&ProductLink, u32)> = None;
    for link in links {
        let score = score_link(query, link);
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((link, score));
        }
    }
    best.filter(|(_, score)| *score >= min_score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(url: &str, text: &str) -> ProductLink {
        ProductLink {
            url: url.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn collects_from_main_content_only() {
        let html = r#"<html><body>
            <nav><a href="/products/featured">Featured</a></nav>
            <main>
              <a href="/products/blue-widget-3-pack?_pos=1#top">Blue Widget 3-Pack</a>
              <a href="/products/blue-widget-3-pack?_pos=2">Blue Widget 3-Pack</a>
              <a href="/about">About</a>
              <a href="/products/red-gadget"><img src="/r.jpg" alt="Red Gadget"></a>
            </main></body></html>"#;
        let links = collect_product_links(html, "https://shop.example/search?q=blue", &[]);
        assert_eq!(
            links,
            vec![
                link(
                    "https://shop.example/products/blue-widget-3-pack?_pos=1",
                    "Blue Widget 3-Pack"
                ),
                link("https://shop.example/products/red-gadget", "Red Gadget"),
            ]
        );
    }

    #[test]
    fn falls_back_to_whole_document() {
        let html = r#"<html><body><div class="grid">
            <a href="https://shop.example/product/x">X</a></div>
            <main><a href="/contact">Contact</a></main></body></html>"#;
        let links = collect_product_links(html, "https://shop.example/", &[]);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://shop.example/product/x");
    }

    #[test]
    fn site_markers_extend_the_heuristic() {
        let html = r#"<main><a href="/catalog/item~p42.html">Item</a></main>"#;
        assert!(collect_product_links(html, "https://shop.example/", &[]).is_empty());
        let links = collect_product_links(html, "https://shop.example/", &["~p".to_string()]);
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn slug_in_url_scores_at_least_ten() {
        let query = "Blue Widget 3-Pack";
        let hit = link("https://shop.example/products/blue-widget-3-pack", "");
        let miss = link("https://shop.example/products/red-gadget", "Red Gadget");
        assert!(score_link(query, &hit) >= 10);
        assert_eq!(score_link(query, &miss), 0);
    }

    #[test]
    fn text_and_words_add_up() {
        let l = link("https://shop.example/products/12345", "Deluxe Blue Widget");
        // "blue widget" in text (+5), "blue" and "widget" words (+2)
        assert_eq!(score_link("Blue Widget", &l), 7);
    }

    #[test]
    fn single_char_words_are_ignored() {
        assert_eq!(significant_words("A Blue-Widget x 3!"), vec!["blue", "widget"]);
    }

    #[test]
    fn hyphenated_query_words_score_separately() {
        assert_eq!(significant_words("Lego-Technic"), vec!["lego", "technic"]);
        let links = vec![link("https://s/products/technic-crane", "Technic Crane")];
        let (chosen, score) = best_link("Lego-Technic", &links, 1).unwrap();
        assert_eq!(chosen.url, "https://s/products/technic-crane");
        assert_eq!(score, 1);
    }

    #[test]
    fn best_link_prefers_first_on_ties() {
        let links = vec![
            link("https://s/products/widget-a", ""),
            link("https://s/products/widget-b", ""),
        ];
        let (chosen, score) = best_link("widget", &links, 1).unwrap();
        assert_eq!(chosen.url, "https://s/products/widget-a");
        assert_eq!(score, 11);
    }

    #[test]
    fn best_link_respects_minimum() {
        let links = vec![link("https://s/products/unrelated", "Other")];
        assert!(best_link("widget", &links, 1).is_none());
        assert!(best_link("widget", &links, 0).is_some());
        assert!(best_link("widget", &[], 0).is_none());
    }

    #[test]
    fn display_name_falls_back_to_slug() {
        assert_eq!(
            link("https://s/products/red-dragon-puzzle/", "").display_name(),
            "red dragon puzzle"
        );
        assert_eq!(link("https://s/p/x", "Named").display_name(), "Named");
    }
}
