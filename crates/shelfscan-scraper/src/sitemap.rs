//! Sitemap discovery: robots.txt `Sitemap:` lines first, then the
//! well-known `/sitemap.xml` and `/sitemap_index.xml` paths.

use std::collections::HashSet;
use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use shelfscan_core::{Identifier, MatchThresholds};

use crate::catalog::{overlap_ratio, significant_tokens};
use crate::error::ScraperError;
use crate::fetch::{FetchKind, Fetcher};

/// Sitemap-index levels that are expanded below a root sitemap.
pub const MAX_SITEMAP_DEPTH: usize = 2;
/// Product URLs tried per identifier.
pub const MAX_CANDIDATES: usize = 3;
/// Children followed from an index when none mention products.
const FALLBACK_CHILDREN: usize = 3;
const PRODUCT_URL_MARKERS: &[&str] = &["/product", "/products/", "/item/", "/p/"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SitemapDoc {
    pub is_index: bool,
    pub locs: Vec<String>,
}

/// Parse a `<urlset>` or `<sitemapindex>` document into its `<loc>` values.
pub(crate) fn parse_sitemap(xml: &str) -> Result<SitemapDoc, ScraperError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut doc = SitemapDoc::default();
    let mut in_loc = false;
    let mut current = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"sitemapindex" => doc.is_index = true,
                b"loc" => {
                    in_loc = true;
                    current.clear();
                }
                _ => {}
            },
            Event::Text(t) if in_loc => {
                current.push_str(&t.unescape().unwrap_or_default());
            }
            Event::CData(c) if in_loc => {
                current.push_str(&String::from_utf8_lossy(c.as_ref()));
            }
            Event::End(e) if e.local_name().as_ref() == b"loc" => {
                in_loc = false;
                let loc = current.trim();
                if !loc.is_empty() {
                    doc.locs.push(loc.to_string());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(doc)
}

/// `Sitemap:` entries of a robots.txt body, in file order.
#[must_use]
pub fn parse_robots_sitemaps(robots: &str) -> Vec<String> {
    robots
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            let value = value.trim();
            (key.trim().eq_ignore_ascii_case("sitemap") && !value.is_empty())
                .then(|| value.to_string())
        })
        .collect()
}

#[must_use]
pub fn is_product_url(url: &str, extra_markers: &[String]) -> bool {
    let lower = url.to_ascii_lowercase();
    PRODUCT_URL_MARKERS.iter().any(|m| lower.contains(m))
        || extra_markers
            .iter()
            .any(|m| !m.is_empty() && lower.contains(&m.to_ascii_lowercase()))
}

/// Children of a sitemap index worth following: those mentioning products,
/// else the first few.
fn select_children(locs: &[String]) -> Vec<String> {
    let product: Vec<String> = locs
        .iter()
        .filter(|u| u.to_ascii_lowercase().contains("product"))
        .cloned()
        .collect();
    if product.is_empty() {
        locs.iter().take(FALLBACK_CHILDREN).cloned().collect()
    } else {
        product
    }
}

/// What sitemap discovery found for one site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SitemapDiscovery {
    pub robots_sitemaps: Vec<String>,
    pub sitemaps_read: Vec<String>,
    pub product_urls: Vec<String>,
}

/// Walk the site's sitemaps and collect product-looking URLs.
///
/// Fetch and parse failures are logged and skipped; discovery never fails
/// as a whole. Roots are tried in order until one yields product URLs.
pub async fn discover<F: Fetcher>(
    fetcher: &F,
    base: &str,
    extra_markers: &[String],
    delay: Duration,
) -> SitemapDiscovery {
    let mut discovery = SitemapDiscovery::default();

    match fetcher.fetch(&format!("{base}/robots.txt"), FetchKind::Resource).await {
        Ok(page) => discovery.robots_sitemaps = parse_robots_sitemaps(&page.body),
        Err(e) => tracing::debug!(base, error = %e, "robots.txt unavailable"),
    }

    let roots = if discovery.robots_sitemaps.is_empty() {
        vec![format!("{base}/sitemap.xml"), format!("{base}/sitemap_index.xml")]
    } else {
        discovery.robots_sitemaps.clone()
    };

    let mut visited = HashSet::new();
    let mut seen_products = HashSet::new();

    for root in roots {
        let mut queue = vec![(root, 0usize)];
        while let Some((url, depth)) = queue.pop() {
            if url.to_ascii_lowercase().ends_with(".gz") || !visited.insert(url.clone()) {
                continue;
            }
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let doc = match fetcher.fetch(&url, FetchKind::Resource).await {
                Ok(page) => match parse_sitemap(&page.body) {
                    Ok(doc) => doc,
                    Err(e) => {
                        tracing::warn!(url, error = %e, "skipping unparseable sitemap");
                        continue;
                    }
                },
                Err(e) => {
                    tracing::debug!(url, error = %e, "sitemap fetch failed");
                    continue;
                }
            };
            discovery.sitemaps_read.push(url);

            if doc.is_index {
                if depth < MAX_SITEMAP_DEPTH {
                    // Reverse so children are visited in document order.
                    for child in select_children(&doc.locs).into_iter().rev() {
                        queue.push((child, depth + 1));
                    }
                }
                continue;
            }

            for loc in doc.locs {
                if is_product_url(&loc, extra_markers) && seen_products.insert(loc.clone()) {
                    discovery.product_urls.push(loc);
                }
            }
        }

        if !discovery.product_urls.is_empty() {
            break;
        }
    }

    tracing::debug!(
        base,
        sitemaps = discovery.sitemaps_read.len(),
        product_urls = discovery.product_urls.len(),
        "sitemap discovery finished"
    );
    discovery
}

/// Up to [`MAX_CANDIDATES`] sitemap URLs for `ident`.
///
/// URLs containing the identifier's code rank first. Otherwise the last
/// path segment is compared with the name by token overlap, using the same
/// thresholds as the catalog matcher.
#[must_use]
pub fn candidate_urls(product_urls: &[String], ident: &Identifier, thresholds: &MatchThresholds) -> Vec<String> {
    let code = ident.code.to_lowercase();
    let target = significant_tokens(&ident.name);
    let threshold = thresholds.for_token_count(target.len());

    let mut scored: Vec<(f64, &String)> = Vec::new();
    for url in product_urls {
        if !code.is_empty() && url.to_lowercase().contains(&code) {
            scored.push((2.0, url));
            continue;
        }
        if target.is_empty() {
            continue;
        }
        let ratio = overlap_ratio(&target, &significant_tokens(last_segment(url)));
        if ratio >= threshold {
            scored.push((ratio, url));
        }
    }

    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored
        .into_iter()
        .take(MAX_CANDIDATES)
        .map(|(_, url)| url.clone())
        .collect()
}

fn last_segment(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_urlset_locs() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
              <url><loc>https://shop.example/products/a</loc></url>
              <url><loc> https://shop.example/pages/about?x=1&amp;y=2 </loc></url>
            </urlset>"#;
        let doc = parse_sitemap(xml).unwrap();
        assert!(!doc.is_index);
        assert_eq!(
            doc.locs,
            vec![
                "https://shop.example/products/a",
                "https://shop.example/pages/about?x=1&y=2"
            ]
        );
    }

    #[test]
    fn detects_sitemap_index() {
        let xml = r"<sitemapindex><sitemap><loc>https://s/sitemap_products_1.xml</loc></sitemap></sitemapindex>";
        let doc = parse_sitemap(xml).unwrap();
        assert!(doc.is_index);
        assert_eq!(doc.locs.len(), 1);
    }

    #[test]
    fn robots_sitemap_lines_any_case() {
        let robots = "User-agent: *\nDisallow: /cart\nSitemap: https://s/sitemap.xml\nsitemap:https://s/extra.xml\n";
        assert_eq!(
            parse_robots_sitemaps(robots),
            vec!["https://s/sitemap.xml", "https://s/extra.xml"]
        );
    }

    #[test]
    fn product_children_are_preferred() {
        let locs: Vec<String> = ["pages.xml", "products_1.xml", "blogs.xml", "Products_2.xml"]
            .iter()
            .map(|s| format!("https://s/{s}"))
            .collect();
        assert_eq!(
            select_children(&locs),
            vec!["https://s/products_1.xml", "https://s/Products_2.xml"]
        );
        let plain: Vec<String> = (1..=5).map(|i| format!("https://s/sitemap{i}.xml")).collect();
        assert_eq!(select_children(&plain).len(), 3);
    }

    #[test]
    fn product_url_markers() {
        assert!(is_product_url("https://s/products/x", &[]));
        assert!(is_product_url("https://s/item/42", &[]));
        assert!(is_product_url("https://s/p/42", &[]));
        assert!(!is_product_url("https://s/blog/post", &[]));
        assert!(is_product_url("https://s/shop/x-42.html", &["/shop/".to_string()]));
    }

    #[test]
    fn candidates_rank_code_then_name_overlap() {
        let urls: Vec<String> = [
            "https://s/products/red-kite",
            "https://s/products/red-dragon-puzzle-300",
            "https://s/products/012345678905",
            "https://s/products/dragon-plush",
        ]
        .iter()
        .map(|s| (*s).to_string())
        .collect();
        let ident = Identifier::new("012345678905", "Red Dragon Puzzle 300 PC");
        let got = candidate_urls(&urls, &ident, &MatchThresholds::default());
        assert_eq!(
            got,
            vec![
                "https://s/products/012345678905",
                "https://s/products/red-dragon-puzzle-300",
            ]
        );
    }

    #[test]
    fn no_candidates_for_unrelated_name() {
        let urls = vec!["https://s/products/wooden-train".to_string()];
        let ident = Identifier::new("", "Space Rocket");
        assert!(candidate_urls(&urls, &ident, &MatchThresholds::default()).is_empty());
    }
}
