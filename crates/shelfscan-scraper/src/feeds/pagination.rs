//! Cursor pagination via the `Link` response header.
//!
//! Shopify storefronts that support cursors answer with:
//! ```text
//! <https://shop.com/products.json?limit=250&page_info=PREV>; rel="previous",
//! <https://shop.com/products.json?limit=250&page_info=NEXT>; rel="next"
//! ```
//! Stores without cursor support send no `Link` header and are paged with
//! `&page=N` instead.

/// The `page_info` cursor of the `rel="next"` link, if any.
#[must_use]
pub fn extract_next_cursor(link_header: Option<&str>) -> Option<String> {
    let header = link_header?;
    let next = header
        .split(',')
        .map(str::trim)
        .find(|segment| segment.contains(r#"rel="next""#))?;
    let url = extract_angle_bracket_url(next)?;
    extract_query_param(url, "page_info")
}

fn extract_angle_bracket_url(segment: &str) -> Option<&str> {
    let start = segment.find('<')? + 1;
    let end = segment.find('>')?;
    (start < end).then(|| &segment[start..end])
}

/// Cursors are base64url and never need percent-decoding.
fn extract_query_param(url: &str, param: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    let needle = format!("{param}=");
    query
        .split('&')
        .filter_map(|pair| pair.strip_prefix(needle.as_str()))
        .map(|value| value.split('#').next().unwrap_or(value))
        .find(|value| !value.is_empty())
        .map(str::to_owned)
}
