use super::*;

/// Wraps `head` and `body` in a page long enough to pass the viability check.
fn page(head: &str, body: &str) -> String {
    format!(
        "<!doctype html><html><head>{head}</head><body>{body}<footer>{}</footer></body></html>",
        "Free shipping on orders over fifty dollars. ".repeat(6)
    )
}

#[test]
fn short_body_is_blocked_regardless_of_content() {
    let html = r#"<script type="application/ld+json">{"@type":"Product","name":"X"}</script>"#;
    let sig = classify(html);
    assert_eq!(sig.page_type, PageType::Blocked);
    assert!(sig.structured_product.is_none());
}

#[test]
fn empty_body_is_blocked() {
    assert_eq!(classify("").page_type, PageType::Blocked);
}

#[test]
fn multibyte_short_body_is_blocked() {
    let html = "é".repeat(150);
    assert_eq!(classify(&html).page_type, PageType::Blocked);
}

#[test]
fn forbidden_marker_is_blocked() {
    let html = page("<title>403 Forbidden</title>", "<h1>Forbidden</h1>");
    let sig = classify(&html);
    assert_eq!(sig.page_type, PageType::Blocked);
    assert_eq!(sig.title, "403 Forbidden");
}

#[test]
fn captcha_marker_is_blocked() {
    let html = page(
        "<title>Checking</title>",
        r#"<div class="sgcaptcha-wrapper">Please verify</div>"#,
    );
    let sig = classify(&html);
    assert_eq!(sig.page_type, PageType::Blocked);
    assert_eq!(sig.block_reason.as_deref(), Some("sgcaptcha challenge"));
}

#[test]
fn captcha_marker_past_window_is_ignored() {
    let filler = "x".repeat(3500);
    let html = page("<title>Shop</title>", &format!("<p>{filler}</p><p>captcha</p>"));
    assert_ne!(classify(&html).page_type, PageType::Blocked);
}

#[test]
fn json_ld_product_wins() {
    let html = page(
        r#"<title>Widget X | Acme</title><script type="application/ld+json">{"@type":"Product","name":"Widget X","image":"https://cdn.example/x.jpg"}</script>"#,
        r#"<a href="/products/other">Other</a>"#,
    );
    let sig = classify(&html);
    assert_eq!(sig.page_type, PageType::Product);
    assert_eq!(sig.structured_product.as_ref().unwrap().name, "Widget X");
    assert_eq!(sig.title, "Widget X | Acme");
    assert_eq!(sig.product_link_count, 1);
}

#[test]
fn og_title_and_image_make_a_product() {
    let html = page(
        r#"<title>Widget</title><meta property="og:title" content="Widget"><meta content="https://cdn.example/w.jpg" property="og:image"><meta property="og:description" content="A widget">"#,
        "",
    );
    let sig = classify(&html);
    assert_eq!(sig.page_type, PageType::Product);
    assert_eq!(sig.og.description.as_deref(), Some("A widget"));
    assert_eq!(sig.og_image(), Some("https://cdn.example/w.jpg"));
}

#[test]
fn og_title_alone_is_not_a_product() {
    let html = page(
        r#"<title>Catalog</title><meta property="og:title" content="Catalog">"#,
        "<p>Browse</p>",
    );
    let sig = classify(&html);
    assert_eq!(sig.page_type, PageType::Unknown);
    assert_eq!(sig.og.title.as_deref(), Some("Catalog"));
}

#[test]
fn product_links_make_a_listing() {
    let html = page(
        "<title>Search: widget</title>",
        r#"<a href="/products/blue-widget">Blue</a><a href="/product/red-widget">Red</a><a href="/about">About</a>"#,
    );
    let sig = classify(&html);
    assert_eq!(sig.page_type, PageType::Search);
    assert_eq!(sig.product_link_count, 2);
}

#[test]
fn extra_markers_count_as_product_links() {
    let html = page(
        "<title>Results</title>",
        r#"<a href="/catalog/item~p123.html">Item</a>"#,
    );
    assert_eq!(classify(&html).page_type, PageType::Unknown);
    let sig = classify_with_markers(&html, &["~p".to_string()]);
    assert_eq!(sig.page_type, PageType::Search);
}

#[test]
fn not_found_title_overrides_listing() {
    let html = page(
        "<title>Page Not Found – Acme</title>",
        r#"<a href="/products/popular">Popular</a>"#,
    );
    assert_eq!(classify(&html).page_type, PageType::NotFound);
}

#[test]
fn not_found_title_does_not_override_product() {
    let html = page(
        r#"<title>404 Widget</title><script type="application/ld+json">{"@type":"Product","name":"404 Widget"}</script>"#,
        "",
    );
    assert_eq!(classify(&html).page_type, PageType::Product);
}

#[test]
fn shopify_home_is_index_not_search() {
    let html = page(
        r#"<title>Acme Toys</title><script>var meta = {"page":{"pageType":"index"}};</script>"#,
        r#"<a href="/products/featured">Featured</a>"#,
    );
    assert_eq!(classify(&html).page_type, PageType::Index);
}

#[test]
fn effective_title_falls_back_to_og_title() {
    let html = page(
        r#"<meta property="og:title" content="Only OG">"#,
        "<p>text</p>",
    );
    let sig = classify(&html);
    assert_eq!(sig.title, "");
    assert_eq!(sig.effective_title(), "Only OG");
}

#[test]
fn meta_description_is_captured() {
    let html = page(
        r#"<title>T</title><meta name="description" content="Plain description">"#,
        "",
    );
    let sig = classify(&html);
    assert_eq!(sig.page_description(), Some("Plain description"));
}
