use super::*;

fn parse(yaml: &str) -> SitesFile {
    serde_yaml::from_str(yaml).expect("valid sites yaml")
}

#[test]
fn parses_minimal_site_with_defaults() {
    let file = parse(
        r"
sites:
  - id: acme
    base_url: https://acmetoys.com/
",
    );
    let site = &file.sites[0];
    assert_eq!(site.base(), "https://acmetoys.com");
    assert!(site.verify_tls);
    assert_eq!(site.fetcher, FetcherKind::Http);
    assert!(site.url_pattern.is_none());
    assert!(site.extract.is_none());
    assert_eq!(
        site.strategy_order(),
        vec![
            StrategyKind::Sitemap,
            StrategyKind::PlatformFeed,
            StrategyKind::Search
        ]
    );
    site.validate().expect("minimal site is valid");
}

#[test]
fn parses_full_site() {
    let file = parse(
        r#"
sites:
  - id: bruder
    base_url: https://bruder.example
    sheet: sheets/bruder.csv
    url_pattern: "{base_url}/products/{upc}"
    search_url: "{base_url}/search?q={query}"
    strategies: [direct_pattern, search]
    columns:
      code: "Item UPC"
    verify_tls: false
    fetcher: browser
    extract:
      description_selector: ".product-description"
"#,
    );
    let site = &file.sites[0];
    assert_eq!(site.fetcher, FetcherKind::Browser);
    assert!(!site.verify_tls);
    assert_eq!(site.columns.code.as_deref(), Some("Item UPC"));
    assert_eq!(
        site.strategy_order(),
        vec![StrategyKind::DirectPattern, StrategyKind::Search]
    );
    let extract = site.extract.as_ref().expect("extract overrides present");
    assert_eq!(
        extract.description_selector.as_deref(),
        Some(".product-description")
    );
    // Markers default even when only one override key is given.
    assert!(extract.exclude_image_markers.iter().any(|m| m == "logo"));
    site.validate().expect("full site is valid");
}

#[test]
fn default_order_includes_direct_and_listing_when_configured() {
    let mut site = SiteConfig::new("x", "https://x.example");
    site.url_pattern = Some("{base}/p/{code}".to_string());
    site.listing_urls = vec!["https://x.example/shop".to_string()];
    assert_eq!(site.strategy_order(), StrategyKind::ALL.to_vec());
}

#[test]
fn explicit_order_drops_duplicates() {
    let mut site = SiteConfig::new("x", "https://x.example");
    site.strategies = vec![
        StrategyKind::Search,
        StrategyKind::Sitemap,
        StrategyKind::Search,
    ];
    assert_eq!(
        site.strategy_order(),
        vec![StrategyKind::Search, StrategyKind::Sitemap]
    );
}

#[test]
fn sheet_path_defaults_to_input_dir() {
    let site = SiteConfig::new("acme", "https://acmetoys.com");
    assert_eq!(
        site.sheet_path(Path::new("/data")),
        PathBuf::from("/data/input/acme.csv")
    );
}

#[test]
fn validate_rejects_relative_base_url() {
    let site = SiteConfig::new("acme", "acmetoys.com");
    let err = site.validate().unwrap_err();
    assert!(err.to_string().contains("absolute http(s) URL"), "{err}");
}

#[test]
fn validate_rejects_unknown_placeholder() {
    let mut site = SiteConfig::new("acme", "https://acmetoys.com");
    site.url_pattern = Some("{base}/products/{sku}".to_string());
    let err = site.validate().unwrap_err();
    assert!(err.to_string().contains("{sku}"), "{err}");
}

#[test]
fn validate_rejects_search_template_without_query() {
    let mut site = SiteConfig::new("acme", "https://acmetoys.com");
    site.search_url = Some("{base}/search".to_string());
    let err = site.validate().unwrap_err();
    assert!(err.to_string().contains("{query}"), "{err}");
}

#[test]
fn validate_rejects_direct_strategy_without_pattern() {
    let mut site = SiteConfig::new("acme", "https://acmetoys.com");
    site.strategies = vec![StrategyKind::DirectPattern];
    let err = site.validate().unwrap_err();
    assert!(err.to_string().contains("requires url_pattern"), "{err}");
}

#[test]
fn validate_rejects_listing_crawl_without_urls() {
    let mut site = SiteConfig::new("acme", "https://acmetoys.com");
    site.strategies = vec![StrategyKind::ListingCrawl];
    let err = site.validate().unwrap_err();
    assert!(err.to_string().contains("requires listing_urls"), "{err}");
}

#[test]
fn file_validation_rejects_duplicate_ids() {
    let file = parse(
        r"
sites:
  - id: acme
    base_url: https://a.example
  - id: ACME
    base_url: https://b.example
",
    );
    let err = validate_sites_file(&file).unwrap_err();
    assert!(err.to_string().contains("duplicate site id"), "{err}");
}

#[test]
fn file_validation_rejects_path_like_id() {
    let file = parse(
        r"
sites:
  - id: ../etc
    base_url: https://a.example
",
    );
    assert!(validate_sites_file(&file).is_err());
}

#[test]
fn load_sites_reports_missing_file() {
    let err = load_sites(Path::new("/definitely/not/here/sites.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::SitesFileIo { .. }));
}

#[test]
fn find_is_case_insensitive() {
    let file = parse(
        r"
sites:
  - id: Chazak
    base_url: https://chazak.example
",
    );
    assert!(file.find("chazak").is_some());
    assert!(file.find("other").is_none());
}
