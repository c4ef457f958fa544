use super::*;
use crate::jsonld::StructuredProduct;

fn baseline() -> Baseline {
    Baseline {
        title: Some("Acme Toys — Home".to_string()),
        image: Some("https://cdn.acmetoys.com/share.jpg".to_string()),
        description: Some("The best toys in town".to_string()),
    }
}

fn filter() -> GenericityFilter {
    GenericityFilter::new(baseline(), "https://www.acmetoys.com")
}

fn sig(title: &str) -> PageSignature {
    PageSignature {
        title: title.to_string(),
        ..PageSignature::default()
    }
}

fn with_og(mut s: PageSignature, image: &str, description: Option<&str>) -> PageSignature {
    s.og.image = Some(image.to_string());
    s.og.description = description.map(str::to_string);
    s
}

fn with_product(mut s: PageSignature) -> PageSignature {
    s.structured_product = Some(StructuredProduct {
        name: s.title.clone(),
        ..StructuredProduct::default()
    });
    s
}

#[test]
fn missing_title_is_not_generic() {
    let mut f = filter();
    assert_eq!(f.check(&sig(""), "1"), None);
    assert_eq!(f.seen_count(), 0);
}

#[test]
fn baseline_title_is_generic_even_if_other_fields_differ() {
    let mut f = filter();
    let page = with_og(
        sig("  acme toys — home "),
        "https://cdn.acmetoys.com/widget.jpg",
        Some("A very specific widget"),
    );
    assert!(f.is_generic(&page, "1"));
}

#[test]
fn baseline_title_beats_structured_product() {
    let mut f = filter();
    let page = with_product(sig("Acme Toys — Home"));
    assert_eq!(f.check(&page, "1"), Some(GenericReason::BaselineTitle));
}

#[test]
fn title_seen_for_another_product_is_generic() {
    let mut f = filter();
    assert_eq!(f.check(&sig("Mystery Box Assortment"), "1"), None);
    assert_eq!(
        f.check(&sig("Mystery Box Assortment"), "2"),
        Some(GenericReason::RepeatedTitle)
    );
}

#[test]
fn same_product_may_see_its_title_again() {
    let mut f = filter();
    assert_eq!(f.check(&sig("Blue Widget Deluxe Edition"), "7"), None);
    assert_eq!(f.check(&sig("Blue Widget Deluxe Edition"), "7"), None);
}

#[test]
fn structured_product_skips_boilerplate_rules() {
    let mut f = filter();
    let page = with_product(with_og(
        sig("Acme Toys Wooden Train"),
        "https://cdn.acmetoys.com/share.jpg",
        None,
    ));
    assert_eq!(f.check(&page, "1"), None);
}

#[test]
fn baseline_image_without_description_is_generic() {
    let mut f = filter();
    let page = with_og(
        sig("Some Product Name That Is Long Enough To Pass"),
        "https://cdn.acmetoys.com/share.jpg",
        None,
    );
    assert_eq!(f.check(&page, "1"), Some(GenericReason::BaselineImage));
}

#[test]
fn baseline_image_with_baseline_description_is_generic() {
    let mut f = filter();
    let page = with_og(
        sig("Some Product Name That Is Long Enough To Pass"),
        "https://cdn.acmetoys.com/share.jpg",
        Some("The best toys in town"),
    );
    assert_eq!(f.check(&page, "1"), Some(GenericReason::BaselineImage));
}

#[test]
fn baseline_image_with_own_description_is_accepted() {
    let mut f = filter();
    let page = with_og(
        sig("Some Product Name That Is Long Enough To Pass"),
        "https://cdn.acmetoys.com/share.jpg",
        Some("Hand-painted wooden train with six cars"),
    );
    assert_eq!(f.check(&page, "1"), None);
}

#[test]
fn store_suffix_titles_are_generic() {
    let mut f = filter();
    assert_eq!(
        f.check(&sig("Bruder Toy Shop"), "1"),
        Some(GenericReason::DenylistedTitle)
    );
    assert_eq!(
        f.check(&sig("Chazak Distribution"), "2"),
        Some(GenericReason::DenylistedTitle)
    );
}

#[test]
fn hostname_in_short_title_is_generic() {
    let mut f = filter();
    assert_eq!(
        f.check(&sig("AcmeToys | Welcome"), "1"),
        Some(GenericReason::HostnameTitle)
    );
}

#[test]
fn long_titles_skip_the_denylist() {
    let mut f = filter();
    let title = "Deluxe Wooden Train Set With Forty Pieces For The Store";
    assert!(title.chars().count() >= 50);
    assert_eq!(f.check(&sig(title), "1"), None);
}

#[test]
fn remember_seeds_seen_titles() {
    let mut f = filter();
    f.remember("Resumed Product Title", "10");
    assert_eq!(
        f.check(&sig("Resumed Product Title"), "11"),
        Some(GenericReason::RepeatedTitle)
    );
}

#[test]
fn baseline_from_signature_uses_og_fields() {
    let mut s = sig("Acme Toys");
    s.og.image_secure = Some("https://cdn/secure.jpg".to_string());
    s.og.image = Some("http://cdn/plain.jpg".to_string());
    s.meta_description = Some("Toys".to_string());
    let b = Baseline::from_signature(&s);
    assert_eq!(b.title.as_deref(), Some("Acme Toys"));
    assert_eq!(b.image.as_deref(), Some("https://cdn/secure.jpg"));
    assert_eq!(b.description.as_deref(), Some("Toys"));
    assert!(!b.is_empty());
    assert!(Baseline::default().is_empty());
}
