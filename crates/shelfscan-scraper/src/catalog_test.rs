use super::*;

fn index(titles: &[&str]) -> CatalogIndex {
    let entries = titles
        .iter()
        .enumerate()
        .map(|(i, t)| CatalogEntry::new(t, &format!("https://shop.example/products/{i}")))
        .collect();
    CatalogIndex::build(entries, MatchThresholds::default())
}

#[test]
fn normalize_strips_punctuation_and_case() {
    assert_eq!(normalize_name("  Widget-X (Blue), 3 PC! "), "widget x blue 3 pc");
    assert_eq!(normalize_name("Café"), "caf");
}

#[test]
fn filler_words_are_dropped() {
    let tokens = significant_tokens("The Deluxe Puzzle Set 500pc");
    assert_eq!(
        tokens.into_iter().collect::<Vec<_>>(),
        vec!["500pc", "deluxe", "puzzle"]
    );
}

#[test]
fn all_filler_name_keeps_its_tokens() {
    assert_eq!(significant_tokens("The Set").len(), 2);
}

#[test]
fn overlap_is_symmetric_under_filler_stripping() {
    let a = significant_tokens("Deluxe Puzzle Set 500pc");
    let b = significant_tokens("500pc Puzzle");
    assert!(overlap_ratio(&a, &b) >= 0.5);
    assert!(overlap_ratio(&b, &a) >= 0.5);
}

#[test]
fn short_name_matches_when_no_better_candidate_exists() {
    let mut idx = index(&["500pc Puzzle", "Wooden Train"]);
    let m = idx.find_best_match("p1", "Deluxe Puzzle Set 500pc", "").unwrap();
    assert_eq!(m.entry.title, "500pc Puzzle");
    assert_eq!(m.kind, MatchKind::Tokens);
}

#[test]
fn red_dragon_puzzle_clears_the_medium_threshold() {
    let mut idx = index(&["300 Piece Red Dragon Jigsaw", "Blue Dragon Plush"]);
    let m = idx.find_best_match("p1", "Red Dragon Puzzle 300 PC", "").unwrap();
    assert_eq!(m.entry.title, "300 Piece Red Dragon Jigsaw");
    assert!(m.score >= 0.4);
    assert!((m.score - 0.75).abs() < f64::EPSILON);
}

#[test]
fn two_token_names_need_ninety_percent() {
    let mut idx = index(&["Red Ball Pit"]);
    assert!(idx.find_best_match("p1", "Red Kite", "").is_none());
    assert!(idx.find_best_match("p2", "Red Ball", "").is_some());
}

#[test]
fn exact_normalized_name_scores_one() {
    let mut idx = index(&["Widget X!", "Widget X Pro"]);
    let m = idx.find_best_match("p1", "widget x", "").unwrap();
    assert_eq!(m.kind, MatchKind::ExactName);
    assert_eq!(m.entry.title, "Widget X!");
    assert!((m.score - 1.0).abs() < f64::EPSILON);
}

#[test]
fn barcode_match_comes_first() {
    let mut a = CatalogEntry::new("Something Else Entirely", "https://s/products/a");
    a.add_barcode("012345678905");
    a.add_barcode("123");
    assert_eq!(a.barcodes.len(), 1);
    let b = CatalogEntry::new("Widget X", "https://s/products/b");
    let mut idx = CatalogIndex::build(vec![a, b], MatchThresholds::default());
    let m = idx.find_best_match("p1", "Widget X", "012345678905").unwrap();
    assert_eq!(m.kind, MatchKind::Barcode);
    assert_eq!(m.entry.product_url, "https://s/products/a");
}

#[test]
fn entries_are_claimed_once_per_run() {
    let mut idx = index(&["Wooden Train Engine Red"]);
    assert!(idx.find_best_match("p1", "Wooden Train Engine Red", "").is_some());
    assert!(idx.find_best_match("p2", "Wooden Train Engine Red", "").is_none());
}

#[test]
fn released_entries_are_available_again() {
    let mut idx = index(&["Wooden Train Engine Red"]);
    assert!(idx.find_best_match("p1", "Wooden Train Engine Red", "").is_some());
    idx.release("p1");
    let m = idx.find_best_match("p2", "Wooden Train Engine Red", "").unwrap();
    assert_eq!(m.entry.title, "Wooden Train Engine Red");
    idx.release("p1");
    assert!(idx.find_best_match("p3", "Wooden Train Engine Red", "").is_none());
}

#[test]
fn same_product_gets_the_same_entry_again() {
    let mut idx = index(&["Wooden Train Engine Red"]);
    let first = idx.find_best_match("p1", "Wooden Train Engine", "").unwrap();
    let second = idx.find_best_match("p1", "Wooden Train Engine", "").unwrap();
    assert_eq!(first, second);
}

#[test]
fn highest_score_wins_and_ties_keep_catalog_order() {
    let mut idx = index(&[
        "Jungle Animals Floor Puzzle",
        "Jungle Animals Floor Puzzle Giant",
        "Jungle Animals Floor Puzzle Mini",
    ]);
    let m = idx.find_best_match("p1", "Giant Jungle Animals Puzzle", "").unwrap();
    assert_eq!(m.entry.title, "Jungle Animals Floor Puzzle Giant");

    let mut idx = index(&["Ocean Floor Puzzle A", "Ocean Floor Puzzle B"]);
    let m = idx.find_best_match("p1", "Ocean Floor Puzzle", "").unwrap();
    assert_eq!(m.entry.title, "Ocean Floor Puzzle A");
}

#[test]
fn empty_name_without_barcode_never_matches() {
    let mut idx = index(&["Anything"]);
    assert!(idx.find_best_match("p1", "  ", "").is_none());
}
