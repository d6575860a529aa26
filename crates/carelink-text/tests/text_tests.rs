use std::path::PathBuf;

use carelink_core::catalog::JsonCatalog;
use carelink_core::config::ScoringWeights;
use carelink_core::traits::CatalogSource;
use carelink_core::types::MatchReason;
use carelink_text::{
    boost_crisis_results, detect_query_pattern, is_crisis_query, tokenize, IndexedService, KeywordScorer, QueryTerms,
    Suggester,
};

fn fixture_catalog() -> Vec<IndexedService> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).expect("repo root").join("test_data/services.json");
    let services = JsonCatalog::new(path).load_services().expect("load fixture");
    IndexedService::index_all(services)
}

fn rank(query: &str) -> Vec<(String, f32)> {
    let catalog = fixture_catalog();
    KeywordScorer::new(ScoringWeights::default())
        .rank(&catalog, &QueryTerms::from_query(query))
        .into_iter()
        .map(|r| (r.service.id.clone(), r.score))
        .collect()
}

#[test]
fn hungry_ranks_food_bank_first() {
    let ranked = rank("I am hungry");
    assert!(!ranked.is_empty());
    assert_eq!(ranked[0].0, "food-bank-central");

    let catalog = fixture_catalog();
    let results = KeywordScorer::default().rank(&catalog, &QueryTerms::from_query("I am hungry"));
    assert!(results[0].has_reason(MatchReason::PhraseMatch));
    assert!(results[0].has_reason(MatchReason::SynonymMatch));
}

#[test]
fn gibberish_matches_nothing() {
    assert!(rank("xyz123foobar").is_empty());
    assert!(rank("").is_empty());
    assert!(rank("   ").is_empty());
}

#[test]
fn french_text_is_searchable() {
    let ranked = rank("épicerie");
    assert_eq!(ranked.first().map(|(id, _)| id.as_str()), Some("food-bank-central"));
}

#[test]
fn scores_are_sorted_descending() {
    let ranked = rank("free legal help food");
    assert!(ranked.len() >= 2);
    for pair in ranked.windows(2) {
        assert!(pair[0].1 >= pair[1].1);
    }
}

#[test]
fn crisis_query_puts_crisis_line_on_top() {
    let catalog = fixture_catalog();
    let query = "emergency food, thinking about suicide";
    let results = KeywordScorer::default().rank(&catalog, &QueryTerms::from_query(query));
    let boosted = boost_crisis_results(results, is_crisis_query(query, None));
    assert_eq!(boosted[0].service.id, "distress-line");
    assert!(boosted[0].crisis);
    // The food bank mentions "Emergency" only in its description, so it stays below.
    let food = boosted.iter().find(|r| r.service.id == "food-bank-central").expect("food bank");
    assert!(!food.crisis);
}

#[test]
fn suggester_uses_catalog_vocabulary() {
    let services: Vec<_> = fixture_catalog().into_iter().map(|s| (*s.service).clone()).collect();
    let s = Suggester::with_catalog(&services, 2);
    assert_eq!(s.suggest("landlrd").as_deref(), Some("landlord"));
    assert_eq!(s.suggest("landlord"), None);
}

#[test]
fn query_pattern_ignores_token_order() {
    let a: Vec<String> = tokenize("Food bank near me").collect();
    let b: Vec<String> = tokenize("me near BANK food").collect();
    assert_eq!(detect_query_pattern(&a), detect_query_pattern(&b));
    assert_ne!(detect_query_pattern(&a), detect_query_pattern(&["shelter"]));
}
