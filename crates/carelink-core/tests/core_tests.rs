use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

use carelink_core::catalog::{JsonCatalog, StaticCatalog};
use carelink_core::traits::CatalogSource;
use carelink_core::types::{Category, Service};

fn fixture_path() -> PathBuf {
    // crates/carelink-core -> crates -> repo root
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).expect("repo root").join("test_data/services.json")
}

#[test]
fn loads_fixture_catalog() {
    let services = JsonCatalog::new(fixture_path()).load_services().expect("load");
    assert_eq!(services.len(), 5);
    let food = services.iter().find(|s| s.id == "food-bank-central").expect("food bank");
    assert_eq!(food.category, Category::Food);
    assert_eq!(food.synthetic_queries[0], "im hungry");
    assert!(food.validate().is_empty());

    // Half-specified Monday hours are reported but the service still loads.
    let far = services.iter().find(|s| s.id == "far-pantry").expect("far pantry");
    assert_eq!(far.validate().len(), 1);
}

#[test]
fn directory_catalog_reads_all_json_files_and_dedups() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    fs::create_dir_all(dir.join("east")).unwrap();
    let a = vec![Service::new("a", "Alpha Pantry", Category::Food)];
    let b = vec![Service::new("b", "Bravo Housing", Category::Housing), Service::new("a", "Duplicate Alpha", Category::Food)];
    fs::write(dir.join("a.json"), serde_json::to_string(&a).unwrap()).unwrap();
    fs::write(dir.join("east/b.json"), serde_json::to_string(&b).unwrap()).unwrap();
    fs::write(dir.join("notes.txt"), "ignored").unwrap();

    let services = JsonCatalog::new(dir).load_services().expect("load dir");
    let ids: Vec<&str> = services.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(services[0].name, "Alpha Pantry");
}

#[test]
fn unknown_category_fails_the_load() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bad.json");
    fs::write(&path, r#"[{"id":"x","name":"X","category":"Astrology"}]"#).unwrap();
    assert!(JsonCatalog::new(&path).load_services().is_err());
}

#[test]
fn missing_catalog_is_an_error_not_empty() {
    let tmp = TempDir::new().unwrap();
    assert!(JsonCatalog::new(tmp.path().join("nope.json")).load_services().is_err());
}

#[test]
fn static_catalog_round_trips() {
    let services = StaticCatalog::new(vec![Service::new("s", "Shelter", Category::Housing)]).load_services().unwrap();
    assert_eq!(services.len(), 1);
}
