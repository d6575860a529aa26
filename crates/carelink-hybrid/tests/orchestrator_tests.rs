use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use carelink_core::catalog::{JsonCatalog, StaticCatalog};
use carelink_core::config::SearchSettings;
use carelink_core::context::{AgeGroup, UserContext};
use carelink_core::eligibility::EligibilityStatus;
use carelink_core::traits::Embedder;
use carelink_core::types::{Category, Coordinates, MatchReason, Service};
use carelink_embed::{FakeEmbedder, ModelHandle};
use carelink_hybrid::{MemorySink, SearchOptions, SearchOrchestrator, SearchPhase, SearchStatus};

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).expect("repo root").join("test_data/services.json")
}

fn orchestrator() -> SearchOrchestrator {
    SearchOrchestrator::new(Arc::new(JsonCatalog::new(fixture_path())), SearchSettings::default())
}

fn with_fake_model() -> SearchOrchestrator {
    let embedder: Arc<dyn Embedder> = Arc::new(FakeEmbedder::default());
    orchestrator().with_model(ModelHandle::ready(embedder))
}

/// How a test embedder misbehaves.
#[derive(Clone, Copy)]
enum Fault {
    Always,
    WrongDimension,
    /// Queries embed fine; catalog texts (which join fields with ". ") fail.
    ServiceBatch,
}

struct FaultyEmbedder {
    inner: FakeEmbedder,
    fault: Fault,
}

impl Embedder for FaultyEmbedder {
    fn id(&self) -> &str {
        "faulty"
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn max_len(&self) -> usize {
        self.inner.max_len()
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        match self.fault {
            Fault::Always => anyhow::bail!("model crashed"),
            Fault::WrongDimension => Ok(texts.iter().map(|_| vec![0.5; 3]).collect()),
            Fault::ServiceBatch if texts.iter().any(|t| t.contains(". ")) => anyhow::bail!("batch too large"),
            Fault::ServiceBatch => self.inner.embed_batch(texts),
        }
    }
}

fn with_faulty_model(fault: Fault) -> SearchOrchestrator {
    let embedder: Arc<dyn Embedder> = Arc::new(FaultyEmbedder { inner: FakeEmbedder::default(), fault });
    orchestrator().with_model(ModelHandle::ready(embedder))
}

/// 2024-01-01 is a Monday.
fn monday(h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(h, m, 0).unwrap()
}

fn ottawa() -> Coordinates {
    Coordinates::new(45.4215, -75.6972)
}

#[tokio::test]
async fn hungry_finds_food_bank_first() {
    let outcome = orchestrator().search_services("I am hungry", &SearchOptions::default()).await;
    assert_eq!(outcome.status, SearchStatus::Ok);
    assert_eq!(outcome.phase, SearchPhase::Initial);
    assert_eq!(outcome.ids()[0], "food-bank-central");
}

#[tokio::test]
async fn gibberish_is_no_match_not_failure() {
    let sink = Arc::new(MemorySink::default());
    let orch = orchestrator().with_analytics(sink.clone());
    let outcome = orch.search_services("xyz123foobar", &SearchOptions::default()).await;
    assert!(outcome.results.is_empty());
    assert_eq!(outcome.status, SearchStatus::NoMatch);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].status, SearchStatus::NoMatch);
    assert!(!events[0].pattern.contains("xyz"));
}

#[tokio::test]
async fn missing_catalog_is_reported_as_unavailable() {
    let sink = Arc::new(MemorySink::default());
    let orch = SearchOrchestrator::new(Arc::new(JsonCatalog::new("/nonexistent/carelink/services.json")), SearchSettings::default())
        .with_analytics(sink.clone());
    let outcome = orch.search_services("food", &SearchOptions::default()).await;
    assert!(outcome.results.is_empty());
    assert_eq!(outcome.status, SearchStatus::CatalogUnavailable);
    assert_eq!(sink.events()[0].status, SearchStatus::CatalogUnavailable);

    // Suggestions still work from the built-in vocabulary.
    assert_eq!(orch.get_suggestion("sheltr").await.as_deref(), Some("shelter"));
}

#[tokio::test]
async fn crisis_query_always_shows_crisis_line() {
    let outcome = orchestrator().search_services("I want to end my life", &SearchOptions::default()).await;
    assert_eq!(outcome.ids()[0], "distress-line");
    let top = &outcome.results[0];
    assert!(top.crisis);
    assert!(top.has_reason(MatchReason::CrisisBoost));
}

#[tokio::test]
async fn refined_phase_keeps_crisis_partition() {
    let orch = with_fake_model();
    let options = SearchOptions::default();
    let initial = orch.phase_one("suicide food", &options).await;
    assert_eq!(initial.ids()[0], "distress-line");

    let refined = orch.upgrade("suicide food", &options, &initial).await.expect("model is ready");
    assert_eq!(refined.phase, SearchPhase::Refined);
    assert_eq!(refined.ids()[0], "distress-line");
    assert!(refined.results[0].crisis);
    let mut a = initial.ids();
    let mut b = refined.ids();
    a.sort_unstable();
    b.sort_unstable();
    assert_eq!(a, b, "phase 2 re-ranks the same services");

    assert!(orch.cache().len().await > 0, "query and service vectors are cached");
}

#[tokio::test]
async fn no_model_means_no_upgrade() {
    let orch = orchestrator();
    let initial = orch.phase_one("food", &SearchOptions::default()).await;
    assert!(orch.upgrade("food", &SearchOptions::default(), &initial).await.is_none());

    // A caller-supplied vector still yields a refined outcome.
    let options = SearchOptions::default().with_vector(vec![0.1; 8]);
    let refined = orch.upgrade("food", &options, &initial).await.expect("override");
    assert_eq!(refined.phase, SearchPhase::Refined);
    assert_eq!(refined.ids(), initial.ids());
}

#[tokio::test]
async fn open_now_filters_by_hours() {
    let orch = orchestrator();
    let morning = orch.search_services("food", &SearchOptions::default().open_at(monday(10, 0))).await;
    assert_eq!(morning.ids(), vec!["food-bank-central"]);
    assert!(morning.results[0].has_reason(MatchReason::OpenNow));

    let evening = orch.search_services("food", &SearchOptions::default().open_at(monday(20, 0))).await;
    assert!(evening.results.is_empty());

    let late = orch.search_services("shelter", &SearchOptions::default().open_at(monday(23, 30))).await;
    assert_eq!(late.ids(), vec!["youth-shelter"]);
    let noon = orch.search_services("shelter", &SearchOptions::default().open_at(monday(12, 0))).await;
    assert!(noon.results.is_empty());
}

#[tokio::test]
async fn location_tags_and_local_scope() {
    let orch = orchestrator();
    let anywhere = orch.search_services("food pantry", &SearchOptions::default().with_location(ottawa())).await;
    assert!(anywhere.ids().contains(&"far-pantry"));
    let food_bank = anywhere.results.iter().find(|r| r.service.id == "food-bank-central").unwrap();
    assert!(food_bank.has_reason(MatchReason::WithinKm(1)));
    assert!(food_bank.distance_km.unwrap() < 0.1);

    let local = orch
        .search_services("food pantry", &SearchOptions::default().with_location(ottawa()).local_only(25.0))
        .await;
    assert!(local.ids().contains(&"food-bank-central"));
    assert!(!local.ids().contains(&"far-pantry"));
}

#[tokio::test]
async fn empty_query_with_category_browses() {
    let orch = orchestrator();
    let browse = orch.search_services("", &SearchOptions::default().with_category(Category::Food)).await;
    assert_eq!(browse.ids(), vec!["food-bank-central", "far-pantry"]);
    assert!(browse.results.iter().all(|r| r.has_reason(MatchReason::CategoryMatch)));

    let nothing = orch.search_services("   ", &SearchOptions::default()).await;
    assert_eq!(nothing.status, SearchStatus::NoMatch);
}

#[tokio::test]
async fn limit_never_hides_crisis_results() {
    let orch = orchestrator();
    let one = orch.search_services("food", &SearchOptions::default().with_limit(1)).await;
    assert_eq!(one.results.len(), 1);

    let crisis = orch.search_services("suicide food", &SearchOptions::default().with_limit(0)).await;
    assert_eq!(crisis.ids(), vec!["distress-line"]);
}

#[tokio::test]
async fn eligibility_is_annotated_not_filtered() {
    let ctx = UserContext { age_group: Some(AgeGroup::Adult), ..UserContext::opted_in() };
    let outcome = orchestrator().search_services("shelter", &SearchOptions::default().with_user(ctx)).await;
    let shelter = outcome.results.iter().find(|r| r.service.id == "youth-shelter").expect("still listed");
    assert_eq!(shelter.eligibility, Some(EligibilityStatus::Ineligible));
}

#[tokio::test]
async fn suggestions_use_catalog_words() {
    let orch = orchestrator();
    assert_eq!(orch.get_suggestion("landlrd problems").await.as_deref(), Some("landlord problems"));
    assert_eq!(orch.get_suggestion("food").await, None);
}

#[tokio::test]
async fn wires_catalog_and_cache_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let config = carelink_core::config::Config::from_toml_str(&format!(
        "[search]\ndefault_limit = 2\n[data]\ncatalog_path = \"{}\"\nvector_cache_path = \"cache/vectors.sqlite3\"\n",
        fixture_path().display()
    ));
    let orch = SearchOrchestrator::from_config(&config, dir.path()).unwrap();
    assert!(orch.cache().is_enabled());
    assert!(dir.path().join("cache/vectors.sqlite3").exists());
    assert_eq!(orch.settings().default_limit, 2);

    let outcome = orch.search_services("food", &SearchOptions::default()).await;
    assert_eq!(outcome.status, SearchStatus::Ok);
    assert!(outcome.results.len() <= 2);
}

#[tokio::test]
async fn failed_embedding_leaves_phase_one_standing() {
    for fault in [Fault::Always, Fault::WrongDimension] {
        let orch = with_faulty_model(fault);
        let options = SearchOptions::default();
        let initial = orch.phase_one("I am hungry", &options).await;
        assert!(orch.upgrade("I am hungry", &options, &initial).await.is_none());

        let outcome = orch.search_services("I am hungry", &options).await;
        assert_eq!(outcome.phase, SearchPhase::Initial);
        assert_eq!(outcome.status, SearchStatus::Ok);
        assert_eq!(outcome.ids(), initial.ids());
        let scores: Vec<f32> = outcome.results.iter().map(|r| r.score).collect();
        let before: Vec<f32> = initial.results.iter().map(|r| r.score).collect();
        assert_eq!(scores, before);
    }
}

#[tokio::test]
async fn failed_service_batch_blends_keywords_only() {
    let orch = with_faulty_model(Fault::ServiceBatch);
    let options = SearchOptions::default();
    let initial = orch.phase_one("suicide food", &options).await;
    let refined = orch.upgrade("suicide food", &options, &initial).await.expect("query vector available");

    assert_eq!(refined.phase, SearchPhase::Refined);
    assert_eq!(refined.ids()[0], "distress-line");
    assert!(refined.results[0].crisis);
    assert!(refined.results.iter().all(|r| !r.has_reason(MatchReason::SemanticMatch)));
    assert!(refined.results.iter().skip_while(|r| r.crisis).all(|r| !r.crisis));
}

#[tokio::test]
async fn lookalike_words_do_not_outrank_crisis_line() {
    let catalog = vec![
        Service::new("jobs", "Youth Job Skills Centre", Category::Employment),
        {
            let mut s = Service::new("studies", "Indigenous Studies Program", Category::Education);
            s.synthetic_queries.push("thinking about school".into());
            s
        },
        Service::new("line", "Distress Line", Category::Crisis),
    ];
    let orch = SearchOrchestrator::new(Arc::new(StaticCatalog::new(catalog)), SearchSettings::default());
    let outcome = orch.search_services("lost my job, thinking about suicide", &SearchOptions::default()).await;

    assert_eq!(outcome.ids()[0], "line");
    assert!(outcome.results[0].crisis);
    for r in outcome.results.iter().filter(|r| r.service.id != "line") {
        assert!(!r.crisis, "{} must not be flagged", r.service.id);
        assert!(!r.has_reason(MatchReason::CrisisBoost));
    }
    assert!(outcome.ids().contains(&"jobs"));
}
