use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use carelink_core::catalog::JsonCatalog;
use carelink_core::config::SearchSettings;
use carelink_core::traits::Embedder;
use carelink_embed::{FakeEmbedder, ModelHandle};
use carelink_hybrid::{LiveSearch, SearchOptions, SearchOrchestrator, SearchPhase, SearchView};
use tokio::sync::watch;

const SLOW_QUERY: &str = "I am hungry";

/// Fake embedder that stalls on one particular query.
struct SlowEmbedder {
    inner: FakeEmbedder,
    delay: Duration,
}

impl Embedder for SlowEmbedder {
    fn id(&self) -> &str {
        "slow-fake"
    }

    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn max_len(&self) -> usize {
        self.inner.max_len()
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.iter().any(|t| t == SLOW_QUERY) {
            std::thread::sleep(self.delay);
        }
        self.inner.embed_batch(texts)
    }
}

fn live(delay: Duration) -> LiveSearch {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).expect("repo root").join("test_data/services.json");
    let embedder: Arc<dyn Embedder> = Arc::new(SlowEmbedder { inner: FakeEmbedder::default(), delay });
    let orch = SearchOrchestrator::new(Arc::new(JsonCatalog::new(path)), SearchSettings::default())
        .with_model(ModelHandle::ready(embedder));
    LiveSearch::new(Arc::new(orch), Duration::from_millis(10))
}

async fn wait_for<F>(rx: &mut watch::Receiver<SearchView>, mut done: F) -> SearchView
where
    F: FnMut(&SearchView) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let view = rx.borrow_and_update().clone();
            if done(&view) {
                return view;
            }
            rx.changed().await.expect("sender alive");
        }
    })
    .await
    .expect("view reached in time")
}

#[tokio::test]
async fn newer_query_wins_over_slow_older_one() {
    let live = live(Duration::from_millis(300));
    let mut rx = live.subscribe();

    let q1 = live.submit(SLOW_QUERY, SearchOptions::default());
    // Q1 publishes phase 1, then stalls computing its query vector.
    let first = wait_for(&mut rx, |v| v.generation == q1).await;
    assert_eq!(first.outcome.phase, SearchPhase::Initial);

    let q2 = live.submit("legal", SearchOptions::default());
    assert!(q2 > q1);
    let view = wait_for(&mut rx, |v| v.generation == q2 && v.outcome.phase == SearchPhase::Refined).await;
    assert_eq!(view.query, "legal");

    // Give the stalled Q1 work time to finish; it must not surface.
    tokio::time::sleep(Duration::from_millis(450)).await;
    let settled = live.current();
    assert_eq!(settled.generation, q2);
    assert_eq!(settled.query, "legal");
    assert_eq!(settled.outcome.ids(), vec!["legal-clinic"]);
}

#[tokio::test]
async fn rapid_keystrokes_are_debounced() {
    let live = live(Duration::ZERO);
    let mut rx = live.subscribe();
    for partial in ["s", "sh", "she", "shel", "shelt", "shelter"] {
        live.submit(partial, SearchOptions::default());
    }
    let view = wait_for(&mut rx, |v| v.generation > 0).await;
    assert_eq!(view.query, "shelter");
    assert_eq!(view.generation, 6);
}

#[tokio::test]
async fn cancel_stops_pending_search() {
    let live = live(Duration::ZERO);
    live.submit("food", SearchOptions::default());
    live.cancel();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(live.current().generation, 0);
}

#[tokio::test]
async fn refinement_of_superseded_query_is_not_shown() {
    let live = live(Duration::from_millis(200));
    let mut rx = live.subscribe();

    let q1 = live.submit(SLOW_QUERY, SearchOptions::default());
    wait_for(&mut rx, |v| v.generation == q1).await;
    // Supersede without scheduling a replacement; the view keeps Q1's phase 1.
    live.cancel();
    tokio::time::sleep(Duration::from_millis(350)).await;
    let view = live.current();
    assert_eq!(view.generation, q1);
    assert_eq!(view.outcome.phase, SearchPhase::Initial);
}
