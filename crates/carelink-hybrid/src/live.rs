//! Debounced search-as-you-type.
//!
//! Each `submit` bumps a generation counter and replaces the pending task.
//! The task waits out the quiet period, publishes phase 1, then phase 2 if
//! there is one. Every publish is checked against the current generation
//! inside the channel's lock, so a slow task from an older query can never
//! overwrite the view of a newer one.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::options::{SearchOptions, SearchOutcome, SearchStatus};
use crate::orchestrator::SearchOrchestrator;

/// What the search box currently shows.
#[derive(Debug, Clone)]
pub struct SearchView {
    pub generation: u64,
    pub query: String,
    pub outcome: SearchOutcome,
}

impl SearchView {
    fn idle() -> Self {
        Self { generation: 0, query: String::new(), outcome: SearchOutcome::empty(SearchStatus::NoMatch) }
    }
}

struct Shared {
    orchestrator: Arc<SearchOrchestrator>,
    generation: AtomicU64,
    tx: watch::Sender<SearchView>,
}

impl Shared {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn publish(&self, generation: u64, query: &str, outcome: SearchOutcome) -> bool {
        self.tx.send_if_modified(|view| {
            if !self.is_current(generation) || view.generation > generation {
                return false;
            }
            *view = SearchView { generation, query: query.to_string(), outcome };
            true
        })
    }
}

pub struct LiveSearch {
    shared: Arc<Shared>,
    debounce: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl LiveSearch {
    pub fn new(orchestrator: Arc<SearchOrchestrator>, debounce: Duration) -> Self {
        let (tx, _) = watch::channel(SearchView::idle());
        Self {
            shared: Arc::new(Shared { orchestrator, generation: AtomicU64::new(0), tx }),
            debounce,
            pending: Mutex::new(None),
        }
    }

    /// Debounce taken from `search.debounce_ms`.
    pub fn with_settings(orchestrator: Arc<SearchOrchestrator>) -> Self {
        let debounce = Duration::from_millis(orchestrator.settings().debounce_ms);
        Self::new(orchestrator, debounce)
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchView> {
        self.shared.tx.subscribe()
    }

    pub fn current(&self) -> SearchView {
        self.shared.tx.borrow().clone()
    }

    /// Schedules `query`, superseding anything submitted earlier. Returns
    /// the generation assigned to it. Must be called inside a tokio runtime.
    pub fn submit(&self, query: impl Into<String>, options: SearchOptions) -> u64 {
        let query = query.into();
        let generation = self.shared.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let shared = Arc::clone(&self.shared);
        let debounce = self.debounce;

        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if !shared.is_current(generation) {
                return;
            }
            let initial = shared.orchestrator.phase_one(&query, &options).await;
            if !shared.publish(generation, &query, initial.clone()) {
                return;
            }
            if let Some(refined) = shared.orchestrator.upgrade(&query, &options, &initial).await {
                if !shared.publish(generation, &query, refined) {
                    tracing::debug!(generation, "dropping superseded refinement");
                }
            }
        });

        if let Some(previous) = self.pending.lock().replace(task) {
            previous.abort();
        }
        generation
    }

    /// Drops whatever is pending; the current view stays as it is.
    pub fn cancel(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(previous) = self.pending.lock().take() {
            previous.abort();
        }
    }
}

impl Drop for LiveSearch {
    fn drop(&mut self) {
        if let Some(task) = self.pending.get_mut().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelink_core::catalog::StaticCatalog;
    use carelink_core::config::SearchSettings;

    fn shared() -> Shared {
        let orchestrator = SearchOrchestrator::new(Arc::new(StaticCatalog::new(Vec::new())), SearchSettings::default());
        let (tx, _) = watch::channel(SearchView::idle());
        Shared { orchestrator: Arc::new(orchestrator), generation: AtomicU64::new(0), tx }
    }

    fn outcome() -> SearchOutcome {
        SearchOutcome::empty(SearchStatus::NoMatch)
    }

    #[test]
    fn stale_generation_cannot_overwrite_view() {
        let shared = shared();
        let mut rx = shared.tx.subscribe();

        shared.generation.store(1, Ordering::SeqCst);
        assert!(shared.publish(1, "food", outcome()));
        shared.generation.store(2, Ordering::SeqCst);
        assert!(shared.publish(2, "shelter", outcome()));
        assert!(rx.has_changed().unwrap());
        let _ = rx.borrow_and_update();

        // A task from generation 1 that was never aborted finishes late.
        assert!(!shared.publish(1, "food", outcome()));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(shared.tx.borrow().generation, 2);
        assert_eq!(shared.tx.borrow().query, "shelter");
    }

    #[test]
    fn superseded_before_first_publish_is_dropped() {
        let shared = shared();
        shared.generation.store(5, Ordering::SeqCst);
        assert!(!shared.publish(4, "she", outcome()));
        assert_eq!(shared.tx.borrow().generation, 0);
        assert!(shared.publish(5, "shelter", outcome()));
        assert_eq!(shared.tx.borrow().query, "shelter");
    }
}
