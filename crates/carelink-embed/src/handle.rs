//! Lifecycle of the (expensive) embedding model.
//!
//! `Uninitialized -> Loading -> Ready | Failed`. Loading runs on a blocking
//! worker; searches never wait for it and simply skip the semantic phase
//! until the handle reports `Ready`. `teardown` returns to `Uninitialized`
//! and discards the result of any load still in flight.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinHandle;

use carelink_core::error::Error;
use carelink_core::traits::Embedder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelState {
    Uninitialized,
    Loading,
    Ready,
    Failed(String),
}

struct Inner {
    state: ModelState,
    embedder: Option<Arc<dyn Embedder>>,
    epoch: u64,
}

#[derive(Clone)]
pub struct ModelHandle {
    inner: Arc<RwLock<Inner>>,
}

impl Default for ModelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelHandle {
    pub fn new() -> Self {
        Self { inner: Arc::new(RwLock::new(Inner { state: ModelState::Uninitialized, embedder: None, epoch: 0 })) }
    }

    /// A handle that is already `Ready` with `embedder`.
    pub fn ready(embedder: Arc<dyn Embedder>) -> Self {
        let handle = Self::new();
        handle.install(embedder);
        handle
    }

    pub fn state(&self) -> ModelState {
        self.inner.read().state.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.read().state == ModelState::Ready
    }

    pub fn ready_embedder(&self) -> Option<Arc<dyn Embedder>> {
        let inner = self.inner.read();
        match inner.state {
            ModelState::Ready => inner.embedder.clone(),
            _ => None,
        }
    }

    /// Puts an already-built embedder in place and marks the handle ready.
    pub fn install(&self, embedder: Arc<dyn Embedder>) {
        let mut inner = self.inner.write();
        inner.epoch += 1;
        tracing::info!(model = embedder.id(), "embedding model ready");
        inner.embedder = Some(embedder);
        inner.state = ModelState::Ready;
    }

    /// Starts `loader` on a blocking worker. Returns `None` when a load is
    /// already running or a model is ready. Must be called inside a tokio
    /// runtime.
    pub fn start_loading<F>(&self, loader: F) -> Option<JoinHandle<()>>
    where
        F: FnOnce() -> anyhow::Result<Arc<dyn Embedder>> + Send + 'static,
    {
        let epoch = {
            let mut inner = self.inner.write();
            if matches!(inner.state, ModelState::Loading | ModelState::Ready) {
                return None;
            }
            inner.epoch += 1;
            inner.state = ModelState::Loading;
            inner.embedder = None;
            inner.epoch
        };

        let this = self.clone();
        Some(tokio::spawn(async move {
            let outcome = match tokio::task::spawn_blocking(loader).await {
                Ok(result) => result,
                Err(e) => Err(Error::Operation(format!("model loader panicked: {e}")).into()),
            };
            let mut inner = this.inner.write();
            if inner.epoch != epoch {
                tracing::debug!("discarding stale model load");
                return;
            }
            match outcome {
                Ok(embedder) => {
                    tracing::info!(model = embedder.id(), "embedding model ready");
                    inner.embedder = Some(embedder);
                    inner.state = ModelState::Ready;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "embedding model failed to load");
                    inner.state = ModelState::Failed(e.to_string());
                }
            }
        }))
    }

    pub fn teardown(&self) {
        let mut inner = self.inner.write();
        inner.epoch += 1;
        inner.embedder = None;
        inner.state = ModelState::Uninitialized;
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle").field("state", &self.state()).finish()
    }
}
