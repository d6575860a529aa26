//! Two-tier vector cache: a bounded LRU in front of an optional SQLite file.
//!
//! Every failure inside the cache is logged and reported to callers as a
//! miss (for `get`) or silently dropped (for `set`); search never sees a
//! storage error. SQLite work runs on tokio's blocking pool.

use chrono::{DateTime, Utc};
use lru::LruCache;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;

use crate::store::SqliteStore;

pub const DEFAULT_HOT_CAPACITY: usize = 512;

#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub embedding: Vec<f32>,
    pub metadata: HashMap<String, String>,
    pub updated_at: DateTime<Utc>,
}

enum Backend {
    Disabled,
    Memory,
    Sqlite(Arc<SqliteStore>),
}

struct Inner {
    backend: Backend,
    hot: Mutex<LruCache<String, CacheEntry>>,
}

#[derive(Clone)]
pub struct VectorCache {
    inner: Arc<Inner>,
}

fn capacity(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap_or(NonZeroUsize::MIN)
}

impl VectorCache {
    fn with_backend(backend: Backend, hot_capacity: usize) -> Self {
        Self { inner: Arc::new(Inner { backend, hot: Mutex::new(LruCache::new(capacity(hot_capacity))) }) }
    }

    /// Durable cache at `path`, created on first use.
    pub fn open(path: &Path, hot_capacity: usize) -> anyhow::Result<Self> {
        let store = SqliteStore::open(path)?;
        tracing::debug!(path = %path.display(), "vector cache opened");
        Ok(Self::with_backend(Backend::Sqlite(Arc::new(store)), hot_capacity))
    }

    /// Durable when `path` can be opened, otherwise a disabled cache.
    pub fn open_or_disabled(path: &Path, hot_capacity: usize) -> Self {
        match Self::open(path, hot_capacity) {
            Ok(cache) => cache,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "vector cache unavailable; continuing without it");
                Self::disabled()
            }
        }
    }

    /// Process-local cache holding at most `capacity` entries.
    pub fn in_memory(capacity: usize) -> Self {
        Self::with_backend(Backend::Memory, capacity)
    }

    /// Every `get` misses and every `set` is dropped.
    pub fn disabled() -> Self {
        Self::with_backend(Backend::Disabled, 1)
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.inner.backend, Backend::Disabled)
    }

    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let store = match &self.inner.backend {
            Backend::Disabled => return None,
            Backend::Memory => return self.inner.hot.lock().get(key).cloned(),
            Backend::Sqlite(store) => {
                let hot = self.inner.hot.lock().get(key).cloned();
                if hot.is_some() {
                    return hot;
                }
                Arc::clone(store)
            }
        };

        let owned = key.to_string();
        let entry = match tokio::task::spawn_blocking(move || store.get(&owned)).await {
            Ok(Ok(entry)) => entry?,
            Ok(Err(e)) => {
                tracing::warn!(key, error = %e, "vector cache read failed");
                return None;
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "vector cache read task failed");
                return None;
            }
        };
        self.inner.hot.lock().put(key.to_string(), entry.clone());
        Some(entry)
    }

    /// Insert or replace `key`, stamping the current time.
    pub async fn set(&self, key: &str, embedding: Vec<f32>, metadata: HashMap<String, String>) {
        if !self.is_enabled() {
            return;
        }
        let entry = CacheEntry { key: key.to_string(), embedding, metadata, updated_at: Utc::now() };
        self.inner.hot.lock().put(entry.key.clone(), entry.clone());

        if let Backend::Sqlite(store) = &self.inner.backend {
            let store = Arc::clone(store);
            match tokio::task::spawn_blocking(move || store.upsert(&entry)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(key, error = %e, "vector cache write failed"),
                Err(e) => tracing::warn!(key, error = %e, "vector cache write task failed"),
            }
        }
    }

    pub async fn clear(&self) {
        self.inner.hot.lock().clear();
        if let Backend::Sqlite(store) = &self.inner.backend {
            let store = Arc::clone(store);
            match tokio::task::spawn_blocking(move || store.clear()).await {
                Ok(Ok(())) => tracing::info!("vector cache cleared"),
                Ok(Err(e)) => tracing::warn!(error = %e, "vector cache clear failed"),
                Err(e) => tracing::warn!(error = %e, "vector cache clear task failed"),
            }
        }
    }

    /// Number of stored entries; the durable count when backed by SQLite.
    pub async fn len(&self) -> usize {
        match &self.inner.backend {
            Backend::Disabled => 0,
            Backend::Memory => self.inner.hot.lock().len(),
            Backend::Sqlite(store) => {
                let store = Arc::clone(store);
                match tokio::task::spawn_blocking(move || store.len()).await {
                    Ok(Ok(n)) => n,
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "vector cache count failed");
                        0
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "vector cache count task failed");
                        0
                    }
                }
            }
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl std::fmt::Debug for VectorCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backend = match self.inner.backend {
            Backend::Disabled => "disabled",
            Backend::Memory => "memory",
            Backend::Sqlite(_) => "sqlite",
        };
        f.debug_struct("VectorCache").field("backend", &backend).finish()
    }
}

/// Cache key for a service's embedding under a given model.
pub fn service_key(embedder_id: &str, service_id: &str) -> String {
    format!("svc:{embedder_id}:{service_id}")
}

/// Cache key for a query embedding; `normalized_query` should already be
/// tokenized and re-joined so trivially different spellings share a slot.
pub fn query_key(embedder_id: &str, normalized_query: &str) -> String {
    format!("q:{embedder_id}:{normalized_query}")
}
