//! Precompute service embeddings into the cache.
//!
//! Each entry records the blake3 hash of the text it was computed from, so
//! a rerun only embeds services whose text changed (or that were never
//! embedded). Batches that fail to embed are counted and skipped; the next
//! run picks them up again.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;

use carelink_core::traits::Embedder;
use carelink_core::types::Service;

use crate::cache::{service_key, CacheEntry, VectorCache};

pub const META_CONTENT_HASH: &str = "content_hash";
pub const META_EMBEDDER: &str = "embedder";
pub const META_SERVICE_ID: &str = "service_id";

pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Metadata stored next to a service embedding.
pub fn service_metadata(embedder_id: &str, service: &Service, hash: &str) -> HashMap<String, String> {
    HashMap::from([
        (META_CONTENT_HASH.to_string(), hash.to_string()),
        (META_EMBEDDER.to_string(), embedder_id.to_string()),
        (META_SERVICE_ID.to_string(), service.id.clone()),
    ])
}

/// True when `entry` was computed from exactly `hash`.
pub fn is_fresh(entry: &CacheEntry, hash: &str) -> bool {
    entry.metadata.get(META_CONTENT_HASH).map(String::as_str) == Some(hash)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmReport {
    pub embedded: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Embeds every service whose cached vector is missing or stale.
/// `on_progress` receives the number of services handled so far.
pub async fn warm_services<F>(
    cache: &VectorCache,
    embedder: Arc<dyn Embedder>,
    services: &[Arc<Service>],
    batch_size: usize,
    mut on_progress: F,
) -> Result<WarmReport>
where
    F: FnMut(usize),
{
    let mut report = WarmReport::default();
    if !cache.is_enabled() {
        tracing::warn!("vector cache disabled; nothing to warm");
        return Ok(report);
    }
    let embedder_id = embedder.id().to_string();
    let mut handled = 0usize;

    for chunk in services.chunks(batch_size.max(1)) {
        let mut pending: Vec<(&Arc<Service>, String, String)> = Vec::new();
        for service in chunk {
            let text = service.embedding_text();
            let hash = content_hash(&text);
            let key = service_key(&embedder_id, &service.id);
            match cache.get(&key).await {
                Some(entry) if is_fresh(&entry, &hash) => report.skipped += 1,
                _ => pending.push((service, text, hash)),
            }
        }

        if !pending.is_empty() {
            let texts: Vec<String> = pending.iter().map(|(_, text, _)| text.clone()).collect();
            let worker = Arc::clone(&embedder);
            let outcome = tokio::task::spawn_blocking(move || worker.embed_batch(&texts)).await;
            match outcome {
                Ok(Ok(vectors)) if vectors.len() == pending.len() => {
                    for ((service, _, hash), vector) in pending.iter().zip(vectors) {
                        if vector.len() != embedder.dim() {
                            tracing::warn!(service = %service.id, got = vector.len(), want = embedder.dim(), "dimension mismatch");
                            report.failed += 1;
                            continue;
                        }
                        let key = service_key(&embedder_id, &service.id);
                        cache.set(&key, vector, service_metadata(&embedder_id, service, hash)).await;
                        report.embedded += 1;
                    }
                }
                Ok(Ok(vectors)) => {
                    tracing::warn!(got = vectors.len(), want = pending.len(), "embedder returned wrong count");
                    report.failed += pending.len();
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, batch = pending.len(), "embedding batch failed");
                    report.failed += pending.len();
                }
                Err(e) => {
                    tracing::warn!(error = %e, "embedding task failed");
                    report.failed += pending.len();
                }
            }
        }

        handled += chunk.len();
        on_progress(handled);
    }

    tracing::info!(embedded = report.embedded, skipped = report.skipped, failed = report.failed, "warm-up finished");
    Ok(report)
}
