//! Embedding backends for CareLink: a candle BERT sentence model, a
//! deterministic hashing embedder, and the handle that owns the model's
//! lifecycle.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use carelink_core::config::{expand_path, EmbeddingSettings};
use carelink_core::error::Error;
use carelink_core::traits::Embedder;

pub mod device;
pub mod fake;
pub mod handle;
pub mod model;
pub mod pool;
pub mod tokenize;

pub use fake::{FakeEmbedder, FAKE_DIM};
pub use handle::{ModelHandle, ModelState};
pub use model::BertEmbedder;
pub use pool::masked_mean_l2;

const DEFAULT_MODEL_DIRS: &[&str] = &["models/all-MiniLM-L6-v2", "../models/all-MiniLM-L6-v2"];

pub fn fake_embeddings_requested() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().map(|v| v == "1" || v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// The embedder the settings ask for. Blocks while model weights load, so
/// async callers go through `ModelHandle::start_loading`.
pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Arc<dyn Embedder>> {
    if settings.use_fake || fake_embeddings_requested() {
        tracing::info!("using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::default()));
    }
    let dir = resolve_model_dir(settings.model_dir.as_deref())?;
    Ok(Arc::new(BertEmbedder::load(&dir)?))
}

fn resolve_model_dir(configured: Option<&str>) -> Result<PathBuf> {
    if let Some(dir) = configured {
        let p = expand_path(dir);
        if p.exists() {
            return Ok(p);
        }
        return Err(Error::NotFound(format!("model dir {}", p.display())).into());
    }
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") {
        let p = expand_path(dir);
        if p.exists() {
            tracing::debug!(path = %p.display(), "using APP_MODEL_DIR");
            return Ok(p);
        }
    }
    DEFAULT_MODEL_DIRS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
        .ok_or_else(|| Error::NotFound("embedding model directory".into()).into())
}
