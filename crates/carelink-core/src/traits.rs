use crate::types::Service;

/// Text embedding model. Implementations return L2-normalized vectors of
/// `dim()` floats; an error means "embedding unavailable" to callers.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the model and its dimensionality, used to keep
    /// cached vectors from different models apart.
    fn id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }
}

/// Source of the service directory. A failure here is a load error, never
/// "no results".
pub trait CatalogSource: Send + Sync {
    fn load_services(&self) -> anyhow::Result<Vec<Service>>;
}
