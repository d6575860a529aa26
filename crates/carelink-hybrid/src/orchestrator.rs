//! Two-phase search over the service catalog.
//!
//! `phase_one` answers from keyword scoring alone and never waits on a
//! model. `upgrade` re-ranks those results with embedding similarity when a
//! query vector can be had (caller override or a ready model) and returns
//! `None` otherwise. `search_services` runs both back to back.

use anyhow::Result;
use chrono::Local;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use carelink_core::catalog::JsonCatalog;
use carelink_core::config::{resolve_with_base, Config, DataSettings, EmbeddingSettings, SearchSettings};
use carelink_core::eligibility::check_eligibility;
use carelink_core::error::Error;
use carelink_core::geo::{distance_band, proximity_bonus, service_distance_km};
use carelink_core::hours::is_open_at;
use carelink_core::traits::{CatalogSource, Embedder};
use carelink_core::types::{Category, MatchReason, SearchResult, Service};
use carelink_embed::ModelHandle;
use carelink_text::{
    boost_crisis_results, detect_query_pattern, is_crisis_query, normalize, tokenize, IndexedService, KeywordScorer,
    QueryTerms, Suggester,
};
use carelink_vector::warm::{content_hash, is_fresh, service_metadata};
use carelink_vector::{query_key, service_key, VectorCache};

use crate::analytics::{AnalyticsSink, SearchEvent, TracingSink};
use crate::options::{SearchOptions, SearchOutcome, SearchPhase, SearchStatus};
use crate::rerank::{blend, BlendParams};

struct LoadedCatalog {
    services: Vec<IndexedService>,
    suggester: Suggester,
}

pub struct SearchOrchestrator {
    source: Arc<dyn CatalogSource>,
    catalog: RwLock<Option<Arc<LoadedCatalog>>>,
    settings: SearchSettings,
    scorer: KeywordScorer,
    model: ModelHandle,
    cache: VectorCache,
    analytics: Arc<dyn AnalyticsSink>,
}

impl SearchOrchestrator {
    pub fn new(source: Arc<dyn CatalogSource>, settings: SearchSettings) -> Self {
        let scorer = KeywordScorer::new(settings.weights.clone());
        Self {
            source,
            catalog: RwLock::new(None),
            settings,
            scorer,
            model: ModelHandle::new(),
            cache: VectorCache::in_memory(carelink_vector::DEFAULT_HOT_CAPACITY),
            analytics: Arc::new(TracingSink),
        }
    }

    /// Wires catalog, cache and settings from configuration. Relative paths
    /// resolve against `base`. The model is left `Uninitialized`; call
    /// `model().start_loading(..)` once a runtime is up.
    pub fn from_config(config: &Config, base: &Path) -> Result<Self> {
        let search: SearchSettings = config.get_or_default("search")?;
        search.validate()?;
        let data: DataSettings = config.get_or_default("data")?;
        let embedding: EmbeddingSettings = config.get_or_default("embedding")?;

        let catalog = JsonCatalog::new(resolve_with_base(base, &data.catalog_path));
        let cache = VectorCache::open_or_disabled(&resolve_with_base(base, &data.vector_cache_path), embedding.cache_capacity);
        Ok(Self::new(Arc::new(catalog), search).with_cache(cache))
    }

    pub fn with_model(mut self, model: ModelHandle) -> Self {
        self.model = model;
        self
    }

    pub fn with_cache(mut self, cache: VectorCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_analytics(mut self, sink: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = sink;
        self
    }

    pub fn model(&self) -> &ModelHandle {
        &self.model
    }

    pub fn cache(&self) -> &VectorCache {
        &self.cache
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Drops the loaded catalog; the next search reloads it.
    pub fn invalidate_catalog(&self) {
        *self.catalog.write() = None;
    }

    /// Loaded services, loading them first if needed.
    pub async fn services(&self) -> Result<Vec<Arc<Service>>, Error> {
        let catalog = self.load_catalog().await?;
        Ok(catalog.services.iter().map(|s| Arc::clone(&s.service)).collect())
    }

    async fn load_catalog(&self) -> Result<Arc<LoadedCatalog>, Error> {
        let cached = self.catalog.read().clone();
        if let Some(loaded) = cached {
            return Ok(loaded);
        }

        let source = Arc::clone(&self.source);
        let max_distance = self.settings.fuzzy_max_distance;
        let built = tokio::task::spawn_blocking(move || -> Result<LoadedCatalog> {
            let services = source.load_services()?;
            let suggester = Suggester::with_catalog(&services, max_distance);
            Ok(LoadedCatalog { services: IndexedService::index_all(services), suggester })
        })
        .await
        .map_err(|e| Error::CatalogUnavailable(e.to_string()))?
        .map_err(|e| Error::CatalogUnavailable(format!("{e:#}")))?;

        let loaded = Arc::new(built);
        *self.catalog.write() = Some(Arc::clone(&loaded));
        Ok(loaded)
    }

    /// "Did you mean" hint; never changes what is searched.
    pub async fn get_suggestion(&self, query: &str) -> Option<String> {
        match self.load_catalog().await {
            Ok(catalog) => catalog.suggester.suggest(query),
            Err(e) => {
                tracing::debug!(error = %e, "suggesting without catalog vocabulary");
                Suggester::new(self.settings.fuzzy_max_distance).suggest(query)
            }
        }
    }

    /// Phase 1 then, when possible, phase 2.
    pub async fn search_services(&self, query: &str, options: &SearchOptions) -> SearchOutcome {
        let initial = self.phase_one(query, options).await;
        match self.upgrade(query, options, &initial).await {
            Some(refined) => refined,
            None => initial,
        }
    }

    /// Keyword-only ranking.
    pub async fn phase_one(&self, query: &str, options: &SearchOptions) -> SearchOutcome {
        let crisis = is_crisis_query(query, options.category);
        let catalog = match self.load_catalog().await {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::error!(error = %e, "catalog unavailable");
                let outcome = SearchOutcome::empty(SearchStatus::CatalogUnavailable);
                self.record(query, &outcome, crisis);
                return outcome;
            }
        };

        let results = self.rank_keywords(&catalog, query, options, crisis);
        let outcome = SearchOutcome::from_results(results, SearchPhase::Initial);
        tracing::debug!(results = outcome.results.len(), crisis, "phase 1 complete");
        self.record(query, &outcome, crisis);
        outcome
    }

    /// Embedding re-rank of a phase-1 outcome. `None` means phase 1 stands:
    /// nothing to re-rank, no query vector available, or embedding failed.
    pub async fn upgrade(&self, query: &str, options: &SearchOptions, initial: &SearchOutcome) -> Option<SearchOutcome> {
        if initial.results.is_empty() || normalize(query).is_empty() {
            return None;
        }
        let embedder = self.model.ready_embedder();
        let query_vector = match &options.vector_override {
            Some(v) if !v.is_empty() => v.clone(),
            _ => self.query_vector(embedder.as_ref()?, query).await?,
        };

        let service_vectors = match &embedder {
            Some(embedder) => self.service_vectors(embedder, &initial.results).await,
            None => HashMap::new(),
        };

        let params = BlendParams { weight: self.settings.blend_weight, semantic_threshold: self.settings.semantic_threshold };
        let crisis = is_crisis_query(query, options.category);
        let results = blend(initial.results.clone(), &query_vector, &service_vectors, params, crisis);
        tracing::debug!(results = results.len(), vectors = service_vectors.len(), "phase 2 complete");
        Some(SearchOutcome { results, status: initial.status, phase: SearchPhase::Refined })
    }

    fn rank_keywords(&self, catalog: &LoadedCatalog, query: &str, options: &SearchOptions, crisis: bool) -> Vec<SearchResult> {
        let candidates: Vec<&IndexedService> = catalog
            .services
            .iter()
            .filter(|s| options.category.map_or(true, |c| s.service.category == c))
            .collect();

        let terms = QueryTerms::from_query(query);
        let mut results = if terms.is_empty() {
            // Category browse: an empty query with a category lists the category.
            match options.category {
                Some(_) => candidates
                    .iter()
                    .map(|s| {
                        let mut r = SearchResult::new(Arc::clone(&s.service), self.scorer.weights().category);
                        r.add_reason(MatchReason::CategoryMatch);
                        r
                    })
                    .collect(),
                None => Vec::new(),
            }
        } else {
            self.scorer.rank(candidates.iter().copied(), &terms)
        };

        if crisis {
            inject_crisis_services(&mut results, &candidates, self.scorer.weights().category);
        }

        self.apply_location(&mut results, options);
        if options.open_now {
            let at = options.at.unwrap_or_else(|| Local::now().naive_local());
            results.retain_mut(|r| {
                let open = r.service.hours.as_ref().is_some_and(|h| is_open_at(h, at));
                if open {
                    r.add_reason(MatchReason::OpenNow);
                }
                open || r.service.category == Category::Crisis
            });
        }

        let mut results = boost_crisis_results(results, crisis);
        if let Some(ctx) = &options.user_context {
            for r in &mut results {
                r.eligibility = Some(check_eligibility(&r.service, ctx));
            }
        }

        let limit = options.limit.unwrap_or(self.settings.default_limit);
        let flagged = results.iter().take_while(|r| r.crisis).count();
        results.truncate(limit.max(flagged));
        results
    }

    fn apply_location(&self, results: &mut Vec<SearchResult>, options: &SearchOptions) {
        let Some(user) = options.location else {
            return;
        };
        for r in results.iter_mut() {
            let Some(km) = service_distance_km(&user, &r.service) else {
                continue;
            };
            r.distance_km = Some(km);
            if let Some(band) = distance_band(km) {
                r.add_reason(MatchReason::WithinKm(band));
            }
            if r.score > 0.0 {
                r.score += proximity_bonus(km, self.settings.proximity_radius_km, self.settings.proximity_weight);
            }
        }
        if let Some(scope) = options.scope {
            results.retain(|r| scope.admits(r.distance_km));
        }
    }

    async fn query_vector(&self, embedder: &Arc<dyn Embedder>, query: &str) -> Option<Vec<f32>> {
        let key = query_key(embedder.id(), &normalize(query));
        if let Some(hit) = self.cache.get(&key).await {
            if hit.embedding.len() == embedder.dim() {
                return Some(hit.embedding);
            }
        }

        let worker = Arc::clone(embedder);
        let text = query.to_string();
        let vector = match tokio::task::spawn_blocking(move || worker.embed_text(&text)).await {
            Ok(Ok(v)) if v.len() == embedder.dim() => v,
            Ok(Ok(v)) => {
                tracing::debug!(got = v.len(), want = embedder.dim(), "query embedding has wrong dimension");
                return None;
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "query embedding failed");
                return None;
            }
            Err(e) => {
                tracing::debug!(error = %e, "query embedding task failed");
                return None;
            }
        };
        self.cache.set(&key, vector.clone(), HashMap::new()).await;
        Some(vector)
    }

    /// Vectors for the services in `results`: fresh cache entries first, the
    /// rest embedded in one batch and written back.
    async fn service_vectors(&self, embedder: &Arc<dyn Embedder>, results: &[SearchResult]) -> HashMap<String, Vec<f32>> {
        let mut vectors = HashMap::new();
        let mut misses: Vec<(Arc<Service>, String, String)> = Vec::new();
        for r in results {
            let text = r.service.embedding_text();
            let hash = content_hash(&text);
            match self.cache.get(&service_key(embedder.id(), &r.service.id)).await {
                Some(entry) if is_fresh(&entry, &hash) && entry.embedding.len() == embedder.dim() => {
                    vectors.insert(r.service.id.clone(), entry.embedding);
                }
                _ => misses.push((Arc::clone(&r.service), text, hash)),
            }
        }
        if misses.is_empty() {
            return vectors;
        }

        let texts: Vec<String> = misses.iter().map(|(_, text, _)| text.clone()).collect();
        let worker = Arc::clone(embedder);
        let computed = match tokio::task::spawn_blocking(move || worker.embed_batch(&texts)).await {
            Ok(Ok(v)) if v.len() == misses.len() => v,
            _ => {
                tracing::debug!(missing = misses.len(), "service embeddings unavailable; keyword score only");
                return vectors;
            }
        };
        for ((service, _, hash), vector) in misses.into_iter().zip(computed) {
            if vector.len() != embedder.dim() {
                continue;
            }
            let key = service_key(embedder.id(), &service.id);
            self.cache.set(&key, vector.clone(), service_metadata(embedder.id(), &service, &hash)).await;
            vectors.insert(service.id.clone(), vector);
        }
        vectors
    }

    fn record(&self, query: &str, outcome: &SearchOutcome, crisis: bool) {
        let tokens: Vec<String> = tokenize(query).collect();
        let event = SearchEvent {
            pattern: detect_query_pattern(&tokens),
            result_count: outcome.results.len(),
            status: outcome.status,
            crisis,
        };
        if let Err(e) = self.analytics.record(&event) {
            tracing::debug!(error = %e, "analytics sink failed");
        }
    }
}

/// On crisis queries every Crisis-category candidate is shown, matched or not.
fn inject_crisis_services(results: &mut Vec<SearchResult>, candidates: &[&IndexedService], score: f32) {
    for s in candidates.iter().filter(|s| s.service.category == Category::Crisis) {
        if results.iter().any(|r| r.service.id == s.service.id) {
            continue;
        }
        results.push(SearchResult::new(Arc::clone(&s.service), score));
    }
}
