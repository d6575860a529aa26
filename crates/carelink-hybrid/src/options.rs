use chrono::NaiveDateTime;
use serde::Serialize;

use carelink_core::context::UserContext;
use carelink_core::geo::ScopeFilter;
use carelink_core::types::{Category, Coordinates, SearchResult};

/// Per-call search inputs. Everything is optional; `Default` is a plain
/// keyword search over the whole catalog.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub category: Option<Category>,
    pub location: Option<Coordinates>,
    /// Query embedding supplied by the caller; enables the semantic phase
    /// even while no local model is ready.
    pub vector_override: Option<Vec<f32>>,
    pub open_now: bool,
    pub scope: Option<ScopeFilter>,
    pub user_context: Option<UserContext>,
    /// Falls back to `search.default_limit`.
    pub limit: Option<usize>,
    /// Clock used by `open_now`; local time when unset.
    pub at: Option<NaiveDateTime>,
}

impl SearchOptions {
    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_location(mut self, location: Coordinates) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector_override = Some(vector);
        self
    }

    pub fn open_at(mut self, at: NaiveDateTime) -> Self {
        self.open_now = true;
        self.at = Some(at);
        self
    }

    pub fn local_only(mut self, radius_km: f64) -> Self {
        self.scope = Some(ScopeFilter::LocalOnly { radius_km });
        self
    }

    pub fn with_user(mut self, ctx: UserContext) -> Self {
        self.user_context = Some(ctx);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Ok,
    /// The catalog loaded and nothing was relevant.
    NoMatch,
    /// The catalog could not be loaded; results are empty for that reason.
    CatalogUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    /// Keyword-only ranking, returned immediately.
    Initial,
    /// Ranking blended with embedding similarity.
    Refined,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchResult>,
    pub status: SearchStatus,
    pub phase: SearchPhase,
}

impl SearchOutcome {
    pub fn empty(status: SearchStatus) -> Self {
        Self { results: Vec::new(), status, phase: SearchPhase::Initial }
    }

    pub(crate) fn from_results(results: Vec<SearchResult>, phase: SearchPhase) -> Self {
        let status = if results.is_empty() { SearchStatus::NoMatch } else { SearchStatus::Ok };
        Self { results, status, phase }
    }

    pub fn ids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.service.id.as_str()).collect()
    }
}
