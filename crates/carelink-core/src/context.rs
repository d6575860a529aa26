//! Client-local preference state: saved searches and optional profile hints.
//!
//! Nothing in here feeds the ranking score; the eligibility checker reads it
//! to annotate results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_SAVED_SEARCHES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    Youth,
    Adult,
    Senior,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSearch {
    pub query: String,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserContext {
    pub opted_in: bool,
    pub age_group: Option<AgeGroup>,
    pub identity_tags: Vec<String>,
    pub saved_searches: Vec<SavedSearch>,
}

impl UserContext {
    pub fn opted_in() -> Self {
        Self { opted_in: true, ..Self::default() }
    }

    pub fn opt_in(&mut self) {
        self.opted_in = true;
    }

    /// Opting out drops every stored preference.
    pub fn opt_out(&mut self) {
        *self = Self::default();
    }

    /// Records `query` as the most recent saved search. Returns false when
    /// the user has not opted in or the query is blank. Re-saving an
    /// existing query (case-insensitive) moves it to the front.
    pub fn save_search(&mut self, query: &str) -> bool {
        let query = query.trim();
        if !self.opted_in || query.is_empty() {
            return false;
        }
        self.saved_searches.retain(|s| !s.query.eq_ignore_ascii_case(query));
        self.saved_searches.insert(0, SavedSearch { query: query.to_string(), saved_at: Utc::now() });
        self.saved_searches.truncate(MAX_SAVED_SEARCHES);
        true
    }

    pub fn remove_search(&mut self, query: &str) -> bool {
        let before = self.saved_searches.len();
        self.saved_searches.retain(|s| !s.query.eq_ignore_ascii_case(query.trim()));
        before != self.saved_searches.len()
    }

    pub fn has_identity(&self, tag: &str) -> bool {
        self.identity_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_searches_require_opt_in_and_stay_bounded() {
        let mut ctx = UserContext::default();
        assert!(!ctx.save_search("food bank"));

        ctx.opt_in();
        for i in 0..(MAX_SAVED_SEARCHES + 5) {
            assert!(ctx.save_search(&format!("query {i}")));
        }
        assert_eq!(ctx.saved_searches.len(), MAX_SAVED_SEARCHES);

        ctx.save_search("QUERY 10");
        assert_eq!(ctx.saved_searches[0].query, "QUERY 10");
        assert_eq!(ctx.saved_searches.iter().filter(|s| s.query.eq_ignore_ascii_case("query 10")).count(), 1);

        ctx.opt_out();
        assert!(ctx.saved_searches.is_empty());
        assert!(!ctx.opted_in);
    }
}
