//! Per-field keyword scoring.
//!
//! Every distinct query term contributes independently to every field it
//! matches. Terms that only entered through synonym expansion are scaled by
//! `ScoringWeights::synonym_factor`. A service that scores zero is not a
//! result.

use std::collections::HashSet;
use std::sync::Arc;

use carelink_core::config::ScoringWeights;
use carelink_core::types::{MatchReason, SearchResult, Service};

use crate::stopwords::is_stop_word;
use crate::synonyms::expand_query;
use crate::tokenize::{significant_terms, tokenize};

/// Substring matching only kicks in from this length; shorter terms need a
/// whole-word hit.
const MIN_SUBSTRING_LEN: usize = 4;

#[derive(Debug, Clone, Default)]
struct FieldText {
    text: String,
    words: HashSet<String>,
}

impl FieldText {
    fn new<'a>(parts: impl IntoIterator<Item = &'a str>) -> Self {
        let tokens: Vec<String> = parts.into_iter().flat_map(tokenize).collect();
        let words = tokens.iter().cloned().collect();
        Self { text: tokens.join(" "), words }
    }

    fn matches(&self, term: &str) -> bool {
        self.words.contains(term) || (term.chars().count() >= MIN_SUBSTRING_LEN && self.text.contains(term))
    }
}

/// A service with its searchable fields normalized once, at catalog load.
#[derive(Debug, Clone)]
pub struct IndexedService {
    pub service: Arc<Service>,
    name: FieldText,
    description: FieldText,
    category: FieldText,
    phrases: Vec<FieldText>,
    eligibility: FieldText,
}

impl IndexedService {
    pub fn new(service: Arc<Service>) -> Self {
        let name = FieldText::new([Some(service.name.as_str()), service.name_fr.as_deref()].into_iter().flatten());
        let description =
            FieldText::new([Some(service.description.as_str()), service.description_fr.as_deref()].into_iter().flatten());
        let category = FieldText::new([service.category.as_str()]);
        let phrases = service.synthetic_queries.iter().map(|q| FieldText::new([q.as_str()])).collect();
        let eligibility = FieldText::new(service.eligibility_notes.as_deref());
        Self { service, name, description, category, phrases, eligibility }
    }

    pub fn index_all(services: Vec<Service>) -> Vec<IndexedService> {
        services.into_iter().map(|s| IndexedService::new(Arc::new(s))).collect()
    }
}

/// Significant query terms split by origin.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryTerms {
    pub original: Vec<String>,
    pub synonyms: Vec<String>,
}

impl QueryTerms {
    pub fn from_query(query: &str) -> Self {
        let original = significant_terms(tokenize(query));
        let synonyms = expand_query(&original).split_off(original.len()).into_iter().filter(|t| !is_stop_word(t)).collect();
        Self { original, synonyms }
    }

    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }

    fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.original.iter().map(|t| (t.as_str(), true)).chain(self.synonyms.iter().map(|t| (t.as_str(), false)))
    }
}

fn push_unique(reasons: &mut Vec<MatchReason>, reason: MatchReason) {
    if !reasons.contains(&reason) {
        reasons.push(reason);
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeywordScorer {
    weights: ScoringWeights,
}

impl KeywordScorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// Score and reasons for one service; `None` when nothing matched.
    pub fn score(&self, indexed: &IndexedService, terms: &QueryTerms) -> Option<(f32, Vec<MatchReason>)> {
        let w = &self.weights;
        let mut total = 0.0f32;
        let mut reasons: Vec<MatchReason> = Vec::new();

        for (term, is_original) in terms.iter() {
            let mut term_score = 0.0f32;
            let mut term_reasons = Vec::new();
            if indexed.name.matches(term) {
                term_score += w.name;
                term_reasons.push(MatchReason::KeywordMatch);
            }
            if indexed.phrases.iter().any(|p| p.matches(term)) {
                term_score += w.synthetic_query;
                term_reasons.push(MatchReason::PhraseMatch);
            }
            if indexed.category.matches(term) {
                term_score += w.category;
                term_reasons.push(MatchReason::CategoryMatch);
            }
            if indexed.description.matches(term) {
                term_score += w.description;
                term_reasons.push(MatchReason::KeywordMatch);
            }
            if indexed.eligibility.matches(term) {
                term_score += w.eligibility;
                term_reasons.push(MatchReason::EligibilityMatch);
            }
            if term_score <= 0.0 {
                continue;
            }
            if is_original {
                total += term_score;
                for r in term_reasons {
                    push_unique(&mut reasons, r);
                }
            } else {
                total += term_score * w.synonym_factor;
                push_unique(&mut reasons, MatchReason::SynonymMatch);
            }
        }

        (total > 0.0).then_some((total, reasons))
    }

    /// Scores every service, drops zero scores, and stable-sorts descending so
    /// equal scores keep catalog order.
    pub fn rank<'a, I>(&self, catalog: I, terms: &QueryTerms) -> Vec<SearchResult>
    where
        I: IntoIterator<Item = &'a IndexedService>,
    {
        let mut results: Vec<SearchResult> = catalog
            .into_iter()
            .filter_map(|indexed| {
                self.score(indexed, terms).map(|(score, reasons)| {
                    let mut r = SearchResult::new(Arc::clone(&indexed.service), score);
                    r.reasons = reasons;
                    r
                })
            })
            .collect();
        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelink_core::types::Category;

    #[test]
    fn query_terms_split_original_and_synonyms() {
        let terms = QueryTerms::from_query("I am hungry");
        assert_eq!(terms.original, vec!["hungry"]);
        assert!(terms.synonyms.contains(&"food".to_string()));
        assert!(!terms.synonyms.contains(&"hungry".to_string()));
    }

    #[test]
    fn short_terms_need_whole_words() {
        let field = FieldText::new(["Free tax clinic"]);
        assert!(field.matches("tax"));
        assert!(!field.matches("ta"));
        assert!(field.matches("clinic"));
        let field = FieldText::new(["Groceries delivered"]);
        assert!(field.matches("grocer"));
    }

    #[test]
    fn name_outweighs_description() {
        let mut a = Service::new("a", "Shelter Network", Category::Housing);
        a.description = "Beds.".into();
        let mut b = Service::new("b", "Hope House", Category::Community);
        b.description = "Emergency shelter referrals.".into();
        let catalog = IndexedService::index_all(vec![b, a]);
        let ranked = KeywordScorer::default().rank(&catalog, &QueryTerms::from_query("shelter"));
        assert_eq!(ranked[0].service.id, "a");
        assert!(ranked[0].score > ranked[1].score);
    }
}
