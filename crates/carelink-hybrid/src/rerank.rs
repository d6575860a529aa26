//! Phase-2 blending of keyword and embedding scores.

use std::collections::HashMap;

use carelink_core::types::{MatchReason, SearchResult};
use carelink_text::boost_crisis_results;
use carelink_vector::cosine_similarity;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendParams {
    /// Share of the cosine similarity in the blended score.
    pub weight: f32,
    /// Similarity at which a result is tagged "Semantic Match".
    pub semantic_threshold: f32,
}

impl Default for BlendParams {
    fn default() -> Self {
        Self { weight: 0.6, semantic_threshold: 0.35 }
    }
}

/// Re-scores `results` as `(1 - w) * kw / max_kw + w * cos`. A service with
/// no usable vector keeps only its keyword component. The crisis partition
/// is re-applied afterwards, so similarity can reorder results within a
/// partition but never across it.
pub fn blend(
    results: Vec<SearchResult>,
    query_vector: &[f32],
    service_vectors: &HashMap<String, Vec<f32>>,
    params: BlendParams,
    query_is_crisis: bool,
) -> Vec<SearchResult> {
    let w = params.weight.clamp(0.0, 1.0);
    let max_kw = results.iter().map(|r| r.score).fold(0.0f32, f32::max);

    let blended: Vec<SearchResult> = results
        .into_iter()
        .map(|mut r| {
            let kw = if max_kw > 0.0 { r.score / max_kw } else { 0.0 };
            let similarity = service_vectors
                .get(&r.service.id)
                .filter(|v| v.len() == query_vector.len())
                .map(|v| cosine_similarity(query_vector, v));
            r.score = match similarity {
                Some(cos) => {
                    if cos >= params.semantic_threshold {
                        r.add_reason(MatchReason::SemanticMatch);
                    }
                    (1.0 - w) * kw + w * cos
                }
                None => (1.0 - w) * kw,
            };
            r
        })
        .collect();

    boost_crisis_results(blended, query_is_crisis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelink_core::types::{Category, Service};
    use std::sync::Arc;

    fn result(id: &str, category: Category, score: f32) -> SearchResult {
        SearchResult::new(Arc::new(Service::new(id, id, category)), score)
    }

    #[test]
    fn similarity_reorders_within_partition() {
        let results = vec![result("a", Category::Food, 10.0), result("b", Category::Food, 8.0)];
        let vectors = HashMap::from([("a".to_string(), vec![0.0, 1.0]), ("b".to_string(), vec![1.0, 0.0])]);
        let out = blend(results, &[1.0, 0.0], &vectors, BlendParams::default(), false);
        assert_eq!(out[0].service.id, "b");
        assert!(out[0].has_reason(MatchReason::SemanticMatch));
        assert!(!out[1].has_reason(MatchReason::SemanticMatch));
    }

    #[test]
    fn similarity_never_crosses_crisis_partition() {
        let mut crisis = result("line", Category::Crisis, 2.0);
        crisis.crisis = true;
        let results = vec![crisis, result("food", Category::Food, 50.0)];
        let vectors = HashMap::from([("line".to_string(), vec![0.0, 1.0]), ("food".to_string(), vec![1.0, 0.0])]);
        for weight in [0.0, 0.3, 0.6, 1.0] {
            let params = BlendParams { weight, ..BlendParams::default() };
            let out = blend(results.clone(), &[1.0, 0.0], &vectors, params, true);
            assert_eq!(out[0].service.id, "line", "weight {weight}");
            assert!(out[0].crisis);
        }
    }

    #[test]
    fn missing_or_mismatched_vectors_keep_keyword_share() {
        let results = vec![result("a", Category::Food, 10.0), result("b", Category::Food, 5.0)];
        let vectors = HashMap::from([("b".to_string(), vec![1.0, 0.0, 0.0])]);
        let out = blend(results, &[1.0, 0.0], &vectors, BlendParams { weight: 0.5, semantic_threshold: 0.35 }, false);
        assert_eq!(out[0].service.id, "a");
        assert!((out[0].score - 0.5).abs() < 1e-6);
        assert!((out[1].score - 0.25).abs() < 1e-6);
    }
}
