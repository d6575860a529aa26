//! Crisis detection and the safety partition.
//!
//! The boost is a hard partition, not a score: once a result is flagged it
//! ranks above every unflagged result no matter how scores are tuned.

use std::cmp::Ordering;

use carelink_core::types::{Category, MatchReason, SearchResult, Service};

use crate::tokenize::normalize;

/// Matched as whole words (or whole word runs) of the normalized text, so
/// "skills" does not trip "kill".
pub const CRISIS_KEYWORDS: &[&str] = &[
    "suicide",
    "suicidal",
    "kill",
    "killing",
    "die",
    "dying",
    "hurt",
    "hurting",
    "crisis",
    "emergency",
    "911",
    "overdose",
    "self harm",
    "end my life",
];

pub fn detect_crisis(text: &str) -> bool {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return false;
    }
    let padded = format!(" {normalized} ");
    CRISIS_KEYWORDS.iter().any(|k| padded.contains(&format!(" {k} ")))
}

/// A query is crisis when its text is, or when the caller explicitly
/// filtered on the Crisis category.
pub fn is_crisis_query(text: &str, category: Option<Category>) -> bool {
    category == Some(Category::Crisis) || detect_crisis(text)
}

/// Crisis-category services are always flagged. During a crisis query a
/// service is also flagged when its name or curated queries read as crisis
/// support; descriptions are ignored so that e.g. "emergency groceries" does
/// not jump the queue.
pub fn is_crisis_service(service: &Service, query_is_crisis: bool) -> bool {
    service.category == Category::Crisis
        || (query_is_crisis && (detect_crisis(&service.name) || service.synthetic_queries.iter().any(|q| detect_crisis(q))))
}

fn by_score_desc(a: &SearchResult, b: &SearchResult) -> Ordering {
    b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
}

fn crisis_category_first(a: &SearchResult, b: &SearchResult) -> Ordering {
    let rank = |r: &SearchResult| u8::from(r.service.category != Category::Crisis);
    rank(a).cmp(&rank(b)).then_with(|| by_score_desc(a, b))
}

/// Moves flagged results above the rest and tags them. Inside the flagged
/// partition Crisis-category services come first; both partitions are
/// otherwise stable-sorted by score. Results already marked `crisis` stay
/// flagged.
pub fn boost_crisis_results(results: Vec<SearchResult>, query_is_crisis: bool) -> Vec<SearchResult> {
    let (mut flagged, mut rest): (Vec<SearchResult>, Vec<SearchResult>) =
        results.into_iter().partition(|r| r.crisis || is_crisis_service(&r.service, query_is_crisis));
    for r in &mut flagged {
        r.crisis = true;
        r.add_reason(MatchReason::CrisisBoost);
    }
    flagged.sort_by(crisis_category_first);
    rest.sort_by(by_score_desc);
    flagged.extend(rest);
    flagged
}
