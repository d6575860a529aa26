//! carelink-text
//!
//! Keyword side of the search engine: normalization, spelling suggestions,
//! synonym expansion, crisis detection and per-field keyword scoring.

pub mod crisis;
pub mod fuzzy;
pub mod pattern;
pub mod scorer;
pub mod stopwords;
pub mod synonyms;
pub mod tokenize;

pub use crisis::{boost_crisis_results, detect_crisis, is_crisis_query, is_crisis_service};
pub use fuzzy::{closest_match, distance, Suggester};
pub use pattern::detect_query_pattern;
pub use scorer::{IndexedService, KeywordScorer, QueryTerms};
pub use synonyms::expand_query;
pub use tokenize::{normalize, tokenize};
