//! Edit distance and "did you mean" suggestions.
//!
//! Suggestions are hints only; the search itself always runs on what the
//! user typed.

use std::collections::HashSet;

use carelink_core::types::{Category, Service};

use crate::crisis::CRISIS_KEYWORDS;
use crate::stopwords::is_stop_word;
use crate::synonyms::all_terms;
use crate::tokenize::tokenize;

pub const DEFAULT_MAX_DISTANCE: usize = 2;

/// Levenshtein distance over chars with a single DP row.
pub fn distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut diag = row[0];
        row[0] = i + 1;
        for j in 1..=b.len() {
            let above = row[j];
            let cost = usize::from(ca != b[j - 1]);
            row[j] = (above + 1).min(row[j - 1] + 1).min(diag + cost);
            diag = above;
        }
    }
    row[b.len()]
}

/// The dictionary entry closest to `term` within `max_distance`. Ties go to
/// the entry seen first.
pub fn closest_match<'a, I>(term: &str, dictionary: I, max_distance: usize) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let term_len = term.chars().count();
    let mut best: Option<(&'a str, usize)> = None;
    for candidate in dictionary {
        // Length gap is a lower bound on the distance.
        if candidate.chars().count().abs_diff(term_len) > max_distance {
            continue;
        }
        let d = distance(term, candidate);
        if d <= max_distance && best.map_or(true, |(_, best_d)| d < best_d) {
            best = Some((candidate, d));
            if d == 0 {
                break;
            }
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// Short and purely numeric terms never get suggestions.
pub fn is_suggestible(term: &str) -> bool {
    term.chars().count() >= 3 && !term.chars().all(|c| c.is_ascii_digit())
}

/// Vocabulary-backed spelling suggester.
#[derive(Debug, Clone)]
pub struct Suggester {
    vocabulary: Vec<String>,
    known: HashSet<String>,
    max_distance: usize,
}

impl Suggester {
    /// Built-in vocabulary only: synonym terms, crisis keywords, categories.
    pub fn new(max_distance: usize) -> Self {
        let mut s = Self { vocabulary: Vec::new(), known: HashSet::new(), max_distance };
        for term in all_terms() {
            s.add_term(term);
        }
        for keyword in CRISIS_KEYWORDS {
            for t in tokenize(keyword) {
                s.add_term(&t);
            }
        }
        for category in Category::ALL {
            s.add_term(&category.as_str().to_lowercase());
        }
        s
    }

    /// Built-in vocabulary plus every word of the catalog's names,
    /// descriptions and curated queries.
    pub fn with_catalog(services: &[Service], max_distance: usize) -> Self {
        let mut s = Self::new(max_distance);
        for service in services {
            let fields = [Some(&service.name), service.name_fr.as_ref(), Some(&service.description), service.description_fr.as_ref()];
            for text in fields.into_iter().flatten().chain(service.synthetic_queries.iter()) {
                for t in tokenize(text) {
                    s.add_term(&t);
                }
            }
        }
        tracing::debug!(services = services.len(), vocabulary = s.len(), "suggestion vocabulary built");
        s
    }

    fn add_term(&mut self, term: &str) {
        if is_suggestible(term) && !is_stop_word(term) && self.known.insert(term.to_string()) {
            self.vocabulary.push(term.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    /// A corrected query when at least one unknown word has a close
    /// vocabulary match, `None` otherwise.
    pub fn suggest(&self, query: &str) -> Option<String> {
        let mut changed = false;
        let corrected: Vec<String> = tokenize(query)
            .map(|token| {
                if !is_suggestible(&token) || is_stop_word(&token) || self.known.contains(&token) {
                    return token;
                }
                match closest_match(&token, self.vocabulary.iter().map(String::as_str), self.max_distance) {
                    Some(m) => {
                        changed = true;
                        m.to_string()
                    }
                    None => token,
                }
            })
            .collect();
        changed.then(|| corrected.join(" "))
    }
}
