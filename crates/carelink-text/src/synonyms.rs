//! Static concept thesaurus.
//!
//! Groups that share a term are merged when the table is built, so every
//! term maps to its whole connected concept. That makes expansion a closure:
//! expanding an expanded set adds nothing.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

const CONCEPT_GROUPS: &[&[&str]] = &[
    &["food", "hungry", "hunger", "meal", "meals", "groceries", "grocery", "pantry", "hamper", "eat", "nourriture", "faim", "epicerie", "repas"],
    &["housing", "shelter", "homeless", "homelessness", "rent", "apartment", "bed", "beds", "sleep", "logement", "abri"],
    &["crisis", "suicide", "suicidal", "distress", "hotline", "crise"],
    &["health", "doctor", "clinic", "medical", "nurse", "sick", "sante", "medecin"],
    &["legal", "lawyer", "law", "tenant", "eviction", "court", "juridique", "avocat"],
    &["financial", "money", "income", "benefits", "tax", "taxes", "debt", "argent"],
    &["employment", "job", "jobs", "work", "career", "resume", "emploi", "travail"],
    &["education", "school", "tutoring", "literacy", "class", "classes", "ecole"],
    &["transport", "transit", "bus", "ride", "rides", "transportation"],
    &["wellness", "mental", "counselling", "counseling", "therapy", "anxiety", "depression", "lonely"],
    &["indigenous", "aboriginal", "inuit", "metis", "autochtone"],
    &["community", "drop", "volunteer", "newcomer", "newcomers", "communautaire"],
];

static SYNONYMS: Lazy<HashMap<&'static str, Vec<&'static str>>> = Lazy::new(build_table);

fn build_table() -> HashMap<&'static str, Vec<&'static str>> {
    let mut components: Vec<Vec<&'static str>> = Vec::new();
    for group in CONCEPT_GROUPS {
        let mut merged: Vec<&'static str> = Vec::new();
        for &term in group.iter() {
            if !merged.contains(&term) {
                merged.push(term);
            }
        }
        let mut i = 0;
        while i < components.len() {
            if components[i].iter().any(|t| merged.contains(t)) {
                for t in components.swap_remove(i) {
                    if !merged.contains(&t) {
                        merged.push(t);
                    }
                }
            } else {
                i += 1;
            }
        }
        components.push(merged);
    }

    let mut table = HashMap::new();
    for component in components {
        for &term in &component {
            table.insert(term, component.clone());
        }
    }
    table
}

/// Concept terms related to `token` (including itself), empty if unknown.
pub fn related_terms(token: &str) -> &'static [&'static str] {
    SYNONYMS.get(token).map(Vec::as_slice).unwrap_or(&[])
}

/// Every term in the thesaurus, in table order.
pub fn all_terms() -> impl Iterator<Item = &'static str> {
    CONCEPT_GROUPS.iter().flat_map(|g| g.iter().copied())
}

/// Original tokens (deduplicated, order kept) followed by their related
/// concept terms. Unknown tokens pass through unchanged.
pub fn expand_query<S: AsRef<str>>(tokens: &[S]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<String> = Vec::new();
    for t in tokens {
        let t = t.as_ref();
        if seen.insert(t.to_string()) {
            out.push(t.to_string());
        }
    }
    let originals = out.len();
    for i in 0..originals {
        for related in related_terms(&out[i]) {
            if seen.insert((*related).to_string()) {
                out.push((*related).to_string());
            }
        }
    }
    out
}
