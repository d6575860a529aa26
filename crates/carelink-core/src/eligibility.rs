//! Eligibility hints for a user context. Annotation only: results are never
//! filtered or re-ranked on this status.

use serde::{Deserialize, Serialize};

use crate::context::{AgeGroup, UserContext};
use crate::types::Service;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EligibilityStatus {
    Eligible,
    Ineligible,
    Unknown,
}

const YOUTH_TERMS: &[&str] = &["youth", "teen", "young people", "young adult", "under 25", "under 18", "ages 12"];
const SENIOR_TERMS: &[&str] = &["senior", "older adult", "elder", "55+", "60+", "65+", "aged 55", "aged 65"];
const ADULT_TERMS: &[&str] = &["adults only", "18+", "19+", "adult men", "adult women"];

/// Age groups a service's eligibility notes restrict it to. Empty when the
/// notes carry no recognizable age restriction.
pub fn restricted_age_groups(notes: &str) -> Vec<AgeGroup> {
    let notes = notes.to_lowercase();
    let mut groups = Vec::new();
    let mentions = |terms: &[&str]| terms.iter().any(|t| notes.contains(t));
    if mentions(YOUTH_TERMS) {
        groups.push(AgeGroup::Youth);
    }
    if mentions(ADULT_TERMS) {
        groups.push(AgeGroup::Adult);
    }
    if mentions(SENIOR_TERMS) {
        groups.push(AgeGroup::Senior);
    }
    groups
}

pub fn check_eligibility(service: &Service, ctx: &UserContext) -> EligibilityStatus {
    let notes = service.eligibility_notes.as_deref().unwrap_or("");
    let restricted = restricted_age_groups(notes);

    if let Some(age) = ctx.age_group {
        if !restricted.is_empty() {
            return if restricted.contains(&age) {
                EligibilityStatus::Eligible
            } else {
                EligibilityStatus::Ineligible
            };
        }
    }

    let notes_lower = notes.to_lowercase();
    let identity_match = ctx.identity_tags.iter().any(|tag| {
        service.identity_tags.iter().any(|t| t.tag.eq_ignore_ascii_case(tag))
            || (!tag.trim().is_empty() && notes_lower.contains(&tag.to_lowercase()))
    });
    if identity_match {
        EligibilityStatus::Eligible
    } else {
        EligibilityStatus::Unknown
    }
}
