//! Domain types used by the text, vector and hybrid engines.

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::eligibility::EligibilityStatus;
use crate::error::Error;

pub type ServiceId = String;
pub type Meta = HashMap<String, String>;

/// Fixed service taxonomy. Catalog entries with any other category are
/// rejected at deserialization time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Food,
    Housing,
    Crisis,
    Health,
    Legal,
    Financial,
    Employment,
    Education,
    Transport,
    Community,
    Indigenous,
    Wellness,
}

impl Category {
    pub const ALL: [Category; 12] = [
        Category::Food,
        Category::Housing,
        Category::Crisis,
        Category::Health,
        Category::Legal,
        Category::Financial,
        Category::Employment,
        Category::Education,
        Category::Transport,
        Category::Community,
        Category::Indigenous,
        Category::Wellness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Housing => "Housing",
            Category::Crisis => "Crisis",
            Category::Health => "Health",
            Category::Legal => "Legal",
            Category::Financial => "Financial",
            Category::Employment => "Employment",
            Category::Education => "Education",
            Category::Transport => "Transport",
            Category::Community => "Community",
            Category::Indigenous => "Indigenous",
            Category::Wellness => "Wellness",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| Error::UnknownCategory(s.to_string()))
    }
}

/// Geographic breadth of a service. Used to segment results, never to rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Local,
    Provincial,
    National,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// One weekday's opening hours: either an `open`/`close` pair of "HH:MM"
/// strings or a free-text `note` ("By appointment").
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayHours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl DayHours {
    pub fn span(open: &str, close: &str) -> Self {
        Self { open: Some(open.to_string()), close: Some(close.to_string()), note: None }
    }

    pub fn note(text: &str) -> Self {
        Self { open: None, close: None, note: Some(text.to_string()) }
    }
}

/// Weekly schedule; a missing day means closed that day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeeklyHours {
    pub monday: Option<DayHours>,
    pub tuesday: Option<DayHours>,
    pub wednesday: Option<DayHours>,
    pub thursday: Option<DayHours>,
    pub friday: Option<DayHours>,
    pub saturday: Option<DayHours>,
    pub sunday: Option<DayHours>,
}

impl WeeklyHours {
    pub fn day(&self, weekday: Weekday) -> Option<&DayHours> {
        match weekday {
            Weekday::Mon => self.monday.as_ref(),
            Weekday::Tue => self.tuesday.as_ref(),
            Weekday::Wed => self.wednesday.as_ref(),
            Weekday::Thu => self.thursday.as_ref(),
            Weekday::Fri => self.friday.as_ref(),
            Weekday::Sat => self.saturday.as_ref(),
            Weekday::Sun => self.sunday.as_ref(),
        }
    }

    pub fn set_day(&mut self, weekday: Weekday, hours: DayHours) {
        let slot = match weekday {
            Weekday::Mon => &mut self.monday,
            Weekday::Tue => &mut self.tuesday,
            Weekday::Wed => &mut self.wednesday,
            Weekday::Thu => &mut self.thursday,
            Weekday::Fri => &mut self.friday,
            Weekday::Sat => &mut self.saturday,
            Weekday::Sun => &mut self.sunday,
        };
        *slot = Some(hours);
    }

    pub fn days(&self) -> impl Iterator<Item = (Weekday, &DayHours)> {
        [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ]
        .into_iter()
        .filter_map(move |d| self.day(d).map(|h| (d, h)))
    }
}

/// Audience affinity ("2SLGBTQI+", "newcomers") with its supporting evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityTag {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    /// 0 = unverified ... 3 = confirmed directly with the provider.
    pub level: u8,
    #[serde(default)]
    pub verified_by: Option<String>,
    #[serde(default)]
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub method: Option<String>,
}

/// A directory entry. Read-only to the search engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: ServiceId,
    pub name: String,
    #[serde(default)]
    pub name_fr: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub description_fr: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub address_fr: Option<String>,
    pub category: Category,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub hours: Option<WeeklyHours>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub eligibility_notes: Option<String>,
    #[serde(default)]
    pub synthetic_queries: Vec<String>,
    #[serde(default)]
    pub identity_tags: Vec<IdentityTag>,
    #[serde(default)]
    pub verification: Option<Verification>,
    #[serde(default)]
    pub scope: Scope,
}

impl Service {
    /// Minimal constructor; the remaining fields start empty.
    pub fn new(id: &str, name: &str, category: Category) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            name_fr: None,
            description: String::new(),
            description_fr: None,
            address: None,
            address_fr: None,
            category,
            coordinates: None,
            hours: None,
            phone: None,
            url: None,
            email: None,
            eligibility_notes: None,
            synthetic_queries: Vec::new(),
            identity_tags: Vec::new(),
            verification: None,
            scope: Scope::Local,
        }
    }

    /// Text fed to embedders; stable for a given service revision.
    pub fn embedding_text(&self) -> String {
        let mut parts = vec![self.name.as_str(), self.category.as_str()];
        if !self.description.is_empty() {
            parts.push(self.description.as_str());
        }
        parts.extend(self.synthetic_queries.iter().map(String::as_str));
        parts.join(". ")
    }

    /// Data-quality problems worth reporting at load time. A service with
    /// issues stays searchable; hours problems fail closed in `hours`.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.id.trim().is_empty() {
            issues.push("empty id".to_string());
        }
        if self.name.trim().is_empty() {
            issues.push("empty name".to_string());
        }
        if let Some(c) = &self.coordinates {
            if !c.is_valid() {
                issues.push(format!("invalid coordinates ({}, {})", c.lat, c.lng));
            }
        }
        if let Some(hours) = &self.hours {
            for (day, h) in hours.days() {
                if let Some(problem) = crate::hours::day_problem(h) {
                    issues.push(format!("{day}: {problem}"));
                }
            }
        }
        issues
    }
}

/// Human-readable explanation attached to a ranked result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchReason {
    KeywordMatch,
    PhraseMatch,
    CategoryMatch,
    SynonymMatch,
    EligibilityMatch,
    CrisisBoost,
    WithinKm(u32),
    OpenNow,
    SemanticMatch,
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchReason::KeywordMatch => f.write_str("Keyword Match"),
            MatchReason::PhraseMatch => f.write_str("Common Phrase Match"),
            MatchReason::CategoryMatch => f.write_str("Category Match"),
            MatchReason::SynonymMatch => f.write_str("Synonym Match"),
            MatchReason::EligibilityMatch => f.write_str("Eligibility Match"),
            MatchReason::CrisisBoost => f.write_str("Crisis Detected (Safety Boost)"),
            MatchReason::WithinKm(km) => write!(f, "Within {km}km"),
            MatchReason::OpenNow => f.write_str("Open Now"),
            MatchReason::SemanticMatch => f.write_str("Semantic Match"),
        }
    }
}

/// One ranked service for one query. Recomputed on every search.
///
/// `score` is higher-is-better; its scale depends on the phase that produced
/// it (raw keyword points in phase 1, blended 0..1 in phase 2). `crisis`
/// marks results held above everything else by the safety partition.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub service: Arc<Service>,
    pub score: f32,
    pub reasons: Vec<MatchReason>,
    pub distance_km: Option<f64>,
    pub crisis: bool,
    pub eligibility: Option<EligibilityStatus>,
}

impl SearchResult {
    pub fn new(service: Arc<Service>, score: f32) -> Self {
        Self { service, score, reasons: Vec::new(), distance_km: None, crisis: false, eligibility: None }
    }

    /// Appends `reason` unless already present; order of first insertion wins.
    pub fn add_reason(&mut self, reason: MatchReason) {
        if !self.reasons.contains(&reason) {
            self.reasons.push(reason);
        }
    }

    pub fn has_reason(&self, reason: MatchReason) -> bool {
        self.reasons.contains(&reason)
    }

    pub fn reason_labels(&self) -> Vec<String> {
        self.reasons.iter().map(ToString::to_string).collect()
    }
}
