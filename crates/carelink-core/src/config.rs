use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Builds a config from an inline TOML document (tests, embedding hosts).
    pub fn from_toml_str(toml: &str) -> Self {
        Self { figment: Figment::new().merge(Toml::string(toml)) }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Like `get`, but a missing section yields `T::default()`. A section
    /// that is present and malformed is still an error.
    pub fn get_or_default<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        if self.figment.contains(key) { self.get(key) } else { Ok(T::default()) }
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        let search: SearchSettings = self.get_or_default("search")?;
        search.validate()?;
        match env {
            "prod" | "production" => {
                let embedding: EmbeddingSettings = self.get_or_default("embedding")?;
                if embedding.use_fake {
                    return Err(Error::InvalidConfig("embedding.use_fake is not allowed in production".into()).into());
                }
            }
            "dev" | "development" => {}
            "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

/// Per-field keyword weights. Synonym-only matches are scaled by
/// `synonym_factor`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub name: f32,
    pub synthetic_query: f32,
    pub category: f32,
    pub description: f32,
    pub eligibility: f32,
    pub synonym_factor: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self { name: 30.0, synthetic_query: 25.0, category: 20.0, description: 10.0, eligibility: 5.0, synonym_factor: 0.5 }
    }
}

/// `[search]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub debounce_ms: u64,
    pub fuzzy_max_distance: usize,
    pub default_limit: usize,
    /// Share of the vector similarity in the phase-2 blend (0..=1).
    pub blend_weight: f32,
    /// Cosine similarity at which a result earns "Semantic Match".
    pub semantic_threshold: f32,
    pub proximity_weight: f32,
    pub proximity_radius_km: f64,
    pub weights: ScoringWeights,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 150,
            fuzzy_max_distance: 2,
            default_limit: 50,
            blend_weight: 0.6,
            semantic_threshold: 0.35,
            proximity_weight: 10.0,
            proximity_radius_km: 25.0,
            weights: ScoringWeights::default(),
        }
    }
}

impl SearchSettings {
    pub fn validate(&self) -> crate::error::Result<()> {
        if !(0.0..=1.0).contains(&self.blend_weight) {
            return Err(Error::InvalidConfig(format!("search.blend_weight must be in 0..=1, got {}", self.blend_weight)));
        }
        if self.default_limit == 0 {
            return Err(Error::InvalidConfig("search.default_limit must be positive".into()));
        }
        if self.proximity_radius_km < 0.0 {
            return Err(Error::InvalidConfig("search.proximity_radius_km must not be negative".into()));
        }
        Ok(())
    }
}

/// `[data]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub catalog_path: String,
    pub vector_cache_path: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { catalog_path: "data/services.json".into(), vector_cache_path: "~/.cache/carelink/vectors.sqlite3".into() }
    }
}

/// `[embedding]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_dir: Option<String>,
    pub use_fake: bool,
    /// Entries kept in the in-memory tier of the vector cache.
    pub cache_capacity: usize,
    pub warm_batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { model_dir: None, use_fake: false, cache_capacity: 512, warm_batch_size: 32 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
