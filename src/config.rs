//! Configuration loaded with figment: defaults, then an optional TOML file,
//! then raw environment variables.
//!
//! Every tuning constant of the ranking engine lives in [`ScoringConfig`] so
//! it can be overridden without touching scoring code. Nested keys can be
//! set from the environment with a double underscore, e.g.
//! `SCORING__TOP_K=5` or `SCORING__WEIGHTS__RELEVANCE=0.5`.

use std::path::PathBuf;
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Deserializer, Serialize};

/// Environment variable naming the TOML file to merge.
pub const CONFIG_PATH_VAR: &str = "COMPASS_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "compass.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("weight '{name}' must be a finite, non-negative number (got {value})")]
    NegativeWeight { name: &'static str, value: f64 },
    #[error("weights must not all be zero")]
    ZeroWeights,
    #[error("'{name}' must be within 0.0-1.0 (got {value})")]
    OutOfUnitRange { name: &'static str, value: f64 },
    #[error("'{name}' must be positive (got {value})")]
    NotPositive { name: &'static str, value: f64 },
    #[error("top_k must be at least 1")]
    ZeroTopK,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_catalogue_path")]
    pub catalogue_path: PathBuf,
    /// Replacement taxonomy file; the built-in table is used when unset.
    #[serde(default)]
    pub taxonomy_path: Option<PathBuf>,
    /// Enables the embedding provider and roadmap generator when present.
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_generation_model")]
    pub generation_model: String,
    /// Timeout for each upstream provider call. Accepts `"30s"`, `"2m"`, or seconds.
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration"
    )]
    #[serde(serialize_with = "serialize_duration")]
    pub request_timeout: Duration,
    #[serde(default = "default_cache_capacity")]
    pub embedding_cache_capacity: usize,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            port: default_port(),
            catalogue_path: default_catalogue_path(),
            taxonomy_path: None,
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            embedding_model: default_embedding_model(),
            generation_model: default_generation_model(),
            request_timeout: default_request_timeout(),
            embedding_cache_capacity: default_cache_capacity(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl Config {
    /// Build the figment used by [`Config::load`].
    pub fn figment() -> Figment {
        let path =
            std::env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::raw().split("__"))
    }

    /// Extract and validate the configuration.
    pub fn load() -> anyhow::Result<Self> {
        use anyhow::Context;

        let config: Config = Self::figment()
            .extract()
            .context("Failed to extract configuration")?;
        config
            .scoring
            .validate()
            .context("Invalid scoring configuration")?;
        Ok(config)
    }

    /// The API key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.openai_api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Relative weight of each factor in the combined score.
///
/// These are proportions: the combiner adjusts them per request and always
/// renormalizes to a sum of 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub relevance: f64,
    pub embedding: f64,
    pub grade: f64,
    pub prereq: f64,
    pub location: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            relevance: 0.35,
            embedding: 0.25,
            grade: 0.20,
            prereq: 0.15,
            location: 0.05,
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.relevance + self.embedding + self.grade + self.prereq + self.location
    }

    fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("relevance", self.relevance),
            ("embedding", self.embedding),
            ("grade", self.grade),
            ("prereq", self.prereq),
            ("location", self.location),
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.named() {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::NegativeWeight { name, value });
            }
        }
        if self.sum() <= 0.0 {
            return Err(ConfigError::ZeroWeights);
        }
        Ok(())
    }
}

/// Thresholds, multipliers, and bonuses used by the scorers.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weights: ScoringWeights,
    /// Default result count for a search.
    pub top_k: usize,
    /// Programs whose relevance falls below this are filtered from results.
    pub min_relevance: f64,
    /// Below this relevance the combined score is multiplied by relevance.
    pub low_relevance_cutoff: f64,

    /// Interest token → field fuzzy acceptance.
    pub field_fuzzy: f64,
    /// Interest word → program name match when no field was detected.
    pub name_fuzzy: f64,
    /// Field keyword → program name fuzzy match.
    pub keyword_fuzzy: f64,
    /// Interest word → single program-name word match that earns a bonus.
    pub strong_word_fuzzy: f64,

    pub stem_irrelevant_penalty: f64,
    pub non_stem_irrelevant_penalty: f64,

    /// Credit for an exact field keyword in the program name.
    pub keyword_hit: f64,
    /// Credit for a fuzzy field keyword in the program name.
    pub fuzzy_keyword_hit: f64,
    /// Credit for a field keyword in the prerequisites.
    pub prereq_keyword_hit: f64,
    /// Credit per fuzzy name hit when no field was detected.
    pub name_fuzzy_hit: f64,
    pub verbatim_word_bonus: f64,
    pub co_op_bonus: f64,
    pub strong_word_bonus: f64,

    /// Steepness of the grade-fit sigmoid.
    pub sigmoid_k: f64,
    pub competitive_boost: f64,
    /// Average surplus beyond which the overqualification discount applies.
    pub overqualified_delta: f64,
    pub overqualified_discount: f64,
    /// Multiplier when every required prerequisite is covered.
    pub prereq_complete_bonus: f64,

    /// Characters of query text used as the embedding cache key.
    pub cache_key_chars: usize,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weights: ScoringWeights::default(),
            top_k: 10,
            min_relevance: 0.1,
            low_relevance_cutoff: 0.3,
            field_fuzzy: 0.75,
            name_fuzzy: 0.6,
            keyword_fuzzy: 0.7,
            strong_word_fuzzy: 0.8,
            stem_irrelevant_penalty: 0.05,
            non_stem_irrelevant_penalty: 0.2,
            keyword_hit: 1.0,
            fuzzy_keyword_hit: 0.7,
            prereq_keyword_hit: 0.3,
            name_fuzzy_hit: 0.5,
            verbatim_word_bonus: 0.5,
            co_op_bonus: 0.2,
            strong_word_bonus: 0.3,
            sigmoid_k: 0.25,
            competitive_boost: 1.1,
            overqualified_delta: 20.0,
            overqualified_discount: 0.95,
            prereq_complete_bonus: 1.1,
            cache_key_chars: 100,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        if self.top_k == 0 {
            return Err(ConfigError::ZeroTopK);
        }

        let unit = [
            ("min_relevance", self.min_relevance),
            ("low_relevance_cutoff", self.low_relevance_cutoff),
            ("field_fuzzy", self.field_fuzzy),
            ("name_fuzzy", self.name_fuzzy),
            ("keyword_fuzzy", self.keyword_fuzzy),
            ("strong_word_fuzzy", self.strong_word_fuzzy),
            ("stem_irrelevant_penalty", self.stem_irrelevant_penalty),
            ("non_stem_irrelevant_penalty", self.non_stem_irrelevant_penalty),
            ("overqualified_discount", self.overqualified_discount),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { name, value });
            }
        }

        let positive = [
            ("sigmoid_k", self.sigmoid_k),
            ("competitive_boost", self.competitive_boost),
            ("prereq_complete_bonus", self.prereq_complete_bonus),
            ("cache_key_chars", self.cache_key_chars as f64),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        Ok(())
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_catalogue_path() -> PathBuf {
    PathBuf::from("data/programs.json")
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_cache_capacity() -> usize {
    256
}

/// Accepts either a number of seconds or a human duration string (`"30s"`, `"2m"`).
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format!("{}s", duration.as_secs_f64()))
}

/// Parse a human duration string such as `"30s"`, `"1.5m"`, or `"250ms"`.
pub fn parse_duration(text: &str) -> Result<Duration, String> {
    let parser = fundu::DurationParser::with_all_time_units();
    let parsed = parser
        .parse(text.trim())
        .map_err(|e| format!("invalid duration '{text}': {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration '{text}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Serialized;

    #[test]
    fn default_weights_sum_to_one() {
        let weights = ScoringWeights::default();
        assert!((weights.sum() - 1.0).abs() < 1e-9);
        assert!(weights.validate().is_ok());
    }

    #[test]
    fn default_scoring_config_is_valid() {
        assert!(ScoringConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_negative_weight() {
        let weights = ScoringWeights {
            grade: -0.1,
            ..Default::default()
        };
        assert!(matches!(
            weights.validate(),
            Err(ConfigError::NegativeWeight { name: "grade", .. })
        ));
    }

    #[test]
    fn rejects_all_zero_weights() {
        let weights = ScoringWeights {
            relevance: 0.0,
            embedding: 0.0,
            grade: 0.0,
            prereq: 0.0,
            location: 0.0,
        };
        assert!(matches!(weights.validate(), Err(ConfigError::ZeroWeights)));
    }

    #[test]
    fn rejects_threshold_outside_unit_range() {
        let config = ScoringConfig {
            field_fuzzy: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfUnitRange {
                name: "field_fuzzy",
                ..
            })
        ));
    }

    #[test]
    fn parse_duration_accepts_units() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn partial_scoring_table_keeps_defaults() {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::string(
                r#"
                port = 9000
                request_timeout = "5s"

                [scoring]
                top_k = 3

                [scoring.weights]
                relevance = 0.5
                "#,
            ))
            .extract()
            .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.scoring.top_k, 3);
        assert_eq!(config.scoring.weights.relevance, 0.5);
        assert_eq!(config.scoring.weights.embedding, 0.25);
        assert_eq!(config.scoring.min_relevance, 0.1);
    }

    #[test]
    fn blank_api_key_is_ignored() {
        let config = Config {
            openai_api_key: Some("  ".into()),
            ..Default::default()
        };
        assert_eq!(config.api_key(), None);
    }
}
