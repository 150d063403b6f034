//! Engine configuration: weights, length bands, fallbacks and vocabularies.
//!
//! Everything here is immutable for the duration of an analysis run. Defaults
//! reproduce the stock vocabularies and scoring policy; a JSON file can override
//! any subset of fields at startup, and callers can override the scoring policy
//! per request via `ScoringOverrides`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::suggestions::generator::SuggestionThresholds;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("weights must be finite and non-negative, with a positive sum")]
    InvalidWeights,

    #[error("length bands must satisfy min_wc <= optimal_max_wc <= acceptable_max_wc")]
    InvalidLengthBands,

    #[error("{0} must lie in [0, 1]")]
    ScoreOutOfRange(&'static str),

    #[error("max_final_score must lie in (0, 100]")]
    InvalidMaxScore,

    #[error("invalid pattern for '{phrase}': {source}")]
    Pattern {
        phrase: String,
        #[source]
        source: regex::Error,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// Scoring policy
// ────────────────────────────────────────────────────────────────────────────

/// Relative weight of each sub-score in the final score.
/// Need not sum to 1.0; `normalized()` rescales before use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub section: f64,
    pub keyword: f64,
    pub action: f64,
    pub metric: f64,
    pub length: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            section: 0.20,
            keyword: 0.30,
            action: 0.20,
            metric: 0.15,
            length: 0.15,
        }
    }
}

impl Weights {
    pub fn total(&self) -> f64 {
        self.section + self.keyword + self.action + self.metric + self.length
    }

    /// Rescales so the five weights sum to 1.0. A non-positive total falls back
    /// to equal weights.
    pub fn normalized(&self) -> Self {
        let total = self.total();
        if total <= 0.0 || !total.is_finite() {
            let equal = 1.0 / 5.0;
            return Self {
                section: equal,
                keyword: equal,
                action: equal,
                metric: equal,
                length: equal,
            };
        }
        Self {
            section: self.section / total,
            keyword: self.keyword / total,
            action: self.action / total,
            metric: self.metric / total,
            length: self.length / total,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let all = [self.section, self.keyword, self.action, self.metric, self.length];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) || self.total() <= 0.0 {
            return Err(ConfigError::InvalidWeights);
        }
        Ok(())
    }
}

/// Which length band a word count falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthBand {
    TooShort,
    Optimal,
    SlightlyLong,
    TooLong,
}

/// Word-count band boundaries and the score awarded per band.
///
/// Bands: `[0, min_wc)` too short, `[min_wc, optimal_max_wc]` optimal,
/// `(optimal_max_wc, acceptable_max_wc]` slightly long, above that too long.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LengthPolicy {
    pub min_wc: usize,
    pub optimal_max_wc: usize,
    pub acceptable_max_wc: usize,
    pub too_short_score: f64,
    pub optimal_score: f64,
    pub slightly_long_score: f64,
    pub too_long_score: f64,
}

impl Default for LengthPolicy {
    fn default() -> Self {
        Self {
            min_wc: 200,
            optimal_max_wc: 800,
            acceptable_max_wc: 1200,
            too_short_score: 0.30,
            optimal_score: 1.00,
            slightly_long_score: 0.70,
            too_long_score: 0.40,
        }
    }
}

impl LengthPolicy {
    pub fn band(&self, word_count: usize) -> LengthBand {
        if word_count < self.min_wc {
            LengthBand::TooShort
        } else if word_count <= self.optimal_max_wc {
            LengthBand::Optimal
        } else if word_count <= self.acceptable_max_wc {
            LengthBand::SlightlyLong
        } else {
            LengthBand::TooLong
        }
    }

    pub fn score(&self, word_count: usize) -> f64 {
        match self.band(word_count) {
            LengthBand::TooShort => self.too_short_score,
            LengthBand::Optimal => self.optimal_score,
            LengthBand::SlightlyLong => self.slightly_long_score,
            LengthBand::TooLong => self.too_long_score,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_wc > self.optimal_max_wc || self.optimal_max_wc > self.acceptable_max_wc {
            return Err(ConfigError::InvalidLengthBands);
        }
        check_unit("too_short_score", self.too_short_score)?;
        check_unit("optimal_score", self.optimal_score)?;
        check_unit("slightly_long_score", self.slightly_long_score)?;
        check_unit("too_long_score", self.too_long_score)
    }
}

/// Scores used for action/metric when no bullet could be detected. Missing
/// bullets may be an extraction artifact, so they are neither zero nor full credit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletFallbacks {
    pub action_score_no_bullets: f64,
    pub metric_score_no_bullets: f64,
}

impl Default for BulletFallbacks {
    fn default() -> Self {
        Self {
            action_score_no_bullets: 0.30,
            metric_score_no_bullets: 0.20,
        }
    }
}

/// Everything the weighted aggregation needs for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub weights: Weights,
    pub length: LengthPolicy,
    pub bullet_fallbacks: BulletFallbacks,
    pub max_final_score: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            length: LengthPolicy::default(),
            bullet_fallbacks: BulletFallbacks::default(),
            max_final_score: 100.0,
        }
    }
}

impl ScoringPolicy {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        self.length.validate()?;
        check_unit(
            "action_score_no_bullets",
            self.bullet_fallbacks.action_score_no_bullets,
        )?;
        check_unit(
            "metric_score_no_bullets",
            self.bullet_fallbacks.metric_score_no_bullets,
        )?;
        if !(self.max_final_score > 0.0 && self.max_final_score <= 100.0) {
            return Err(ConfigError::InvalidMaxScore);
        }
        Ok(())
    }
}

/// Per-request overrides merged on top of the configured policy.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringOverrides {
    #[serde(default)]
    pub weights: Option<Weights>,
    #[serde(default)]
    pub length: Option<LengthPolicy>,
    #[serde(default)]
    pub bullet_fallbacks: Option<BulletFallbacks>,
    #[serde(default)]
    pub max_final_score: Option<f64>,
}

impl ScoringOverrides {
    /// Returns the effective policy, rejecting overrides that break its invariants.
    pub fn apply(&self, base: &ScoringPolicy) -> Result<ScoringPolicy, ConfigError> {
        let policy = ScoringPolicy {
            weights: self.weights.unwrap_or(base.weights),
            length: self.length.clone().unwrap_or_else(|| base.length.clone()),
            bullet_fallbacks: self.bullet_fallbacks.unwrap_or(base.bullet_fallbacks),
            max_final_score: self.max_final_score.unwrap_or(base.max_final_score),
        };
        policy.validate()?;
        Ok(policy)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Vocabularies and detector limits
// ────────────────────────────────────────────────────────────────────────────

const WEAK_PHRASES: &[&str] = &[
    "responsible for",
    "worked on",
    "helped with",
    "assisted with",
    "participated in",
    "various tasks",
    "duties included",
    "hard-working",
    "team player",
    "result-oriented",
    "fast learner",
    "self-motivated",
    "detail-oriented",
    "go-getter",
    "out-of-the-box thinker",
    "dynamic individual",
    "highly motivated",
    "results driven",
];

const ACTION_VERBS: &[&str] = &[
    "achieved",
    "analyzed",
    "built",
    "created",
    "designed",
    "developed",
    "implemented",
    "led",
    "managed",
    "optimized",
    "reduced",
    "improved",
    "increased",
    "delivered",
    "launched",
    "owned",
    "resolved",
    "conducted",
    "orchestrated",
    "shipped",
    "enhanced",
    "automated",
    "deployed",
    "initiated",
    "executed",
    "streamlined",
    "facilitated",
    "coordinated",
    "negotiated",
    "mentored",
    "advised",
    "architected",
    "modernized",
];

const EXPECTED_SECTIONS: &[&str] = &[
    "summary",
    "objective",
    "experience",
    "work experience",
    "professional experience",
    "education",
    "skills",
    "projects",
    "certifications",
    "achievements",
    "publications",
    "awards",
];

/// Glyphs that open a bullet at line start or after whitespace.
const BULLET_GLYPHS: &[char] = &['•', '‣', '▪', '●', '◦', '·'];

/// ASCII markers that open a bullet only at line start, followed by whitespace.
const ASCII_MARKERS: &[char] = &['-', '*', '+'];

/// Word lists and glyph sets the detectors are built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    pub action_verbs: Vec<String>,
    pub weak_phrases: Vec<String>,
    pub expected_sections: Vec<String>,
    pub bullet_glyphs: Vec<char>,
    pub ascii_markers: Vec<char>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            action_verbs: to_owned(ACTION_VERBS),
            weak_phrases: to_owned(WEAK_PHRASES),
            expected_sections: to_owned(EXPECTED_SECTIONS),
            bullet_glyphs: BULLET_GLYPHS.to_vec(),
            ascii_markers: ASCII_MARKERS.to_vec(),
        }
    }
}

/// Word-count limits used by bullet quality stats.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BulletLimits {
    /// Bullets with more words than this are "too long".
    pub too_long_words: usize,
    /// Bullets with fewer words than this are "too short".
    pub too_short_words: usize,
}

impl Default for BulletLimits {
    fn default() -> Self {
        Self {
            too_long_words: 40,
            too_short_words: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Vocabulary cap for the joint term vectors.
    pub max_features: usize,
    /// Job descriptions shorter than this carry too little signal to score.
    pub min_jd_words: usize,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            max_features: 5000,
            min_jd_words: 5,
        }
    }
}

/// Full engine configuration, built once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub scoring: ScoringPolicy,
    pub vocabulary: Vocabulary,
    pub bullet_limits: BulletLimits,
    pub similarity: SimilarityConfig,
    pub suggestions: SuggestionThresholds,
    /// Characters of context kept on each side of a weak-phrase hit.
    pub snippet_radius: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringPolicy::default(),
            vocabulary: Vocabulary::default(),
            bullet_limits: BulletLimits::default(),
            similarity: SimilarityConfig::default(),
            suggestions: SuggestionThresholds::default(),
            snippet_radius: 40,
        }
    }
}

impl AnalyzerConfig {
    /// Loads the defaults, overridden by the JSON file at `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read analyzer config {}", path.display()))?;
                serde_json::from_str::<AnalyzerConfig>(&raw)
                    .with_context(|| format!("Invalid analyzer config {}", path.display()))?
            }
            None => AnalyzerConfig::default(),
        };
        config
            .scoring
            .validate()
            .context("Invalid scoring policy in analyzer config")?;
        Ok(config)
    }
}

fn check_unit(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::ScoreOutOfRange(name))
    }
}

fn to_owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
