//! Scoring engine — five normalized sub-scores and one weighted final score.
//!
//! Algorithm (single pass, pure):
//! 1. normalize; extract bullets; word count = whitespace tokens
//! 2. section   = fraction of expected sections declared at a line start
//! 3. keyword   = TF-IDF cosine against the job description (0 without one)
//! 4. action / metric = fraction of bullets passing each check, or the
//!    configured fallbacks when no bullet was detected
//! 5. length    = banded word-count score
//! 6. final     = 100 × Σ(normalized weight × raw score), capped, rounded to 0.1

use serde::Serialize;
use tracing::debug;

use crate::analysis::config::{
    AnalyzerConfig, ConfigError, LengthBand, LengthPolicy, ScoringPolicy, Weights,
};
use crate::analysis::normalizer::{normalize, normalize_lines, normalize_optional};
use crate::analysis::signals::{
    contains_metric, estimate_experience_years, first_person_ratio, passive_voice_ratio,
    readability_scores, skill_coverage_score, BulletQualityStats, LexicalSignals, Readability,
};
use crate::analysis::similarity::SimilarityScorer;
use crate::analysis::structure::{Bullet, SectionFound, StructureExtractor};

/// Raw sub-scores, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RawScores {
    pub section: f64,
    pub keyword: f64,
    pub action: f64,
    pub metric: f64,
    pub length: f64,
}

/// How the action/metric scores were derived.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BulletAnalysis {
    NoBulletsFound {
        action_score_fallback: f64,
        metric_score_fallback: f64,
    },
    Flagged {
        total_bullets: usize,
        action_bullets: usize,
        metric_bullets: usize,
        action_flags: Vec<bool>,
        metric_flags: Vec<bool>,
    },
}

/// Diagnostics only; never feeds back into the score.
#[derive(Debug, Clone, Serialize)]
pub struct Explanation {
    pub weights_used: Weights,
    pub raw_scores: RawScores,
    pub length_policy: LengthPolicy,
    pub length_band: LengthBand,
    pub max_final_score: f64,
    pub bullet_analysis: BulletAnalysis,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreBreakdown {
    pub final_score: f64,
    pub section_score: f64,
    pub keyword_score: f64,
    pub action_score: f64,
    pub metric_score: f64,
    pub length_score: f64,
    pub word_count: usize,
    pub bullets_count: usize,
    pub section_found: SectionFound,
    pub bullets: Vec<Bullet>,
    pub readability: Readability,
    pub bullet_quality: BulletQualityStats,
    pub passive_voice_ratio: f64,
    pub first_person_ratio: f64,
    pub estimated_experience_years: u32,
    pub skill_coverage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
}

pub struct ScoringEngine {
    structure: StructureExtractor,
    signals: LexicalSignals,
    similarity: SimilarityScorer,
}

impl ScoringEngine {
    pub fn new(config: &AnalyzerConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            structure: StructureExtractor::new(&config.vocabulary)?,
            signals: LexicalSignals::new(
                &config.vocabulary,
                config.bullet_limits,
                config.snippet_radius,
            )?,
            similarity: SimilarityScorer::new(config.similarity),
        })
    }

    pub fn signals(&self) -> &LexicalSignals {
        &self.signals
    }

    /// Scores one résumé. Infallible for any input, including empty text.
    pub fn compute(
        &self,
        resume_text: &str,
        jd_text: Option<&str>,
        policy: &ScoringPolicy,
        required_skills: &[String],
        include_explanation: bool,
    ) -> ScoreBreakdown {
        let text = normalize(resume_text);
        let lines = normalize_lines(resume_text);
        let bullets = self.structure.extract_bullets(&lines);
        let word_count = text.word_count();

        let (section_raw, section_found) = self.structure.coverage_score(&lines);

        let jd = normalize_optional(jd_text);
        let keyword_raw = if jd.is_empty() {
            0.0
        } else {
            self.similarity.keyword_match_score(&text, &jd)
        };

        let (action_raw, metric_raw, bullet_analysis) = self.bullet_scores(&bullets, policy);

        let length_band = policy.length.band(word_count);
        let length_raw = policy.length.score(word_count);

        let raw = RawScores {
            section: section_raw,
            keyword: keyword_raw,
            action: action_raw,
            metric: metric_raw,
            length: length_raw,
        };
        let weights = policy.weights.normalized();
        let final_score = weighted_final(&raw, &weights, policy.max_final_score);

        debug!(
            word_count,
            bullets = bullets.len(),
            final_score,
            "Scored resume"
        );

        let explanation = include_explanation.then(|| Explanation {
            weights_used: weights,
            raw_scores: raw,
            length_policy: policy.length.clone(),
            length_band,
            max_final_score: policy.max_final_score,
            bullet_analysis,
        });

        ScoreBreakdown {
            final_score: round1(final_score),
            section_score: as_percent(raw.section),
            keyword_score: as_percent(raw.keyword),
            action_score: as_percent(raw.action),
            metric_score: as_percent(raw.metric),
            length_score: as_percent(raw.length),
            word_count,
            bullets_count: bullets.len(),
            section_found,
            readability: readability_scores(&text),
            bullet_quality: self.signals.bullet_quality_stats(&bullets),
            passive_voice_ratio: passive_voice_ratio(&text),
            first_person_ratio: first_person_ratio(&text),
            estimated_experience_years: estimate_experience_years(&text),
            skill_coverage: skill_coverage_score(&text, required_skills),
            bullets,
            explanation,
        }
    }

    fn bullet_scores(&self, bullets: &[Bullet], policy: &ScoringPolicy) -> (f64, f64, BulletAnalysis) {
        if bullets.is_empty() {
            let fallbacks = policy.bullet_fallbacks;
            debug!("No bullets detected; using fallback action/metric scores");
            return (
                fallbacks.action_score_no_bullets,
                fallbacks.metric_score_no_bullets,
                BulletAnalysis::NoBulletsFound {
                    action_score_fallback: fallbacks.action_score_no_bullets,
                    metric_score_fallback: fallbacks.metric_score_no_bullets,
                },
            );
        }

        let action_flags: Vec<bool> = bullets
            .iter()
            .map(|b| self.signals.starts_with_action_verb(&b.text))
            .collect();
        let metric_flags: Vec<bool> = bullets.iter().map(|b| contains_metric(&b.text)).collect();

        let total = bullets.len();
        let action_bullets = action_flags.iter().filter(|f| **f).count();
        let metric_bullets = metric_flags.iter().filter(|f| **f).count();

        (
            action_bullets as f64 / total as f64,
            metric_bullets as f64 / total as f64,
            BulletAnalysis::Flagged {
                total_bullets: total,
                action_bullets,
                metric_bullets,
                action_flags,
                metric_flags,
            },
        )
    }
}

/// 100 × weighted sum of raw scores, capped at `max_final_score`.
/// `weights` are expected to be normalized already.
pub fn weighted_final(raw: &RawScores, weights: &Weights, max_final_score: f64) -> f64 {
    let sum = raw.section * weights.section
        + raw.keyword * weights.keyword
        + raw.action * weights.action
        + raw.metric * weights.metric
        + raw.length * weights.length;
    (sum * 100.0).clamp(0.0, max_final_score)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn as_percent(raw: f64) -> f64 {
    round1(raw * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ScoringEngine {
        ScoringEngine::new(&AnalyzerConfig::default()).unwrap()
    }

    fn compute(resume: &str, jd: Option<&str>) -> ScoreBreakdown {
        engine().compute(resume, jd, &ScoringPolicy::default(), &[], false)
    }

    fn raw(section: f64, keyword: f64, action: f64, metric: f64, length: f64) -> RawScores {
        RawScores {
            section,
            keyword,
            action,
            metric,
            length,
        }
    }

    #[test]
    fn test_plain_short_resume_uses_fallbacks() {
        let resume = vec!["lorem"; 50].join(" ");
        let scores = compute(&resume, None);

        assert_eq!(scores.word_count, 50);
        assert_eq!(scores.bullets_count, 0);
        assert_eq!(scores.section_score, 0.0);
        assert_eq!(scores.keyword_score, 0.0);
        assert_eq!(scores.action_score, 30.0);
        assert_eq!(scores.metric_score, 20.0);
        assert_eq!(scores.length_score, 30.0);
        // 0.2*0.3 + 0.15*0.2 + 0.15*0.3 = 0.135
        assert_eq!(scores.final_score, 13.5);
    }

    #[test]
    fn test_two_bullets_half_action_half_metric() {
        let resume = "• Built a pipeline that reduced latency by 40%\n• helped with various tasks";
        let scores = compute(resume, Some(""));

        assert_eq!(scores.bullets_count, 2);
        assert_eq!(scores.action_score, 50.0);
        assert_eq!(scores.metric_score, 50.0);
        assert_eq!(scores.keyword_score, 0.0);
        assert_eq!(scores.bullets[1].text, "helped with various tasks");
    }

    #[test]
    fn test_empty_input_never_fails() {
        let scores = compute("", None);
        assert_eq!(scores.word_count, 0);
        assert!(scores.final_score >= 0.0 && scores.final_score <= 100.0);
        assert_eq!(scores.readability, Readability::default());
    }

    #[test]
    fn test_sections_detected_across_lines() {
        let scores = compute("Summary\nBackend engineer\nSkills: Rust\nEducation\nBSc", None);
        assert_eq!(scores.section_found.get("summary"), Some(true));
        assert_eq!(scores.section_found.get("skills"), Some(true));
        assert_eq!(scores.section_found.get("education"), Some(true));
        assert_eq!(scores.section_score, 25.0);
    }

    #[test]
    fn test_bare_carriage_returns_break_lines() {
        let scores = compute("Summary\rBackend engineer\rSkills: Rust\r- Led 3 teams\rEducation", None);
        assert_eq!(scores.section_found.get("summary"), Some(true));
        assert_eq!(scores.section_found.get("skills"), Some(true));
        assert_eq!(scores.section_found.get("education"), Some(true));
        assert_eq!(scores.bullets_count, 1);
        assert_eq!(scores.bullets[0].text, "Led 3 teams");
    }

    #[test]
    fn test_final_score_is_capped() {
        let policy = ScoringPolicy {
            max_final_score: 10.0,
            ..ScoringPolicy::default()
        };
        let resume = vec!["lorem"; 300].join(" ");
        let scores = engine().compute(&resume, None, &policy, &[], false);
        assert_eq!(scores.final_score, 10.0);
    }

    #[test]
    fn test_final_score_monotonic_in_each_sub_score() {
        let weights = Weights::default().normalized();
        let base = raw(0.4, 0.4, 0.4, 0.4, 0.4);
        let base_score = weighted_final(&base, &weights, 100.0);
        let bumps = [
            raw(0.9, 0.4, 0.4, 0.4, 0.4),
            raw(0.4, 0.9, 0.4, 0.4, 0.4),
            raw(0.4, 0.4, 0.9, 0.4, 0.4),
            raw(0.4, 0.4, 0.4, 0.9, 0.4),
            raw(0.4, 0.4, 0.4, 0.4, 0.9),
        ];
        for bumped in bumps {
            assert!(weighted_final(&bumped, &weights, 100.0) >= base_score);
        }
    }

    #[test]
    fn test_final_score_invariant_under_weight_scaling() {
        let resume = "Summary\n• Built a pipeline that reduced latency by 40%\n• helped with various tasks";
        let base = ScoringPolicy::default();
        let scaled = ScoringPolicy {
            weights: Weights {
                section: 2.0,
                keyword: 3.0,
                action: 2.0,
                metric: 1.5,
                length: 1.5,
            },
            ..ScoringPolicy::default()
        };
        let a = engine().compute(resume, None, &base, &[], false);
        let b = engine().compute(resume, None, &scaled, &[], false);
        assert_eq!(a.final_score, b.final_score);
    }

    #[test]
    fn test_all_scores_within_bounds() {
        let resume = "Summary\nExperience\n• Led 5 teams\n• Shipped 3x faster builds\n".repeat(200);
        let scores = compute(&resume, Some("Rust engineer leading teams shipping builds fast"));
        for s in [
            scores.final_score,
            scores.section_score,
            scores.keyword_score,
            scores.action_score,
            scores.metric_score,
            scores.length_score,
        ] {
            assert!((0.0..=100.0).contains(&s), "score out of range: {s}");
        }
    }

    #[test]
    fn test_explanation_only_when_requested() {
        let resume = "• Built a pipeline\n• helped with various tasks";
        let plain = engine().compute(resume, None, &ScoringPolicy::default(), &[], false);
        assert!(plain.explanation.is_none());
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json.get("explanation").is_none());

        let explained = engine().compute(resume, None, &ScoringPolicy::default(), &[], true);
        let explanation = explained.explanation.expect("explanation requested");
        assert_eq!(
            explanation.bullet_analysis,
            BulletAnalysis::Flagged {
                total_bullets: 2,
                action_bullets: 1,
                metric_bullets: 0,
                action_flags: vec![true, false],
                metric_flags: vec![false, false],
            }
        );
        assert_eq!(explained.final_score, plain.final_score);
    }

    #[test]
    fn test_required_skills_feed_skill_coverage() {
        let skills = vec!["rust".to_string(), "go".to_string()];
        let scores = engine().compute("Rust developer", None, &ScoringPolicy::default(), &skills, false);
        assert_eq!(scores.skill_coverage, 0.5);
    }
}
