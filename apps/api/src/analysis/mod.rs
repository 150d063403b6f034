// Analysis engine: normalization, structure, lexical signals, similarity and
// scoring, plus the `Analyzer` facade that runs one full analysis.
// Pure and synchronous; callers in async contexts use spawn_blocking.

pub mod config;
pub mod handlers;
pub mod normalizer;
pub mod scoring;
pub mod signals;
pub mod similarity;
pub mod structure;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::analysis::config::{AnalyzerConfig, ConfigError, ScoringOverrides};
use crate::analysis::normalizer::{normalize, normalize_optional};
use crate::analysis::scoring::{ScoreBreakdown, ScoringEngine};
use crate::analysis::signals::WeakPhraseHit;
use crate::annotation::highlighter::{
    AnnotatableDocument, DocumentRenderer, HighlightSpan, RenderError, TextHighlighter,
};
use crate::annotation::rules::{build_highlight_rules, HighlightRule};
use crate::suggestions::generator::generate_suggestions;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid scoring overrides: {0}")]
    Config(#[from] ConfigError),

    #[error("Highlighting failed: {0}")]
    Render(#[from] RenderError),
}

/// Input to one analysis run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisRequest {
    pub resume_text: String,
    #[serde(default)]
    pub jd_text: Option<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub overrides: ScoringOverrides,
    #[serde(default)]
    pub include_diagnostics: bool,
}

/// Everything one analysis produces, before suggestion classification.
#[derive(Debug, Clone, Serialize)]
pub struct Analysis {
    pub scores: ScoreBreakdown,
    pub suggestions: Vec<String>,
    pub weak_phrases: Vec<WeakPhraseHit>,
    pub highlight_rules: Vec<HighlightRule>,
    pub highlights: Vec<HighlightSpan>,
}

/// Engine built once from configuration and shared across requests.
pub struct Analyzer {
    config: AnalyzerConfig,
    engine: ScoringEngine,
    renderer: TextHighlighter,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Result<Self, ConfigError> {
        config.scoring.validate()?;
        let engine = ScoringEngine::new(&config)?;
        Ok(Self {
            config,
            engine,
            renderer: TextHighlighter,
        })
    }

    pub fn analyse(&self, request: &AnalysisRequest) -> Result<Analysis, AnalysisError> {
        let policy = request.overrides.apply(&self.config.scoring)?;
        let jd_text = request.jd_text.as_deref();

        let scores = self.engine.compute(
            &request.resume_text,
            jd_text,
            &policy,
            &request.required_skills,
            request.include_diagnostics,
        );

        let text = normalize(&request.resume_text);
        let weak_phrases = self.engine.signals().weak_phrases(&text);
        let highlight_rules =
            build_highlight_rules(&weak_phrases, &scores.bullets, self.engine.signals());

        let annotated = self
            .renderer
            .apply_highlights(&AnnotatableDocument::text(text.into_string()), &highlight_rules)?;

        let has_jd = !normalize_optional(jd_text).is_empty();
        let suggestions = generate_suggestions(
            &scores,
            &weak_phrases,
            has_jd,
            &policy.length,
            &self.config.suggestions,
        );

        debug!(
            final_score = scores.final_score,
            suggestions = suggestions.len(),
            rules = highlight_rules.len(),
            "Analysis complete"
        );

        Ok(Analysis {
            scores,
            suggestions,
            weak_phrases,
            highlight_rules,
            highlights: annotated.spans,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::config::Weights;
    use crate::annotation::rules::Severity;

    fn analyzer() -> Analyzer {
        Analyzer::new(AnalyzerConfig::default()).unwrap()
    }

    fn request(resume: &str) -> AnalysisRequest {
        AnalysisRequest {
            resume_text: resume.to_string(),
            ..AnalysisRequest::default()
        }
    }

    #[test]
    fn test_weak_bullet_flows_through_every_output() {
        let analysis = analyzer()
            .analyse(&request(
                "• Built a pipeline that reduced latency by 40%\n• helped with various tasks",
            ))
            .unwrap();

        let phrases: Vec<&str> = analysis.weak_phrases.iter().map(|h| h.phrase.as_str()).collect();
        assert_eq!(phrases, vec!["helped with", "various tasks"]);

        assert!(analysis
            .highlight_rules
            .iter()
            .any(|r| r.phrase == "helped with" && r.severity == Severity::WeakPhrase));
        assert!(analysis
            .highlight_rules
            .iter()
            .any(|r| r.phrase == "helped with various tasks" && r.severity == Severity::ActionMissing));

        assert!(analysis.highlights.iter().all(|s| s.severity == Severity::WeakPhrase));
        assert_eq!(analysis.highlights.len(), 2);
        assert!(analysis
            .suggestions
            .iter()
            .any(|s| s == "Weak phrases detected: helped with, various tasks"));
    }

    #[test]
    fn test_overrides_change_the_score() {
        let resume = "Summary\n• Led 3 migrations\n• Wrote docs";
        let base = analyzer().analyse(&request(resume)).unwrap();

        let mut weighted = request(resume);
        weighted.overrides.weights = Some(Weights {
            section: 0.0,
            keyword: 0.0,
            action: 1.0,
            metric: 0.0,
            length: 0.0,
        });
        let action_only = analyzer().analyse(&weighted).unwrap();

        assert_eq!(action_only.scores.final_score, 50.0);
        assert_ne!(action_only.scores.final_score, base.scores.final_score);
    }

    #[test]
    fn test_invalid_overrides_rejected() {
        let mut bad = request("Summary");
        bad.overrides.max_final_score = Some(150.0);
        assert!(matches!(
            analyzer().analyse(&bad),
            Err(AnalysisError::Config(ConfigError::InvalidMaxScore))
        ));
    }

    #[test]
    fn test_diagnostics_flag_controls_explanation() {
        let mut req = request("Summary\n• Led 3 migrations");
        assert!(analyzer().analyse(&req).unwrap().scores.explanation.is_none());
        req.include_diagnostics = true;
        assert!(analyzer().analyse(&req).unwrap().scores.explanation.is_some());
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let req: AnalysisRequest =
            serde_json::from_str(r#"{"resume_text": "Summary", "overrides": {"max_final_score": 90}}"#)
                .unwrap();
        assert!(req.jd_text.is_none());
        assert!(req.required_skills.is_empty());
        assert_eq!(req.overrides.max_final_score, Some(90.0));
        assert!(!req.include_diagnostics);
    }

    #[test]
    fn test_invalid_config_rejected_at_startup() {
        let mut config = AnalyzerConfig::default();
        config.scoring.max_final_score = 0.0;
        assert!(matches!(Analyzer::new(config), Err(ConfigError::InvalidMaxScore)));
    }
}
