//! Maps threshold breaches in a score breakdown to advice strings.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::analysis::config::LengthPolicy;
use crate::analysis::scoring::ScoreBreakdown;
use crate::analysis::signals::WeakPhraseHit;

/// Percent thresholds below which a sub-score triggers advice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionThresholds {
    /// Only applies when a job description was supplied.
    pub keyword_score: f64,
    pub action_score: f64,
    pub metric_score: f64,
    pub length_score: f64,
}

impl Default for SuggestionThresholds {
    fn default() -> Self {
        Self {
            keyword_score: 50.0,
            action_score: 60.0,
            metric_score: 40.0,
            length_score: 60.0,
        }
    }
}

/// Advice strings in a fixed order: sections, keywords, action verbs, metrics,
/// length, weak phrases.
pub fn generate_suggestions(
    scores: &ScoreBreakdown,
    weak_phrases: &[WeakPhraseHit],
    has_jd: bool,
    length: &LengthPolicy,
    thresholds: &SuggestionThresholds,
) -> Vec<String> {
    let mut suggestions = Vec::new();

    let missing = scores.section_found.missing();
    if !missing.is_empty() {
        suggestions.push(format!("Missing important sections: {}", missing.join(", ")));
    }

    if has_jd && scores.keyword_score < thresholds.keyword_score {
        suggestions.push(
            "Low keyword match - tailor resume more closely to the job description.".to_string(),
        );
    }

    if scores.action_score < thresholds.action_score {
        suggestions.push("More bullet points should start with action verbs.".to_string());
    }

    if scores.metric_score < thresholds.metric_score {
        suggestions.push("Add more measurable achievements (%, $, numbers).".to_string());
    }

    if scores.length_score < thresholds.length_score {
        if scores.word_count < length.min_wc {
            suggestions.push("Resume is too short - add more detail.".to_string());
        } else if scores.word_count > length.acceptable_max_wc {
            suggestions.push("Resume is too long - reduce irrelevant content.".to_string());
        }
    }

    if !weak_phrases.is_empty() {
        let phrases: BTreeSet<&str> = weak_phrases.iter().map(|h| h.phrase.as_str()).collect();
        suggestions.push(format!(
            "Weak phrases detected: {}",
            phrases.into_iter().collect::<Vec<_>>().join(", ")
        ));
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::config::{AnalyzerConfig, ScoringPolicy};
    use crate::analysis::scoring::ScoringEngine;

    fn breakdown(resume: &str, jd: Option<&str>) -> (ScoreBreakdown, Vec<WeakPhraseHit>) {
        let engine = ScoringEngine::new(&AnalyzerConfig::default()).unwrap();
        let scores = engine.compute(resume, jd, &ScoringPolicy::default(), &[], false);
        let hits = engine
            .signals()
            .weak_phrases(&crate::analysis::normalizer::normalize(resume));
        (scores, hits)
    }

    fn generate(resume: &str, jd: Option<&str>) -> Vec<String> {
        let (scores, hits) = breakdown(resume, jd);
        generate_suggestions(
            &scores,
            &hits,
            jd.is_some_and(|j| !j.trim().is_empty()),
            &LengthPolicy::default(),
            &SuggestionThresholds::default(),
        )
    }

    #[test]
    fn test_short_resume_gets_full_advice_set() {
        let suggestions = generate(
            "• Built a pipeline that reduced latency by 40%\n• helped with various tasks",
            None,
        );
        assert!(suggestions[0].starts_with("Missing important sections: summary, objective"));
        assert!(suggestions.contains(&"More bullet points should start with action verbs.".to_string()));
        assert!(suggestions.contains(&"Resume is too short - add more detail.".to_string()));
        assert_eq!(
            suggestions.last().map(String::as_str),
            Some("Weak phrases detected: helped with, various tasks")
        );
        // 50% metrics clears the 40% bar.
        assert!(!suggestions.iter().any(|s| s.starts_with("Add more measurable")));
    }

    #[test]
    fn test_keyword_advice_only_with_job_description() {
        let resume = "Pastry chef baking croissants every morning";
        let jd = "Senior Rust engineer building distributed systems";
        assert!(generate(resume, Some(jd)).iter().any(|s| s.starts_with("Low keyword match")));
        assert!(!generate(resume, None).iter().any(|s| s.starts_with("Low keyword match")));
    }

    #[test]
    fn test_long_resume_flagged_too_long() {
        let resume = vec!["lorem"; 1300].join(" ");
        let suggestions = generate(&resume, None);
        assert!(suggestions.contains(&"Resume is too long - reduce irrelevant content.".to_string()));
        assert!(!suggestions.iter().any(|s| s.contains("too short")));
    }

    #[test]
    fn test_weak_phrases_sorted_and_unique() {
        let suggestions = generate("team player. responsible for X. team player again.", None);
        assert_eq!(
            suggestions.last().map(String::as_str),
            Some("Weak phrases detected: responsible for, team player")
        );
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let (scores, hits) = breakdown("• Built a pipeline that reduced latency by 40%", None);
        let lenient = SuggestionThresholds {
            keyword_score: 0.0,
            action_score: 0.0,
            metric_score: 0.0,
            length_score: 0.0,
        };
        let suggestions =
            generate_suggestions(&scores, &hits, false, &LengthPolicy::default(), &lenient);
        assert_eq!(suggestions.len(), 1, "{suggestions:?}");
        assert!(suggestions[0].starts_with("Missing important sections"));
    }
}
