//! Resolves findings into one highlight rule per distinct normalized phrase,
//! carrying the most severe classification any finding gave it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::analysis::normalizer::normalize;
use crate::analysis::signals::{contains_metric, LexicalSignals, WeakPhraseHit};
use crate::analysis::structure::Bullet;

/// Phrases shorter than this (in normalized characters) are noise.
const MIN_PHRASE_CHARS: usize = 3;

/// Ordered least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    MetricMissing,
    ActionMissing,
    WeakPhrase,
}

impl Severity {
    /// Upgrade-only merge. Commutative and idempotent.
    pub fn merge(self, other: Severity) -> Severity {
        self.max(other)
    }

    /// Highlight colour a renderer should use.
    pub fn color(self) -> &'static str {
        match self {
            Severity::WeakPhrase => "red",
            Severity::ActionMissing => "yellow",
            Severity::MetricMissing => "turquoise",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRule {
    pub phrase: String,
    pub severity: Severity,
}

/// Merges findings keyed by normalized, lower-cased phrase text.
#[derive(Debug, Default)]
struct RuleSet {
    rules: HashMap<String, Severity>,
}

impl RuleSet {
    fn assign(&mut self, text: &str, severity: Severity) {
        let key = normalize(text).as_str().to_lowercase();
        if key.chars().count() < MIN_PHRASE_CHARS {
            return;
        }
        self.rules
            .entry(key)
            .and_modify(|current| *current = current.merge(severity))
            .or_insert(severity);
    }

    /// Most severe first, then alphabetical.
    fn into_rules(self) -> Vec<HighlightRule> {
        let mut rules: Vec<HighlightRule> = self
            .rules
            .into_iter()
            .map(|(phrase, severity)| HighlightRule { phrase, severity })
            .collect();
        rules.sort_by(|a, b| b.severity.cmp(&a.severity).then_with(|| a.phrase.cmp(&b.phrase)));
        rules
    }
}

/// Weak phrases first, then bullets without an action verb, then bullets
/// without a metric. Every pass only ever upgrades an existing entry.
pub fn build_highlight_rules(
    weak_phrase_hits: &[WeakPhraseHit],
    bullets: &[Bullet],
    signals: &LexicalSignals,
) -> Vec<HighlightRule> {
    let mut set = RuleSet::default();

    for hit in weak_phrase_hits {
        set.assign(&hit.phrase, Severity::WeakPhrase);
    }
    for bullet in bullets.iter().filter(|b| !signals.starts_with_action_verb(&b.text)) {
        set.assign(&bullet.text, Severity::ActionMissing);
    }
    for bullet in bullets.iter().filter(|b| !contains_metric(&b.text)) {
        set.assign(&bullet.text, Severity::MetricMissing);
    }

    set.into_rules()
}
