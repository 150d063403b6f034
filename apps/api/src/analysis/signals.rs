//! Pure predicates and metrics over a span of text.
//!
//! Nothing here looks at the whole document except where a function says so.
//! Vocabulary-driven detectors (action verbs, weak phrases) live on
//! `LexicalSignals`, built once from the configured `Vocabulary`; the rest are
//! free functions.

use std::collections::{BTreeSet, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::config::{BulletLimits, ConfigError, Vocabulary};
use crate::analysis::normalizer::{normalize, CharIndex};
use crate::analysis::structure::Bullet;

// Bare integers count as metrics, so "3 team members" is flagged as quantified.
// Known precision/recall trade-off: over-flags plain counts.
static METRIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \b\d{1,3}(?:,\d{3})*(?:\.\d+)?\s*(?:%|percent|pts?|x)?\b
        |
        \b\d+(?:\.\d+)?\s*(?:k|m|b)\b
        |
        \$\s*\d{1,3}(?:,\d{3})*(?:\.\d+)?
        ",
    )
    .expect("metric pattern is valid")
});

static PASSIVE_VOICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:was|were|is|are|been|be|being)\s+\w+ed\b")
        .expect("passive voice pattern is valid")
});

static FIRST_PERSON_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:i|me|my|we|our|us)\b").expect("first person pattern is valid")
});

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(19[89]\d|20[0-4]\d)\b").expect("year pattern is valid"));

/// Year spans wider than this are treated as noise (e.g. a birth year).
const MAX_EXPERIENCE_SPAN: u32 = 45;

/// A weak phrase found in the normalized text. `start`/`end` are character offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeakPhraseHit {
    pub phrase: String,
    pub start: usize,
    pub end: usize,
    pub snippet: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BulletQualityStats {
    pub avg_length_words: f64,
    pub pct_with_action_verb: f64,
    pub pct_with_metric: f64,
    pub pct_too_long: f64,
    pub pct_too_short: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Readability {
    pub flesch_reading_ease: f64,
    pub flesch_kincaid_grade: f64,
}

/// Vocabulary-driven detectors, compiled once per configuration.
pub struct LexicalSignals {
    action_verbs: HashSet<String>,
    weak_patterns: Vec<(String, Regex)>,
    strip_chars: Vec<char>,
    limits: BulletLimits,
    snippet_radius: usize,
}

impl LexicalSignals {
    pub fn new(
        vocabulary: &Vocabulary,
        limits: BulletLimits,
        snippet_radius: usize,
    ) -> Result<Self, ConfigError> {
        let action_verbs = vocabulary
            .action_verbs
            .iter()
            .map(|v| v.trim().to_lowercase())
            .filter(|v| !v.is_empty())
            .collect();

        let weak_patterns = vocabulary
            .weak_phrases
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|phrase| {
                phrase_pattern(phrase)
                    .map(|re| (phrase.to_string(), re))
                    .map_err(|source| ConfigError::Pattern {
                        phrase: phrase.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let strip_chars = vocabulary
            .bullet_glyphs
            .iter()
            .chain(vocabulary.ascii_markers.iter())
            .copied()
            .collect();

        Ok(Self {
            action_verbs,
            weak_patterns,
            strip_chars,
            limits,
            snippet_radius,
        })
    }

    /// True when the first token, glyphs and punctuation stripped, is a known action verb.
    pub fn starts_with_action_verb(&self, text: &str) -> bool {
        let stripped =
            text.trim_start_matches(|c: char| c.is_whitespace() || self.strip_chars.contains(&c));

        let Some(first) = stripped.split_whitespace().next() else {
            return false;
        };

        let token: String = first
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '\'')
            .collect::<String>()
            .to_lowercase();

        self.action_verbs.contains(&token)
    }

    /// Every weak-phrase occurrence, phrase by phrase in vocabulary order.
    /// Duplicate (phrase, start, end) triples are reported once.
    pub fn weak_phrases(&self, text: &str) -> Vec<WeakPhraseHit> {
        if text.is_empty() {
            return Vec::new();
        }

        let index = CharIndex::new(text);
        let mut seen = HashSet::new();
        let mut hits = Vec::new();

        for (phrase, pattern) in &self.weak_patterns {
            for m in pattern.find_iter(text) {
                let start = index.char_at(m.start());
                let end = index.char_at(m.end());

                if !seen.insert((phrase.clone(), start, end)) {
                    continue;
                }

                hits.push(WeakPhraseHit {
                    phrase: phrase.clone(),
                    start,
                    end,
                    snippet: snippet(text, &index, start, end, self.snippet_radius),
                });
            }
        }

        if !hits.is_empty() {
            debug!("Found {} weak phrase hits", hits.len());
        }
        hits
    }

    pub fn bullet_quality_stats(&self, bullets: &[Bullet]) -> BulletQualityStats {
        if bullets.is_empty() {
            return BulletQualityStats::default();
        }

        let total = bullets.len() as f64;
        let lengths: Vec<usize> = bullets
            .iter()
            .map(|b| b.text.split_whitespace().count())
            .collect();

        let with_action = bullets
            .iter()
            .filter(|b| self.starts_with_action_verb(&b.text))
            .count();
        let with_metric = bullets.iter().filter(|b| contains_metric(&b.text)).count();
        let too_long = lengths
            .iter()
            .filter(|&&n| n > self.limits.too_long_words)
            .count();
        let too_short = lengths
            .iter()
            .filter(|&&n| n < self.limits.too_short_words)
            .count();

        BulletQualityStats {
            avg_length_words: lengths.iter().sum::<usize>() as f64 / total,
            pct_with_action_verb: with_action as f64 / total,
            pct_with_metric: with_metric as f64 / total,
            pct_too_long: too_long as f64 / total,
            pct_too_short: too_short as f64 / total,
        }
    }
}

/// Case-insensitive whole-phrase pattern: internal whitespace matches any
/// whitespace run, an internal hyphen matches a hyphen or whitespace.
pub(crate) fn phrase_pattern(phrase: &str) -> Result<Regex, regex::Error> {
    let body = phrase
        .split_whitespace()
        .map(|word| {
            word.split('-')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"(?:-|\s+)")
        })
        .collect::<Vec<_>>()
        .join(r"\s+");

    let starts_word = phrase.chars().next().is_some_and(is_word_char);
    let ends_word = phrase.chars().last().is_some_and(is_word_char);

    Regex::new(&format!(
        "(?i){}{}{}",
        if starts_word { r"\b" } else { "" },
        body,
        if ends_word { r"\b" } else { "" },
    ))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `radius` characters of context on both sides of a char span, trimmed.
fn snippet(text: &str, index: &CharIndex, start: usize, end: usize, radius: usize) -> String {
    let from = index.byte_at(start.saturating_sub(radius));
    let to = index.byte_at((end + radius).min(index.char_len()));
    text[from..to].trim().to_string()
}

/// True if the text holds a numeric quantity: percentages, multipliers,
/// k/m/b scales, currency amounts, or a bare number.
pub fn contains_metric(text: &str) -> bool {
    !text.is_empty() && METRIC_RE.is_match(text)
}

/// Splits after a terminal `.`, `!` or `?` that is followed by whitespace.
pub fn split_into_sentences(text: &str) -> Vec<String> {
    let text = normalize(text);
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);
        let at_boundary =
            matches!(ch, '.' | '!' | '?') && chars.peek().is_some_and(|c| c.is_whitespace());
        if at_boundary {
            let sentence = current.trim();
            if !sentence.is_empty() {
                sentences.push(sentence.to_string());
            }
            current.clear();
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }
    sentences
}

/// Vowel-group syllable estimate; a trailing silent `e` is discounted while the
/// count stays positive. Words without letters count zero.
pub fn count_syllables(word: &str) -> usize {
    let letters: Vec<char> = word
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase())
        .collect();
    if letters.is_empty() {
        return 0;
    }

    let mut count = 0;
    let mut prev_is_vowel = false;
    for ch in &letters {
        let is_vowel = matches!(ch, 'a' | 'e' | 'i' | 'o' | 'u' | 'y');
        if is_vowel && !prev_is_vowel {
            count += 1;
        }
        prev_is_vowel = is_vowel;
    }

    if letters.last() == Some(&'e') && count > 1 {
        count -= 1;
    }
    count.max(1)
}

/// Flesch reading ease and Flesch-Kincaid grade, rounded to two decimals.
pub fn readability_scores(text: &str) -> Readability {
    let sentences = split_into_sentences(text);
    let normalized = normalize(text);
    let words: Vec<&str> = normalized.split_whitespace().collect();

    if sentences.is_empty() || words.is_empty() {
        return Readability::default();
    }

    let words_per_sentence = words.len() as f64 / sentences.len() as f64;
    let syllables: usize = words.iter().map(|w| count_syllables(w)).sum();
    let syllables_per_word = syllables as f64 / words.len() as f64;

    Readability {
        flesch_reading_ease: round2(
            206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word,
        ),
        flesch_kincaid_grade: round2(0.39 * words_per_sentence + 11.8 * syllables_per_word - 15.59),
    }
}

pub fn passive_voice_ratio(text: &str) -> f64 {
    sentence_ratio(text, &PASSIVE_VOICE_RE)
}

pub fn first_person_ratio(text: &str) -> f64 {
    sentence_ratio(text, &FIRST_PERSON_RE)
}

fn sentence_ratio(text: &str, pattern: &Regex) -> f64 {
    let sentences = split_into_sentences(text);
    if sentences.is_empty() {
        return 0.0;
    }
    let matching = sentences.iter().filter(|s| pattern.is_match(s)).count();
    matching as f64 / sentences.len() as f64
}

/// Span between the earliest and latest plausible year (1980–2049) in the
/// whole text; zero with fewer than two distinct years or an implausible span.
pub fn estimate_experience_years(text: &str) -> u32 {
    let years: BTreeSet<u32> = YEAR_RE
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect();

    let (Some(&min), Some(&max)) = (years.first(), years.last()) else {
        return 0;
    };
    if years.len() < 2 || max <= min || max - min > MAX_EXPERIENCE_SPAN {
        return 0;
    }
    max - min
}

/// Fraction of required skills found as whole words/phrases in the text.
pub fn skill_coverage_score(text: &str, required_skills: &[String]) -> f64 {
    let skills: Vec<String> = required_skills
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    if skills.is_empty() {
        return 0.0;
    }

    let haystack = text.to_lowercase();
    let found = skills
        .iter()
        .filter(|skill| match phrase_pattern(skill) {
            Ok(pattern) => pattern.is_match(&haystack),
            Err(e) => {
                debug!("Skipping unmatchable skill '{skill}': {e}");
                false
            }
        })
        .count();

    found as f64 / skills.len() as f64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
