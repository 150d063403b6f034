//! Plain-text renderer: locates each highlight rule in a text document and emits
//! non-overlapping, colour-tagged spans.

use std::collections::BTreeMap;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::analysis::normalizer::CharIndex;
use crate::annotation::rules::{HighlightRule, Severity};
use crate::ingest::DocumentFormat;

#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("{renderer} cannot annotate {format:?} documents")]
    WrongDocumentType {
        renderer: &'static str,
        format: DocumentFormat,
    },
}

/// A document handed to a renderer: its format and its extracted text.
#[derive(Debug, Clone)]
pub struct AnnotatableDocument {
    pub format: DocumentFormat,
    pub text: String,
}

impl AnnotatableDocument {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            format: DocumentFormat::Text,
            text: text.into(),
        }
    }
}

/// One highlighted region; `start`/`end` are character offsets into the text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighlightSpan {
    pub start: usize,
    pub end: usize,
    pub phrase: String,
    pub severity: Severity,
    pub color: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedDocument {
    pub text: String,
    pub spans: Vec<HighlightSpan>,
}

pub trait DocumentRenderer: Send + Sync {
    fn apply_highlights(
        &self,
        document: &AnnotatableDocument,
        rules: &[HighlightRule],
    ) -> Result<AnnotatedDocument, RenderError>;
}

/// Renderer for plain-text documents.
///
/// Rules are applied in the order given (the resolver emits the most severe
/// first); a match overlapping an already highlighted region is skipped, so no
/// character ever carries two colours.
pub struct TextHighlighter;

impl DocumentRenderer for TextHighlighter {
    fn apply_highlights(
        &self,
        document: &AnnotatableDocument,
        rules: &[HighlightRule],
    ) -> Result<AnnotatedDocument, RenderError> {
        if document.format != DocumentFormat::Text {
            return Err(RenderError::WrongDocumentType {
                renderer: "TextHighlighter",
                format: document.format,
            });
        }

        let text = &document.text;
        let index = CharIndex::new(text);
        let mut claimed = ClaimedRanges::default();
        let mut spans = Vec::new();

        for rule in rules {
            let Some(pattern) = literal_pattern(&rule.phrase) else {
                continue;
            };
            for m in pattern.find_iter(text) {
                if !claimed.claim(m.start(), m.end()) {
                    continue;
                }

                spans.push(HighlightSpan {
                    start: index.char_at(m.start()),
                    end: index.char_at(m.end()),
                    phrase: rule.phrase.clone(),
                    severity: rule.severity,
                    color: rule.severity.color(),
                });
            }
        }

        spans.sort_by_key(|s| s.start);
        debug!("Applied {} highlight spans from {} rules", spans.len(), rules.len());

        Ok(AnnotatedDocument {
            text: text.clone(),
            spans,
        })
    }
}

/// Disjoint byte ranges keyed by start. Disjointness means only the nearest
/// range on each side can overlap a candidate.
#[derive(Debug, Default)]
struct ClaimedRanges {
    ranges: BTreeMap<usize, usize>,
}

impl ClaimedRanges {
    /// Records `start..end` unless it overlaps a claimed range.
    fn claim(&mut self, start: usize, end: usize) -> bool {
        let before = self.ranges.range(..=start).next_back();
        if before.is_some_and(|(_, &e)| e > start) {
            return false;
        }
        let after = self.ranges.range(start..).next();
        if after.is_some_and(|(&s, _)| s < end) {
            return false;
        }
        self.ranges.insert(start, end);
        true
    }
}

/// Case-insensitive literal search tolerant of any whitespace run between words.
fn literal_pattern(phrase: &str) -> Option<Regex> {
    let words: Vec<String> = phrase.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }
    match Regex::new(&format!("(?i){}", words.join(r"\s+"))) {
        Ok(re) => Some(re),
        Err(e) => {
            debug!("Skipping highlight rule '{phrase}': {e}");
            None
        }
    }
}
