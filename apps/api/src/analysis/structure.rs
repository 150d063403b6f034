//! Bullet items and declared section headers.

use regex::Regex;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use tracing::debug;

use crate::analysis::config::{ConfigError, Vocabulary};

/// One extracted list item, glyph stripped, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bullet {
    pub position: usize,
    pub text: String,
}

/// Presence flag per expected section, in vocabulary order.
/// Serializes as a JSON object whose keys keep that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionFound(Vec<(String, bool)>);

impl SectionFound {
    pub fn get(&self, section: &str) -> Option<bool> {
        self.0
            .iter()
            .find(|(name, _)| name == section)
            .map(|(_, found)| *found)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.0.iter().map(|(name, found)| (name.as_str(), *found))
    }

    pub fn missing(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, found)| !found)
            .map(|(name, _)| name)
            .collect()
    }

    pub fn found_count(&self) -> usize {
        self.0.iter().filter(|(_, found)| *found).count()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SectionFound {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, found) in &self.0 {
            map.serialize_entry(name, found)?;
        }
        map.end()
    }
}

/// Detects bullets and section headers in a line-preserving document view.
pub struct StructureExtractor {
    glyphs: Vec<char>,
    ascii_markers: Vec<char>,
    sections: Vec<(String, Regex)>,
}

impl StructureExtractor {
    pub fn new(vocabulary: &Vocabulary) -> Result<Self, ConfigError> {
        let sections = vocabulary
            .expected_sections
            .iter()
            .map(|section| {
                let pattern = format!(r"(?i)^{}\b", regex::escape(section.trim()));
                Regex::new(&pattern)
                    .map(|re| (section.clone(), re))
                    .map_err(|source| ConfigError::Pattern {
                        phrase: section.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            glyphs: vocabulary.bullet_glyphs.clone(),
            ascii_markers: vocabulary.ascii_markers.clone(),
            sections,
        })
    }

    fn is_glyph(&self, ch: char) -> bool {
        self.glyphs.contains(&ch)
    }

    fn is_marker(&self, ch: char) -> bool {
        self.glyphs.contains(&ch) || self.ascii_markers.contains(&ch)
    }

    /// Extracts bullets in document order.
    ///
    /// Glyph scan first; the line-based fallback only runs when the scan found
    /// nothing, so no item is ever counted twice.
    pub fn extract_bullets(&self, text: &str) -> Vec<Bullet> {
        let mut items: Vec<String> = text
            .split(['\n', '\r'])
            .flat_map(|line| self.scan_line(line))
            .collect();

        if items.is_empty() {
            items = self.fallback_items(text);
            if !items.is_empty() {
                debug!("Glyph scan found no bullets; line fallback found {}", items.len());
            }
        }

        items
            .into_iter()
            .enumerate()
            .map(|(position, text)| Bullet { position, text })
            .collect()
    }

    /// Primary strategy over one line: a glyph at line start or after whitespace
    /// opens an item that runs to the next glyph or the end of the line.
    fn scan_line(&self, line: &str) -> Vec<String> {
        let chars: Vec<char> = line.trim().chars().collect();
        let mut items = Vec::new();
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];
            let after_space = i == 0 || chars[i - 1].is_whitespace();
            let opens = (self.is_glyph(ch) && after_space)
                || (i == 0
                    && self.ascii_markers.contains(&ch)
                    && chars.get(1).is_some_and(|c| c.is_whitespace()));

            if !opens {
                i += 1;
                continue;
            }

            let start = i + 1;
            let mut end = start;
            while end < chars.len() && !self.is_glyph(chars[end]) {
                end += 1;
            }

            let body: String = chars[start..end].iter().collect();
            let body = collapse_whitespace(&body);
            if !body.is_empty() {
                items.push(body);
            }
            i = end;
        }

        items
    }

    /// Fallback strategy: any line whose first non-space character is a marker.
    fn fallback_items(&self, text: &str) -> Vec<String> {
        text.split(['\n', '\r'])
            .map(str::trim)
            .filter(|line| line.chars().next().is_some_and(|c| self.is_marker(c)))
            .map(|line| {
                line.trim_start_matches(|c: char| self.is_marker(c) || c.is_whitespace())
                    .trim()
            })
            .filter(|item| !item.is_empty())
            .map(collapse_whitespace)
            .collect()
    }

    /// Fraction of expected sections declared at the start of some line, plus
    /// the per-section flags. A name mid-sentence does not count.
    pub fn coverage_score(&self, text: &str) -> (f64, SectionFound) {
        let lines: Vec<&str> = text
            .split(['\n', '\r'])
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        let found = SectionFound(
            self.sections
                .iter()
                .map(|(name, pattern)| {
                    let present = lines.iter().any(|line| pattern.is_match(line));
                    (name.clone(), present)
                })
                .collect(),
        );

        let score = if found.is_empty() {
            0.0
        } else {
            found.found_count() as f64 / found.len() as f64
        };
        (score, found)
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
