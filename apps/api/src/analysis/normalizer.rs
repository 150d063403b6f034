//! Text normalization — canonicalizes raw extracted text into the form every
//! downstream component assumes.
//!
//! Guarantees for a `NormalizedText`:
//! - no control characters (below U+0020, or U+007F)
//! - no run of more than one whitespace character
//! - typographic quotes and dashes mapped to their ASCII equivalents
//! - no leading or trailing whitespace

use std::fmt;
use std::ops::Deref;

use serde::Serialize;

/// Typographic punctuation and its ASCII replacement.
const TYPOGRAPHIC_MAP: &[(char, char)] = &[
    ('\u{2010}', '-'), // hyphen
    ('\u{2011}', '-'), // non-breaking hyphen
    ('\u{2012}', '-'), // figure dash
    ('\u{2013}', '-'), // en dash
    ('\u{2014}', '-'), // em dash
    ('\u{2015}', '-'), // horizontal bar
    ('\u{2212}', '-'), // minus sign
    ('\u{2018}', '\''),
    ('\u{2019}', '\''),
    ('\u{201A}', '\''),
    ('\u{201B}', '\''),
    ('\u{201C}', '"'),
    ('\u{201D}', '"'),
    ('\u{201E}', '"'),
    ('\u{201F}', '"'),
];

/// Immutable normalized text. Only `normalize` can build one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct NormalizedText(String);

impl NormalizedText {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Count of whitespace-delimited tokens.
    pub fn word_count(&self) -> usize {
        self.0.split_whitespace().count()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for NormalizedText {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for NormalizedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn map_typographic(ch: char) -> char {
    TYPOGRAPHIC_MAP
        .iter()
        .find(|(from, _)| *from == ch)
        .map(|(_, to)| *to)
        .unwrap_or(ch)
}

fn is_control(ch: char) -> bool {
    (ch as u32) < 0x20 || ch == '\u{7F}'
}

/// Normalizes raw text. Never fails; empty input yields empty text.
///
/// The mapping runs character by character in the documented order: typographic
/// punctuation first, then control characters become whitespace, then every
/// whitespace run (including the ones produced by the previous step) collapses
/// to a single space, and finally the ends are trimmed.
pub fn normalize(raw: &str) -> NormalizedText {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;

    for ch in raw.chars() {
        let ch = map_typographic(ch);
        let ch = if is_control(ch) { ' ' } else { ch };

        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }

        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }

    NormalizedText(out)
}

/// Absent input normalizes to the empty string.
pub fn normalize_optional(raw: Option<&str>) -> NormalizedText {
    raw.map(normalize).unwrap_or_default()
}

/// Line-preserving view of a document: every physical line normalized on its
/// own, blank lines dropped, joined with `\n`.
///
/// Structure detection (bullets, section headers) needs line starts, which a
/// fully normalized text no longer has.
pub fn normalize_lines(raw: &str) -> String {
    // A lone `\r` is a line break too; the empty piece of `\r\n` is dropped below.
    raw.split(['\n', '\r'])
        .map(normalize)
        .filter(|line| !line.is_empty())
        .map(NormalizedText::into_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Byte-to-character offset table for one text, built in a single pass.
///
/// Regex matches report byte offsets while every span we publish is in
/// characters; lookups are a binary search instead of a rescan from the start.
#[derive(Debug, Clone)]
pub struct CharIndex {
    byte_offsets: Vec<usize>,
    len: usize,
}

impl CharIndex {
    pub fn new(text: &str) -> Self {
        Self {
            byte_offsets: text.char_indices().map(|(b, _)| b).collect(),
            len: text.len(),
        }
    }

    /// Character offset of a byte offset on a char boundary (or `text.len()`).
    pub fn char_at(&self, byte: usize) -> usize {
        self.byte_offsets.partition_point(|&b| b < byte)
    }

    /// Byte offset of a character offset, clamped to the end of the text.
    pub fn byte_at(&self, char_offset: usize) -> usize {
        self.byte_offsets
            .get(char_offset)
            .copied()
            .unwrap_or(self.len)
    }

    pub fn char_len(&self) -> usize {
        self.byte_offsets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "   ",
        "plain text",
        "  leading and trailing  ",
        "tabs\tand\nnewlines\r\nmixed",
        "control\u{0}\u{1}\u{7F}chars",
        "\u{201C}smart quotes\u{201D} and \u{2018}single\u{2019}",
        "2019 \u{2013} 2021 \u{2014} present",
        "• bullet one\n• bullet two",
        "\u{0B}\u{0C} \t \u{1F}",
        "nbsp\u{A0}\u{A0}space",
    ];

    #[test]
    fn test_normalize_is_idempotent() {
        for sample in SAMPLES {
            let once = normalize(sample);
            let twice = normalize(&once);
            assert_eq!(once, twice, "normalize not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_normalize_empty_and_absent_input() {
        assert_eq!(normalize("").as_str(), "");
        assert_eq!(normalize("  \n\t ").as_str(), "");
        assert_eq!(normalize_optional(None).as_str(), "");
        assert_eq!(normalize_optional(Some(" a ")).as_str(), "a");
    }

    #[test]
    fn test_normalize_collapses_whitespace_runs() {
        assert_eq!(
            normalize("a  b\t\tc\n\nd").as_str(),
            "a b c d",
            "every whitespace run should become a single space"
        );
    }

    #[test]
    fn test_control_chars_collapse_with_adjacent_whitespace() {
        // Control chars turn into whitespace before collapsing, so this is one gap.
        assert_eq!(normalize("a \u{1} \u{2}b").as_str(), "a b");
        assert_eq!(normalize("a\u{7F}b").as_str(), "a b");
    }

    #[test]
    fn test_typographic_punctuation_mapped_to_ascii() {
        let text = normalize("\u{201C}Led\u{201D} team \u{2013} it\u{2019}s \u{2014} done");
        assert_eq!(text.as_str(), "\"Led\" team - it's - done");
    }

    #[test]
    fn test_normalized_text_invariants_hold() {
        for sample in SAMPLES {
            let text = normalize(sample);
            assert!(!text.chars().any(is_control), "control char in {text:?}");
            assert!(!text.contains("  "), "double space in {text:?}");
            assert_eq!(text.trim(), text.as_str());
            assert!(!text.chars().any(|c| c.is_whitespace() && c != ' '));
        }
    }

    #[test]
    fn test_word_count_counts_whitespace_tokens() {
        assert_eq!(normalize("one two\nthree").word_count(), 3);
        assert_eq!(normalize("").word_count(), 0);
    }

    #[test]
    fn test_normalize_lines_keeps_line_structure() {
        let lines = normalize_lines("  Summary:  \n\n\t• Built  things\r\n   \nSkills");
        assert_eq!(lines, "Summary:\n• Built things\nSkills");
    }

    #[test]
    fn test_normalize_lines_splits_on_bare_carriage_return() {
        let lines = normalize_lines("Summary\r• Built things\r- Led 3 teams\rSkills\r\nRust");
        assert_eq!(lines, "Summary\n• Built things\n- Led 3 teams\nSkills\nRust");
    }

    #[test]
    fn test_char_index_maps_both_ways() {
        let text = "Résumé: ok";
        let index = CharIndex::new(text);
        assert_eq!(index.char_len(), 10);
        assert_eq!(index.char_at(0), 0);
        assert_eq!(index.char_at(3), 2);
        assert_eq!(index.char_at(text.len()), 10);
        assert_eq!(index.byte_at(2), 3);
        assert_eq!(index.byte_at(10), text.len());
        assert_eq!(index.byte_at(99), text.len());
        assert_eq!(CharIndex::new("").char_at(0), 0);
    }
}
