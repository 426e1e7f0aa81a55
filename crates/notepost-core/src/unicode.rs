//! Code-point classification and run segmentation.
//!
//! Native key dispatch can only represent characters that fit a 16-bit key
//! code, and several widgets mis-render pictographic symbols even inside the
//! Basic Multilingual Plane. Characters in either group are [`CharClass::Wide`];
//! everything else is [`CharClass::Plain`].
//!
//! Segmentation works on Unicode scalar values, not grapheme clusters. A ZWJ
//! family emoji is split wherever its joiner (a plain character) sits between
//! two wide pictographs. Delivery is unaffected because any wide run routes
//! the whole text through a single paste.

use std::iter::FusedIterator;

/// Whether a character can go through native key dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharClass {
    Plain,
    Wide,
}

/// Curated pictographic and symbol ranges, inclusive.
///
/// The supplementary-plane entries are already covered by the `> 0xFFFF`
/// rule; they are listed so the table documents the full curated set.
const WIDE_RANGES: &[(u32, u32)] = &[
    (0x2300, 0x23FF),   // miscellaneous technical
    (0x2460, 0x24FF),   // enclosed alphanumerics
    (0x2600, 0x26FF),   // miscellaneous symbols
    (0x2700, 0x27BF),   // dingbats
    (0x2B00, 0x2BFF),   // miscellaneous symbols and arrows
    (0x3297, 0x3297),   // circled ideograph congratulation
    (0x3299, 0x3299),   // circled ideograph secret
    (0xFE00, 0xFE0F),   // variation selectors
    (0x1F100, 0x1F1FF), // enclosed alphanumeric supplement, regional indicators
    (0x1F200, 0x1F2FF), // enclosed ideographic supplement
    (0x1F300, 0x1F5FF), // symbols and pictographs
    (0x1F600, 0x1F64F), // emoticons
    (0x1F680, 0x1F6FF), // transport and map symbols
    (0x1F900, 0x1F9FF), // supplemental symbols and pictographs
];

/// Classify a single scalar value.
pub fn classify(ch: char) -> CharClass {
    let cp = ch as u32;
    if cp > 0xFFFF || WIDE_RANGES.iter().any(|&(lo, hi)| (lo..=hi).contains(&cp)) {
        CharClass::Wide
    } else {
        CharClass::Plain
    }
}

/// Whether `text` contains at least one wide character.
pub fn contains_wide(text: &str) -> bool {
    text.chars().any(|c| classify(c) == CharClass::Wide)
}

/// A maximal run of characters sharing one [`CharClass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodepointRun<'a> {
    pub kind: CharClass,
    pub text: &'a str,
}

/// Lazy iterator over the runs of a string. Cloning it restarts from the
/// clone point; calling [`segment`] again restarts from the beginning.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Segments<'a> {
    type Item = CodepointRun<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut chars = self.rest.char_indices();
        let (_, first) = chars.next()?;
        let kind = classify(first);
        let end = chars
            .find(|&(_, c)| classify(c) != kind)
            .map(|(idx, _)| idx)
            .unwrap_or(self.rest.len());
        let (text, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(CodepointRun { kind, text })
    }
}

impl FusedIterator for Segments<'_> {}

/// Split `text` into runs; a boundary falls exactly where the class changes.
pub fn segment(text: &str) -> Segments<'_> {
    Segments { rest: text }
}
