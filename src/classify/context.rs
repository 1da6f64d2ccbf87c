//! Context builder: a bounded window of following lines plus cheap line
//! statistics, assembled once per line and handed to every scorer.

use crate::line_type::LineType;
use crate::vocab;

pub const DEFAULT_WINDOW: usize = 3;

/// Surface statistics of a single line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineStats {
    pub char_count: usize,
    pub word_count: usize,
    pub ends_with_colon: bool,
    pub has_colon: bool,
    pub has_sentence_punct: bool,
    pub ends_with_sentence_punct: bool,
    pub ends_with_ellipsis: bool,
    pub starts_with_dash: bool,
    pub parenthesized: bool,
    pub opens_paren: bool,
}

impl LineStats {
    pub fn of(text: &str) -> Self {
        let t = text.trim();
        Self {
            char_count: t.chars().count(),
            word_count: vocab::word_count(t),
            ends_with_colon: vocab::ends_with_colon(t),
            has_colon: t.chars().any(vocab::is_colon),
            has_sentence_punct: vocab::has_sentence_punct(t),
            ends_with_sentence_punct: vocab::ends_with_sentence_punct(t),
            ends_with_ellipsis: vocab::ends_with_ellipsis(t),
            starts_with_dash: vocab::starts_with_dash(t),
            parenthesized: vocab::is_parenthetical_shape(t),
            opens_paren: t.starts_with('(') || t.starts_with('（'),
        }
    }
}

/// Everything a scorer may look at for one line.
#[derive(Debug, Clone)]
pub struct LineContext<'a> {
    pub index: usize,
    pub text: &'a str,
    /// Up to `window` following lines, nearest first.
    pub next_lines: Vec<&'a str>,
    /// Types resolved so far for this document, in order.
    pub previous_types: &'a [LineType],
    pub stats: LineStats,
}

impl<'a> LineContext<'a> {
    /// Immediately preceding resolved type, skipping blank lines.
    pub fn previous_type(&self) -> Option<LineType> {
        self.previous_types
            .iter()
            .rev()
            .copied()
            .find(|t| *t != LineType::Blank)
    }

    /// First non-blank following line.
    pub fn next_non_blank(&self) -> Option<&'a str> {
        self.next_lines.iter().copied().find(|l| !l.trim().is_empty())
    }

    /// Whether the line sits inside an active dialogue block.
    pub fn in_dialogue_block(&self) -> bool {
        in_dialogue_block(self.previous_types)
    }
}

/// Scan back over resolved types: a character line opens a block, dialogue and
/// parentheticals continue it, action or any block-breaking type ends it.
/// Blank lines are skipped.
pub fn in_dialogue_block(previous_types: &[LineType]) -> bool {
    for t in previous_types.iter().rev() {
        match t {
            LineType::Character => return true,
            LineType::Dialogue | LineType::Parenthetical | LineType::Blank => continue,
            // action ends the block; headings, transitions, invocations break it
            _ => return false,
        }
    }
    false
}

/// Builds [`LineContext`] values over a split document.
#[derive(Debug, Clone, Copy)]
pub struct ContextBuilder {
    window: usize,
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl ContextBuilder {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
        }
    }

    pub fn build<'a>(
        &self,
        lines: &[&'a str],
        index: usize,
        previous_types: &'a [LineType],
    ) -> LineContext<'a> {
        let text = lines.get(index).copied().unwrap_or("");
        let next_start = (index + 1).min(lines.len());
        let next_end = (index + 1 + self.window).min(lines.len());
        let next_lines = lines[next_start..next_end].to_vec();
        LineContext {
            index,
            text,
            next_lines,
            previous_types,
            stats: LineStats::of(text),
        }
    }
}
