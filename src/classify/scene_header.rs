//! Structural (scene-header) parser.
//!
//! Runs before per-line scoring. A heading-start line (numbered marker plus
//! optional inline detail) opens a unit; following non-blank lines are consumed
//! greedily while they complete an open time/interior detail or read as a short
//! place name. A dash followed by a dictionary verb splits the line: the part
//! before stays in the heading, the rest is handed back as `remaining_action`.

use serde::Serialize;

use crate::classify::context::LineStats;
use crate::classify::memory::{DocumentMemory, KnownConfidence};
use crate::line_type::LineType;
use crate::vocab::{self, Vocabulary};

/// Upper bound on continuation lines swallowed after the marker line.
pub const DEFAULT_MAX_CONTINUATION: usize = 4;

/// One consumed source line and the structural role it received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderLine {
    pub index: usize,
    pub text: String,
    #[serde(rename = "type")]
    pub line_type: LineType,
}

/// A structural heading unit (composite or one of its parts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingUnit {
    #[serde(rename = "type")]
    pub line_type: LineType,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneHeader {
    pub scene_number: String,
    pub time_detail: Option<String>,
    pub place: Option<String>,
    pub consumed_line_count: usize,
    pub remaining_action: Option<String>,
    pub lines: Vec<HeaderLine>,
}

impl SceneHeader {
    /// Composite heading first, then its number/detail/place parts.
    pub fn units(&self) -> Vec<HeadingUnit> {
        let composite = self
            .lines
            .iter()
            .map(|l| l.text.as_str())
            .collect::<Vec<_>>()
            .join(" - ");
        let mut out = vec![
            HeadingUnit {
                line_type: LineType::HeadingFull,
                text: composite,
            },
            HeadingUnit {
                line_type: LineType::HeadingNumberOnly,
                text: self.scene_number.clone(),
            },
        ];
        if let Some(t) = &self.time_detail {
            out.push(HeadingUnit {
                line_type: LineType::HeadingDetail,
                text: t.clone(),
            });
        }
        if let Some(p) = &self.place {
            out.push(HeadingUnit {
                line_type: LineType::HeadingPlace,
                text: p.clone(),
            });
        }
        out
    }
}

enum Absorb {
    Merged,
    /// `kept` stays in the heading, `action` becomes its own line.
    SplitAction { kept: String, action: String },
}

/// Accumulates interior/exterior, time and place segments across lines.
#[derive(Debug, Default)]
struct Detail {
    int_ext: Vec<String>,
    time: Vec<String>,
    place: Vec<String>,
    open_dash: bool,
}

impl Detail {
    /// Incomplete until both a time (or int/ext) and a place are known, or
    /// while the last absorbed text ended in a dash.
    fn is_open(&self) -> bool {
        self.open_dash || (self.time.is_empty() && self.int_ext.is_empty()) || self.place.is_empty()
    }

    fn push_segment(&mut self, seg: &str, vocab: &Vocabulary) {
        let n = vocab::word_count(seg);
        if vocab.contains_int_ext(seg) && n <= 2 {
            self.int_ext.push(seg.to_string());
        } else if vocab.contains_time_word(seg) && n <= 3 {
            self.time.push(seg.to_string());
        } else {
            self.place.push(seg.to_string());
        }
    }

    fn absorb(&mut self, text: &str, vocab: &Vocabulary) -> Absorb {
        let segments = dash_segments(text);
        let last = segments.len().saturating_sub(1);
        for (k, &(start, end)) in segments.iter().enumerate() {
            let seg = text[start..end].trim();
            if seg.is_empty() {
                if k == last && k > 0 {
                    self.open_dash = true;
                }
                continue;
            }
            if vocab.starts_with_action_verb(seg) {
                let kept = text[..start]
                    .trim_end_matches(|c: char| vocab::is_dash(c) || c.is_whitespace())
                    .to_string();
                return Absorb::SplitAction {
                    kept,
                    action: text[start..].trim().to_string(),
                };
            }
            self.open_dash = false;
            self.push_segment(seg, vocab);
        }
        Absorb::Merged
    }

    fn time_detail(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .int_ext
            .iter()
            .chain(self.time.iter())
            .map(String::as_str)
            .collect();
        (!parts.is_empty()).then(|| parts.join(" - "))
    }

    fn place(&self) -> Option<String> {
        (!self.place.is_empty()).then(|| self.place.join(" - "))
    }
}

/// Byte ranges of the dash-separated segments of `text`.
fn dash_segments(text: &str) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if vocab::is_dash(c) {
            out.push((start, i));
            start = i + c.len_utf8();
        }
    }
    out.push((start, text.len()));
    out
}

#[derive(Debug, Clone)]
pub struct SceneHeaderParser<'v> {
    vocab: &'v Vocabulary,
    max_continuation: usize,
}

impl<'v> SceneHeaderParser<'v> {
    pub fn new(vocab: &'v Vocabulary) -> Self {
        Self {
            vocab,
            max_continuation: DEFAULT_MAX_CONTINUATION,
        }
    }

    pub fn with_max_continuation(mut self, n: usize) -> Self {
        self.max_continuation = n;
        self
    }

    /// Parse a heading unit starting at `start`. `None` means the line is not
    /// a heading start and should fall through to per-line scoring.
    pub fn parse(
        &self,
        lines: &[&str],
        start: usize,
        memory: &DocumentMemory,
    ) -> Option<SceneHeader> {
        let first = lines.get(start)?.trim();
        let (scene_number, rest) = vocab::heading_start(first)?;

        let mut detail = Detail::default();
        let mut header_lines = Vec::new();
        let mut remaining_action = None;

        if rest.is_empty() {
            header_lines.push(HeaderLine {
                index: start,
                text: first.to_string(),
                line_type: LineType::HeadingNumberOnly,
            });
        } else {
            match detail.absorb(&rest, self.vocab) {
                Absorb::Merged => header_lines.push(HeaderLine {
                    index: start,
                    text: first.to_string(),
                    line_type: LineType::HeadingFull,
                }),
                Absorb::SplitAction { kept, action } => {
                    let marker = first
                        .strip_suffix(action.as_str())
                        .unwrap_or(first)
                        .trim_end_matches(|c: char| vocab::is_dash(c) || c.is_whitespace());
                    let line_type = if kept.is_empty() {
                        LineType::HeadingNumberOnly
                    } else {
                        LineType::HeadingFull
                    };
                    header_lines.push(HeaderLine {
                        index: start,
                        text: marker.to_string(),
                        line_type,
                    });
                    remaining_action = Some(action);
                }
            }
        }

        let mut idx = start + 1;
        while remaining_action.is_none()
            && idx < lines.len()
            && header_lines.len() <= self.max_continuation
        {
            let t = lines[idx].trim();
            if t.is_empty() || !self.accepts_continuation(t, &detail, memory) {
                break;
            }
            match detail.absorb(t, self.vocab) {
                Absorb::Merged => header_lines.push(HeaderLine {
                    index: idx,
                    text: t.to_string(),
                    line_type: self.continuation_type(t),
                }),
                Absorb::SplitAction { kept, action } => {
                    header_lines.push(HeaderLine {
                        index: idx,
                        line_type: self.continuation_type(&kept),
                        text: kept,
                    });
                    remaining_action = Some(action);
                }
            }
            idx += 1;
        }

        Some(SceneHeader {
            scene_number,
            time_detail: detail.time_detail(),
            place: detail.place(),
            consumed_line_count: header_lines.len(),
            remaining_action,
            lines: header_lines,
        })
    }

    fn continuation_type(&self, text: &str) -> LineType {
        if self.vocab.contains_time_detail(text) {
            LineType::HeadingDetail
        } else {
            LineType::HeadingPlace
        }
    }

    fn accepts_continuation(&self, t: &str, detail: &Detail, memory: &DocumentMemory) -> bool {
        let st = LineStats::of(t);
        if vocab::heading_start(t).is_some()
            || vocab::is_transition(t)
            || vocab::inline_dialogue(t).is_some()
            || st.ends_with_sentence_punct
            || st.ends_with_ellipsis
        {
            return false;
        }
        if st.parenthesized {
            // only a still-open detail may continue in parenthesized form
            return detail.is_open() && self.vocab.contains_time_detail(t);
        }
        if self.vocab.starts_with_action_verb(t) {
            return false;
        }

        let resolves_detail =
            detail.is_open() && st.word_count <= 8 && self.vocab.contains_time_detail(t);
        if resolves_detail {
            return true;
        }

        let known_place = self.vocab.contains_place_word(t)
            || memory.is_known_place(t) > KnownConfidence::Unknown;
        known_place && st.word_count <= 6 && !st.has_sentence_punct && !st.has_colon
    }
}
