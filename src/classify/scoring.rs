//! Scoring engine: independent 0–100 scores for the contested candidates
//! (character, dialogue, action, parenthetical) with human-readable reasons.
//!
//! Closed-form detectors (blank, invocation, heading start, transition,
//! parenthetical shape) short-circuit with a fixed 100 and skip the contested
//! scorers. Contested scorers start at 0 and add or
//! subtract fixed points per heuristic; two global corrections run after all
//! four, then the optional adaptive weights multiply each candidate.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::classify::context::LineContext;
use crate::classify::learning::AdaptiveWeights;
use crate::classify::memory::DocumentMemory;
use crate::line_type::{clamp_score, ClassificationScore, LineType};
use crate::vocab::{self, Vocabulary};

/// Line length above which sentence punctuation pushes toward action.
const LONG_LINE_CHARS: usize = 50;

/// Outcome of scoring one line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvidence {
    /// Unambiguous by construction; no doubt is computed.
    ClosedForm {
        line_type: LineType,
        score: ClassificationScore,
    },
    Contested {
        scores: BTreeMap<LineType, ClassificationScore>,
    },
}

/// Running sum of heuristic points for one candidate.
#[derive(Debug, Default)]
struct Tally {
    points: f32,
    reasons: Vec<String>,
}

impl Tally {
    fn add(&mut self, pts: f32, why: &str) {
        self.points += pts;
        self.reasons.push(format!("{why} ({pts:+})"));
    }

    fn add_if(&mut self, cond: bool, pts: f32, why: &str) {
        if cond {
            self.add(pts, why);
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoringEngine {
    vocab: Arc<Vocabulary>,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(Vocabulary::shared())
    }
}

impl ScoringEngine {
    pub fn new(vocab: Arc<Vocabulary>) -> Self {
        Self { vocab }
    }

    /// Fixed-score detectors, in precedence order.
    pub fn closed_form(&self, ctx: &LineContext<'_>) -> Option<(LineType, ClassificationScore)> {
        let t = ctx.text.trim();
        if t.is_empty() {
            return Some((LineType::Blank, ClassificationScore::certain("empty line")));
        }
        if vocab::is_invocation(t) {
            return Some((
                LineType::Invocation,
                ClassificationScore::certain("invocation text"),
            ));
        }
        if let Some((_, rest)) = vocab::heading_start(t) {
            let ty = if rest.is_empty() {
                LineType::HeadingNumberOnly
            } else {
                LineType::HeadingFull
            };
            return Some((ty, ClassificationScore::certain("numbered heading marker")));
        }
        if vocab::is_transition(t) {
            return Some((
                LineType::Transition,
                ClassificationScore::certain("transition vocabulary"),
            ));
        }
        if ctx.stats.parenthesized {
            return Some((
                LineType::Parenthetical,
                ClassificationScore::certain("parenthetical shape"),
            ));
        }
        None
    }

    /// Score a line. `learner` (when present) reweights each contested score by
    /// the learned factor for `previous type → candidate`.
    pub fn score(
        &self,
        ctx: &LineContext<'_>,
        memory: &DocumentMemory,
        learner: Option<&AdaptiveWeights>,
    ) -> LineEvidence {
        if let Some((line_type, score)) = self.closed_form(ctx) {
            return LineEvidence::ClosedForm { line_type, score };
        }

        let mut character = self.score_character(ctx, memory);
        let mut dialogue = self.score_dialogue(ctx);
        let mut action = self.score_action(ctx);
        let parenthetical = self.score_parenthetical(ctx);

        // Global corrections.
        if ctx.previous_type() == Some(LineType::Character)
            && self.vocab.starts_with_action(ctx.text)
        {
            dialogue.add(-55.0, "action start right after character");
            action.add(25.0, "action start right after character");
        }
        if ctx.stats.char_count > LONG_LINE_CHARS && ctx.stats.has_sentence_punct {
            action.add(20.0, "long punctuated line");
        }
        character.points = character.points.min(100.0);

        let mut scores = BTreeMap::new();
        for (ty, tally) in [
            (LineType::Character, character),
            (LineType::Dialogue, dialogue),
            (LineType::Action, action),
            (LineType::Parenthetical, parenthetical),
        ] {
            let mut s = ClassificationScore::new(tally.points, tally.reasons);
            if let Some(w) = learner {
                let weighted = w.improve_score(ty, ctx, s.score);
                if (weighted - s.score).abs() > f32::EPSILON {
                    s.reasons.push(format!(
                        "learned weight x{:.2}",
                        w.weight_for(ctx.previous_type(), ty)
                    ));
                }
                s.rescore(weighted);
            }
            scores.insert(ty, s);
        }
        LineEvidence::Contested { scores }
    }

    fn score_character(&self, ctx: &LineContext<'_>, memory: &DocumentMemory) -> Tally {
        let st = &ctx.stats;
        let mut t = Tally::default();
        t.add_if(st.ends_with_colon, 50.0, "trailing colon");
        t.add_if(st.word_count <= 3, 20.0, "short line");
        t.add_if(st.word_count >= 5, -30.0, "too many words for a name");
        t.add_if(st.char_count > 30, -20.0, "too long for a name");
        t.add_if(st.ends_with_sentence_punct, -35.0, "sentence punctuation");
        t.add_if(st.starts_with_dash, -20.0, "dash prefix");
        t.add_if(
            self.vocab.starts_with_action_verb(ctx.text),
            -40.0,
            "starts with action verb",
        );
        t.add_if(
            ctx.previous_type() == Some(LineType::Character),
            -30.0,
            "follows another character",
        );

        match memory.character_weight(ctx.text) {
            0 => {}
            1 => t.add(20.0, "known character"),
            2 => t.add(40.0, "known character"),
            _ => t.add(60.0, "known character"),
        }

        if let Some(next) = ctx.next_non_blank() {
            t.add_if(
                self.plausible_dialogue(next),
                10.0,
                "next line reads as speech",
            );
        }
        t
    }

    fn score_dialogue(&self, ctx: &LineContext<'_>) -> Tally {
        let st = &ctx.stats;
        let mut t = Tally::default();
        match ctx.previous_type() {
            Some(LineType::Character) => t.add(60.0, "follows character"),
            Some(LineType::Parenthetical) => t.add(40.0, "follows parenthetical"),
            Some(LineType::Dialogue) => t.add(20.0, "continues dialogue"),
            Some(LineType::Action) | None => t.add(-20.0, "no speaker context"),
            Some(other) if other.breaks_block() => t.add(-20.0, "no speaker context"),
            Some(_) => {}
        }
        t.add_if(st.has_sentence_punct, 15.0, "sentence punctuation");
        t.add_if(st.word_count >= 2, 10.0, "multi-word");
        t.add_if(
            vocab::inline_dialogue(ctx.text).is_some(),
            30.0,
            "inline speaker prefix",
        );
        t.add_if(
            self.vocab.starts_with_action_verb(ctx.text),
            -30.0,
            "starts with action verb",
        );
        t.add_if(st.ends_with_colon, -40.0, "trailing colon");
        if st.starts_with_dash {
            if ctx.in_dialogue_block() {
                t.add(25.0, "dash line inside dialogue block");
            } else {
                t.add(-25.0, "dash line outside dialogue block");
            }
        }
        t
    }

    fn score_action(&self, ctx: &LineContext<'_>) -> Tally {
        let st = &ctx.stats;
        let mut t = Tally::default();
        if self.vocab.starts_with_action_verb(ctx.text) {
            if st.word_count <= 1 {
                t.add(20.0, "single-word action verb");
            } else {
                t.add(50.0, "starts with action verb");
            }
        } else if self.vocab.starts_with_action(ctx.text) {
            t.add(40.0, "action opener");
        }
        match ctx.previous_type() {
            Some(LineType::Action) => t.add(15.0, "follows action"),
            Some(p) if p.is_heading() => t.add(20.0, "follows heading"),
            Some(LineType::Transition) | Some(LineType::Invocation) => {
                t.add(10.0, "follows block break")
            }
            _ => {}
        }
        let in_block = ctx.in_dialogue_block();
        t.add_if(!in_block, 15.0, "outside dialogue block");
        if st.starts_with_dash {
            if in_block {
                t.add(-25.0, "dash line inside dialogue block");
            } else {
                t.add(25.0, "dash line outside dialogue block");
            }
        }
        t.add_if(st.ends_with_colon, -40.0, "trailing colon");
        t
    }

    fn score_parenthetical(&self, ctx: &LineContext<'_>) -> Tally {
        let st = &ctx.stats;
        let mut t = Tally::default();
        // fully wrapped lines never get here (closed form)
        t.add_if(st.opens_paren, 25.0, "opens with parenthesis");
        t.add_if(
            ctx.previous_type() == Some(LineType::Character),
            20.0,
            "follows character",
        );
        let in_block = ctx.in_dialogue_block();
        t.add_if(in_block, 10.0, "inside dialogue block");
        if st.starts_with_dash {
            if in_block {
                t.add(10.0, "dash line inside dialogue block");
            } else {
                t.add(-20.0, "dash line outside dialogue block");
            }
        }
        t.add_if(st.word_count <= 6, 10.0, "short aside");
        t.add_if(st.word_count > 12, -20.0, "too long for an aside");
        t
    }

    /// Next line could be speech: 2–30 words, not an action start or heading.
    pub fn plausible_dialogue(&self, line: &str) -> bool {
        let n = vocab::word_count(line);
        (2..=30).contains(&n)
            && !self.vocab.starts_with_action(line)
            && vocab::heading_start(line).is_none()
            && !vocab::is_transition(line)
    }
}

/// Candidates ordered best first; equal scores fall back to the fixed
/// priority (action first, as the universal default).
pub fn ranked(scores: &BTreeMap<LineType, ClassificationScore>) -> Vec<(LineType, f32)> {
    let mut v: Vec<(LineType, f32)> = scores
        .iter()
        .map(|(t, s)| (*t, clamp_score(s.score)))
        .collect();
    v.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.tie_rank().cmp(&b.0.tie_rank()))
    });
    v
}
