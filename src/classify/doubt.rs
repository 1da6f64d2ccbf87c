//! Doubt & fallback resolver.
//!
//! Order per line: doubt (with the dash adjustment folded in), then the smart
//! fallback when the line needs review, then the unconditional structural
//! override. Document Memory is updated afterwards by the pipeline.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::classify::context::LineContext;
use crate::classify::memory::{DocumentMemory, KnownConfidence};
use crate::classify::scoring::ranked;
use crate::line_type::{
    clamp_score, needs_review, ClassificationScore, ConfidenceTier, FallbackApplied,
    LineClassification, LineType,
};
use crate::vocab::{self, Vocabulary};

/// Fallbacks are never applied when the winner leads by more than this.
pub const MAX_FALLBACK_GAP: f32 = 25.0;
/// Synthetic score given to a structural override.
pub const OVERRIDE_SCORE: f32 = 85.0;
/// Band (in points below the best) that counts as a near-tie.
const NEAR_TIE_BAND: f32 = 5.0;

/// Doubt contributions, summed then clamped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DoubtBreakdown {
    pub gap: f32,
    pub low_best: f32,
    pub near_tie: f32,
    pub tier: f32,
    pub dash: f32,
}

impl DoubtBreakdown {
    pub fn total(&self) -> f32 {
        clamp_score(self.gap + self.low_best + self.near_tie + self.tier + self.dash)
    }
}

/// Doubt over a best-first candidate list.
///
/// Non-increasing in the best score when every other candidate is held fixed.
pub fn doubt_breakdown(
    ranked: &[(LineType, f32)],
    text: &str,
    vocab: &Vocabulary,
) -> DoubtBreakdown {
    let Some(&(_, best)) = ranked.first() else {
        return DoubtBreakdown::default();
    };
    let second = ranked.get(1).map_or(0.0, |c| c.1);
    let lead = best - second;
    let near = ranked.iter().filter(|c| best - c.1 <= NEAR_TIE_BAND).count();

    DoubtBreakdown {
        gap: if lead < 15.0 {
            50.0
        } else if lead < 25.0 {
            30.0
        } else if lead < 35.0 {
            15.0
        } else {
            0.0
        },
        low_best: if best < 40.0 {
            30.0
        } else if best < 55.0 {
            15.0
        } else {
            0.0
        },
        near_tie: if near >= 3 { 20.0 } else { 0.0 },
        tier: match ConfidenceTier::from_score(best) {
            ConfidenceTier::Low => 20.0,
            ConfidenceTier::Medium => 10.0,
            ConfidenceTier::High => 0.0,
        },
        dash: dash_adjustment(text, vocab),
    }
}

pub fn doubt_score(ranked: &[(LineType, f32)], text: &str, vocab: &Vocabulary) -> f32 {
    doubt_breakdown(ranked, text, vocab).total()
}

/// −10 for a dangling dash, −15 when a non-verb follows it (likely place
/// continuation), +25 when a verb follows (action/heading boundary).
pub fn dash_adjustment(text: &str, vocab: &Vocabulary) -> f32 {
    match vocab::split_interior_dash(text) {
        None => 0.0,
        Some((_, "")) => -10.0,
        Some((_, after)) if vocab.starts_with_action_verb(after) => 25.0,
        Some(_) => -15.0,
    }
}

#[derive(Debug, Clone)]
pub struct DoubtResolver {
    vocab: Arc<Vocabulary>,
}

impl Default for DoubtResolver {
    fn default() -> Self {
        Self::new(Vocabulary::shared())
    }
}

impl DoubtResolver {
    pub fn new(vocab: Arc<Vocabulary>) -> Self {
        Self { vocab }
    }

    /// Turn contested scores into a final record for `ctx`.
    pub fn resolve(
        &self,
        ctx: &LineContext<'_>,
        memory: &DocumentMemory,
        mut scores: BTreeMap<LineType, ClassificationScore>,
    ) -> LineClassification {
        let order = ranked(&scores);
        let (winner, best) = order.first().copied().unwrap_or((LineType::Action, 0.0));
        let doubt = doubt_score(&order, ctx.text, &self.vocab);

        let mut record = LineClassification {
            index: ctx.index,
            text: ctx.text.to_string(),
            line_type: winner,
            confidence_tier: ConfidenceTier::from_score(best),
            confidence: best,
            doubt_score: 0.0,
            needs_review: false,
            top2_candidates: order.get(1).map(|second| [winner, second.0]),
            fallback_applied: None,
            scores: BTreeMap::new(),
        };
        record.set_doubt(doubt);

        if needs_review(record.doubt_score) {
            if let Some(fb) = self.smart_fallback(&order, ctx) {
                let s = scores.get(&fb.fallback_type).map_or(0.0, |s| s.score);
                record.line_type = fb.fallback_type;
                record.confidence = s;
                record.confidence_tier = ConfidenceTier::from_score(s);
                record.fallback_applied = Some(fb);
            }
        }

        if self.structural_override(record.line_type, ctx, memory) {
            scores.insert(
                LineType::HeadingDetail,
                ClassificationScore::new(OVERRIDE_SCORE, vec!["place name under heading".into()]),
            );
            record.line_type = LineType::HeadingDetail;
            record.confidence = OVERRIDE_SCORE;
            record.confidence_tier = ConfidenceTier::from_score(OVERRIDE_SCORE);
        }

        record.scores = scores;
        record
    }

    /// Context rules for the top-2 pair. Returns a record only when the type changes.
    pub fn smart_fallback(
        &self,
        order: &[(LineType, f32)],
        ctx: &LineContext<'_>,
    ) -> Option<FallbackApplied> {
        use LineType::*;
        let (&(a, a_score), &(b, b_score)) = (order.first()?, order.get(1)?);
        if a_score - b_score > MAX_FALLBACK_GAP {
            return None;
        }
        let prev = ctx.previous_type();
        let pair = |x: LineType, y: LineType| (a == x && b == y) || (a == y && b == x);

        let (resolved, reason) = if pair(Action, Character) {
            let speech_follows = ctx
                .next_non_blank()
                .is_some_and(|n| (2..=30).contains(&vocab::word_count(n)));
            if speech_follows {
                (Character, "next line reads as dialogue")
            } else {
                (Action, "no dialogue follows")
            }
        } else if pair(Action, Dialogue) {
            if matches!(prev, Some(Character | Parenthetical | Dialogue)) {
                (Dialogue, "inside speaker context")
            } else {
                (Action, "no speaker context")
            }
        } else if pair(Character, Dialogue) {
            if prev == Some(Character) {
                (Dialogue, "follows character")
            } else if ctx.stats.ends_with_colon {
                (Character, "ends with colon")
            } else {
                return None;
            }
        } else if pair(Parenthetical, Dialogue) {
            if ctx.stats.opens_paren {
                (Parenthetical, "opens with parenthesis")
            } else {
                (Dialogue, "no parenthesis")
            }
        } else if pair(Parenthetical, Action) {
            if ctx.stats.opens_paren {
                (Parenthetical, "opens with parenthesis")
            } else {
                (Action, "no parenthesis")
            }
        } else {
            return None;
        };

        (resolved != a).then(|| FallbackApplied {
            original_type: a,
            fallback_type: resolved,
            reason: format!("{a}/{b}: {reason}"),
        })
    }

    /// Character directly under a heading that names a place.
    pub fn structural_override(
        &self,
        line_type: LineType,
        ctx: &LineContext<'_>,
        memory: &DocumentMemory,
    ) -> bool {
        if line_type != LineType::Character {
            return false;
        }
        if !ctx.previous_type().is_some_and(|p| p.is_heading()) {
            return false;
        }
        self.vocab.contains_place_word(ctx.text)
            || self.vocab.starts_with_locative(ctx.text)
            || memory.is_known_place(ctx.text) > KnownConfidence::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::context::ContextBuilder;

    fn v() -> Arc<Vocabulary> {
        Vocabulary::shared()
    }

    #[test]
    fn clear_winner_has_no_doubt() {
        let order = [(LineType::Character, 80.0), (LineType::Parenthetical, 10.0)];
        assert_eq!(doubt_score(&order, "أحمد:", &v()), 0.0);
    }

    #[test]
    fn close_low_scores_need_review() {
        let order = [
            (LineType::Character, 30.0),
            (LineType::Action, 28.0),
            (LineType::Dialogue, 26.0),
        ];
        let d = doubt_breakdown(&order, "سارة", &v());
        assert_eq!(d.gap, 50.0);
        assert_eq!(d.low_best, 30.0);
        assert_eq!(d.near_tie, 20.0);
        assert_eq!(d.tier, 20.0);
        assert_eq!(d.total(), 100.0);
    }

    #[test]
    fn middle_bands_and_dash_add_up() {
        let order = [(LineType::Action, 50.0), (LineType::HeadingDetail, 30.0)];
        let d = doubt_breakdown(&order, "الشارع - يركض عمر", &v());
        assert_eq!(
            d,
            DoubtBreakdown {
                gap: 30.0,
                low_best: 15.0,
                near_tie: 0.0,
                tier: 10.0,
                dash: 25.0,
            }
        );
        assert_eq!(d.total(), 80.0);
    }

    #[test]
    fn dash_adjustments() {
        let voc = v();
        assert_eq!(dash_adjustment("المطبخ -", &voc), -10.0);
        assert_eq!(dash_adjustment("المطبخ - ليل", &voc), -15.0);
        assert_eq!(dash_adjustment("الشارع - يركض عمر", &voc), 25.0);
        assert_eq!(dash_adjustment("- مرحبا", &voc), 0.0);
    }

    #[test]
    fn fallback_respects_gap_cap() {
        let lines = ["مرحبا يا صديقي"];
        let prev = [LineType::Character];
        let ctx = ContextBuilder::default().build(&lines, 0, &prev);
        let r = DoubtResolver::default();
        let wide = [(LineType::Action, 60.0), (LineType::Dialogue, 30.0)];
        assert!(r.smart_fallback(&wide, &ctx).is_none());
        let close = [(LineType::Action, 40.0), (LineType::Dialogue, 35.0)];
        let fb = r.smart_fallback(&close, &ctx).unwrap();
        assert_eq!(fb.original_type, LineType::Action);
        assert_eq!(fb.fallback_type, LineType::Dialogue);
    }

    #[test]
    fn bare_name_before_speech_falls_back_to_character() {
        let lines = ["سارة", "أين كنت طوال الليل؟"];
        let ctx = ContextBuilder::default().build(&lines, 0, &[]);
        let order = [(LineType::Action, 32.0), (LineType::Character, 30.0)];
        let fb = DoubtResolver::default().smart_fallback(&order, &ctx).unwrap();
        assert_eq!(fb.fallback_type, LineType::Character);
    }

    #[test]
    fn place_under_heading_is_overridden() {
        let lines = ["مشهد 5", "المقهى"];
        let prev = [LineType::HeadingNumberOnly];
        let ctx = ContextBuilder::default().build(&lines, 1, &prev);
        let mut scores = BTreeMap::new();
        scores.insert(LineType::Character, ClassificationScore::new(60.0, vec![]));
        scores.insert(LineType::Action, ClassificationScore::new(15.0, vec![]));
        let rec = DoubtResolver::default().resolve(&ctx, &DocumentMemory::new(), scores);
        assert_eq!(rec.line_type, LineType::HeadingDetail);
        assert_eq!(rec.confidence, OVERRIDE_SCORE);
        assert!(rec.scores.contains_key(&LineType::HeadingDetail));
    }
}
