//! line_type.rs — Closed set of structural roles plus the score/result shapes
//! every layer (scoring, doubt, audit, review, API) speaks.
//!
//! Scores live in `[0, 100]`. The confidence tier is never stored on its own:
//! it is always derived from the score through [`ConfidenceTier::from_score`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Structural role of one line of a script-like document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineType {
    HeadingFull,
    HeadingNumberOnly,
    HeadingDetail,
    HeadingPlace,
    Action,
    Character,
    Dialogue,
    Parenthetical,
    Transition,
    Invocation,
    Blank,
}

impl LineType {
    pub const ALL: [LineType; 11] = [
        LineType::HeadingFull,
        LineType::HeadingNumberOnly,
        LineType::HeadingDetail,
        LineType::HeadingPlace,
        LineType::Action,
        LineType::Character,
        LineType::Dialogue,
        LineType::Parenthetical,
        LineType::Transition,
        LineType::Invocation,
        LineType::Blank,
    ];

    /// The four candidates the contested scorers compete over.
    pub const CONTESTED: [LineType; 4] = [
        LineType::Character,
        LineType::Dialogue,
        LineType::Action,
        LineType::Parenthetical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HeadingFull => "heading-full",
            Self::HeadingNumberOnly => "heading-number-only",
            Self::HeadingDetail => "heading-detail",
            Self::HeadingPlace => "heading-place",
            Self::Action => "action",
            Self::Character => "character",
            Self::Dialogue => "dialogue",
            Self::Parenthetical => "parenthetical",
            Self::Transition => "transition",
            Self::Invocation => "invocation",
            Self::Blank => "blank",
        }
    }

    /// Any facet of a scene heading.
    pub fn is_heading(&self) -> bool {
        matches!(
            self,
            Self::HeadingFull | Self::HeadingNumberOnly | Self::HeadingDetail | Self::HeadingPlace
        )
    }

    /// Types that end a dialogue block when scanning backwards.
    pub fn breaks_block(&self) -> bool {
        self.is_heading() || matches!(self, Self::Transition | Self::Invocation)
    }

    /// Tie-break priority among contested candidates (lower wins).
    /// Action comes first: it is the universal default when nothing else fires.
    pub(crate) fn tie_rank(&self) -> u8 {
        match self {
            Self::Action => 0,
            Self::Dialogue => 1,
            Self::Character => 2,
            Self::Parenthetical => 3,
            _ => 4,
        }
    }
}

impl fmt::Display for LineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for names outside the closed set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown line type: {0}")]
pub struct UnknownLineType(pub String);

impl FromStr for LineType {
    type Err = UnknownLineType;

    /// Lenient parse: accepts kebab, snake, camel and spaced spellings plus a
    /// few legacy names used by older editor builds and model outputs.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(|c| c.to_lowercase())
            .collect();
        let ty = match key.as_str() {
            "headingfull" | "sceneheader" | "sceneheadertopline" | "sceneheading" => {
                Self::HeadingFull
            }
            "headingnumberonly" | "headingnumber" | "sceneheader1" => Self::HeadingNumberOnly,
            "headingdetail" | "sceneheader2" => Self::HeadingDetail,
            "headingplace" | "sceneheader3" | "place" => Self::HeadingPlace,
            "action" => Self::Action,
            "character" | "speaker" => Self::Character,
            "dialogue" | "dialog" => Self::Dialogue,
            "parenthetical" => Self::Parenthetical,
            "transition" => Self::Transition,
            "invocation" | "basmala" => Self::Invocation,
            "blank" | "empty" => Self::Blank,
            _ => return Err(UnknownLineType(s.to_string())),
        };
        Ok(ty)
    }
}

/// Coarse confidence bucket derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn from_score(score: f32) -> Self {
        if score >= 70.0 {
            Self::High
        } else if score >= 40.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Clamp any score-like value into `[0, 100]`.
#[inline]
pub fn clamp_score(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 100.0)
    }
}

/// Score of one candidate type with its justifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationScore {
    pub score: f32,
    pub confidence_tier: ConfidenceTier,
    pub reasons: Vec<String>,
}

impl ClassificationScore {
    pub fn new(score: f32, reasons: Vec<String>) -> Self {
        let score = clamp_score(score);
        Self {
            score,
            confidence_tier: ConfidenceTier::from_score(score),
            reasons,
        }
    }

    /// Fixed full-confidence score used by closed-form detectors.
    pub fn certain(reason: impl Into<String>) -> Self {
        Self::new(100.0, vec![reason.into()])
    }

    /// Re-derive the score (and tier) after a multiplicative or additive change.
    pub fn rescore(&mut self, score: f32) {
        self.score = clamp_score(score);
        self.confidence_tier = ConfidenceTier::from_score(self.score);
    }
}

/// Record of a fallback rule changing the winning type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallbackApplied {
    pub original_type: LineType,
    pub fallback_type: LineType,
    pub reason: String,
}

/// Full classification of one line (the record consumers receive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineClassification {
    pub index: usize,
    pub text: String,
    #[serde(rename = "type")]
    pub line_type: LineType,
    pub confidence_tier: ConfidenceTier,
    /// Winning score in `[0, 100]`.
    pub confidence: f32,
    pub doubt_score: f32,
    pub needs_review: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top2_candidates: Option<[LineType; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_applied: Option<FallbackApplied>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scores: BTreeMap<LineType, ClassificationScore>,
}

/// `needs_review` is a pure function of the doubt score.
pub const NEEDS_REVIEW_DOUBT: f32 = 60.0;

#[inline]
pub fn needs_review(doubt: f32) -> bool {
    doubt >= NEEDS_REVIEW_DOUBT
}

impl LineClassification {
    /// Build a record for a closed-form or structural decision (score 100, no doubt).
    pub fn certain(index: usize, text: &str, line_type: LineType, reason: &str) -> Self {
        let mut scores = BTreeMap::new();
        scores.insert(line_type, ClassificationScore::certain(reason));
        Self {
            index,
            text: text.to_string(),
            line_type,
            confidence_tier: ConfidenceTier::High,
            confidence: 100.0,
            doubt_score: 0.0,
            needs_review: false,
            top2_candidates: None,
            fallback_applied: None,
            scores,
        }
    }

    /// Set doubt and keep `needs_review` in sync.
    pub fn set_doubt(&mut self, doubt: f32) {
        self.doubt_score = clamp_score(doubt);
        self.needs_review = needs_review(self.doubt_score);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_thresholds() {
        assert_eq!(ConfidenceTier::from_score(70.0), ConfidenceTier::High);
        assert_eq!(ConfidenceTier::from_score(69.9), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_score(40.0), ConfidenceTier::Medium);
        assert_eq!(ConfidenceTier::from_score(39.9), ConfidenceTier::Low);
    }

    #[test]
    fn scores_are_clamped() {
        let s = ClassificationScore::new(140.0, vec![]);
        assert_eq!(s.score, 100.0);
        let s = ClassificationScore::new(-20.0, vec![]);
        assert_eq!(s.score, 0.0);
        assert_eq!(s.confidence_tier, ConfidenceTier::Low);
    }

    #[test]
    fn parses_lenient_names() {
        assert_eq!("heading-full".parse::<LineType>().unwrap(), LineType::HeadingFull);
        assert_eq!("HEADING_DETAIL".parse::<LineType>().unwrap(), LineType::HeadingDetail);
        assert_eq!("headingPlace".parse::<LineType>().unwrap(), LineType::HeadingPlace);
        assert_eq!("basmala".parse::<LineType>().unwrap(), LineType::Invocation);
        assert!("montage".parse::<LineType>().is_err());
    }

    #[test]
    fn serde_uses_kebab_case() {
        let s = serde_json::to_string(&LineType::HeadingNumberOnly).unwrap();
        assert_eq!(s, "\"heading-number-only\"");
    }

    #[test]
    fn needs_review_tracks_doubt() {
        let mut r = LineClassification::certain(0, "x", LineType::Action, "test");
        r.set_doubt(59.0);
        assert!(!r.needs_review);
        r.set_doubt(60.0);
        assert!(r.needs_review);
    }
}
