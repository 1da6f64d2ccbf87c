//! Confidence diagnostics: a secondary context/pattern/history score for UI
//! and debugging. Never feeds back into type selection.

use serde::Serialize;
use strsim::normalized_levenshtein;

use crate::classify::audit::is_valid_transition;
use crate::classify::context::in_dialogue_block;
use crate::line_type::{clamp_score, LineClassification, LineType};
use crate::vocab::normalize_name;

const CONTEXT_WEIGHT: f32 = 0.4;
const PATTERN_WEIGHT: f32 = 0.35;
const HISTORY_WEIGHT: f32 = 0.25;
/// Repeats of the same transition beyond this add nothing.
const TRANSITION_SATURATION: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfidenceDiagnostics {
    pub index: usize,
    pub overall: f32,
    pub context: f32,
    pub pattern: f32,
    pub history: f32,
    pub notes: Vec<String>,
}

/// Diagnose `lines[index]` against everything before it.
pub fn diagnose(lines: &[LineClassification], index: usize) -> Option<ConfidenceDiagnostics> {
    let line = lines.get(index)?;
    let earlier = &lines[..index];
    let mut notes = Vec::new();

    let context = context_factor(line, earlier, &mut notes);
    let pattern = clamp_score(line.confidence);
    let history = history_factor(line, earlier, &mut notes);
    let overall = clamp_score(
        CONTEXT_WEIGHT * context + PATTERN_WEIGHT * pattern + HISTORY_WEIGHT * history,
    );

    Some(ConfidenceDiagnostics {
        index,
        overall,
        context,
        pattern,
        history,
        notes,
    })
}

pub fn diagnose_all(lines: &[LineClassification]) -> Vec<ConfidenceDiagnostics> {
    (0..lines.len()).filter_map(|i| diagnose(lines, i)).collect()
}

fn context_factor(
    line: &LineClassification,
    earlier: &[LineClassification],
    notes: &mut Vec<String>,
) -> f32 {
    if line.line_type == LineType::Blank {
        return 100.0;
    }
    let prev = earlier
        .iter()
        .rev()
        .map(|l| l.line_type)
        .find(|t| *t != LineType::Blank);
    let mut score = match prev {
        None => 70.0,
        Some(p) if is_valid_transition(p, line.line_type) => 90.0,
        Some(p) => {
            notes.push(format!("unusual transition {p} -> {}", line.line_type));
            20.0
        }
    };

    let types: Vec<LineType> = earlier.iter().map(|l| l.line_type).collect();
    let in_block = in_dialogue_block(&types);
    match line.line_type {
        LineType::Dialogue | LineType::Parenthetical if in_block => score += 10.0,
        LineType::Dialogue if !in_block => {
            notes.push("dialogue outside a dialogue block".into());
            score -= 20.0;
        }
        _ => {}
    }
    clamp_score(score)
}

fn history_factor(
    line: &LineClassification,
    earlier: &[LineClassification],
    notes: &mut Vec<String>,
) -> f32 {
    let non_blank: Vec<&LineClassification> = earlier
        .iter()
        .filter(|l| l.line_type != LineType::Blank)
        .collect();
    if non_blank.is_empty() {
        notes.push("no document history yet".into());
        return 50.0;
    }

    let prev = non_blank.last().map(|l| l.line_type);
    let repeats = non_blank
        .windows(2)
        .filter(|w| Some(w[0].line_type) == prev && w[1].line_type == line.line_type)
        .count();
    let frequency = repeats.min(TRANSITION_SATURATION) as f32 / TRANSITION_SATURATION as f32 * 60.0;

    let me = normalize_name(&line.text);
    let similarity = non_blank
        .iter()
        .filter(|l| l.line_type == line.line_type)
        .map(|l| normalized_levenshtein(&me, &normalize_name(&l.text)))
        .fold(0.0_f64, f64::max) as f32;
    if similarity > 0.9 {
        notes.push("near-duplicate of an earlier line of the same type".into());
    }

    clamp_score(frequency + similarity * 40.0)
}
