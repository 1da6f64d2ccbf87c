//! Adaptive weight learner.
//!
//! Corrections are an append-only log. Weights are a pure fold over that log:
//! every time a `(preceding → wrong)` pair is seen again, the wrong transition
//! is multiplied by 0.7 and the transition to the type the user picked by 1.3.
//! Factors compound with no decay or normalization.
//!
//! JSON shape (export/import and on-disk file):
//! {
//!   "corrections": [ { "originalType": "character", ... } ],
//!   "weights": { "heading-detail->character": 0.7 },
//!   "exportedAt": "2026-01-01T00:00:00Z"
//! }

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::classify::context::LineContext;
use crate::error::{ClassifierError, Result};
use crate::line_type::LineType;

pub const WRONG_FACTOR: f32 = 0.7;
pub const CORRECT_FACTOR: f32 = 1.3;
/// A pattern seen more often than this raises a diagnostic warning.
pub const RECURRING_WARN_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionEvent {
    pub original_type: LineType,
    pub corrected_type: LineType,
    #[serde(default)]
    pub preceding_type: Option<LineType>,
    pub line_text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default = "default_event_weight")]
    pub weight: f32,
}

fn default_event_weight() -> f32 {
    1.0
}

/// Export/import document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightsExport {
    pub corrections: Vec<CorrectionEvent>,
    pub weights: BTreeMap<String, f32>,
    pub exported_at: DateTime<Utc>,
}

/// `"{preceding}->{candidate}"`, with `none` at document start.
pub fn pattern_key(preceding: Option<LineType>, candidate: LineType) -> String {
    format!(
        "{}->{}",
        preceding.map_or("none", |p| p.as_str()),
        candidate.as_str()
    )
}

#[derive(Debug, Clone, Default)]
pub struct AdaptiveWeights {
    corrections: Vec<CorrectionEvent>,
    weights: BTreeMap<String, f32>,
}

impl AdaptiveWeights {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a correction and refold the weights. Returns diagnostic warnings
    /// for patterns that keep recurring.
    pub fn record_correction(
        &mut self,
        line_text: &str,
        original_type: LineType,
        corrected_type: LineType,
        preceding_type: Option<LineType>,
    ) -> Vec<String> {
        self.corrections.push(CorrectionEvent {
            original_type,
            corrected_type,
            preceding_type,
            line_text: line_text.to_string(),
            timestamp: Utc::now(),
            weight: 1.0,
        });
        self.recompute();
        self.recurring_warnings()
    }

    fn recompute(&mut self) {
        let mut seen: HashMap<(Option<LineType>, LineType), usize> = HashMap::new();
        let mut weights = BTreeMap::new();
        for ev in &self.corrections {
            let n = seen.entry((ev.preceding_type, ev.original_type)).or_insert(0);
            *n += 1;
            if *n < 2 {
                continue;
            }
            *weights
                .entry(pattern_key(ev.preceding_type, ev.original_type))
                .or_insert(1.0) *= WRONG_FACTOR;
            *weights
                .entry(pattern_key(ev.preceding_type, ev.corrected_type))
                .or_insert(1.0) *= CORRECT_FACTOR;
        }
        self.weights = weights;
    }

    fn recurring_warnings(&self) -> Vec<String> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for ev in &self.corrections {
            *counts
                .entry(pattern_key(ev.preceding_type, ev.original_type))
                .or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|(_, n)| *n > RECURRING_WARN_COUNT)
            .map(|(key, n)| {
                warn!(pattern = %key, count = n, "recurring correction pattern");
                format!("pattern {key} corrected {n} times")
            })
            .collect()
    }

    /// Multiplicative factor for a transition (1.0 when unseen).
    pub fn weight_for(&self, preceding: Option<LineType>, candidate: LineType) -> f32 {
        self.weights
            .get(&pattern_key(preceding, candidate))
            .copied()
            .unwrap_or(1.0)
    }

    pub fn improve_score(&self, line_type: LineType, ctx: &LineContext<'_>, base: f32) -> f32 {
        base * self.weight_for(ctx.previous_type(), line_type)
    }

    pub fn corrections(&self) -> &[CorrectionEvent] {
        &self.corrections
    }

    pub fn weights(&self) -> &BTreeMap<String, f32> {
        &self.weights
    }

    pub fn is_empty(&self) -> bool {
        self.corrections.is_empty()
    }

    pub fn export(&self) -> WeightsExport {
        WeightsExport {
            corrections: self.corrections.clone(),
            weights: self.weights.clone(),
            exported_at: Utc::now(),
        }
    }

    pub fn export_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.export())
            .map_err(|e| ClassifierError::WeightsImport(e.to_string()))
    }

    /// Replace state wholesale. On any error the current state is untouched.
    pub fn import_json(&mut self, json: &str) -> Result<()> {
        let doc: WeightsExport = serde_json::from_str(json)
            .map_err(|e| ClassifierError::WeightsImport(e.to_string()))?;
        self.import(doc)
    }

    pub fn import(&mut self, doc: WeightsExport) -> Result<()> {
        if let Some((k, w)) = doc
            .weights
            .iter()
            .find(|(_, w)| !w.is_finite() || **w <= 0.0)
        {
            return Err(ClassifierError::WeightsImport(format!(
                "weight {k} = {w} is not a positive number"
            )));
        }
        self.corrections = doc.corrections;
        self.weights = doc.weights;
        Ok(())
    }

    /// Write the export JSON via a temp file + rename.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = self.export_json()?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let mut w = Self::new();
        w.import_json(&data)?;
        Ok(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn unique_tmp_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        dir.push(format!("learner_test_{}", nanos));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn single_correction_changes_nothing() {
        let mut w = AdaptiveWeights::new();
        let after_marker = Some(LineType::HeadingNumberOnly);
        w.record_correction(
            "المقهى",
            LineType::Character,
            LineType::HeadingDetail,
            after_marker,
        );
        assert_eq!(w.weight_for(after_marker, LineType::Character), 1.0);
    }

    #[test]
    fn repeated_corrections_compound() {
        let prev = Some(LineType::HeadingNumberOnly);
        let mut w = AdaptiveWeights::new();
        for text in ["المقهى", "الحديقة", "السوق"] {
            w.record_correction(text, LineType::Character, LineType::HeadingDetail, prev);
        }
        let wrong = w.weight_for(prev, LineType::Character);
        let right = w.weight_for(prev, LineType::HeadingDetail);
        assert!((wrong - 0.49).abs() < 1e-4);
        assert!((right - 1.69).abs() < 1e-4);
        assert_eq!(w.weight_for(None, LineType::Character), 1.0);
    }

    #[test]
    fn warns_past_three_repeats() {
        let mut w = AdaptiveWeights::new();
        let mut last = Vec::new();
        for _ in 0..4 {
            last = w.record_correction("x", LineType::Dialogue, LineType::Action, None);
        }
        assert_eq!(last.len(), 1);
        assert!(last[0].contains("none->dialogue"));
    }

    #[test]
    fn bad_import_keeps_state() {
        let mut w = AdaptiveWeights::new();
        w.record_correction("x", LineType::Dialogue, LineType::Action, None);
        w.record_correction("y", LineType::Dialogue, LineType::Action, None);
        let before = w.weights().clone();
        assert!(w.import_json("{not json").is_err());
        let negative = r#"{"corrections":[],"weights":{"none->action":-1.0},
            "exportedAt":"2026-01-01T00:00:00Z"}"#;
        assert!(w.import_json(negative).is_err());
        assert_eq!(w.weights(), &before);
        assert_eq!(w.corrections().len(), 2);
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = unique_tmp_dir();
        let path = dir.join("weights.json");
        let mut w = AdaptiveWeights::new();
        w.record_correction("x", LineType::Dialogue, LineType::Action, Some(LineType::Action));
        w.record_correction("y", LineType::Dialogue, LineType::Action, Some(LineType::Action));
        w.save_to_file(&path).unwrap();
        let loaded = AdaptiveWeights::load_from_file(&path).unwrap();
        assert_eq!(loaded.weights(), w.weights());
        assert_eq!(loaded.corrections().len(), 2);
        let _ = fs::remove_dir_all(dir);
    }
}
