//! Rule-based auditor: an independent, advisory pass over an already
//! classified batch.
//!
//! Two checks per line:
//! 1. knowledge base: ordered `{pattern, rules}` entries. The first entry whose
//!    pattern matches and whose rule rejects the current type emits a
//!    suggestion to that rule's `confirmType`.
//! 2. transitions: the previous non-blank type must allow the current one.
//!
//! Patterns run against diacritic-free, alef-unified text (see
//! [`crate::vocab::strip_diacritics`]). The batch is never mutated.

use chrono::{DateTime, Utc};
use metrics::counter;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ClassifierError, Result};
use crate::line_type::{LineClassification, LineType};
use crate::vocab::strip_diacritics;

const BUILTIN_KB: &str = include_str!("../../config/knowledge_base.json");

/// Boost applied to the current confidence when a rule fires.
pub const RULE_CONFIDENCE_BOOST: f32 = 15.0;
/// Transition problems are only reported below this confidence.
pub const TRANSITION_CONFIDENCE_CEILING: f32 = 80.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseRule {
    pub confirm_type: LineType,
    #[serde(default)]
    pub reject_types: Vec<LineType>,
    #[serde(default)]
    pub min_confidence: f32,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseEntry {
    pub pattern: String,
    pub rules: Vec<KnowledgeBaseRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBaseExport {
    pub rules: Vec<KnowledgeBaseEntry>,
    #[serde(default = "Utc::now")]
    pub exported_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct CompiledEntry {
    entry: KnowledgeBaseEntry,
    re: Regex,
}

/// Ordered, precompiled knowledge base.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: Vec<CompiledEntry>,
}

impl KnowledgeBase {
    /// Rules shipped in `config/knowledge_base.json`.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_KB)
    }

    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let doc: KnowledgeBaseExport = serde_json::from_str(json)
            .map_err(|e| ClassifierError::KnowledgeBaseImport(e.to_string()))?;
        Self::compile(doc.rules)
    }

    pub fn compile(rules: Vec<KnowledgeBaseEntry>) -> Result<Self> {
        let entries = rules
            .into_iter()
            .map(|entry| {
                let re = Regex::new(&format!("(?i){}", entry.pattern)).map_err(|e| {
                    ClassifierError::KnowledgeBaseImport(format!(
                        "pattern {:?}: {e}",
                        entry.pattern
                    ))
                })?;
                Ok(CompiledEntry { entry, re })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { entries })
    }

    /// Replace every entry. On failure the current rules stay in place.
    pub fn import_json(&mut self, json: &str) -> Result<()> {
        *self = Self::from_json(json)?;
        Ok(())
    }

    pub fn export(&self) -> KnowledgeBaseExport {
        KnowledgeBaseExport {
            rules: self.entries.iter().map(|c| c.entry.clone()).collect(),
            exported_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First `(entry, rule)` that matches `text` and rejects `current`.
    fn first_rejection(
        &self,
        text: &str,
        current: LineType,
    ) -> Option<(&KnowledgeBaseEntry, &KnowledgeBaseRule)> {
        let norm = strip_diacritics(text.trim());
        self.entries
            .iter()
            .filter(|c| c.re.is_match(&norm))
            .find_map(|c| {
                c.entry
                    .rules
                    .iter()
                    .find(|r| r.reject_types.contains(&current))
                    .map(|r| (&c.entry, r))
            })
    }
}

/// Allowed successors of `prev`. The first entry is the default suggestion.
pub fn valid_next(prev: LineType) -> &'static [LineType] {
    use LineType::*;
    match prev {
        Invocation => &[HeadingFull, HeadingNumberOnly, Action, Transition, Blank],
        HeadingFull => &[HeadingDetail, HeadingPlace, Action, Blank, Character],
        HeadingNumberOnly => &[HeadingDetail, HeadingPlace, Action, Blank],
        HeadingDetail => &[HeadingPlace, HeadingDetail, Action, Character, Blank],
        HeadingPlace => &[Action, HeadingDetail, HeadingPlace, Character, Blank],
        Action => &[Action, Character, Transition, HeadingFull, HeadingNumberOnly, Blank],
        Character => &[Dialogue, Parenthetical, Blank],
        Parenthetical => &[Dialogue, Blank],
        Dialogue => &[
            Dialogue,
            Character,
            Action,
            Parenthetical,
            Transition,
            HeadingFull,
            HeadingNumberOnly,
            Blank,
        ],
        Transition => &[HeadingFull, HeadingNumberOnly, Action, Blank],
        Blank => &LineType::ALL,
    }
}

pub fn is_valid_transition(prev: LineType, next: LineType) -> bool {
    next == LineType::Blank || valid_next(prev).contains(&next)
}

/// One line of the batch under audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLine {
    pub text: String,
    #[serde(rename = "type")]
    pub line_type: LineType,
    pub confidence: f32,
}

impl From<&LineClassification> for AuditLine {
    fn from(r: &LineClassification) -> Self {
        Self {
            text: r.text.clone(),
            line_type: r.line_type,
            confidence: r.confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuditSource {
    KnowledgeBase,
    Transition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSuggestion {
    pub line_index: usize,
    pub current_type: LineType,
    pub suggested_type: LineType,
    pub confidence: f32,
    pub severity: Severity,
    pub source: AuditSource,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct RuleAuditor {
    kb: KnowledgeBase,
}

impl RuleAuditor {
    pub fn new(kb: KnowledgeBase) -> Self {
        Self { kb }
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn knowledge_base_mut(&mut self) -> &mut KnowledgeBase {
        &mut self.kb
    }

    /// Suggestions sorted high > medium > low, then by line.
    pub fn audit(&self, lines: &[AuditLine]) -> Vec<AuditSuggestion> {
        crate::metrics::ensure_metrics_described();
        let mut out = Vec::new();
        let mut prev: Option<LineType> = None;

        for (i, line) in lines.iter().enumerate() {
            if let Some((entry, rule)) = self.kb.first_rejection(&line.text, line.line_type) {
                let boosted = (line.confidence + RULE_CONFIDENCE_BOOST).min(100.0);
                if boosted >= rule.min_confidence {
                    let severity = if line.confidence < 60.0 {
                        Severity::High
                    } else {
                        Severity::Medium
                    };
                    let why = if rule.explanation.is_empty() {
                        entry.pattern.as_str()
                    } else {
                        rule.explanation.as_str()
                    };
                    out.push(AuditSuggestion {
                        line_index: i,
                        current_type: line.line_type,
                        suggested_type: rule.confirm_type,
                        confidence: boosted,
                        severity,
                        source: AuditSource::KnowledgeBase,
                        reason: why.to_string(),
                    });
                }
            }

            if let Some(p) = prev {
                if !is_valid_transition(p, line.line_type)
                    && line.confidence < TRANSITION_CONFIDENCE_CEILING
                {
                    let suggested = valid_next(p)[0];
                    out.push(AuditSuggestion {
                        line_index: i,
                        current_type: line.line_type,
                        suggested_type: suggested,
                        confidence: line.confidence,
                        severity: Severity::Low,
                        source: AuditSource::Transition,
                        reason: format!("{p} is not usually followed by {}", line.line_type),
                    });
                }
            }

            if line.line_type != LineType::Blank {
                prev = Some(line.line_type);
            }
        }

        out.sort_by(|a, b| a.severity.cmp(&b.severity).then(a.line_index.cmp(&b.line_index)));
        debug!(lines = lines.len(), suggestions = out.len(), "audit pass");
        counter!("audit_suggestions_total").increment(out.len() as u64);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, ty: LineType, confidence: f32) -> AuditLine {
        AuditLine {
            text: text.into(),
            line_type: ty,
            confidence,
        }
    }

    #[test]
    fn builtin_kb_compiles() {
        let kb = KnowledgeBase::builtin().unwrap();
        assert!(kb.len() >= 5);
    }

    #[test]
    fn kb_rule_flags_rejected_type() {
        let auditor = RuleAuditor::new(KnowledgeBase::builtin().unwrap());
        let out = auditor.audit(&[line("مشهد 3", LineType::Action, 50.0)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].suggested_type, LineType::HeadingNumberOnly);
        assert_eq!(out[0].confidence, 65.0);
        assert_eq!(out[0].severity, Severity::High);
    }

    #[test]
    fn confidence_is_capped_and_severity_medium() {
        let auditor = RuleAuditor::new(KnowledgeBase::builtin().unwrap());
        let out = auditor.audit(&[line("قطع إلى:", LineType::Action, 95.0)]);
        assert_eq!(out[0].confidence, 100.0);
        assert_eq!(out[0].severity, Severity::Medium);
    }

    #[test]
    fn invalid_transition_is_low_severity() {
        let auditor = RuleAuditor::new(KnowledgeBase::empty());
        let out = auditor.audit(&[
            line("أحمد:", LineType::Character, 90.0),
            line("", LineType::Blank, 100.0),
            line("يدخل عمر", LineType::Action, 50.0),
        ]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].line_index, 2);
        assert_eq!(out[0].suggested_type, LineType::Dialogue);
        assert_eq!(out[0].severity, Severity::Low);
    }

    #[test]
    fn confident_lines_skip_transition_check() {
        let auditor = RuleAuditor::new(KnowledgeBase::empty());
        let out = auditor.audit(&[
            line("أحمد:", LineType::Character, 90.0),
            line("يدخل عمر", LineType::Action, 85.0),
        ]);
        assert!(out.is_empty());
    }

    #[test]
    fn results_sorted_by_severity() {
        let auditor = RuleAuditor::new(KnowledgeBase::builtin().unwrap());
        let out = auditor.audit(&[
            line("أحمد:", LineType::Character, 90.0),
            line("يدخل عمر", LineType::Action, 70.0),
            line("مشهد 2", LineType::Action, 30.0),
        ]);
        assert!(out.len() >= 2);
        assert_eq!(out[0].severity, Severity::High);
        assert!(out.windows(2).all(|w| w[0].severity <= w[1].severity));
    }

    #[test]
    fn bad_import_keeps_rules() {
        let mut kb = KnowledgeBase::builtin().unwrap();
        let before = kb.len();
        let bad = r#"{"rules":[{"pattern":"(unclosed","rules":[]}]}"#;
        assert!(kb.import_json(bad).is_err());
        assert!(kb.import_json("not json").is_err());
        assert_eq!(kb.len(), before);

        let good = r#"{"rules":[{"pattern":"^x$",
            "rules":[{"confirmType":"action","rejectTypes":["dialogue"]}]}]}"#;
        kb.import_json(good).unwrap();
        assert_eq!(kb.len(), 1);
    }
}
