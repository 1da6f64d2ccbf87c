//! Line classification pipeline.
//!
//! raw text → line split → scene-header parser consumes heading blocks →
//! remaining lines are scored (context window + document memory + learned
//! weights) → doubt/fallback resolver fixes the type → memory update.
//!
//! Lines are resolved strictly in order: every line sees the final types of
//! the lines before it. Audit, review and diagnostics are optional post-passes
//! over the returned batch.

pub mod audit;
pub mod context;
pub mod diagnostics;
pub mod doubt;
pub mod learning;
pub mod memory;
pub mod review;
pub mod scene_header;
pub mod scoring;

use std::sync::Arc;

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ClassifierConfig;
use crate::line_type::{ClassificationScore, LineClassification, LineType};
use crate::vocab::{self, Vocabulary};

pub use audit::{AuditLine, AuditSuggestion, KnowledgeBase, RuleAuditor, Severity};
pub use context::{ContextBuilder, LineContext};
pub use diagnostics::{diagnose, diagnose_all, ConfidenceDiagnostics};
pub use doubt::DoubtResolver;
pub use learning::AdaptiveWeights;
pub use memory::{AddConfidence, DocumentMemory, KnownConfidence};
pub use review::{ReviewOrchestrator, ReviewOutcome, ReviewSettings};
pub use scene_header::{SceneHeader, SceneHeaderParser};
pub use scoring::{LineEvidence, ScoringEngine};

/// How per-line decisions are combined into a document.
///
/// Only greedy left-to-right resolution exists; a sequence-optimal resolver
/// would be added as another variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStrategy {
    #[default]
    Greedy,
}

/// Per-line debug logs are opt-in via CLASSIFIER_DEV_LOG=1 and only in
/// debug builds. Raw text is never logged.
pub(crate) fn dev_logging_enabled() -> bool {
    cfg!(debug_assertions) && std::env::var("CLASSIFIER_DEV_LOG").ok().as_deref() == Some("1")
}

/// Short stable id for a line of text.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn log_decision(record: &LineClassification) {
    if !dev_logging_enabled() {
        return;
    }
    let id = anon_hash(&record.text);
    debug!(
        target: "classifier",
        %id,
        index = record.index,
        line_type = %record.line_type,
        confidence = record.confidence,
        doubt = record.doubt_score,
        fallback = record.fallback_applied.is_some(),
    );
}

#[derive(Debug, Clone)]
pub struct Classifier {
    vocab: Arc<Vocabulary>,
    context: ContextBuilder,
    scoring: ScoringEngine,
    resolver: DoubtResolver,
    max_heading_continuation: usize,
    strategy: ResolutionStrategy,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &ClassifierConfig) -> Self {
        let vocab = Vocabulary::shared();
        Self {
            context: ContextBuilder::new(cfg.classifier.context_window),
            scoring: ScoringEngine::new(vocab.clone()),
            resolver: DoubtResolver::new(vocab.clone()),
            max_heading_continuation: cfg.classifier.max_heading_continuation,
            strategy: ResolutionStrategy::Greedy,
            vocab,
        }
    }

    /// Classify newline-delimited `text`.
    ///
    /// `previous_types` are the resolved types of lines that precede `text`
    /// (e.g. earlier parts of the same document); they shape context but are
    /// not re-emitted. `memory` is read and updated; `learner` only read.
    pub fn classify(
        &self,
        text: &str,
        previous_types: &[LineType],
        memory: &mut DocumentMemory,
        learner: Option<&AdaptiveWeights>,
    ) -> Vec<LineClassification> {
        let lines: Vec<&str> = text.lines().collect();
        match self.strategy {
            ResolutionStrategy::Greedy => {
                self.classify_greedy(&lines, previous_types, memory, learner)
            }
        }
    }

    fn classify_greedy(
        &self,
        lines: &[&str],
        previous_types: &[LineType],
        memory: &mut DocumentMemory,
        learner: Option<&AdaptiveWeights>,
    ) -> Vec<LineClassification> {
        crate::metrics::ensure_metrics_described();
        let parser = SceneHeaderParser::new(&self.vocab)
            .with_max_continuation(self.max_heading_continuation);

        let mut out: Vec<LineClassification> = Vec::with_capacity(lines.len());
        let mut resolved: Vec<LineType> = previous_types.to_vec();
        let mut i = 0;

        while i < lines.len() {
            let raw = lines[i];
            if raw.trim().is_empty() {
                let record = LineClassification::certain(i, raw, LineType::Blank, "empty line");
                self.emit(record, &mut out, &mut resolved);
                i += 1;
                continue;
            }

            if let Some(header) = parser.parse(lines, i, memory) {
                self.emit_header(&header, &mut out, &mut resolved, memory);
                i += header.consumed_line_count.max(1);
                continue;
            }

            let record = {
                let ctx = self.context.build(lines, i, &resolved);
                match self.scoring.score(&ctx, memory, learner) {
                    LineEvidence::ClosedForm { line_type, score } => {
                        closed_form_record(i, raw, line_type, score)
                    }
                    LineEvidence::Contested { scores } => {
                        self.resolver.resolve(&ctx, memory, scores)
                    }
                }
            };

            if record.line_type == LineType::Character {
                let confidence = if vocab::ends_with_colon(raw) {
                    AddConfidence::High
                } else {
                    AddConfidence::Medium
                };
                memory.add_character(raw, confidence);
            }
            self.emit(record, &mut out, &mut resolved);
            i += 1;
        }

        let needs_review = out.iter().filter(|r| r.needs_review).count();
        info!(lines = out.len(), needs_review, "classified batch");
        out
    }

    fn emit_header(
        &self,
        header: &SceneHeader,
        out: &mut Vec<LineClassification>,
        resolved: &mut Vec<LineType>,
        memory: &mut DocumentMemory,
    ) {
        for hl in &header.lines {
            let record =
                LineClassification::certain(hl.index, &hl.text, hl.line_type, "scene heading");
            self.emit(record, out, resolved);
        }
        if let (Some(action), Some(last)) = (&header.remaining_action, header.lines.last()) {
            let record = LineClassification::certain(
                last.index,
                action,
                LineType::Action,
                "action split from heading",
            );
            self.emit(record, out, resolved);
        }
        if let Some(place) = &header.place {
            for part in place.split(" - ").map(str::trim).filter(|p| !p.is_empty()) {
                memory.add_place(part, AddConfidence::High);
            }
        }
    }

    fn emit(
        &self,
        record: LineClassification,
        out: &mut Vec<LineClassification>,
        resolved: &mut Vec<LineType>,
    ) {
        counter!("classifier_lines_total", "type" => record.line_type.as_str()).increment(1);
        if record.needs_review {
            counter!("classifier_needs_review_total").increment(1);
        }
        if record.fallback_applied.is_some() {
            counter!("classifier_fallbacks_total").increment(1);
        }
        log_decision(&record);
        resolved.push(record.line_type);
        out.push(record);
    }
}

fn closed_form_record(
    index: usize,
    text: &str,
    line_type: LineType,
    score: ClassificationScore,
) -> LineClassification {
    let mut record = LineClassification::certain(index, text, line_type, "");
    record.scores.insert(line_type, score);
    record
}

/// One-shot classification with a fresh default classifier.
///
/// A `None` memory means a throwaway memory for this call only.
pub fn classify(
    text: &str,
    previous_types: Option<&[LineType]>,
    memory: Option<&mut DocumentMemory>,
) -> Vec<LineClassification> {
    let classifier = Classifier::default();
    let prev = previous_types.unwrap_or(&[]);
    match memory {
        Some(m) => classifier.classify(text, prev, m, None),
        None => classifier.classify(text, prev, &mut DocumentMemory::new(), None),
    }
}
