//! External review orchestrator.
//!
//! Only lines whose doubt exceeds the threshold are sent out, in fixed-size
//! batches with a ±N line context window. Batches run one after another; each
//! request is capped by a timeout and retried with exponential backoff on
//! HTTP 429 only. Any other failure, including a malformed reply, degrades
//! that batch to "no suggestions" and the pass continues.
//!
//! Suggestions are applied only after every batch has finished. A cancelled
//! pass applies nothing and returns the batch exactly as it came in.
//!
//! The rule-based doubt stays authoritative: suggestions change the type and
//! confidence of a line but never its doubt score.

use std::collections::{BTreeSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::classify::doubt::dash_adjustment;
use crate::config::review::{ReviewConfig, DEFAULT_REVIEW_MODEL, MAX_ATTEMPTS, MAX_TIMEOUT_SECS};
use crate::config::ReviewSection;
use crate::error::{ClassifierError, Result};
use crate::line_type::{ClassificationScore, ConfidenceTier, LineClassification, LineType};
use crate::vocab::Vocabulary;

/// Heading-detail lines at or above this confidence are trusted locally.
pub const TRUSTED_HEADING_DETAIL: f32 = 80.0;

// ------------------------------------------------------------
// Wire types
// ------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewMessage {
    pub role: String,
    pub content: String,
}

/// `{ messages, model, temperature }` as posted to the review endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub messages: Vec<ReviewMessage>,
    pub model: String,
    pub temperature: f32,
}

impl ReviewRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![ReviewMessage {
                role: "user".into(),
                content: prompt.into(),
            }],
            model: model.into(),
            temperature: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSuggestion {
    pub line_index: usize,
    pub suggested_type: LineType,
    pub confidence: f32,
    pub reason: String,
}

// ------------------------------------------------------------
// Providers
// ------------------------------------------------------------

/// Transport to an external classification model. Returns the reply text
/// (the part that should contain the JSON array).
#[async_trait]
pub trait ReviewProvider: Send + Sync {
    async fn complete(&self, request: &ReviewRequest) -> Result<String>;

    fn name(&self) -> &'static str;

    fn enabled(&self) -> bool {
        true
    }
}

pub type DynReviewProvider = Arc<dyn ReviewProvider>;

/// Factory: build a provider according to config and environment.
///
/// * `REVIEW_TEST_MODE=mock` gives a deterministic mock that never suggests anything.
/// * `enabled == false` gives a disabled provider.
/// * Otherwise the HTTP provider; a client build failure falls back to disabled.
pub fn build_review_provider(cfg: &ReviewConfig) -> DynReviewProvider {
    if std::env::var("REVIEW_TEST_MODE")
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockReviewProvider::new("[]"));
    }
    if !cfg.enabled {
        return Arc::new(DisabledReviewProvider);
    }
    match HttpReviewProvider::new(cfg) {
        Ok(p) => Arc::new(p),
        Err(e) => {
            warn!(error = %e, "review provider unavailable, running without external review");
            Arc::new(DisabledReviewProvider)
        }
    }
}

pub struct HttpReviewProvider {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout_secs: u64,
}

impl HttpReviewProvider {
    pub fn new(cfg: &ReviewConfig) -> Result<Self> {
        let timeout_secs = cfg.timeout_secs.clamp(1, MAX_TIMEOUT_SECS);
        let http = reqwest::Client::builder()
            .user_agent("script-line-classifier/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ClassifierError::Config(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint.clone(),
            api_key: cfg.api_key.clone(),
            timeout_secs,
        })
    }
}

#[async_trait]
impl ReviewProvider for HttpReviewProvider {
    async fn complete(&self, request: &ReviewRequest) -> Result<String> {
        let mut req = self.http.post(&self.endpoint).json(request);
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }
        let resp = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ClassifierError::Timeout(self.timeout_secs)
            } else {
                ClassifierError::Network(e.to_string())
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ClassifierError::RateLimited { attempts: 1 });
        }
        if !status.is_success() {
            return Err(ClassifierError::Status(status.as_u16()));
        }
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ClassifierError::ResponseParse(e.to_string()))?;
        extract_content(&body)
            .ok_or_else(|| ClassifierError::ResponseParse("reply has no content".into()))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Never called; the orchestrator skips the pass entirely.
pub struct DisabledReviewProvider;

#[async_trait]
impl ReviewProvider for DisabledReviewProvider {
    async fn complete(&self, _request: &ReviewRequest) -> Result<String> {
        Ok("[]".to_string())
    }

    fn name(&self) -> &'static str {
        "disabled"
    }

    fn enabled(&self) -> bool {
        false
    }
}

/// Scripted reply for [`MockReviewProvider`].
#[derive(Debug, Clone)]
pub enum MockReply {
    Content(String),
    RateLimited,
    Status(u16),
    Network(String),
    /// Wait, then answer. Used to exercise the timeout.
    Delayed(Duration, String),
}

/// Deterministic provider for tests and local runs. Pops scripted replies in
/// order, then keeps answering with `fallback`.
pub struct MockReviewProvider {
    replies: Mutex<VecDeque<MockReply>>,
    fallback: String,
    calls: AtomicUsize,
    requests: Mutex<Vec<ReviewRequest>>,
}

impl MockReviewProvider {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: fallback.into(),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn scripted(replies: impl IntoIterator<Item = MockReply>) -> Self {
        let mock = Self::new("[]");
        mock.replies
            .lock()
            .expect("poisoned mock")
            .extend(replies);
        mock
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ReviewRequest> {
        self.requests.lock().expect("poisoned mock").clone()
    }
}

#[async_trait]
impl ReviewProvider for MockReviewProvider {
    async fn complete(&self, request: &ReviewRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .expect("poisoned mock")
            .push(request.clone());
        let next = self.replies.lock().expect("poisoned mock").pop_front();
        match next {
            None => Ok(self.fallback.clone()),
            Some(MockReply::Content(c)) => Ok(c),
            Some(MockReply::RateLimited) => Err(ClassifierError::RateLimited { attempts: 1 }),
            Some(MockReply::Status(code)) => Err(ClassifierError::Status(code)),
            Some(MockReply::Network(msg)) => Err(ClassifierError::Network(msg)),
            Some(MockReply::Delayed(wait, c)) => {
                tokio::time::sleep(wait).await;
                Ok(c)
            }
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Reply parsing
// ------------------------------------------------------------

/// `{content}` or the chat-completions `{choices[0].message.content}`.
pub fn extract_content(body: &serde_json::Value) -> Option<String> {
    body.get("content")
        .and_then(|c| c.as_str())
        .or_else(|| {
            body.pointer("/choices/0/message/content")
                .and_then(|c| c.as_str())
        })
        .map(str::to_string)
}

/// Parse the fenced or bare JSON array inside a model reply. Items with a
/// missing index or an unknown type are dropped; confidence is clamped.
pub fn parse_suggestions(content: &str) -> Result<Vec<ReviewSuggestion>> {
    let items = fenced_array(content)
        .or_else(|| first_object_array(content))
        .ok_or_else(|| ClassifierError::ResponseParse("no JSON array in reply".into()))?;

    let out = items
        .iter()
        .filter_map(|item| {
            let line_index = item.get("index")?.as_u64()? as usize;
            let suggested_type = item
                .get("suggestedType")
                .or_else(|| item.get("type"))?
                .as_str()?
                .parse::<LineType>()
                .ok()?;
            let confidence = item
                .get("confidence")
                .and_then(|c| c.as_f64())
                .unwrap_or(50.0)
                .clamp(0.0, 100.0) as f32;
            let reason = item
                .get("reason")
                .and_then(|r| r.as_str())
                .unwrap_or_default()
                .to_string();
            Some(ReviewSuggestion {
                line_index,
                suggested_type,
                confidence,
                reason,
            })
        })
        .collect();
    Ok(out)
}

fn fenced_array(content: &str) -> Option<Vec<serde_json::Value>> {
    const FENCE: &str = "```json";
    let start = content.find(FENCE)? + FENCE.len();
    let len = content[start..].find("```")?;
    serde_json::from_str(content[start..start + len].trim()).ok()
}

/// First `[` that opens a complete array of objects. Bracketed prose such as
/// `line [3]` is skipped and text after the array is ignored.
fn first_object_array(content: &str) -> Option<Vec<serde_json::Value>> {
    content.match_indices('[').find_map(|(i, _)| {
        let mut de = serde_json::Deserializer::from_str(&content[i..]);
        let items = Vec::<serde_json::Value>::deserialize(&mut de).ok()?;
        items.iter().all(serde_json::Value::is_object).then_some(items)
    })
}

/// Apply suggestions that disagree with the current type. Returns how many changed.
pub fn apply_suggestions(
    lines: &mut [LineClassification],
    suggestions: &[ReviewSuggestion],
) -> usize {
    let mut applied = 0;
    for s in suggestions {
        let Some(line) = lines.get_mut(s.line_index) else {
            continue;
        };
        if line.line_type == s.suggested_type {
            continue;
        }
        line.line_type = s.suggested_type;
        line.confidence = s.confidence;
        line.confidence_tier = ConfidenceTier::from_score(s.confidence);
        line.scores
            .entry(s.suggested_type)
            .or_insert_with(|| ClassificationScore::new(s.confidence, Vec::new()))
            .reasons
            .push(format!("review: {}", s.reason));
        applied += 1;
    }
    if applied > 0 {
        counter!("review_suggestions_applied_total").increment(applied as u64);
    }
    applied
}

// ------------------------------------------------------------
// Orchestrator
// ------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ReviewSettings {
    /// Lines with doubt strictly above this are reviewed.
    pub doubt_threshold: f32,
    pub batch_size: usize,
    pub context_radius: usize,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            doubt_threshold: 30.0,
            batch_size: 20,
            context_radius: 3,
            timeout: Duration::from_secs(MAX_TIMEOUT_SECS),
            max_attempts: MAX_ATTEMPTS,
            base_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl ReviewSettings {
    pub fn from_config(section: &ReviewSection, cfg: &ReviewConfig) -> Self {
        Self {
            doubt_threshold: section.doubt_threshold,
            batch_size: section.batch_size.max(1),
            context_radius: section.context_radius,
            timeout: Duration::from_secs(cfg.timeout_secs.clamp(1, MAX_TIMEOUT_SECS)),
            max_attempts: cfg.max_attempts.clamp(1, MAX_ATTEMPTS),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub candidates: usize,
    pub batches: usize,
    pub failed_batches: usize,
    pub applied: usize,
    pub cancelled: bool,
    pub suggestions: Vec<ReviewSuggestion>,
}

pub struct ReviewOrchestrator {
    provider: DynReviewProvider,
    settings: ReviewSettings,
    model: RwLock<String>,
    vocab: Arc<Vocabulary>,
}

impl ReviewOrchestrator {
    pub fn new(
        provider: DynReviewProvider,
        settings: ReviewSettings,
        model: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            settings,
            model: RwLock::new(model.into()),
            vocab: Vocabulary::shared(),
        }
    }

    /// Provider with default settings and the baseline model.
    pub fn with_provider(provider: DynReviewProvider) -> Self {
        Self::new(provider, ReviewSettings::default(), DEFAULT_REVIEW_MODEL)
    }

    pub fn settings(&self) -> &ReviewSettings {
        &self.settings
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn model(&self) -> String {
        self.model
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Runtime override of the model id.
    pub fn set_model(&self, model: impl Into<String>) {
        *self.model.write().unwrap_or_else(|e| e.into_inner()) = model.into();
    }

    fn trusted_locally(&self, line: &LineClassification) -> bool {
        line.line_type == LineType::HeadingDetail
            && line.confidence >= TRUSTED_HEADING_DETAIL
            && dash_adjustment(&line.text, &self.vocab) <= 0.0
    }

    /// Positions of lines worth sending out.
    pub fn select_candidates(&self, lines: &[LineClassification]) -> Vec<usize> {
        lines
            .iter()
            .enumerate()
            .filter(|(_, l)| {
                l.doubt_score > self.settings.doubt_threshold && !self.trusted_locally(l)
            })
            .map(|(i, _)| i)
            .collect()
    }

    pub fn build_prompt(&self, lines: &[LineClassification], batch: &[usize]) -> String {
        let r = self.settings.context_radius;
        let mut shown = BTreeSet::new();
        for &i in batch {
            let hi = (i + r).min(lines.len().saturating_sub(1));
            shown.extend(i.saturating_sub(r)..=hi);
        }

        let mut p = String::from(PROMPT_HEADER);
        p.push_str("\nLines (>> marks the lines to review):\n");
        for i in shown {
            let Some(l) = lines.get(i) else { continue };
            let marker = if batch.contains(&i) { ">>" } else { "  " };
            p.push_str(&format!("{marker} [{i}] ({}) {}\n", l.line_type, l.text.trim()));
        }
        p.push_str(PROMPT_FOOTER);
        p
    }

    /// Review the uncertain lines of `lines` in place.
    pub async fn review(
        &self,
        lines: &mut [LineClassification],
        cancel: &CancellationToken,
    ) -> ReviewOutcome {
        crate::metrics::ensure_metrics_described();
        let mut outcome = ReviewOutcome::default();
        if !self.provider.enabled() {
            return outcome;
        }
        let candidates = self.select_candidates(lines);
        outcome.candidates = candidates.len();

        let mut pending = Vec::new();
        for batch in candidates.chunks(self.settings.batch_size) {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }
            outcome.batches += 1;
            counter!("review_batches_total").increment(1);

            let prompt = self.build_prompt(lines, batch);
            let reply = self.request(prompt, cancel).await;
            match reply.and_then(|c| parse_suggestions(&c)) {
                Ok(found) => {
                    debug!(batch = outcome.batches, found = found.len(), "review batch done");
                    pending.extend(found.into_iter().filter(|s| batch.contains(&s.line_index)));
                }
                Err(ClassifierError::Cancelled) => {
                    outcome.cancelled = true;
                    break;
                }
                Err(e) => {
                    outcome.failed_batches += 1;
                    counter!("review_batch_failures_total").increment(1);
                    warn!(
                        batch = outcome.batches,
                        error = %e,
                        "review batch degraded to no suggestions"
                    );
                }
            }
        }

        if outcome.cancelled {
            info!(batches = outcome.batches, "review pass cancelled, batch left unchanged");
            return outcome;
        }
        outcome.applied = apply_suggestions(lines, &pending);
        outcome.suggestions = pending;
        info!(
            candidates = outcome.candidates,
            batches = outcome.batches,
            failed = outcome.failed_batches,
            applied = outcome.applied,
            "review pass finished"
        );
        outcome
    }

    /// One batch request: timeout per attempt, backoff on 429, abort on cancel.
    async fn request(&self, prompt: String, cancel: &CancellationToken) -> Result<String> {
        let request = ReviewRequest::new(self.model(), prompt);
        let max = self.settings.max_attempts.max(1);
        let mut backoff = self.settings.base_backoff;

        for attempt in 1..=max {
            let timeout = self.settings.timeout;
            let call = tokio::time::timeout(timeout, self.provider.complete(&request));
            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(ClassifierError::Cancelled),
                r = call => r.unwrap_or_else(|_| Err(ClassifierError::Timeout(timeout.as_secs()))),
            };
            match result {
                Err(e) if e.is_retryable() && attempt < max => {
                    warn!(
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "review endpoint rate-limited, backing off"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(ClassifierError::Cancelled),
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(self.settings.max_backoff);
                }
                Err(e) if e.is_retryable() => {
                    return Err(ClassifierError::RateLimited { attempts: attempt })
                }
                other => return other,
            }
        }
        Err(ClassifierError::RateLimited { attempts: max })
    }
}

const PROMPT_HEADER: &str = "\
You review the structural classification of lines from an Arabic screenplay.
Each line has exactly one type from this closed set:
- heading-full: a numbered scene marker together with its detail on one line
- heading-number-only: a bare numbered scene marker (e.g. \"مشهد 3\")
- heading-detail: interior/exterior or time-of-day detail of the current scene heading
- heading-place: the place named by the current scene heading
- action: narrative description or stage direction
- character: the name of the speaker of the following dialogue, usually ending with a colon
- dialogue: spoken text following a character or parenthetical line
- parenthetical: a short bracketed performance note between a character and its dialogue
- transition: a scene transition such as \"قطع إلى:\" or \"مزج\"
- invocation: the opening basmala line
- blank: an empty line

Structural rules:
1. Heading parts only appear directly after a scene marker or another heading part.
2. Dialogue follows a character, a parenthetical or more dialogue.
3. A line that starts with an action verb right after a character line is usually action.
4. A short place name directly under a scene marker is heading detail, not a character.
";

const PROMPT_FOOTER: &str = "
Reply with ONLY a JSON array, one object per line whose type should change:
[{\"index\": <line index>, \"suggestedType\": \"<type>\", \"confidence\": <0-100>, \"reason\": \"<short reason>\"}]
Reply with [] when every marked line is already correct.
";

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(
        index: usize,
        text: &str,
        ty: LineType,
        confidence: f32,
        doubt: f32,
    ) -> LineClassification {
        let mut r = LineClassification::certain(index, text, ty, "test");
        r.confidence = confidence;
        r.confidence_tier = ConfidenceTier::from_score(confidence);
        r.set_doubt(doubt);
        r
    }

    #[test]
    fn parses_fenced_and_bare_arrays() {
        let fenced = "Here you go:\n```json\n[{\"index\": 2, \"suggestedType\": \"dialogue\", \
            \"confidence\": 88, \"reason\": \"after name\"}]\n```";
        let s = parse_suggestions(fenced).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].line_index, 2);
        assert_eq!(s[0].suggested_type, LineType::Dialogue);

        let bare = r#"[{"index": 0, "suggestedType": "heading-detail", "confidence": 140}]"#;
        let s = parse_suggestions(bare).unwrap();
        assert_eq!(s[0].confidence, 100.0);
    }

    #[test]
    fn drops_invalid_items_and_rejects_non_arrays() {
        let mixed = r#"[{"index": 1, "suggestedType": "montage"},
            {"suggestedType": "action"}, {"index": 3, "type": "action"}]"#;
        let s = parse_suggestions(mixed).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].line_index, 3);

        assert!(parse_suggestions("I think line 3 is action").is_err());
        assert!(parse_suggestions("[not json]").is_err());
    }

    #[test]
    fn bracketed_prose_before_the_array_is_skipped() {
        let fenced = "Line [1] looks like a name and line [3] is speech.\n```json\n\
            [{\"index\": 1, \"suggestedType\": \"character\", \"confidence\": 80}]\n```";
        let s = parse_suggestions(fenced).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].line_index, 1);
        assert_eq!(s[0].suggested_type, LineType::Character);

        let bare = r#"See line [2]: [{"index": 2, "suggestedType": "dialogue"}] (done)"#;
        let s = parse_suggestions(bare).unwrap();
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].suggested_type, LineType::Dialogue);

        assert!(parse_suggestions("[]").unwrap().is_empty());
        assert!(parse_suggestions("only line [4] needs a look").is_err());
    }

    #[test]
    fn extracts_content_from_both_shapes() {
        let plain = serde_json::json!({"content": "[]"});
        assert_eq!(extract_content(&plain).as_deref(), Some("[]"));
        let chat = serde_json::json!({"choices": [{"message": {"content": "[1]"}}]});
        assert_eq!(extract_content(&chat).as_deref(), Some("[1]"));
        assert!(extract_content(&serde_json::json!({"ok": true})).is_none());
    }

    #[test]
    fn candidates_respect_threshold_and_carve_out() {
        let orch = ReviewOrchestrator::with_provider(Arc::new(MockReviewProvider::new("[]")));
        let lines = vec![
            rec(0, "سارة", LineType::Character, 30.0, 80.0),
            rec(1, "مرحبا", LineType::Dialogue, 90.0, 10.0),
            rec(2, "المطبخ - ليل", LineType::HeadingDetail, 85.0, 50.0),
            rec(3, "الشارع - يركض عمر", LineType::HeadingDetail, 85.0, 50.0),
            rec(4, "باب", LineType::Action, 40.0, 30.0),
        ];
        assert_eq!(orch.select_candidates(&lines), vec![0, 3]);
    }

    #[test]
    fn prompt_lists_taxonomy_and_context() {
        let orch = ReviewOrchestrator::with_provider(Arc::new(MockReviewProvider::new("[]")));
        let lines: Vec<_> = (0..10)
            .map(|i| rec(i, &format!("سطر {i}"), LineType::Action, 50.0, 0.0))
            .collect();
        let p = orch.build_prompt(&lines, &[5]);
        for t in LineType::ALL {
            assert!(p.contains(t.as_str()), "missing {t}");
        }
        assert!(p.contains(">> [5]"));
        assert!(p.contains("[2]") && p.contains("[8]"));
        assert!(!p.contains("[1]") && !p.contains("[9]"));
    }

    #[test]
    fn apply_only_when_type_differs() {
        let mut lines = vec![
            rec(0, "سارة", LineType::Action, 30.0, 80.0),
            rec(1, "مرحبا", LineType::Dialogue, 60.0, 70.0),
        ];
        let n = apply_suggestions(
            &mut lines,
            &[
                ReviewSuggestion {
                    line_index: 0,
                    suggested_type: LineType::Character,
                    confidence: 90.0,
                    reason: "speaker".into(),
                },
                ReviewSuggestion {
                    line_index: 1,
                    suggested_type: LineType::Dialogue,
                    confidence: 95.0,
                    reason: "same".into(),
                },
            ],
        );
        assert_eq!(n, 1);
        assert_eq!(lines[0].line_type, LineType::Character);
        assert_eq!(lines[0].doubt_score, 80.0);
        assert!(lines[0].scores[&LineType::Character]
            .reasons
            .iter()
            .any(|r| r == "review: speaker"));
        assert_eq!(lines[1].confidence, 60.0);
    }
}
