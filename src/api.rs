use std::sync::{Arc, RwLock};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::classify::audit::{
    AuditLine, AuditSuggestion, KnowledgeBase, KnowledgeBaseExport, RuleAuditor,
};
use crate::classify::diagnostics::{diagnose_all, ConfidenceDiagnostics};
use crate::classify::learning::{AdaptiveWeights, WeightsExport};
use crate::classify::review::{DisabledReviewProvider, ReviewOrchestrator, ReviewOutcome};
use crate::classify::{Classifier, DocumentMemory};
use crate::line_type::{LineClassification, LineType};

/// Process-wide state. Document memory is not here: each request classifies
/// with a fresh one.
#[derive(Clone)]
pub struct AppState {
    classifier: Arc<Classifier>,
    learner: Arc<RwLock<AdaptiveWeights>>,
    auditor: Arc<RwLock<RuleAuditor>>,
    review: Arc<ReviewOrchestrator>,
}

impl AppState {
    pub fn new(
        classifier: Classifier,
        auditor: RuleAuditor,
        review: Arc<ReviewOrchestrator>,
    ) -> Self {
        Self {
            classifier: Arc::new(classifier),
            learner: Arc::new(RwLock::new(AdaptiveWeights::new())),
            auditor: Arc::new(RwLock::new(auditor)),
            review,
        }
    }

    /// Default classifier, built-in knowledge base, review switched off.
    pub fn with_defaults() -> anyhow::Result<Self> {
        Ok(Self::new(
            Classifier::default(),
            RuleAuditor::new(KnowledgeBase::builtin()?),
            Arc::new(ReviewOrchestrator::with_provider(Arc::new(DisabledReviewProvider))),
        ))
    }

    pub fn with_learner(mut self, learner: AdaptiveWeights) -> Self {
        self.learner = Arc::new(RwLock::new(learner));
        self
    }

    fn classify(&self, text: &str, previous_types: &[LineType]) -> Vec<LineClassification> {
        let learner = self.learner.read().expect("rwlock poisoned");
        let learner = (!learner.is_empty()).then_some(&*learner);
        self.classifier
            .classify(text, previous_types, &mut DocumentMemory::new(), learner)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/classify", post(classify))
        .route("/audit", post(audit))
        .route("/review", post(review))
        .route("/review/model", get(get_model).post(set_model))
        .route("/corrections", post(record_correction))
        .route("/diagnostics", post(diagnostics))
        .route("/weights/export", get(export_weights))
        .route("/weights/import", post(import_weights))
        .route("/knowledge-base/export", get(export_knowledge_base))
        .route("/knowledge-base/import", post(import_knowledge_base))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassifyReq {
    text: String,
    #[serde(default)]
    previous_types: Vec<LineType>,
}

#[derive(Serialize)]
struct ReviewResp {
    lines: Vec<LineClassification>,
    review: ReviewOutcome,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CorrectionReq {
    line_text: String,
    original_type: LineType,
    corrected_type: LineType,
    #[serde(default)]
    preceding_type: Option<LineType>,
}

#[derive(Serialize)]
struct CorrectionResp {
    recorded: usize,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct ImportResp {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct ModelBody {
    model: String,
}

fn import_result(res: crate::error::Result<()>) -> (StatusCode, Json<ImportResp>) {
    match res {
        Ok(()) => (StatusCode::OK, Json(ImportResp { ok: true, error: None })),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(ImportResp {
                ok: false,
                error: Some(e.to_string()),
            }),
        ),
    }
}

async fn classify(
    State(state): State<AppState>,
    Json(body): Json<ClassifyReq>,
) -> Json<Vec<LineClassification>> {
    Json(state.classify(&body.text, &body.previous_types))
}

async fn audit(
    State(state): State<AppState>,
    Json(lines): Json<Vec<AuditLine>>,
) -> Json<Vec<AuditSuggestion>> {
    let auditor = state.auditor.read().expect("rwlock poisoned");
    Json(auditor.audit(&lines))
}

async fn review(State(state): State<AppState>, Json(body): Json<ClassifyReq>) -> Json<ReviewResp> {
    let mut lines = state.classify(&body.text, &body.previous_types);
    let review = state.review.review(&mut lines, &CancellationToken::new()).await;
    Json(ReviewResp { lines, review })
}

async fn get_model(State(state): State<AppState>) -> Json<ModelBody> {
    Json(ModelBody {
        model: state.review.model(),
    })
}

async fn set_model(
    State(state): State<AppState>,
    Json(body): Json<ModelBody>,
) -> (StatusCode, Json<ModelBody>) {
    let status = if body.model.trim().is_empty() {
        StatusCode::BAD_REQUEST
    } else {
        state.review.set_model(body.model.trim());
        StatusCode::OK
    };
    let model = state.review.model();
    (status, Json(ModelBody { model }))
}

async fn record_correction(
    State(state): State<AppState>,
    Json(body): Json<CorrectionReq>,
) -> Json<CorrectionResp> {
    let mut learner = state.learner.write().expect("rwlock poisoned");
    let warnings = learner.record_correction(
        &body.line_text,
        body.original_type,
        body.corrected_type,
        body.preceding_type,
    );
    Json(CorrectionResp {
        recorded: learner.corrections().len(),
        warnings,
    })
}

async fn diagnostics(
    State(state): State<AppState>,
    Json(body): Json<ClassifyReq>,
) -> Json<Vec<ConfidenceDiagnostics>> {
    let lines = state.classify(&body.text, &body.previous_types);
    Json(diagnose_all(&lines))
}

async fn export_weights(State(state): State<AppState>) -> Json<WeightsExport> {
    Json(state.learner.read().expect("rwlock poisoned").export())
}

async fn import_weights(
    State(state): State<AppState>,
    body: String,
) -> (StatusCode, Json<ImportResp>) {
    let mut learner = state.learner.write().expect("rwlock poisoned");
    import_result(learner.import_json(&body))
}

async fn export_knowledge_base(State(state): State<AppState>) -> Json<KnowledgeBaseExport> {
    let auditor = state.auditor.read().expect("rwlock poisoned");
    Json(auditor.knowledge_base().export())
}

async fn import_knowledge_base(
    State(state): State<AppState>,
    body: String,
) -> (StatusCode, Json<ImportResp>) {
    let mut auditor = state.auditor.write().expect("rwlock poisoned");
    import_result(auditor.knowledge_base_mut().import_json(&body))
}
