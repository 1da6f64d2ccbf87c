//! Script line classifier — binary entrypoint.
//! Boots the axum HTTP server, wiring routes, shared state and middleware.

use std::path::PathBuf;

use script_line_classifier::{
    api::{self, AppState},
    classify::{learning::AdaptiveWeights, Classifier, KnowledgeBase, RuleAuditor},
    config::{review::DEFAULT_REVIEW_CONFIG_PATH, ClassifierConfig},
    metrics::Metrics,
    review_bootstrap::ReviewRuntime,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("script_line_classifier=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; harmless when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = ClassifierConfig::from_toml()?;
    let review = ReviewRuntime::from_path(DEFAULT_REVIEW_CONFIG_PATH, &cfg.review)?;
    let metrics = Metrics::init(review.cfg.timeout_secs)?;

    let mut state = AppState::new(
        Classifier::from_config(&cfg),
        RuleAuditor::new(KnowledgeBase::builtin()?),
        review.orchestrator.clone(),
    );

    // Learned weights are loaded only when a path is given explicitly.
    if let Ok(path) = std::env::var("CLASSIFIER_WEIGHTS_PATH").map(PathBuf::from) {
        match AdaptiveWeights::load_from_file(&path) {
            Ok(w) => {
                info!(
                    path = %path.display(),
                    corrections = w.corrections().len(),
                    "learned weights loaded"
                );
                state = state.with_learner(w);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "learned weights not loaded"),
        }
    }

    if std::env::var("REVIEW_PROBE").is_ok_and(|v| v == "1") {
        review.quick_probe().await;
    }

    let app = api::router(state).merge(metrics.router());

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}
