// src/review_bootstrap.rs
use crate::classify::review::{build_review_provider, ReviewOrchestrator, ReviewSettings};
use crate::config::review::ReviewConfig;
use crate::config::ReviewSection;
use crate::line_type::{ConfidenceTier, LineClassification, LineType};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct ReviewRuntime {
    pub cfg: ReviewConfig,
    pub orchestrator: Arc<ReviewOrchestrator>,
}

impl ReviewRuntime {
    /// Load `config/review.json`-style settings. A missing file means review is off.
    pub fn from_path<P: AsRef<Path>>(path: P, section: &ReviewSection) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let cfg = if path.exists() {
            ReviewConfig::load_from_file(path)?
        } else {
            warn!(path = %path.display(), "review config not found, external review disabled");
            ReviewConfig::default()
        };
        Ok(Self::from_config(cfg, section))
    }

    pub fn from_config(cfg: ReviewConfig, section: &ReviewSection) -> Self {
        let provider = build_review_provider(&cfg);
        let model = cfg.resolved_model();
        // Safe diagnostics: only provider + enabled + key length
        info!(
            provider = provider.name(),
            enabled = cfg.enabled,
            model = %model,
            key_len = cfg.api_key.len(),
            "review config loaded"
        );
        let settings = ReviewSettings::from_config(section, &cfg);
        let orchestrator = Arc::new(ReviewOrchestrator::new(provider, settings, model));
        Self { cfg, orchestrator }
    }

    /// One tiny forced batch against the configured provider; logs the outcome.
    pub async fn quick_probe(&self) {
        if self.orchestrator.provider_name() == "disabled" {
            warn!("review quick_probe skipped: external review is disabled");
            return;
        }
        let mut sample = LineClassification::certain(0, "سارة", LineType::Action, "probe");
        sample.confidence = 30.0;
        sample.confidence_tier = ConfidenceTier::Low;
        sample.set_doubt(100.0);
        let mut lines = vec![sample];
        let out = self
            .orchestrator
            .review(&mut lines, &CancellationToken::new())
            .await;
        info!(
            batches = out.batches,
            failed = out.failed_batches,
            suggestions = out.suggestions.len(),
            "review quick_probe finished"
        );
    }
}
