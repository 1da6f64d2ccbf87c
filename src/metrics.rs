use axum::{routing::get, Router};
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// Register counter descriptions once per process. Safe to call before a
/// recorder is installed (descriptions are then dropped by the no-op recorder).
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("classifier_lines_total", "Lines classified, labelled by final type.");
        describe_counter!(
            "classifier_needs_review_total",
            "Lines whose doubt score reached the review threshold."
        );
        describe_counter!(
            "classifier_fallbacks_total",
            "Lines whose winner was changed by the smart fallback."
        );
        describe_counter!("review_batches_total", "External review batches attempted.");
        describe_counter!(
            "review_batch_failures_total",
            "External review batches that degraded to no suggestions."
        );
        describe_counter!(
            "review_suggestions_applied_total",
            "Review suggestions that changed a line's type."
        );
        describe_counter!("audit_suggestions_total", "Suggestions emitted by the rule auditor.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the review timeout as a static gauge.
    pub fn init(review_timeout_secs: u64) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder()?;
        ensure_metrics_described();
        gauge!("review_timeout_seconds").set(review_timeout_secs as f64);
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
