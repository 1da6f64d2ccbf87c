//! Runtime configuration.
//!
//! `config/classifier.toml` holds the pipeline knobs (path overridable with
//! `CLASSIFIER_CONFIG_PATH`); `config/review.json` holds the external review
//! endpoint settings (see [`review`]). A missing TOML file means defaults.

pub mod review;

use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};

use crate::classify::context::DEFAULT_WINDOW;
use crate::classify::scene_header::DEFAULT_MAX_CONTINUATION;

pub const DEFAULT_CLASSIFIER_CONFIG_PATH: &str = "config/classifier.toml";
pub const ENV_CLASSIFIER_CONFIG_PATH: &str = "CLASSIFIER_CONFIG_PATH";

fn default_context_window() -> usize {
    DEFAULT_WINDOW
}
fn default_max_heading_continuation() -> usize {
    DEFAULT_MAX_CONTINUATION
}
fn default_review_doubt_threshold() -> f32 {
    30.0
}
fn default_review_batch_size() -> usize {
    20
}
fn default_review_context_radius() -> usize {
    3
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub classifier: ClassifierSection,
    #[serde(default)]
    pub review: ReviewSection,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClassifierSection {
    /// Lines of context on each side handed to the scorers.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
    /// Continuation lines the scene-header parser may consume after the marker.
    #[serde(default = "default_max_heading_continuation")]
    pub max_heading_continuation: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReviewSection {
    /// Lines with doubt strictly above this go to the external reviewer.
    #[serde(default = "default_review_doubt_threshold")]
    pub doubt_threshold: f32,
    #[serde(default = "default_review_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_review_context_radius")]
    pub context_radius: usize,
}

impl Default for ClassifierSection {
    fn default() -> Self {
        Self {
            context_window: default_context_window(),
            max_heading_continuation: default_max_heading_continuation(),
        }
    }
}

impl Default for ReviewSection {
    fn default() -> Self {
        Self {
            doubt_threshold: default_review_doubt_threshold(),
            batch_size: default_review_batch_size(),
            context_radius: default_review_context_radius(),
        }
    }
}

impl ClassifierConfig {
    /// Load from `CLASSIFIER_CONFIG_PATH` or `config/classifier.toml`.
    /// A missing file yields defaults; an unreadable or invalid one is an error.
    pub fn from_toml() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_CLASSIFIER_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CLASSIFIER_CONFIG_PATH));

        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!(
                "Failed to read classifier config at {}: {}",
                path.display(),
                e
            )
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let mut cfg: ClassifierConfig = toml::from_str(toml_str)?;
        cfg.sanitize();
        Ok(cfg)
    }

    fn sanitize(&mut self) {
        let r = &mut self.review;
        if !r.doubt_threshold.is_finite() || !(0.0..=100.0).contains(&r.doubt_threshold) {
            r.doubt_threshold = default_review_doubt_threshold();
        }
        r.batch_size = r.batch_size.max(1);
        let c = &mut self.classifier;
        c.context_window = c.context_window.max(1);
        c.max_heading_continuation = c.max_heading_continuation.max(1);
    }
}
