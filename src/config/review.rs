// src/config/review.rs
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path};

pub const DEFAULT_REVIEW_CONFIG_PATH: &str = "config/review.json";
pub const DEFAULT_REVIEW_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_REVIEW_MODEL: &str = "gpt-4o-mini";
/// Hard ceiling for a single review request.
pub const MAX_TIMEOUT_SECS: u64 = 30;
pub const MAX_ATTEMPTS: u32 = 3;

fn default_endpoint() -> String {
    DEFAULT_REVIEW_ENDPOINT.to_string()
}
fn default_timeout_secs() -> u64 {
    MAX_TIMEOUT_SECS
}
fn default_max_attempts() -> u32 {
    MAX_ATTEMPTS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewConfig {
    pub enabled: bool,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// "ENV" means: read from REVIEW_API_KEY
    #[serde(default)]
    pub api_key: String,
    /// Used when REVIEW_MODEL is unset.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            api_key: String::new(),
            model: None,
            timeout_secs: default_timeout_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl ReviewConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn from_json_str(data: &str) -> anyhow::Result<Self> {
        let mut cfg: ReviewConfig = serde_json::from_str(data)?;

        // Resolve api key if "ENV"
        if cfg.api_key.trim().eq_ignore_ascii_case("env") {
            cfg.api_key = match env::var("REVIEW_API_KEY") {
                Ok(k) => k,
                Err(_) if cfg.enabled => anyhow::bail!("Missing REVIEW_API_KEY env var"),
                Err(_) => String::new(),
            };
        }

        cfg.timeout_secs = cfg.timeout_secs.clamp(1, MAX_TIMEOUT_SECS);
        cfg.max_attempts = cfg.max_attempts.clamp(1, MAX_ATTEMPTS);
        Ok(cfg)
    }

    /// `REVIEW_MODEL`, else the configured model, else the baseline id.
    pub fn resolved_model(&self) -> String {
        env::var("REVIEW_MODEL")
            .ok()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| self.model.clone())
            .unwrap_or_else(|| DEFAULT_REVIEW_MODEL.to_string())
    }
}
