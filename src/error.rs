//! Error taxonomy for the refinement layers (review, audit, import/export).
//!
//! The primary classification pipeline never returns these: every line gets a
//! best-effort type. A heading pattern miss is `Option::None`, not an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Transport failure talking to the external review model.
    #[error("review request failed: {0}")]
    Network(String),

    /// Review request exceeded the capped timeout.
    #[error("review request timed out after {0}s")]
    Timeout(u64),

    /// HTTP 429 after all retry attempts were spent.
    #[error("review endpoint rate-limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// Non-success HTTP status other than 429.
    #[error("review endpoint returned HTTP {0}")]
    Status(u16),

    /// Model reply did not contain a usable JSON array.
    #[error("malformed review response: {0}")]
    ResponseParse(String),

    /// Caller cancelled the review pass.
    #[error("review cancelled")]
    Cancelled,

    /// Knowledge-base JSON or one of its patterns was rejected; previous rules kept.
    #[error("knowledge base import rejected: {0}")]
    KnowledgeBaseImport(String),

    /// Adaptive-weights JSON was rejected; previous state kept.
    #[error("weights import rejected: {0}")]
    WeightsImport(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ClassifierError {
    /// Errors that are worth another attempt with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

pub type Result<T> = std::result::Result<T, ClassifierError>;
