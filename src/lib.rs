// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod classify;
pub mod config;
pub mod error;
pub mod line_type;
pub mod metrics;
pub mod review_bootstrap;
pub mod vocab;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::classify::{classify, Classifier, DocumentMemory, ResolutionStrategy};
pub use crate::error::ClassifierError;
pub use crate::line_type::{ClassificationScore, ConfidenceTier, LineClassification, LineType};
