//! Error taxonomy for the extraction engine.
//!
//! Only collaborator, configuration and artifact failures are errors.
//! Text that yields nothing is an empty extraction, time ambiguity is
//! resolved by the fallback chain in [`crate::temporal`], and broken
//! event invariants are repaired and recorded as anomalies on the event.

use std::time::Duration;

/// Errors raised by a [`crate::provider::TextExtractionProvider`].
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("text extraction failed: {0}")]
    ExtractionFailed(String),
}

/// Errors raised by an augmentation collaborator.
///
/// These never reach the caller of [`crate::engine::Engine::extract`];
/// the engine logs them and falls back to rule-based extraction.
#[derive(Debug, thiserror::Error)]
pub enum AugmentError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("collaborator timed out after {0:?}")]
    Timeout(Duration),

    #[error("collaborator failed: {0}")]
    Failed(String),
}

/// Engine-level errors.
#[derive(Debug, thiserror::Error)]
pub enum SofError {
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("augmentation error: {0}")]
    Augmentation(#[from] AugmentError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, SofError>;
