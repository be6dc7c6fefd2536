//! Error types for the enhancement engine.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, EnhancerError>;

/// Failures the engine can surface to callers.
///
/// Quota exhaustion is deliberately absent: running out of budget is a normal
/// routing branch, not an error. Per-point collaborator failures are caught by
/// the orchestrator, counted, and never abort a batch.
#[derive(Debug, Error)]
pub enum EnhancerError {
    /// The rule-based collaborator failed for a point
    #[error("rule engine failed for point '{point}': {message}")]
    RuleEngine { point: String, message: String },

    /// The AI collaborator failed or timed out for a point
    #[error("ai enhancer failed for point '{point}': {message}")]
    AiEnhancer { point: String, message: String },

    /// Persistent cache backing failure
    #[error("cache backing error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Cache entry (de)serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EnhancerError {
    /// Shorthand used by rule-based collaborator implementations.
    pub fn rule_engine(point: impl Into<String>, message: impl Into<String>) -> Self {
        EnhancerError::RuleEngine {
            point: point.into(),
            message: message.into(),
        }
    }

    /// Shorthand used by AI collaborator implementations.
    pub fn ai_enhancer(point: impl Into<String>, message: impl Into<String>) -> Self {
        EnhancerError::AiEnhancer {
            point: point.into(),
            message: message.into(),
        }
    }
}
