//! Error types for arceager
//!
//! Every fallible operation in the crate returns [`ParserError`]. Illegal
//! transitions and an exhausted oracle are logic errors: they are reported
//! immediately instead of being turned into no-ops.

use crate::transition::ActionType;
use thiserror::Error;

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ParserError>;

/// Main error type for arceager
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParserError {
    /// Word and POS arrays disagree, or the sentence is too long to encode
    #[error("Invalid sentence: {message}")]
    InvalidSentence { message: String },

    /// Gold heads/labels do not describe a single-rooted tree
    #[error("Invalid gold tree: {message}")]
    InvalidTree { message: String },

    /// Configuration validation failed
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A transition was requested where its legality predicate is false
    #[error("Illegal transition {action:?} (stack top = {stack_top}, buffer = {buffer})")]
    IllegalTransition {
        action: ActionType,
        stack_top: usize,
        buffer: usize,
    },

    /// No zero-cost action exists; the gold tree is unreachable
    /// (usually non-projective)
    #[error("Oracle exhausted at step {step}: no zero-cost action (stack top = {stack_top}, buffer = {buffer})")]
    OracleExhausted {
        step: usize,
        stack_top: usize,
        buffer: usize,
    },

    /// A packed action code is outside the documented bit ranges
    #[error("Action encoding error: {message}")]
    ActionEncoding { message: String },

    /// NaN or infinity where a finite number is required
    #[error("Non-finite value in {context}: {value}")]
    NonFinite { context: String, value: f64 },

    /// Parallel arrays of a weight vector disagree in length
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Internal error (should not occur in normal usage)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ParserError {
    /// Create an invalid sentence error
    pub fn invalid_sentence(message: impl Into<String>) -> Self {
        Self::InvalidSentence {
            message: message.into(),
        }
    }

    /// Create an invalid tree error
    pub fn invalid_tree(message: impl Into<String>) -> Self {
        Self::InvalidTree {
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an illegal transition error
    pub fn illegal_transition(action: ActionType, stack_top: usize, buffer: usize) -> Self {
        Self::IllegalTransition {
            action,
            stack_top,
            buffer,
        }
    }

    /// Create an oracle exhausted error
    pub fn oracle_exhausted(step: usize, stack_top: usize, buffer: usize) -> Self {
        Self::OracleExhausted {
            step,
            stack_top,
            buffer,
        }
    }

    /// Create an action encoding error
    pub fn action_encoding(message: impl Into<String>) -> Self {
        Self::ActionEncoding {
            message: message.into(),
        }
    }

    /// Create a non-finite value error
    pub fn non_finite(context: impl Into<String>, value: f64) -> Self {
        Self::NonFinite {
            context: context.into(),
            value,
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if the oracle ran out of zero-cost actions
    pub fn is_oracle_exhausted(&self) -> bool {
        matches!(self, Self::OracleExhausted { .. })
    }

    /// Check if an illegal transition was requested
    pub fn is_illegal_transition(&self) -> bool {
        matches!(self, Self::IllegalTransition { .. })
    }

    /// Check if a NaN/infinity was rejected
    pub fn is_non_finite(&self) -> bool {
        matches!(self, Self::NonFinite { .. })
    }
}

impl From<serde_json::Error> for ParserError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

/// Reject NaN and infinities before they reach the model.
pub(crate) fn ensure_finite(context: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ParserError::non_finite(context, value))
    }
}
