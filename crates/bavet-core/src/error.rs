//! Error types for the Bavet engine

use thiserror::Error;

/// Main error type for Bavet operations.
///
/// Every variant is fatal for the scoring pass that produced it: there is no
/// degraded mode, and a session that reported an error during propagation
/// refuses further mutation.
#[derive(Debug, Error)]
pub enum BavetError {
    /// Build-time configuration error (unknown constraint, bad arity, ...).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal consistency violation inside the network.
    ///
    /// Retracting a tuple that was never inserted, registering a third source
    /// node for one fact class, or probing an unindexed key all end up here.
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// A user supplied function panicked while being evaluated.
    #[error("User function failed in constraint ({constraint}) on facts {facts}: {message}")]
    UserFunction {
        /// Full name of the constraint or node that called the function.
        constraint: String,
        /// Debug rendering of the tuple's facts.
        facts: String,
        /// Panic payload, when it was a string.
        message: String,
    },

    /// Incremental score differs from a from-scratch recalculation.
    #[error("Score corruption: incremental score {actual} but from-scratch score {expected}")]
    ScoreCorruption {
        /// Score of the freshly rebuilt session.
        expected: String,
        /// Score of the incremental session.
        actual: String,
    },

    /// The fact handle does not refer to a live fact of this session.
    #[error("Unknown fact handle: {0}")]
    UnknownFact(String),

    /// An earlier error left the session in an undefined state.
    #[error("Session is poisoned by an earlier failure")]
    Poisoned,
}

impl BavetError {
    /// Shorthand for [`BavetError::IllegalState`].
    pub fn illegal_state(message: impl Into<String>) -> Self {
        BavetError::IllegalState(message.into())
    }

    /// Shorthand for [`BavetError::Config`].
    pub fn config(message: impl Into<String>) -> Self {
        BavetError::Config(message.into())
    }
}

/// Result type alias for Bavet operations
pub type Result<T> = std::result::Result<T, BavetError>;
