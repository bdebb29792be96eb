//! Error types for sequence generation and statistics output.

use thiserror::Error;

/// Result type alias for dual N-back operations.
pub type Result<T> = std::result::Result<T, NBackError>;

/// Errors raised by the generator and the simulation output path.
///
/// Out-of-window responses and stale timers are not errors; the lifecycle
/// ignores them silently.
#[derive(Debug, Error)]
pub enum NBackError {
    /// N, trial count, grid size, alphabet or rates violate a precondition.
    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration {
        /// Which precondition failed
        reason: String,
    },

    /// I/O error while writing results
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization failed
    #[error("Serialization failed: {source}")]
    Serialization {
        /// Underlying serde_json error
        #[from]
        source: serde_json::Error,
    },
}

impl NBackError {
    /// Create an invalid configuration error
    pub fn invalid_configuration(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
