//! Error types for the caching engine

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the caching engine
///
/// Only `Encode` and `Configuration` ever reach callers of the public
/// engine API; backend and decode faults are contained at the engine
/// boundary and converted into miss/no-op behavior.
#[derive(Error, Debug)]
pub enum Error {
    /// A tier's backend store could not be reached or timed out
    #[error("backend unavailable for tier {tier}: {reason}")]
    BackendUnavailable { tier: String, reason: String },

    /// Backend command failed after a connection was established
    #[error("backend command failed: {0}")]
    Backend(String),

    /// Stored bytes could not be decoded (corruption or format mismatch)
    #[error("decode failed: {reason}")]
    Decode { reason: String },

    /// Caller's value cannot be represented by either encoding strategy
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Unknown tier name or invalid configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for faults the engine degrades to a miss or no-op.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Error::BackendUnavailable { .. } | Error::Backend(_) | Error::Decode { .. }
        )
    }
}

impl From<redis::RedisError> for Error {
    fn from(e: redis::RedisError) -> Self {
        Error::Backend(e.to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degradable_classification() {
        assert!(Error::Backend("boom".into()).is_degradable());
        assert!(Error::BackendUnavailable {
            tier: "hot".into(),
            reason: "timeout".into()
        }
        .is_degradable());
        assert!(Error::Decode {
            reason: "bad marker".into()
        }
        .is_degradable());
        assert!(!Error::Configuration("unknown tier".into()).is_degradable());
    }

    #[test]
    fn test_display_includes_context() {
        let err = Error::BackendUnavailable {
            tier: "cold".into(),
            reason: "connection refused".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("cold"));
        assert!(msg.contains("connection refused"));
    }
}
