//! Connector error types.

use thiserror::Error;

/// Errors that can occur while fetching rigs.
#[derive(Debug, Clone, Error)]
pub enum RigApiError {
    /// Failed to build request signature
    #[error("Failed to build signature: {0}")]
    Signature(String),

    /// Connection-level failure
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded its deadline
    #[error("Request timed out")]
    Timeout,

    /// Signature or credentials rejected
    #[error("Authentication rejected (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    /// Non-success response that is not an auth rejection
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Response body does not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl RigApiError {
    /// Transport-class failures that are expected to clear up on their own.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RigApiError::Network(_) | RigApiError::Timeout | RigApiError::Http { .. }
        )
    }

    /// Failures that point at bad credentials or configuration.
    pub fn is_auth(&self) -> bool {
        matches!(self, RigApiError::Auth { .. })
    }
}

// =============================================================================
// Tests
// =============================================================================
