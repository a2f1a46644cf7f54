//! Daemon error types.

use rigwatch_domain::DomainError;
use thiserror::Error;

/// Daemon-level errors.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Domain error
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Presence sink error
    #[error("Presence sink error: {0}")]
    Presence(String),

    /// Background task failed to join
    #[error("Task error: {0}")]
    Task(String),

    /// Could not listen for the shutdown signal
    #[error("Signal error: {0}")]
    Signal(String),
}

/// Result type for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
