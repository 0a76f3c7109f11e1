//! # DomainError
//!
//! Failure taxonomy shared by every port and service.

use thiserror::Error;

/// The primary error type for all domain operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Network or backend failure. Retryable.
    #[error("backend unavailable: {0}")]
    Transient(String),

    /// The action needs a signed-in identity. Never retried.
    #[error("sign in required: {0}")]
    AuthRequired(String),

    /// Rejected client-side before any remote call (e.g., empty content)
    #[error("validation error: {0}")]
    Validation(String),

    /// Record missing (e.g., Entry, Comment)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// The user backed out (e.g., dismissed a share dialog). Not reported.
    #[error("cancelled: {0}")]
    Cancelled(String),
}

impl DomainError {
    /// The store does not distinguish a missing record from a flaky one,
    /// so both are handed to the retry policy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DomainError::Transient(_) | DomainError::NotFound(..))
    }

    pub fn transient(err: impl std::fmt::Display) -> Self {
        DomainError::Transient(err.to_string())
    }
}

/// A specialized Result type for diary logic.
pub type DomainResult<T> = std::result::Result<T, DomainError>;
