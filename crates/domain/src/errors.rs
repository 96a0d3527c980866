//! Domain-level errors

use thiserror::Error;

/// Errors that can occur in the domain layer
#[derive(Debug, Error)]
pub enum DomainError {
    /// An identifier received from a peer was empty or malformed
    #[error("Invalid {kind}: {reason}")]
    InvalidIdentifier {
        /// Which identifier was rejected (e.g. "stream id")
        kind: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

impl DomainError {
    /// Create an invalid identifier error
    pub fn invalid_identifier(kind: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            kind,
            reason: reason.into(),
        }
    }
}
