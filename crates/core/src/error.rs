//! Domain error model.

use thiserror::Error;

/// Result type used by the pure primitives.
pub type DomainResult<T> = Result<T, DomainError>;

/// Error raised when a primitive value cannot be constructed.
///
/// Keep this focused on deterministic input failures. Collaborator and
/// transport failures belong to the crates that talk to them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// An identifier was the nil UUID, which never names a real subject.
    #[error("empty identifier: {0}")]
    EmptyId(&'static str),
}

impl DomainError {
    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
