//! Failure taxonomy for marketplace rules.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Deterministic rule failures: bad input, a broken invariant, a lost claim.
/// Storage and transport failures live with the stores, not here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Input a listing or order refuses to accept (empty name, zero price,
    /// non-positive quantity).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A state rule was broken, such as completing an order that was never
    /// paid for.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier that does not parse.
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The addressed listing or order does not exist.
    #[error("not found")]
    NotFound,

    /// Another actor got there first.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller's role or ownership does not cover the action.
    #[error("unauthorized")]
    Unauthorized,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
