//! Domain error model.

use serde::Serialize;
use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every core operation surfaces exactly one of these kinds with a
/// human-readable message. Transport collaborators map the kind to a status
/// code via [`DomainError::status_code`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// No session, or the presented session token is not recognised.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but lacking the required role or capability.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// Duplicate credential or unique-constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Valid input that violates a state-machine precondition.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The backing store failed (e.g. lock poisoning).
    ///
    /// The detail is kept for logs; the public message is generic.
    #[error("internal store error")]
    Store(String),
}

/// Coarse error classification (stable across messages).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    Validation,
    Conflict,
    NotFound,
    InvalidOperation,
    Store,
}

impl DomainError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Unauthorized(_) => ErrorKind::Unauthorized,
            DomainError::Forbidden(_) => ErrorKind::Forbidden,
            DomainError::Validation(_) => ErrorKind::Validation,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::NotFound(_) => ErrorKind::NotFound,
            DomainError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            DomainError::Store(_) => ErrorKind::Store,
        }
    }

    /// HTTP status code a transport layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Validation | ErrorKind::InvalidOperation => 400,
            ErrorKind::Store => 500,
        }
    }

    /// Message safe to show to end users.
    pub fn public_message(&self) -> String {
        match self {
            DomainError::Store(_) => "internal store error".to_string(),
            other => other.to_string(),
        }
    }

    /// JSON error body in the `{ "error": kind, "message": ... }` shape.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.kind(),
            "message": self.public_message(),
        })
    }
}
