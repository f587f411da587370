//! Domain error model.

use core::fmt::Display;

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Deterministic business failures only (state machine, preconditions, filing
/// rules). Storage and transport failures belong to the infra layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// The payroll month cannot take the requested transition from its current status.
    #[error("invalid transition: cannot {requested} while month is {from}")]
    InvalidTransition { from: String, requested: String },

    /// The operation is legal in principle but its preconditions are not met yet.
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// The calculation collaborator could not produce a snapshot.
    #[error("calculation failed for employee {employee_id}: {reason}")]
    CalculationFailure { employee_id: String, reason: String },

    /// Generation was blocked by validation errors.
    #[error("validation blocked generation ({count} error(s))")]
    ValidationFailure { count: usize },

    /// A correcting/voiding filing has no regular filing to refer to.
    #[error("conflicting correction: {0}")]
    ConflictingCorrection(String),

    /// A conflict occurred (e.g. stale version / optimistic concurrency).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn invalid_transition(from: impl Display, requested: impl Display) -> Self {
        Self::InvalidTransition {
            from: from.to_string(),
            requested: requested.to_string(),
        }
    }

    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::PreconditionFailed(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn calculation(employee_id: impl Display, reason: impl Display) -> Self {
        Self::CalculationFailure {
            employee_id: employee_id.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn conflicting_correction(msg: impl Into<String>) -> Self {
        Self::ConflictingCorrection(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}
