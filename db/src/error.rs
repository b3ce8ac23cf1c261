//! Domain error taxonomy shared by the ledger, QR session, and attendance logic.
//!
//! Every variant is a terminal, user-visible failure: callers map them onto
//! HTTP status codes and never retry them. Persistence failures stay in the
//! `Db` variant and surface as server errors.

use sea_orm::DbErr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed input: unparseable QR payload, unknown enum value, etc.
    #[error("{0}")]
    BadRequest(String),

    /// Caller identity is missing or invalid.
    #[error("{0}")]
    Unauthorized(String),

    /// Caller is authenticated but lacks the required authority.
    #[error("{0}")]
    Forbidden(String),

    /// A referenced entity does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The operation conflicts with current state: duplicate registration,
    /// capacity exhausted, expired or superseded QR token, attendance
    /// already marked.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Db(#[from] DbErr),
}

/// True when a `DbErr` was caused by a UNIQUE index violation.
///
/// The `(user_id, event_id)` unique indexes are the concurrency safety net:
/// a lost check-then-insert race still fails at the storage layer, and this
/// lets callers report it as a conflict rather than a server error.
pub fn is_unique_violation(err: &DbErr) -> bool {
    err.to_string().contains("UNIQUE constraint failed")
}

impl DomainError {
    /// Converts a storage-layer error into the matching conflict, keeping
    /// everything else a server-side `Db` error.
    pub fn from_insert(err: DbErr, conflict_msg: &str) -> Self {
        if is_unique_violation(&err) {
            DomainError::Conflict(conflict_msg.to_string())
        } else {
            DomainError::Db(err)
        }
    }
}
