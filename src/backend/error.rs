use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of failure classes a backend adapter reports upward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The relation being addressed does not exist.
    MissingEntity,
    /// The caller is not allowed to read or change the relation.
    AccessDenied,
    /// Connection-level trouble: busy, locked, exhausted, unreachable.
    Transient,
    /// A uniqueness or other constraint rejected the write.
    Conflict,
    Failed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::MissingEntity => "missing entity",
            Self::AccessDenied => "access denied",
            Self::Transient => "transient",
            Self::Conflict => "conflict",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct BackendError {
    pub kind: ErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn is_transient(&self) -> bool {
        self.kind == ErrorKind::Transient
    }
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Why a migration unit was not applied. Nothing from the unit is kept in
/// any of these cases.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitError {
    /// Statement at `index` (zero-based) was rejected.
    #[error("statement {} failed: {source}", .index + 1)]
    Statement { index: usize, source: BackendError },
    /// The ledger row could not be written.
    #[error("ledger insert failed: {0}")]
    Ledger(BackendError),
    /// The surrounding transaction could not be opened or committed.
    #[error("transaction failed: {0}")]
    Transaction(BackendError),
}
