use thiserror::Error;

use crate::backend::BackendError;
use crate::bucket::StorageError;
use crate::schema::GraphError;
use crate::types::LifecycleState;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("backend unavailable: {0}")]
    Transient(String),

    #[error("another lifecycle operation is already running")]
    Busy,

    #[error("cannot {action} while {from}")]
    InvalidTransition {
        from: LifecycleState,
        action: &'static str,
    },

    #[error("invalid migration: {0}")]
    InvalidMigration(String),

    #[error("invalid bucket name: {0}")]
    InvalidBucketName(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

impl Error {
    /// Whether the operation may succeed if simply tried again later.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transient(_) => true,
            Self::Backend(e) => e.is_transient(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
