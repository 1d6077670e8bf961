mod error;
#[cfg(test)]
pub(crate) mod fake;
mod sqlite;

pub use error::{BackendError, BackendResult, ErrorKind, UnitError};
pub use sqlite::{SqliteBackend, classify};

use crate::types::{Account, LedgerEntry};

/// Name of the table backing the migration ledger.
pub const LEDGER_TABLE: &str = "schema_migrations";

/// Role stored on the one privileged account.
pub const ADMIN_ROLE: &str = "admin";

/// Backend defines the transport the lifecycle manager drives.
///
/// Every method reports failures as a classified [`BackendError`]; callers
/// branch on [`ErrorKind`] and never on message text.
pub trait Backend: Send + Sync {
    /// Lightweight existence probe; returns the entity's row count.
    fn probe(&self, entity: &str) -> BackendResult<i64>;

    // Ledger operations
    fn ensure_ledger(&self) -> BackendResult<()>;
    fn ledger_entries(&self) -> BackendResult<Vec<LedgerEntry>>;

    /// Runs `statements` in order and inserts `entry` into the ledger as one
    /// atomic change. The first failure rolls everything back.
    fn apply_unit(&self, statements: &[String], entry: &LedgerEntry) -> Result<(), UnitError>;

    // Privileged account operations
    fn find_privileged_account(&self) -> BackendResult<Option<String>>;
    fn insert_account(&self, account: &Account) -> BackendResult<()>;
}
