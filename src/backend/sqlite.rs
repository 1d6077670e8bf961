use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OpenFlags, OptionalExtension, params};

use super::{ADMIN_ROLE, Backend, BackendError, BackendResult, ErrorKind, LEDGER_TABLE, UnitError};
use crate::error::Result;
use crate::types::{Account, LedgerEntry};

pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an existing database without write access.
    pub fn open_read_only<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Maps a rusqlite error onto the closed backend taxonomy.
///
/// This is the only place that looks at SQLite result codes or message text.
#[must_use]
pub fn classify(err: &rusqlite::Error) -> ErrorKind {
    match err {
        rusqlite::Error::SqliteFailure(failure, message) => match failure.code {
            ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked
            | ErrorCode::CannotOpen
            | ErrorCode::FileLockingProtocolFailed
            | ErrorCode::OutOfMemory => ErrorKind::Transient,
            ErrorCode::PermissionDenied
            | ErrorCode::AuthorizationForStatementDenied
            | ErrorCode::ReadOnly => ErrorKind::AccessDenied,
            ErrorCode::ConstraintViolation => ErrorKind::Conflict,
            _ => match message {
                Some(msg) if is_missing_relation(msg) => ErrorKind::MissingEntity,
                _ => ErrorKind::Failed,
            },
        },
        other => {
            if is_missing_relation(&other.to_string()) {
                ErrorKind::MissingEntity
            } else {
                ErrorKind::Failed
            }
        }
    }
}

fn is_missing_relation(message: &str) -> bool {
    message.contains("no such table")
}

impl From<rusqlite::Error> for BackendError {
    fn from(err: rusqlite::Error) -> Self {
        BackendError::new(classify(&err), err.to_string())
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in ledger: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

impl Backend for SqliteBackend {
    fn probe(&self, entity: &str) -> BackendResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(entity));
        let count = self.conn().query_row(&sql, [], |row| row.get(0))?;
        Ok(count)
    }

    fn ensure_ledger(&self) -> BackendResult<()> {
        self.conn().execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {LEDGER_TABLE} (
                version TEXT PRIMARY KEY,
                checksum TEXT NOT NULL,
                executed_at TEXT NOT NULL
            )"
        ))?;
        Ok(())
    }

    fn ledger_entries(&self) -> BackendResult<Vec<LedgerEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT version, checksum, executed_at FROM {LEDGER_TABLE} ORDER BY version"
        ))?;

        let rows = stmt.query_map([], |row| {
            Ok(LedgerEntry {
                version: row.get(0)?,
                checksum: row.get(1)?,
                executed_at: parse_datetime(&row.get::<_, String>(2)?),
            })
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(BackendError::from)
    }

    fn apply_unit(
        &self,
        statements: &[String],
        entry: &LedgerEntry,
    ) -> std::result::Result<(), UnitError> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .map_err(|e| UnitError::Transaction(e.into()))?;

        for (index, statement) in statements.iter().enumerate() {
            tx.execute_batch(statement)
                .map_err(|e| UnitError::Statement {
                    index,
                    source: e.into(),
                })?;
        }

        tx.execute(
            &format!(
                "INSERT INTO {LEDGER_TABLE} (version, checksum, executed_at) VALUES (?1, ?2, ?3)"
            ),
            params![
                entry.version,
                entry.checksum,
                format_datetime(&entry.executed_at)
            ],
        )
        .map_err(|e| UnitError::Ledger(e.into()))?;

        tx.commit().map_err(|e| UnitError::Transaction(e.into()))
    }

    fn find_privileged_account(&self) -> BackendResult<Option<String>> {
        self.conn()
            .query_row(
                "SELECT id FROM profiles WHERE role = ?1 ORDER BY created_at LIMIT 1",
                params![ADMIN_ROLE],
                |row| row.get(0),
            )
            .optional()
            .map_err(BackendError::from)
    }

    fn insert_account(&self, account: &Account) -> BackendResult<()> {
        self.conn().execute(
            "INSERT INTO profiles (id, given_name, family_name, role, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                account.id,
                account.given_name,
                account.family_name,
                account.role,
                format_datetime(&account.created_at),
            ],
        )?;
        Ok(())
    }
}
