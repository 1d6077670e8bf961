use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use crate::backend::{Backend, ErrorKind, UnitError};
use crate::error::Result;
use crate::schema::MigrationUnit;
use crate::types::LedgerEntry;

/// Durable record of applied migration units, one row per version.
///
/// A version is written in the same transaction as its unit's statements, so
/// a unit interrupted half-way leaves nothing behind and runs again in full
/// next time.
pub struct Ledger {
    backend: Arc<dyn Backend>,
}

impl Ledger {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Creates the backing table if needed.
    pub fn ensure(&self) -> Result<()> {
        self.backend.ensure_ledger()?;
        Ok(())
    }

    pub fn applied(&self) -> Result<BTreeMap<String, LedgerEntry>> {
        let entries = self.backend.ledger_entries()?;
        Ok(entries
            .into_iter()
            .map(|entry| (entry.version.clone(), entry))
            .collect())
    }

    /// Runs `unit` and records it. Returns `false` when another run recorded
    /// the version first; the unit's own changes are then rolled back and the
    /// existing entry is left untouched.
    pub fn apply(&self, unit: &MigrationUnit) -> std::result::Result<bool, UnitError> {
        let entry = LedgerEntry {
            version: unit.version.clone(),
            checksum: unit.checksum(),
            executed_at: Utc::now(),
        };

        match self.backend.apply_unit(&unit.statements, &entry) {
            Ok(()) => Ok(true),
            Err(UnitError::Ledger(e)) if e.kind == ErrorKind::Conflict => Ok(false),
            Err(e) => Err(e),
        }
    }
}
