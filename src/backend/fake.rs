//! Scriptable in-memory backend for unit tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use super::{ADMIN_ROLE, Backend, BackendError, BackendResult, ErrorKind, UnitError};
use crate::schema::created_entity;
use crate::types::{Account, LedgerEntry};

#[derive(Default)]
struct State {
    tables: BTreeMap<String, i64>,
    denied: BTreeSet<String>,
    failing: Vec<String>,
    recorded_elsewhere: BTreeSet<String>,
    transient_probes: usize,
    ledger: BTreeMap<String, LedgerEntry>,
    ledger_ready: bool,
    accounts: Vec<Account>,
    executed: Vec<String>,
}

#[derive(Default)]
pub struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn with_table(self, name: &str, rows: i64) -> Self {
        self.state().tables.insert(name.to_string(), rows);
        self
    }

    /// Probes of this entity fail with an access-denied error.
    pub fn deny(self, name: &str) -> Self {
        self.state().denied.insert(name.to_string());
        self
    }

    /// Any statement containing `needle` fails.
    pub fn fail_statements_containing(self, needle: &str) -> Self {
        self.state().failing.push(needle.to_string());
        self
    }

    pub fn clear_failures(&self) {
        self.state().failing.clear();
    }

    /// Another run records `version` between this run's ledger read and its
    /// own insert.
    pub fn recorded_elsewhere(self, version: &str) -> Self {
        self.state().recorded_elsewhere.insert(version.to_string());
        self
    }

    /// The next `count` probes fail as transient.
    pub fn transient_probes(self, count: usize) -> Self {
        self.state().transient_probes = count;
        self
    }

    pub fn drop_table(&self, name: &str) {
        self.state().tables.remove(name);
    }

    pub fn executed(&self) -> Vec<String> {
        self.state().executed.clone()
    }

    pub fn ledger_versions(&self) -> Vec<String> {
        self.state().ledger.keys().cloned().collect()
    }

    pub fn admin_count(&self) -> usize {
        self.state()
            .accounts
            .iter()
            .filter(|a| a.role == ADMIN_ROLE)
            .count()
    }
}

impl Backend for FakeBackend {
    fn probe(&self, entity: &str) -> BackendResult<i64> {
        let mut state = self.state();
        if state.transient_probes > 0 {
            state.transient_probes -= 1;
            return Err(BackendError::new(ErrorKind::Transient, "too many connections"));
        }
        if state.denied.contains(entity) {
            return Err(BackendError::new(
                ErrorKind::AccessDenied,
                format!("permission denied for {entity}"),
            ));
        }
        state
            .tables
            .get(entity)
            .copied()
            .ok_or_else(|| BackendError::new(ErrorKind::MissingEntity, format!("no such table: {entity}")))
    }

    fn ensure_ledger(&self) -> BackendResult<()> {
        self.state().ledger_ready = true;
        Ok(())
    }

    fn ledger_entries(&self) -> BackendResult<Vec<LedgerEntry>> {
        let state = self.state();
        if !state.ledger_ready {
            return Err(BackendError::new(ErrorKind::MissingEntity, "no such table: schema_migrations"));
        }
        Ok(state.ledger.values().cloned().collect())
    }

    fn apply_unit(&self, statements: &[String], entry: &LedgerEntry) -> Result<(), UnitError> {
        let mut state = self.state();
        let mut created = Vec::new();

        for (index, statement) in statements.iter().enumerate() {
            if state.failing.iter().any(|needle| statement.contains(needle.as_str())) {
                return Err(UnitError::Statement {
                    index,
                    source: BackendError::new(ErrorKind::Failed, "syntax error"),
                });
            }
            state.executed.push(statement.clone());
            created.extend(created_entity(statement));
        }

        if state.recorded_elsewhere.remove(&entry.version) {
            state.ledger.insert(entry.version.clone(), entry.clone());
        }
        if state.ledger.contains_key(&entry.version) {
            return Err(UnitError::Ledger(BackendError::new(
                ErrorKind::Conflict,
                "UNIQUE constraint failed: schema_migrations.version",
            )));
        }

        for entity in created {
            state.tables.entry(entity).or_insert(0);
        }
        state.ledger.insert(entry.version.clone(), entry.clone());
        Ok(())
    }

    fn find_privileged_account(&self) -> BackendResult<Option<String>> {
        let state = self.state();
        if !state.tables.contains_key("profiles") {
            return Err(BackendError::new(ErrorKind::MissingEntity, "no such table: profiles"));
        }
        Ok(state
            .accounts
            .iter()
            .find(|a| a.role == ADMIN_ROLE)
            .map(|a| a.id.clone()))
    }

    fn insert_account(&self, account: &Account) -> BackendResult<()> {
        let mut state = self.state();
        if account.role == ADMIN_ROLE && state.accounts.iter().any(|a| a.role == ADMIN_ROLE) {
            return Err(BackendError::new(ErrorKind::Conflict, "UNIQUE constraint failed: profiles.role"));
        }
        state.accounts.push(account.clone());
        if let Some(rows) = state.tables.get_mut("profiles") {
            *rows += 1;
        }
        Ok(())
    }
}
