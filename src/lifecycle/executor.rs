use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{error, info, warn};

use super::Ledger;
use crate::backend::{Backend, UnitError};
use crate::error::Result;
use crate::schema::MigrationUnit;
use crate::types::MigrationResult;

/// Line-oriented run log. Each line starts with a marker the UI can colour:
/// `✓` applied, `✗` failed, `•` informational, `!` warning.
#[derive(Default)]
struct RunLog {
    lines: Vec<String>,
}

impl RunLog {
    fn ok(&mut self, line: String) {
        info!("{line}");
        self.lines.push(format!("✓ {line}"));
    }

    fn fail(&mut self, line: String) {
        error!("{line}");
        self.lines.push(format!("✗ {line}"));
    }

    fn note(&mut self, line: String) {
        info!("{line}");
        self.lines.push(format!("• {line}"));
    }

    fn warn(&mut self, line: String) {
        warn!("{line}");
        self.lines.push(format!("! {line}"));
    }
}

/// Applies migration units in version order, at most once each.
pub struct Executor {
    ledger: Ledger,
}

impl Executor {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            ledger: Ledger::new(backend),
        }
    }

    /// Runs every unit not yet in the ledger.
    ///
    /// Units are sorted by version whatever order they arrive in. A failing
    /// statement aborts only its own unit; later units still run. `Err` is
    /// returned only when the ledger itself cannot be read or created.
    pub fn apply(&self, units: &[MigrationUnit]) -> Result<MigrationResult> {
        self.ledger.ensure()?;
        let already_applied = self.ledger.applied()?;

        let mut ordered: Vec<&MigrationUnit> = units.iter().collect();
        ordered.sort_by(|a, b| a.version.cmp(&b.version));

        let mut result = MigrationResult::default();
        let mut log = RunLog::default();
        let mut seen: BTreeSet<&str> = BTreeSet::new();

        log.note(format!("{} migration units to consider", ordered.len()));

        for unit in ordered {
            if !seen.insert(unit.version.as_str()) {
                log.fail(format!("{}: duplicate version, skipped", unit.version));
                result.failed_versions.push(unit.version.clone());
                continue;
            }

            if let Some(entry) = already_applied.get(&unit.version) {
                if entry.checksum != unit.checksum() {
                    log.warn(format!(
                        "{}: changed since it was applied on {}; not re-running",
                        unit.version,
                        entry.executed_at.to_rfc3339()
                    ));
                }
                log.note(format!("{}: already applied", unit.version));
                result.skipped_versions.push(unit.version.clone());
                continue;
            }

            match self.ledger.apply(unit) {
                Ok(true) => {
                    log.ok(format!(
                        "{}: applied {} statements",
                        unit.version,
                        unit.statements.len()
                    ));
                    result.applied_versions.push(unit.version.clone());
                }
                Ok(false) => {
                    log.note(format!(
                        "{}: already recorded by another run",
                        unit.version
                    ));
                    result.skipped_versions.push(unit.version.clone());
                }
                Err(UnitError::Statement { index, source }) => {
                    log.fail(format!(
                        "{}: statement {}/{} failed: {source}",
                        unit.version,
                        index + 1,
                        unit.statements.len()
                    ));
                    result.failed_versions.push(unit.version.clone());
                }
                Err(e) => {
                    log.fail(format!("{}: not applied: {e}", unit.version));
                    result.failed_versions.push(unit.version.clone());
                }
            }
        }

        result.success = result.failed_versions.is_empty() && !result.applied_versions.is_empty();

        if result.applied_versions.is_empty() && result.failed_versions.is_empty() {
            log.note("nothing to apply".to_string());
        } else {
            log.note(format!(
                "{} applied, {} failed",
                result.applied_versions.len(),
                result.failed_versions.len()
            ));
        }
        result.log = log.lines;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::backend::{ErrorKind, SqliteBackend};

    fn unit(version: &str, script: &str) -> MigrationUnit {
        MigrationUnit::from_script(version, script).unwrap()
    }

    fn three_units() -> Vec<MigrationUnit> {
        vec![
            unit("001", "CREATE TABLE a (id INT);"),
            unit("002", "CREATE TABLE b (id INT); CREATE TABLE broken (id INT);"),
            unit("003", "CREATE TABLE c (id INT);"),
        ]
    }

    #[test]
    fn test_applies_in_version_order() {
        let backend = Arc::new(FakeBackend::new());
        let executor = Executor::new(backend.clone());

        let units = vec![
            unit("002", "CREATE TABLE b (id INT, a_id INT REFERENCES a(id));"),
            unit("001", "CREATE TABLE a (id INT);"),
        ];
        let result = executor.apply(&units).unwrap();

        assert!(result.success);
        assert_eq!(result.applied_versions, vec!["001", "002"]);
        let executed = backend.executed();
        assert!(executed[0].contains("TABLE a"));
        assert!(executed[1].contains("TABLE b"));
    }

    #[test]
    fn test_failure_is_isolated_to_its_unit() {
        let backend = Arc::new(FakeBackend::new().fail_statements_containing("broken"));
        let executor = Executor::new(backend.clone());

        let result = executor.apply(&three_units()).unwrap();

        assert!(!result.success);
        assert_eq!(result.applied_versions, vec!["001", "003"]);
        assert_eq!(result.failed_versions, vec!["002"]);
        assert_eq!(backend.ledger_versions(), vec!["001", "003"]);
        assert!(result.log.iter().any(|l| l.starts_with("✗ 002: statement 2/2")));
    }

    #[test]
    fn test_failed_unit_retried_in_full() {
        let failing = Arc::new(FakeBackend::new().fail_statements_containing("broken"));
        let executor = Executor::new(failing.clone());
        executor.apply(&three_units()).unwrap();

        // The first statement ran but was rolled back with its unit.
        assert!(failing.executed().iter().any(|s| s.contains("TABLE b")));
        assert!(!failing.ledger_versions().contains(&"002".to_string()));

        failing.clear_failures();
        let result = executor.apply(&three_units()).unwrap();
        assert!(result.success);
        assert_eq!(result.applied_versions, vec!["002"]);
        assert_eq!(result.skipped_versions, vec!["001", "003"]);
    }

    #[test]
    fn test_partial_unit_leaves_nothing_behind_in_sqlite() {
        let backend = Arc::new(SqliteBackend::open_in_memory().unwrap());
        let executor = Executor::new(backend.clone());
        let dependent = unit("001", "CREATE TABLE a (id INT); INSERT INTO z (id) VALUES (1);");

        let first = executor.apply(std::slice::from_ref(&dependent)).unwrap();
        assert_eq!(first.failed_versions, vec!["001"]);
        assert!(first.log.iter().any(|l| l.starts_with("✗ 001: statement 2/2")));

        let second = executor
            .apply(&[dependent, unit("000", "CREATE TABLE z (id INT);")])
            .unwrap();
        assert!(second.success, "log: {:?}", second.log);
        assert_eq!(second.applied_versions, vec!["000", "001"]);
        assert_eq!(backend.probe("a").unwrap(), 0);
        assert_eq!(backend.probe("z").unwrap(), 1);
    }

    #[test]
    fn test_version_recorded_by_another_run_is_skipped() {
        let backend = Arc::new(FakeBackend::new().recorded_elsewhere("002"));
        let executor = Executor::new(backend.clone());

        let result = executor.apply(&three_units()).unwrap();

        assert_eq!(result.applied_versions, vec!["001", "003"]);
        assert_eq!(result.skipped_versions, vec!["002"]);
        assert!(result.failed_versions.is_empty());
        assert!(
            result
                .log
                .iter()
                .any(|l| l == "• 002: already recorded by another run")
        );
        assert_eq!(backend.ledger_versions(), vec!["001", "002", "003"]);
        // The losing run's own changes were not kept.
        assert_eq!(backend.probe("b").unwrap_err().kind, ErrorKind::MissingEntity);
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let backend = Arc::new(FakeBackend::new());
        let executor = Executor::new(backend.clone());
        let units = three_units();

        let first = executor.apply(&units).unwrap();
        assert_eq!(first.applied_versions.len(), 3);
        let executed_after_first = backend.executed().len();

        let second = executor.apply(&units).unwrap();
        assert!(second.applied_versions.is_empty());
        assert!(second.failed_versions.is_empty());
        assert!(!second.success);
        assert_eq!(second.skipped_versions, vec!["001", "002", "003"]);
        assert_eq!(backend.executed().len(), executed_after_first);
        assert_eq!(backend.ledger_versions(), vec!["001", "002", "003"]);
    }

    #[test]
    fn test_applied_unit_skipped_even_if_entity_empty() {
        let backend = Arc::new(FakeBackend::new());
        let executor = Executor::new(backend.clone());
        executor.apply(&[unit("001", "CREATE TABLE a (id INT);")]).unwrap();

        backend.drop_table("a");
        let result = executor.apply(&[unit("001", "CREATE TABLE a (id INT);")]).unwrap();
        assert_eq!(result.skipped_versions, vec!["001"]);
        assert!(result.applied_versions.is_empty());
    }

    #[test]
    fn test_duplicate_versions_run_once() {
        let backend = Arc::new(FakeBackend::new());
        let executor = Executor::new(backend.clone());

        let units = vec![
            unit("001", "CREATE TABLE a (id INT);"),
            unit("001", "CREATE TABLE other (id INT);"),
        ];
        let result = executor.apply(&units).unwrap();

        assert_eq!(result.applied_versions, vec!["001"]);
        assert_eq!(result.failed_versions, vec!["001"]);
        assert!(!result.success);
        assert_eq!(backend.ledger_versions(), vec!["001"]);
        assert_eq!(backend.executed().len(), 1);
    }

    #[test]
    fn test_changed_unit_logs_drift_warning() {
        let backend = Arc::new(FakeBackend::new());
        let executor = Executor::new(backend.clone());
        executor.apply(&[unit("001", "CREATE TABLE a (id INT);")]).unwrap();

        let result = executor
            .apply(&[unit("001", "CREATE TABLE a (id TEXT);")])
            .unwrap();
        assert!(result.log.iter().any(|l| l.starts_with("! 001: changed")));
        assert_eq!(backend.executed().len(), 1);
    }
}
