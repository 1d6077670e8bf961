use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{error, info, warn};

use super::{BootstrapSeeder, Executor, Inspector, RetryPolicy};
use crate::backend::{Backend, SqliteBackend};
use crate::bucket::{BucketProvisioner, CredentialTier, FsObjectStore, ObjectStore, StatusCache};
use crate::config::Settings;
use crate::error::{Error, Result};
use crate::schema::{
    DependencyGraph, DirectorySource, MigrationSource, MigrationUnit, StaticSource,
    platform_entities, platform_graph,
};
use crate::types::{
    AdminCreationResult, BucketSpec, BucketStatus, EnsureBucketOutcome, EntityDescriptor,
    Identity, LifecycleState, MigrationResult, StatusReport,
};

/// Owned view of the controller handed to callers.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub state: LifecycleState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<StatusReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_result: Option<MigrationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

struct Inner {
    state: LifecycleState,
    report: Option<StatusReport>,
    last_result: Option<MigrationResult>,
    last_error: Option<String>,
}

/// Clears the in-flight flag when the command that set it ends, however it
/// ends.
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone, Copy)]
enum RunKind {
    Initialize,
    Repair,
}

impl RunKind {
    fn action(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Repair => "repair",
        }
    }

    fn state(self) -> LifecycleState {
        match self {
            Self::Initialize => LifecycleState::Initializing,
            Self::Repair => LifecycleState::Repairing,
        }
    }
}

/// Drives inspection, initialization and repair through the lifecycle state
/// machine, and exposes bucket provisioning and admin seeding alongside.
///
/// Check, initialize and repair are single-flight: while one runs, the others
/// fail fast with [`Error::Busy`].
pub struct Controller {
    inspector: Inspector,
    executor: Executor,
    source: Arc<dyn MigrationSource>,
    graph: Option<DependencyGraph>,
    provisioner: BucketProvisioner,
    seeder: BootstrapSeeder,
    inner: Mutex<Inner>,
    in_flight: AtomicBool,
}

impl Controller {
    pub fn new(
        backend: Arc<dyn Backend>,
        entities: Vec<EntityDescriptor>,
        source: Arc<dyn MigrationSource>,
        provisioner: BucketProvisioner,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            inspector: Inspector::new(Arc::clone(&backend), entities, retry),
            executor: Executor::new(Arc::clone(&backend)),
            source,
            graph: None,
            provisioner,
            seeder: BootstrapSeeder::new(backend),
            inner: Mutex::new(Inner {
                state: LifecycleState::Checking,
                report: None,
                last_result: None,
                last_error: None,
            }),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Validate loaded units against `graph` before every run.
    #[must_use]
    pub fn with_graph(mut self, graph: DependencyGraph) -> Self {
        self.graph = Some(graph);
        self
    }

    /// Wires the SQLite backend, migration source and storage tiers described
    /// by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        fs::create_dir_all(&settings.data_dir)?;
        let backend: Arc<dyn Backend> = Arc::new(SqliteBackend::new(settings.db_path())?);

        let storage_root = settings.storage_root();
        fs::create_dir_all(&storage_root)?;
        let restricted: Arc<dyn ObjectStore> =
            Arc::new(FsObjectStore::new(&storage_root, CredentialTier::Restricted));
        let elevated: Option<Arc<dyn ObjectStore>> = settings.storage.elevated.then(|| {
            Arc::new(FsObjectStore::new(&storage_root, CredentialTier::Elevated))
                as Arc<dyn ObjectStore>
        });
        let cache = Arc::new(StatusCache::with_system_clock(settings.cache_ttl()));
        let provisioner = BucketProvisioner::from_stores(restricted, elevated, cache);

        let controller = match &settings.migrations_dir {
            Some(dir) => Self::new(
                backend,
                platform_entities(),
                Arc::new(DirectorySource::new(dir)),
                provisioner,
                settings.retry_policy(),
            ),
            None => Self::new(
                backend,
                platform_entities(),
                Arc::new(StaticSource::builtin()),
                provisioner,
                settings.retry_policy(),
            )
            .with_graph(platform_graph()),
        };
        Ok(controller)
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn begin(&self) -> Result<FlightGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::Busy)?;
        Ok(FlightGuard(&self.in_flight))
    }

    fn transition(&self, inner: &mut Inner, next: LifecycleState) {
        if inner.state != next {
            info!("Lifecycle {} -> {}", inner.state, next);
        }
        inner.state = next;
    }

    fn fail(&self, message: String) {
        error!("Lifecycle error: {}", message);
        let mut inner = self.inner();
        inner.last_error = Some(message);
        self.transition(&mut inner, LifecycleState::Error);
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.inner().state
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.inner();
        Snapshot {
            state: inner.state,
            report: inner.report.clone(),
            last_result: inner.last_result.clone(),
            last_error: inner.last_error.clone(),
        }
    }

    /// Inspects the backend and settles in `success`, `idle` or `error`.
    /// Inspection failures are reported through the snapshot, not as `Err`.
    pub async fn check(&self) -> Result<Snapshot> {
        let _flight = self.begin()?;
        {
            let mut inner = self.inner();
            self.transition(&mut inner, LifecycleState::Checking);
        }

        match self.inspector.check_status().await {
            Ok(report) => {
                let mut inner = self.inner();
                let next = if report.is_initialized {
                    LifecycleState::Success
                } else {
                    LifecycleState::Idle
                };
                inner.report = Some(report);
                inner.last_error = None;
                self.transition(&mut inner, next);
            }
            Err(e) => self.fail(format!("Status check failed: {e}")),
        }

        Ok(self.snapshot())
    }

    /// Re-enters `checking` from a terminal state.
    pub async fn recheck(&self) -> Result<Snapshot> {
        let from = self.state();
        if !matches!(from, LifecycleState::Success | LifecycleState::Error) {
            return Err(Error::InvalidTransition {
                from,
                action: "recheck",
            });
        }
        self.check().await
    }

    /// Applies every unit from the migration source.
    pub async fn initialize(&self) -> Result<MigrationResult> {
        self.run(RunKind::Initialize).await
    }

    /// Applies only the units that create an entity the latest report lists as
    /// missing. Units already in the ledger are skipped regardless.
    pub async fn repair(&self) -> Result<MigrationResult> {
        self.run(RunKind::Repair).await
    }

    async fn run(&self, kind: RunKind) -> Result<MigrationResult> {
        let _flight = self.begin()?;
        let missing = {
            let mut inner = self.inner();
            if inner.state != LifecycleState::Idle {
                return Err(Error::InvalidTransition {
                    from: inner.state,
                    action: kind.action(),
                });
            }
            self.transition(&mut inner, kind.state());
            inner
                .report
                .as_ref()
                .map(|r| r.missing.clone())
                .unwrap_or_default()
        };

        let units = match self.select_units(kind, &missing) {
            Ok(units) => units,
            Err(e) => {
                let message = format!("Cannot {}: {e}", kind.action());
                self.fail(message.clone());
                let result = MigrationResult::aborted(message);
                self.inner().last_result = Some(result.clone());
                return Ok(result);
            }
        };

        let result = match self.executor.apply(&units) {
            Ok(result) => result,
            Err(e) => {
                let message = format!("Migration run aborted: {e}");
                self.fail(message.clone());
                let result = MigrationResult::aborted(message);
                self.inner().last_result = Some(result.clone());
                return Ok(result);
            }
        };

        self.settle_after_run(&result).await;
        Ok(result)
    }

    fn select_units(&self, kind: RunKind, missing: &[String]) -> Result<Vec<MigrationUnit>> {
        let units = self.source.load()?;
        info!(
            "Loaded {} migration units from {}",
            units.len(),
            self.source.describe()
        );

        if let Some(graph) = &self.graph {
            graph.validate_units(&units)?;
        }

        Ok(match kind {
            RunKind::Initialize => units,
            RunKind::Repair => {
                let selected: Vec<MigrationUnit> = units
                    .into_iter()
                    .filter(|unit| unit.creates_any(missing))
                    .collect();
                if selected.is_empty() && !missing.is_empty() {
                    warn!(
                        "No migration unit creates the missing entities: {}",
                        missing.join(", ")
                    );
                }
                selected
            }
        })
    }

    /// Re-inspects after a run and picks `success` or `error`.
    async fn settle_after_run(&self, result: &MigrationResult) {
        let report = self.inspector.check_status().await;

        let mut inner = self.inner();
        inner.last_result = Some(result.clone());

        let report = match report {
            Ok(report) => report,
            Err(e) => {
                drop(inner);
                self.fail(format!("Post-run status check failed: {e}"));
                return;
            }
        };

        let outcome = if !result.failed_versions.is_empty() {
            Err(format!(
                "{} migration unit(s) failed: {}",
                result.failed_versions.len(),
                result.failed_versions.join(", ")
            ))
        } else if result.success || report.is_initialized {
            Ok(())
        } else {
            Err(format!(
                "Schema still incomplete; missing: {}",
                report.missing.join(", ")
            ))
        };
        inner.report = Some(report);
        drop(inner);

        match outcome {
            Ok(()) => {
                let mut inner = self.inner();
                inner.last_error = None;
                self.transition(&mut inner, LifecycleState::Success);
            }
            Err(message) => self.fail(message),
        }
    }

    pub fn ensure_bucket(&self, spec: &BucketSpec) -> EnsureBucketOutcome {
        self.provisioner.ensure(spec)
    }

    pub fn bucket_status(&self, name: &str) -> Result<BucketStatus> {
        self.provisioner.status(name)
    }

    pub fn refresh_bucket_status(&self, name: &str) -> Result<BucketStatus> {
        self.provisioner.refresh(name)
    }

    pub fn create_admin(&self, identity: &Identity) -> AdminCreationResult {
        self.seeder.create_admin(identity)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::bucket::ManualClock;
    use crate::types::AdminOutcome;
    use tempfile::TempDir;

    struct Fixture {
        backend: Arc<FakeBackend>,
        controller: Controller,
        _storage: TempDir,
    }

    fn unit(version: &str, script: &str) -> MigrationUnit {
        MigrationUnit::from_script(version, script).unwrap()
    }

    fn units() -> Vec<MigrationUnit> {
        vec![
            unit("001", "CREATE TABLE profiles (id TEXT PRIMARY KEY);"),
            unit(
                "002",
                "CREATE TABLE videos (id TEXT, owner TEXT REFERENCES profiles(id));",
            ),
            unit("003", "CREATE TABLE tags (id TEXT);"),
        ]
    }

    fn fixture_with(backend: FakeBackend, units: Vec<MigrationUnit>) -> Fixture {
        let storage = TempDir::new().unwrap();
        let backend = Arc::new(backend);
        let provisioner = BucketProvisioner::from_stores(
            Arc::new(FsObjectStore::new(storage.path(), CredentialTier::Restricted)),
            Some(Arc::new(FsObjectStore::new(
                storage.path(),
                CredentialTier::Elevated,
            ))),
            Arc::new(StatusCache::new(
                Duration::from_secs(60),
                Arc::new(ManualClock::new()),
            )),
        );
        let entities = ["profiles", "videos", "tags"]
            .iter()
            .map(|n| EntityDescriptor::new(*n, format!("{n} table")))
            .collect();
        let controller = Controller::new(
            backend.clone(),
            entities,
            Arc::new(StaticSource::new(units)),
            provisioner,
            RetryPolicy::new(2, Duration::from_millis(1)),
        );
        Fixture {
            backend,
            controller,
            _storage: storage,
        }
    }

    fn fixture(backend: FakeBackend) -> Fixture {
        fixture_with(backend, units())
    }

    #[tokio::test]
    async fn test_cold_start_is_checking() {
        let f = fixture(FakeBackend::new());
        assert_eq!(f.controller.state(), LifecycleState::Checking);
    }

    #[tokio::test]
    async fn test_check_empty_backend_goes_idle() {
        let f = fixture(FakeBackend::new());
        let snapshot = f.controller.check().await.unwrap();

        assert_eq!(snapshot.state, LifecycleState::Idle);
        let report = snapshot.report.unwrap();
        assert!(!report.is_initialized);
        assert_eq!(report.existing_count, 0);
    }

    #[tokio::test]
    async fn test_check_initialized_backend_goes_success() {
        let backend = FakeBackend::new()
            .with_table("profiles", 1)
            .with_table("videos", 0)
            .with_table("tags", 0);
        let f = fixture(backend);
        assert_eq!(
            f.controller.check().await.unwrap().state,
            LifecycleState::Success
        );
    }

    #[tokio::test]
    async fn test_transient_failures_end_in_error() {
        let f = fixture(FakeBackend::new().transient_probes(10));
        let snapshot = f.controller.check().await.unwrap();

        assert_eq!(snapshot.state, LifecycleState::Error);
        assert!(snapshot.last_error.unwrap().contains("gave up after 2 attempts"));

        // A recheck once the backend recovers clears the error.
        let f = fixture(FakeBackend::new().transient_probes(2));
        f.controller.check().await.unwrap();
        assert_eq!(f.controller.state(), LifecycleState::Error);
        let snapshot = f.controller.recheck().await.unwrap();
        assert_eq!(snapshot.state, LifecycleState::Idle);
        assert!(snapshot.last_error.is_none());
    }

    #[tokio::test]
    async fn test_initialize_applies_everything() {
        let f = fixture(FakeBackend::new());
        f.controller.check().await.unwrap();

        let result = f.controller.initialize().await.unwrap();
        assert!(result.success);
        assert_eq!(result.applied_versions, vec!["001", "002", "003"]);

        let snapshot = f.controller.snapshot();
        assert_eq!(snapshot.state, LifecycleState::Success);
        assert!(snapshot.report.unwrap().is_initialized);
        assert_eq!(snapshot.last_result.unwrap(), result);
    }

    #[tokio::test]
    async fn test_initialize_requires_idle() {
        let f = fixture(FakeBackend::new());
        let err = f.controller.initialize().await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidTransition {
                from: LifecycleState::Checking,
                action: "initialize"
            }
        ));

        f.controller.check().await.unwrap();
        f.controller.initialize().await.unwrap();
        assert!(matches!(
            f.controller.repair().await,
            Err(Error::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_recheck_rejected_while_idle() {
        let f = fixture(FakeBackend::new());
        f.controller.check().await.unwrap();
        assert!(matches!(
            f.controller.recheck().await,
            Err(Error::InvalidTransition { action: "recheck", .. })
        ));
    }

    #[tokio::test]
    async fn test_second_mutating_command_is_busy() {
        let f = fixture(FakeBackend::new());
        let _held = f.controller.begin().unwrap();

        assert!(matches!(f.controller.check().await, Err(Error::Busy)));
        assert!(matches!(f.controller.initialize().await, Err(Error::Busy)));
        assert!(matches!(f.controller.repair().await, Err(Error::Busy)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_initialize_runs_once() {
        let f = fixture(FakeBackend::new());
        f.controller.check().await.unwrap();
        let controller = Arc::new(f.controller);

        let spawn_initialize = |controller: Arc<Controller>| {
            tokio::spawn(async move { controller.initialize().await })
        };
        let first = spawn_initialize(Arc::clone(&controller));
        let second = spawn_initialize(Arc::clone(&controller));
        let results = [first.await.unwrap(), second.await.unwrap()];

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(results.iter().any(|r| matches!(
            r,
            Err(Error::Busy | Error::InvalidTransition { .. })
        )));
        assert_eq!(f.backend.ledger_versions(), vec!["001", "002", "003"]);
        assert_eq!(f.backend.executed().len(), 3);
        assert_eq!(controller.state(), LifecycleState::Success);
    }

    #[tokio::test]
    async fn test_flight_released_after_command() {
        let f = fixture(FakeBackend::new());
        f.controller.check().await.unwrap();
        f.controller.check().await.unwrap();
        assert!(!f.controller.in_flight.load(Ordering::Acquire));
    }

    #[tokio::test]
    async fn test_partial_failure_goes_error() {
        let f = fixture(FakeBackend::new().fail_statements_containing("CREATE TABLE videos"));
        f.controller.check().await.unwrap();

        let result = f.controller.initialize().await.unwrap();
        assert!(!result.success);
        assert_eq!(result.applied_versions, vec!["001", "003"]);
        assert_eq!(result.failed_versions, vec!["002"]);

        let snapshot = f.controller.snapshot();
        assert_eq!(snapshot.state, LifecycleState::Error);
        assert!(snapshot.last_error.unwrap().contains("002"));
        assert_eq!(snapshot.report.unwrap().missing, vec!["videos"]);
    }

    #[tokio::test]
    async fn test_repair_runs_only_missing_units() {
        let backend = FakeBackend::new()
            .with_table("profiles", 2)
            .with_table("videos", 5);
        let f = fixture(backend);
        f.controller.check().await.unwrap();

        let result = f.controller.repair().await.unwrap();
        assert!(result.success);
        assert_eq!(result.applied_versions, vec!["003"]);
        assert_eq!(f.backend.executed().len(), 1);
        assert_eq!(f.controller.state(), LifecycleState::Success);
    }

    #[tokio::test]
    async fn test_repair_twice_applies_nothing_new() {
        let f = fixture(FakeBackend::new());
        f.controller.check().await.unwrap();
        f.controller.repair().await.unwrap();
        let ledger_after_first = f.backend.ledger_versions();

        f.controller.recheck().await.unwrap();
        assert_eq!(f.controller.state(), LifecycleState::Success);

        // The table is gone but its unit is in the ledger.
        f.backend.drop_table("tags");
        f.controller.recheck().await.unwrap();
        let result = f.controller.repair().await.unwrap();

        assert!(result.applied_versions.is_empty());
        assert_eq!(result.skipped_versions, vec!["003"]);
        assert_eq!(f.backend.ledger_versions(), ledger_after_first);
        assert_eq!(f.controller.state(), LifecycleState::Error);
    }

    #[tokio::test]
    async fn test_graph_violation_aborts_run() {
        let out_of_order = vec![
            unit("001", "CREATE TABLE videos (id TEXT);"),
            unit("002", "CREATE TABLE profiles (id TEXT);"),
        ];
        let graph = DependencyGraph::new().depends_on("videos", &["profiles"]);
        let mut f = fixture_with(FakeBackend::new(), out_of_order);
        f.controller = f.controller.with_graph(graph);
        f.controller.check().await.unwrap();

        let result = f.controller.initialize().await.unwrap();
        assert!(!result.success);
        assert!(result.log[0].starts_with("✗ Cannot initialize"));
        assert!(f.backend.executed().is_empty());
        assert_eq!(f.controller.state(), LifecycleState::Error);
    }

    #[tokio::test]
    async fn test_admin_and_bucket_side_channels() {
        let f = fixture(FakeBackend::new());
        f.controller.check().await.unwrap();
        f.controller.initialize().await.unwrap();

        let identity = Identity {
            given_name: "Ada".to_string(),
            family_name: "Lovelace".to_string(),
        };
        assert!(f.controller.create_admin(&identity).success);
        let second = f.controller.create_admin(&identity);
        assert_eq!(second.outcome, AdminOutcome::AlreadyExists);
        assert_eq!(f.backend.admin_count(), 1);

        let outcome = f.controller.ensure_bucket(&BucketSpec::default());
        assert!(outcome.success);
        assert!(f.controller.bucket_status("media").unwrap().exists);
    }
}
