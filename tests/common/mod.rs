#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::Connection;
use stagehand::config::Settings;
use stagehand::lifecycle::Controller;
use tempfile::TempDir;

/// An isolated data directory with helpers to build controllers over it.
pub struct TestEnv {
    pub temp_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn settings(&self) -> Settings {
        let mut settings = Settings {
            data_dir: self.data_dir().to_path_buf(),
            ..Settings::default()
        };
        settings.retry.base_delay_ms = 1;
        settings
    }

    pub fn controller(&self) -> Controller {
        Controller::from_settings(&self.settings()).expect("build controller")
    }

    /// A controller reading migrations from `dir` instead of the built-ins.
    pub fn controller_from_dir(&self, dir: &Path) -> Controller {
        let settings = Settings {
            migrations_dir: Some(dir.to_path_buf()),
            ..self.settings()
        };
        Controller::from_settings(&settings).expect("build controller")
    }

    /// Writes the first `count` built-in units as `*.sql` files.
    pub fn write_builtin_units(&self, count: usize) -> PathBuf {
        let dir = self.data_dir().join("migrations");
        fs::create_dir_all(&dir).expect("create migrations dir");
        for (version, script) in stagehand::schema::builtin::UNITS.iter().take(count) {
            fs::write(dir.join(format!("{version}.sql")), script).expect("write unit");
        }
        dir
    }

    pub fn db(&self) -> Connection {
        Connection::open(self.settings().db_path()).expect("open database")
    }

    pub fn admin_count(&self) -> i64 {
        self.db()
            .query_row(
                "SELECT COUNT(*) FROM profiles WHERE role = 'admin'",
                [],
                |row| row.get(0),
            )
            .expect("count admins")
    }

    pub fn ledger_versions(&self) -> Vec<String> {
        let conn = self.db();
        let mut stmt = conn
            .prepare("SELECT version FROM schema_migrations ORDER BY version")
            .expect("prepare ledger query");
        stmt.query_map([], |row| row.get(0))
            .expect("query ledger")
            .collect::<Result<Vec<String>, _>>()
            .expect("read ledger")
    }
}
