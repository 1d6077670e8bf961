use std::fs;
use std::path::{Path, PathBuf};

use super::{MigrationUnit, builtin};
use crate::error::{Error, Result};

/// Supplies migration units; the lifecycle manager does not care where they
/// are kept.
pub trait MigrationSource: Send + Sync {
    /// All units, sorted by ascending version.
    fn load(&self) -> Result<Vec<MigrationUnit>>;

    /// Human-readable origin for log lines.
    fn describe(&self) -> String;
}

/// Units held in memory, e.g. compiled into the binary.
pub struct StaticSource {
    units: Vec<MigrationUnit>,
}

impl StaticSource {
    #[must_use]
    pub fn new(mut units: Vec<MigrationUnit>) -> Self {
        units.sort_by(|a, b| a.version.cmp(&b.version));
        Self { units }
    }

    /// The content library's own schema.
    #[must_use]
    pub fn builtin() -> Self {
        let units = builtin::UNITS
            .iter()
            .map(|(version, script)| MigrationUnit {
                version: (*version).to_string(),
                statements: super::split_statements(script),
            })
            .collect();
        Self::new(units)
    }
}

impl MigrationSource for StaticSource {
    fn load(&self) -> Result<Vec<MigrationUnit>> {
        Ok(self.units.clone())
    }

    fn describe(&self) -> String {
        "built-in migrations".to_string()
    }
}

/// Units read from `*.sql` files in one directory. The file stem is the
/// version, so `0003_media.sql` becomes version `0003_media`.
pub struct DirectorySource {
    dir: PathBuf,
}

impl DirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl MigrationSource for DirectorySource {
    fn load(&self) -> Result<Vec<MigrationUnit>> {
        if !self.dir.is_dir() {
            return Err(Error::Config(format!(
                "migrations directory not found: {}",
                self.dir.display()
            )));
        }

        let escaped = glob::Pattern::escape(&self.dir.to_string_lossy());
        let pattern = Path::new(&escaped).join("*.sql");
        let paths = glob::glob(&pattern.to_string_lossy())
            .map_err(|e| Error::Config(format!("invalid migrations path: {e}")))?;

        let mut units = Vec::new();
        for entry in paths {
            let path = entry.map_err(|e| Error::Io(e.into_error()))?;
            let Some(version) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let script = fs::read_to_string(&path)?;
            units.push(MigrationUnit::from_script(version, &script)?);
        }

        units.sort_by(|a, b| a.version.cmp(&b.version));
        tracing::debug!(
            "Loaded {} migration units from {}",
            units.len(),
            self.dir.display()
        );
        Ok(units)
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}
