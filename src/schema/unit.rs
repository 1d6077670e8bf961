use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::statements::{created_entity, referenced_entities, split_statements};
use crate::error::{Error, Result};

/// A versioned, ordered batch of statements.
///
/// Units execute in ascending `version` order; the version string is compared
/// lexicographically, so authors zero-pad or timestamp-prefix it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationUnit {
    pub version: String,
    pub statements: Vec<String>,
}

impl MigrationUnit {
    pub fn new(version: impl Into<String>, statements: Vec<String>) -> Result<Self> {
        let version = version.into();
        validate_version(&version)?;

        if statements.iter().all(|s| s.trim().is_empty()) {
            return Err(Error::InvalidMigration(format!(
                "{version} contains no statements"
            )));
        }

        Ok(Self {
            version,
            statements,
        })
    }

    /// Builds a unit from a whole script, splitting it into statements.
    pub fn from_script(version: impl Into<String>, script: &str) -> Result<Self> {
        Self::new(version, split_statements(script))
    }

    /// Entities this unit creates, in statement order.
    #[must_use]
    pub fn creates(&self) -> Vec<String> {
        let mut created = Vec::new();
        for entity in self.statements.iter().filter_map(|s| created_entity(s)) {
            if !created.contains(&entity) {
                created.push(entity);
            }
        }
        created
    }

    #[must_use]
    pub fn creates_any(&self, entities: &[String]) -> bool {
        self.creates().iter().any(|c| entities.contains(c))
    }

    /// Entities this unit needs, excluding the ones it creates itself.
    #[must_use]
    pub fn references(&self) -> Vec<String> {
        let created = self.creates();
        let mut referenced = Vec::new();
        for entity in self.statements.iter().flat_map(|s| referenced_entities(s)) {
            if !created.contains(&entity) && !referenced.contains(&entity) {
                referenced.push(entity);
            }
        }
        referenced
    }

    /// SHA-256 over the statements, used to notice edits after a unit ran.
    #[must_use]
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        for statement in &self.statements {
            hasher.update(statement.trim().as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }
}

fn validate_version(version: &str) -> Result<()> {
    if version.trim().is_empty() {
        return Err(Error::InvalidMigration(
            "migration version cannot be empty".to_string(),
        ));
    }

    if version.len() > 255 {
        return Err(Error::InvalidMigration(format!(
            "migration version cannot exceed 255 characters: {version}"
        )));
    }

    if !version
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(Error::InvalidMigration(format!(
            "migration version contains invalid characters: {version}"
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_script_splits_and_analyses() {
        let unit = MigrationUnit::from_script(
            "0003_media",
            "CREATE TABLE IF NOT EXISTS videos (id TEXT, owner_id TEXT REFERENCES profiles(id));
             CREATE INDEX IF NOT EXISTS idx_videos_owner ON videos(owner_id);",
        )
        .unwrap();

        assert_eq!(unit.statements.len(), 2);
        assert_eq!(unit.creates(), vec!["videos"]);
        assert_eq!(unit.references(), vec!["profiles"]);
        assert!(unit.creates_any(&["videos".to_string()]));
        assert!(!unit.creates_any(&["profiles".to_string()]));
    }

    #[test]
    fn test_empty_unit_rejected() {
        let result = MigrationUnit::from_script("0001_empty", "-- nothing\n");
        assert!(matches!(result, Err(Error::InvalidMigration(_))));
    }

    #[test]
    fn test_version_validation() {
        assert!(MigrationUnit::from_script("", "SELECT 1").is_err());
        assert!(MigrationUnit::from_script("0001 bad", "SELECT 1").is_err());
        assert!(MigrationUnit::from_script("20240101.1_ok-name", "SELECT 1").is_ok());
    }

    #[test]
    fn test_checksum_tracks_statement_changes() {
        let a = MigrationUnit::from_script("0001", "CREATE TABLE a (id INT);").unwrap();
        let same = MigrationUnit::from_script("0001", "  CREATE TABLE a (id INT)  ;").unwrap();
        let edited = MigrationUnit::from_script("0001", "CREATE TABLE a (id TEXT);").unwrap();

        assert_eq!(a.checksum(), same.checksum());
        assert_ne!(a.checksum(), edited.checksum());
        assert_eq!(a.checksum().len(), 64);
    }
}
