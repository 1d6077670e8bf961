use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A structural unit the application needs in the backend, declared once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub name: String,
    pub description: String,
}

impl EntityDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStatus {
    pub name: String,
    pub exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<i64>,
    /// False when the entity is assumed to exist but the probe was refused.
    pub accessible: bool,
}

impl EntityStatus {
    #[must_use]
    pub fn present(name: &str, row_count: i64) -> Self {
        Self {
            name: name.to_string(),
            exists: true,
            row_count: Some(row_count),
            accessible: true,
        }
    }

    #[must_use]
    pub fn missing(name: &str) -> Self {
        Self {
            name: name.to_string(),
            exists: false,
            row_count: None,
            accessible: true,
        }
    }

    #[must_use]
    pub fn inaccessible(name: &str) -> Self {
        Self {
            name: name.to_string(),
            exists: true,
            row_count: Some(0),
            accessible: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub is_initialized: bool,
    pub entities: Vec<EntityStatus>,
    pub missing: Vec<String>,
    pub total_count: usize,
    pub existing_count: usize,
}

impl StatusReport {
    #[must_use]
    pub fn from_entities(entities: Vec<EntityStatus>) -> Self {
        let missing: Vec<String> = entities
            .iter()
            .filter(|e| !e.exists)
            .map(|e| e.name.clone())
            .collect();
        let total_count = entities.len();

        Self {
            is_initialized: missing.is_empty(),
            existing_count: total_count - missing.len(),
            total_count,
            missing,
            entities,
        }
    }

    #[must_use]
    pub fn is_missing(&self, entity: &str) -> bool {
        self.missing.iter().any(|m| m == entity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub version: String,
    pub checksum: String,
    pub executed_at: DateTime<Utc>,
}

/// Outcome of one executor run, handed to the caller by value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationResult {
    pub success: bool,
    pub applied_versions: Vec<String>,
    pub failed_versions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub skipped_versions: Vec<String>,
    pub log: Vec<String>,
}

impl MigrationResult {
    /// A run that could not start at all.
    #[must_use]
    pub fn aborted(message: impl Into<String>) -> Self {
        Self {
            success: false,
            log: vec![format!("✗ {}", message.into())],
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketSpec {
    pub name: String,
    pub public_read: bool,
    pub max_object_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

impl Default for BucketSpec {
    fn default() -> Self {
        Self {
            name: "media".to_string(),
            public_read: true,
            max_object_bytes: 500 * 1024 * 1024,
            allowed_content_types: vec![
                "video/*".to_string(),
                "audio/*".to_string(),
                "image/*".to_string(),
                "application/pdf".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketStatus {
    pub name: String,
    pub exists: bool,
}

/// What an operator has to create by hand when automatic creation is refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualBucketSetup {
    pub name: String,
    pub public_read: bool,
    pub max_object_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

impl From<&BucketSpec> for ManualBucketSetup {
    fn from(spec: &BucketSpec) -> Self {
        Self {
            name: spec.name.clone(),
            public_read: spec.public_read,
            max_object_bytes: spec.max_object_bytes,
            allowed_content_types: spec.allowed_content_types.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnsureBucketOutcome {
    pub success: bool,
    pub already_existed: bool,
    pub requires_manual_setup: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_setup: Option<ManualBucketSetup>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub given_name: String,
    pub family_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub given_name: String,
    pub family_name: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminOutcome {
    Created,
    AlreadyExists,
    Invalid,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminCreationResult {
    pub success: bool,
    pub outcome: AdminOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub message: String,
}

impl AdminCreationResult {
    #[must_use]
    pub fn created(account_id: String) -> Self {
        Self {
            success: true,
            outcome: AdminOutcome::Created,
            message: format!("Administrator account {account_id} created"),
            account_id: Some(account_id),
        }
    }

    #[must_use]
    pub fn rejected(outcome: AdminOutcome, message: impl Into<String>) -> Self {
        Self {
            success: false,
            outcome,
            account_id: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Checking,
    Idle,
    Initializing,
    Repairing,
    Success,
    Error,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Checking => "checking",
            Self::Idle => "idle",
            Self::Initializing => "initializing",
            Self::Repairing => "repairing",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}
