use std::fmt;
use std::fs;
use std::io::{self, ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::BucketSpec;

const MANIFEST_FILE: &str = "bucket.json";

/// Which credential a storage client acts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialTier {
    /// May read public buckets; cannot list private ones or create any.
    Restricted,
    Elevated,
}

impl fmt::Display for CredentialTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Restricted => f.write_str("restricted"),
            Self::Elevated => f.write_str("elevated"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    NotFound,
    AlreadyExists,
    AccessDenied,
    Transient,
    Failed,
}

impl fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotFound => "not found",
            Self::AlreadyExists => "already exists",
            Self::AccessDenied => "access denied",
            Self::Transient => "transient",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
}

impl StorageError {
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn from_io(e: std::io::Error) -> Self {
        let kind = match e.kind() {
            IoErrorKind::NotFound => StorageErrorKind::NotFound,
            IoErrorKind::AlreadyExists => StorageErrorKind::AlreadyExists,
            IoErrorKind::PermissionDenied => StorageErrorKind::AccessDenied,
            IoErrorKind::WouldBlock | IoErrorKind::TimedOut | IoErrorKind::Interrupted => {
                StorageErrorKind::Transient
            }
            _ => StorageErrorKind::Failed,
        };
        Self::new(kind, e.to_string())
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::from_io(e)
    }
}

/// A blob-storage client acting with one credential tier.
pub trait ObjectStore: Send + Sync {
    fn tier(&self) -> CredentialTier;
    fn bucket_exists(&self, name: &str) -> Result<bool, StorageError>;
    fn create_bucket(&self, spec: &BucketSpec) -> Result<(), StorageError>;
}

/// Policy persisted next to a bucket's objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketManifest {
    pub name: String,
    pub public_read: bool,
    pub max_object_bytes: u64,
    pub allowed_content_types: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Buckets as directories under a storage root, each holding a
/// `bucket.json` policy manifest.
pub struct FsObjectStore {
    root: PathBuf,
    tier: CredentialTier,
}

impl FsObjectStore {
    pub fn new(root: &Path, tier: CredentialTier) -> Self {
        Self {
            root: root.to_path_buf(),
            tier,
        }
    }

    fn bucket_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn manifest_path(&self, name: &str) -> PathBuf {
        self.bucket_path(name).join(MANIFEST_FILE)
    }

    pub fn read_manifest(&self, name: &str) -> Result<BucketManifest, StorageError> {
        let raw = fs::read(self.manifest_path(name))?;
        serde_json::from_slice(&raw)
            .map_err(|e| StorageError::new(StorageErrorKind::Failed, format!("corrupt manifest: {e}")))
    }
}

impl ObjectStore for FsObjectStore {
    fn tier(&self) -> CredentialTier {
        self.tier
    }

    fn bucket_exists(&self, name: &str) -> Result<bool, StorageError> {
        let manifest = match self.read_manifest(name) {
            Ok(manifest) => manifest,
            Err(e) if e.kind == StorageErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e),
        };

        // A restricted client cannot see private buckets at all.
        Ok(self.tier == CredentialTier::Elevated || manifest.public_read)
    }

    fn create_bucket(&self, spec: &BucketSpec) -> Result<(), StorageError> {
        if self.tier != CredentialTier::Elevated {
            return Err(StorageError::new(
                StorageErrorKind::AccessDenied,
                "restricted credential cannot create buckets",
            ));
        }

        let final_path = self.manifest_path(&spec.name);
        if final_path.exists() {
            return Err(StorageError::new(
                StorageErrorKind::AlreadyExists,
                format!("bucket {} already exists", spec.name),
            ));
        }

        let manifest = BucketManifest {
            name: spec.name.clone(),
            public_read: spec.public_read,
            max_object_bytes: spec.max_object_bytes,
            allowed_content_types: spec.allowed_content_types.clone(),
            created_at: Utc::now(),
        };
        let body = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| StorageError::new(StorageErrorKind::Failed, e.to_string()))?;

        let bucket_dir = self.bucket_path(&spec.name);
        fs::create_dir_all(&bucket_dir)?;

        let temp_path = bucket_dir.join(format!(".{}.tmp", Uuid::new_v4()));
        write_atomically(&temp_path, &final_path, &body)?;

        Ok(())
    }
}

/// Writes `body` to `temp_path` and renames it over `final_path`. The temp
/// file is removed again if any step fails.
fn write_atomically(temp_path: &Path, final_path: &Path, body: &[u8]) -> io::Result<()> {
    let written = fs::File::create(temp_path).and_then(|mut temp_file| {
        temp_file.write_all(body)?;
        temp_file.sync_all()?;
        fs::rename(temp_path, final_path)
    });

    if written.is_err() && temp_path.exists() {
        if let Err(e) = fs::remove_file(temp_path) {
            tracing::warn!("Failed to remove {}: {}", temp_path.display(), e);
        }
    }
    written
}
