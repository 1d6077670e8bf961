use std::sync::Arc;

use tracing::{info, warn};

use super::{ObjectStore, ProbeOutcome, ProbeStrategy, StatusCache, StorageErrorKind, StoreProbe};
use crate::error::{Error, Result};
use crate::types::{BucketSpec, BucketStatus, EnsureBucketOutcome, ManualBucketSetup};

/// Idempotently ensures a storage bucket exists with the declared policy.
pub struct BucketProvisioner {
    probes: Vec<Box<dyn ProbeStrategy>>,
    creator: Arc<dyn ObjectStore>,
    cache: Arc<StatusCache>,
}

impl BucketProvisioner {
    pub fn new(
        probes: Vec<Box<dyn ProbeStrategy>>,
        creator: Arc<dyn ObjectStore>,
        cache: Arc<StatusCache>,
    ) -> Self {
        Self {
            probes,
            creator,
            cache,
        }
    }

    /// Probes through the restricted store, then the elevated one if
    /// configured; creates through the most privileged store available.
    pub fn from_stores(
        restricted: Arc<dyn ObjectStore>,
        elevated: Option<Arc<dyn ObjectStore>>,
        cache: Arc<StatusCache>,
    ) -> Self {
        let mut probes: Vec<Box<dyn ProbeStrategy>> =
            vec![Box::new(StoreProbe::new(Arc::clone(&restricted)))];
        if let Some(elevated) = &elevated {
            probes.push(Box::new(StoreProbe::new(Arc::clone(elevated))));
        }
        let creator = elevated.unwrap_or(restricted);

        Self::new(probes, creator, cache)
    }

    #[must_use]
    pub fn cache(&self) -> &StatusCache {
        &self.cache
    }

    fn probe(&self, name: &str) -> ProbeOutcome {
        for strategy in &self.probes {
            let outcome = strategy.probe(name);
            if outcome.conclusive {
                return outcome;
            }
        }
        ProbeOutcome::UNKNOWN
    }

    /// Cached status if fresh, otherwise a new probe. Inconclusive answers are
    /// reported as absent but never cached.
    pub fn status(&self, name: &str) -> Result<BucketStatus> {
        validate_bucket_name(name)?;

        if let Some(status) = self.cache.get(name) {
            return Ok(status);
        }

        let outcome = self.probe(name);
        let status = BucketStatus {
            name: name.to_string(),
            exists: outcome.found,
        };
        if outcome.conclusive {
            self.cache.insert(status.clone());
        }
        Ok(status)
    }

    /// Drops any cached verdict and probes again.
    pub fn refresh(&self, name: &str) -> Result<BucketStatus> {
        self.cache.invalidate(name);
        self.status(name)
    }

    pub fn ensure(&self, spec: &BucketSpec) -> EnsureBucketOutcome {
        let status = match self.status(&spec.name) {
            Ok(status) => status,
            Err(e) => return failed(e.to_string()),
        };

        if status.exists {
            self.cache.invalidate(&spec.name);
            return EnsureBucketOutcome {
                success: true,
                already_existed: true,
                requires_manual_setup: false,
                manual_setup: None,
                message: format!("Bucket '{}' already exists", spec.name),
            };
        }

        match self.creator.create_bucket(spec) {
            Ok(()) => {
                self.cache.invalidate(&spec.name);
                info!("Created bucket '{}'", spec.name);
                EnsureBucketOutcome {
                    success: true,
                    already_existed: false,
                    requires_manual_setup: false,
                    manual_setup: None,
                    message: format!("Bucket '{}' created", spec.name),
                }
            }
            Err(e) if e.kind == StorageErrorKind::AlreadyExists => {
                self.cache.invalidate(&spec.name);
                EnsureBucketOutcome {
                    success: true,
                    already_existed: true,
                    requires_manual_setup: false,
                    manual_setup: None,
                    message: format!("Bucket '{}' already exists", spec.name),
                }
            }
            Err(e) if e.kind == StorageErrorKind::AccessDenied => {
                warn!(
                    "Bucket '{}' could not be created automatically: {}",
                    spec.name, e
                );
                EnsureBucketOutcome {
                    success: false,
                    already_existed: false,
                    requires_manual_setup: true,
                    manual_setup: Some(ManualBucketSetup::from(spec)),
                    message: format!(
                        "Bucket '{}' must be created manually with the listed settings: {}",
                        spec.name, e.message
                    ),
                }
            }
            Err(e) => {
                warn!("Failed to create bucket '{}': {}", spec.name, e);
                failed(format!("Failed to create bucket '{}': {e}", spec.name))
            }
        }
    }
}

fn failed(message: String) -> EnsureBucketOutcome {
    EnsureBucketOutcome {
        success: false,
        already_existed: false,
        requires_manual_setup: false,
        manual_setup: None,
        message,
    }
}

pub fn validate_bucket_name(name: &str) -> Result<()> {
    if name.len() < 3 || name.len() > 63 {
        return Err(Error::InvalidBucketName(format!(
            "'{name}' must be 3 to 63 characters"
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(Error::InvalidBucketName(format!(
            "'{name}' may only contain lowercase letters, digits, '-' and '_'"
        )));
    }

    if !name.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return Err(Error::InvalidBucketName(format!(
            "'{name}' must start with a letter or digit"
        )));
    }

    Ok(())
}
