use std::sync::Arc;

use tracing::debug;

use super::{CredentialTier, ObjectStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub found: bool,
    /// Whether `found` can be trusted as the final answer.
    pub conclusive: bool,
}

impl ProbeOutcome {
    pub const FOUND: Self = Self {
        found: true,
        conclusive: true,
    };
    pub const ABSENT: Self = Self {
        found: false,
        conclusive: true,
    };
    pub const UNKNOWN: Self = Self {
        found: false,
        conclusive: false,
    };
}

/// One way of asking whether a bucket exists. Strategies are consulted in
/// order and the first conclusive answer wins.
pub trait ProbeStrategy: Send + Sync {
    fn name(&self) -> String;
    fn probe(&self, bucket: &str) -> ProbeOutcome;
}

/// Asks an object store directly.
///
/// A restricted client may lack list permission on a bucket that exists, so
/// "not found" from it is inconclusive; only the elevated tier can say a
/// bucket is absent.
pub struct StoreProbe {
    store: Arc<dyn ObjectStore>,
}

impl StoreProbe {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }
}

impl ProbeStrategy for StoreProbe {
    fn name(&self) -> String {
        format!("{} store", self.store.tier())
    }

    fn probe(&self, bucket: &str) -> ProbeOutcome {
        match self.store.bucket_exists(bucket) {
            Ok(true) => ProbeOutcome::FOUND,
            Ok(false) if self.store.tier() == CredentialTier::Elevated => ProbeOutcome::ABSENT,
            Ok(false) => ProbeOutcome::UNKNOWN,
            Err(e) => {
                debug!("Probe of bucket '{}' via {} failed: {}", bucket, self.name(), e);
                ProbeOutcome::UNKNOWN
            }
        }
    }
}
