use std::sync::Arc;

use tracing::{debug, warn};

use super::RetryPolicy;
use crate::backend::{Backend, ErrorKind};
use crate::error::{Error, Result};
use crate::types::{EntityDescriptor, EntityStatus, StatusReport};

/// Reads which required entities exist. Never writes.
pub struct Inspector {
    backend: Arc<dyn Backend>,
    entities: Vec<EntityDescriptor>,
    retry: RetryPolicy,
}

impl Inspector {
    pub fn new(backend: Arc<dyn Backend>, entities: Vec<EntityDescriptor>, retry: RetryPolicy) -> Self {
        Self {
            backend,
            entities,
            retry,
        }
    }

    #[must_use]
    pub fn entities(&self) -> &[EntityDescriptor] {
        &self.entities
    }

    /// One inspection pass.
    ///
    /// A missing entity is data, not an error. A probe refused for any other
    /// reason counts as existing but inaccessible so that one permissions quirk
    /// cannot make the whole schema look uninitialized. Only a transient
    /// connectivity failure aborts the pass.
    pub fn inspect(&self) -> Result<StatusReport> {
        let mut statuses = Vec::with_capacity(self.entities.len());

        for entity in &self.entities {
            let status = match self.backend.probe(&entity.name) {
                Ok(count) => EntityStatus::present(&entity.name, count),
                Err(e) => match e.kind {
                    ErrorKind::MissingEntity => EntityStatus::missing(&entity.name),
                    ErrorKind::Transient => return Err(Error::Backend(e)),
                    ErrorKind::AccessDenied | ErrorKind::Conflict | ErrorKind::Failed => {
                        warn!(
                            "Entity '{}' could not be probed ({}); assuming it exists",
                            entity.name, e
                        );
                        EntityStatus::inaccessible(&entity.name)
                    }
                },
            };
            statuses.push(status);
        }

        let report = StatusReport::from_entities(statuses);
        debug!(
            "Inspected {} entities, {} missing",
            report.total_count,
            report.missing.len()
        );
        Ok(report)
    }

    /// [`Inspector::inspect`] with bounded backoff on transient failures.
    pub async fn check_status(&self) -> Result<StatusReport> {
        self.retry.run(|| self.inspect()).await
    }
}
