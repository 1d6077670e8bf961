use std::sync::{Arc, Mutex};

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::{ADMIN_ROLE, Backend, ErrorKind};
use crate::types::{Account, AdminCreationResult, AdminOutcome, Identity};

const MAX_NAME_LEN: usize = 100;

/// Creates the one privileged account. A second call reports
/// [`AdminOutcome::AlreadyExists`]; callers treat that as final.
pub struct BootstrapSeeder {
    backend: Arc<dyn Backend>,
    lock: Mutex<()>,
}

impl BootstrapSeeder {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            backend,
            lock: Mutex::new(()),
        }
    }

    pub fn create_admin(&self, identity: &Identity) -> AdminCreationResult {
        let given_name = identity.given_name.trim();
        let family_name = identity.family_name.trim();

        if let Err(message) = validate_name("Given name", given_name)
            .and_then(|()| validate_name("Family name", family_name))
        {
            return AdminCreationResult::rejected(AdminOutcome::Invalid, message);
        }

        // Check-then-insert must not interleave within this process.
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        match self.backend.find_privileged_account() {
            Ok(Some(existing)) => {
                return AdminCreationResult::rejected(
                    AdminOutcome::AlreadyExists,
                    format!("An administrator already exists ({existing})"),
                );
            }
            Ok(None) => {}
            Err(e) if e.kind == ErrorKind::MissingEntity => {
                return AdminCreationResult::rejected(
                    AdminOutcome::Failed,
                    "Account storage does not exist yet; initialize the schema first",
                );
            }
            Err(e) => {
                warn!("Could not check for an existing administrator: {}", e);
                return AdminCreationResult::rejected(
                    AdminOutcome::Failed,
                    format!("Could not check for an existing administrator: {e}"),
                );
            }
        }

        let account = Account {
            id: Uuid::new_v4().to_string(),
            given_name: given_name.to_string(),
            family_name: family_name.to_string(),
            role: ADMIN_ROLE.to_string(),
            created_at: Utc::now(),
        };

        match self.backend.insert_account(&account) {
            Ok(()) => {
                info!("Created administrator account {}", account.id);
                AdminCreationResult::created(account.id)
            }
            Err(e) if e.kind == ErrorKind::Conflict => AdminCreationResult::rejected(
                AdminOutcome::AlreadyExists,
                "An administrator already exists",
            ),
            Err(e) => {
                warn!("Failed to create administrator: {}", e);
                AdminCreationResult::rejected(
                    AdminOutcome::Failed,
                    format!("Failed to create administrator: {e}"),
                )
            }
        }
    }
}

fn validate_name(field: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{field} cannot be empty"));
    }
    if value.chars().count() > MAX_NAME_LEN {
        return Err(format!("{field} cannot exceed {MAX_NAME_LEN} characters"));
    }
    if value.chars().any(char::is_control) {
        return Err(format!("{field} contains invalid characters"));
    }
    Ok(())
}
