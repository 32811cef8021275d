//! In-process store with the same invariants as the Postgres backend.
//!
//! Useful for development and tests. `set_offline` makes every operation fail
//! with `StorageUnavailable` to exercise outage handling.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

use super::Fido2Store;
use crate::fido2::{
    error::{Fido2Error, Result},
    models::{Credential, CredentialId, Fido2Status, NewCredential, validate_user_id},
};

#[derive(Debug, Default)]
struct Tables {
    // insertion order doubles as creation order
    credentials: Vec<Credential>,
    userstatus: HashMap<String, Fido2Status>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    offline: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a backend outage (or recovery).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Fido2Error::StorageUnavailable(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

impl Fido2Store for MemoryStore {
    async fn ensure_schema(&self) -> Result<()> {
        self.check_online()
    }

    async fn user_status(&self, user_id: &str) -> Result<Option<Fido2Status>> {
        self.check_online()?;
        let tables = self.tables.lock().await;
        Ok(tables.userstatus.get(user_id).copied())
    }

    async fn set_user_status(&self, user_id: &str, status: Fido2Status) -> Result<()> {
        validate_user_id(user_id)?;
        self.check_online()?;
        let mut tables = self.tables.lock().await;
        tables.userstatus.insert(user_id.to_string(), status);
        debug!(user_id, %status, "user status updated");
        Ok(())
    }

    async fn credential_exists(&self, credential_id: &CredentialId) -> Result<bool> {
        self.check_online()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .credentials
            .iter()
            .any(|c| &c.credential_id == credential_id))
    }

    async fn store_credential(&self, credential: NewCredential) -> Result<()> {
        credential.validate()?;
        self.check_online()?;
        let mut tables = self.tables.lock().await;

        let duplicate = tables.credentials.iter().any(|c| {
            c.user_id == credential.user_id && c.credential_id == credential.credential_id
        });
        if duplicate {
            return Err(Fido2Error::DuplicateCredential {
                user_id: credential.user_id,
                credential_id: credential.credential_id.to_string(),
            });
        }

        let friendly_name = credential.friendly_name().to_string();
        tables.credentials.push(Credential {
            user_id: credential.user_id,
            credential_id: credential.credential_id,
            public_key: credential.public_key,
            algorithm: Some(credential.algorithm),
            sign_counter: credential.sign_counter,
            friendly_name,
            created_at: Utc::now(),
        });

        Ok(())
    }

    async fn list_credentials(&self, user_id: &str) -> Result<Vec<Credential>> {
        self.check_online()?;
        let tables = self.tables.lock().await;
        Ok(tables
            .credentials
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn update_sign_counter(&self, credential_id: &CredentialId, value: u32) -> Result<()> {
        self.check_online()?;
        let mut tables = self.tables.lock().await;

        let mut updated = 0;
        for credential in tables
            .credentials
            .iter_mut()
            .filter(|c| &c.credential_id == credential_id)
        {
            credential.sign_counter = value;
            updated += 1;
        }

        if updated == 0 {
            return Err(Fido2Error::NotFound(credential_id.to_string()));
        }
        Ok(())
    }

    async fn delete_credential(&self, credential_id: &CredentialId) -> Result<()> {
        self.check_online()?;
        let mut tables = self.tables.lock().await;

        let before = tables.credentials.len();
        tables
            .credentials
            .retain(|c| &c.credential_id != credential_id);

        if tables.credentials.len() == before {
            return Err(Fido2Error::NotFound(credential_id.to_string()));
        }
        Ok(())
    }
}
