//! Credential lifecycle storage.
//!
//! Flow Overview:
//! 1) `ensure_schema` runs once when a backend is opened.
//! 2) The filter reads `userstatus` (through `is_2fa_enabled`) and lists credentials.
//! 3) The external ceremony handler stores new credentials, bumps sign counters
//!    after verified assertions, and deletes revoked credentials.
//!
//! Security boundaries:
//! - `(user_id, credential_id)` uniqueness is enforced by the backend, so two
//!   concurrent registrations of the same pair have exactly one winner.
//! - The store does not check sign counter monotonicity. Callers of
//!   `update_sign_counter` must have rejected replayed counters already.
//! - Updating or deleting an absent credential is reported as `NotFound`.

pub mod memory;
pub mod postgres;
pub mod schema;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use secrecy::SecretString;
use std::future::Future;
use std::time::Duration;

use super::{
    enablement::EnablementPolicy,
    error::{Fido2Error, Result},
    models::{Credential, CredentialId, Fido2Status, NewCredential},
};

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
const ENV_STORE_DSN: &str = "FIDO2SF_DSN";

/// Storage contract used by the filter and by the external ceremony handler.
pub trait Fido2Store: Send + Sync {
    /// Create the tables if they do not exist. Safe to call concurrently.
    fn ensure_schema(&self) -> impl Future<Output = Result<()>> + Send;

    /// Stored status for a user, `None` when no row exists.
    fn user_status(&self, user_id: &str) -> impl Future<Output = Result<Option<Fido2Status>>> + Send;

    /// Insert or replace the status row of a user. An empty or oversized user
    /// id is `InvalidInput`.
    fn set_user_status(
        &self,
        user_id: &str,
        status: Fido2Status,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Whether any user has registered this credential id.
    fn credential_exists(
        &self,
        credential_id: &CredentialId,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Insert a credential. Fails with `DuplicateCredential` when the
    /// `(user_id, credential_id)` pair exists; the existing row is left untouched.
    /// Fields wider than their columns are `InvalidInput` and never reach the backend.
    fn store_credential(&self, credential: NewCredential) -> impl Future<Output = Result<()>> + Send;

    /// All credentials of a user, ordered by creation time then credential id.
    fn list_credentials(&self, user_id: &str) -> impl Future<Output = Result<Vec<Credential>>> + Send;

    /// Overwrite the sign counter of a credential.
    ///
    /// Precondition: the caller has verified the assertion and that `value`
    /// is not a replayed counter. No comparison with the stored value happens
    /// here and concurrent updates are last-write-wins.
    fn update_sign_counter(
        &self,
        credential_id: &CredentialId,
        value: u32,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove a credential. Returns `NotFound` when nothing was deleted.
    fn delete_credential(&self, credential_id: &CredentialId) -> impl Future<Output = Result<()>> + Send;

    /// Enablement decision for a user. The status row is read only when the
    /// policy asks for the database; read failures propagate as errors.
    fn is_2fa_enabled(
        &self,
        user_id: &str,
        policy: &EnablementPolicy,
    ) -> impl Future<Output = Result<bool>> + Send {
        let policy = *policy;
        async move {
            if !policy.use_database {
                return Ok(policy.resolve(None));
            }
            let stored = self.user_status(user_id).await?;
            if stored.is_none() {
                tracing::debug!(user_id, "user does not exist in store, using default");
            }
            Ok(policy.resolve(stored))
        }
    }
}

/// Connection settings for `PgStore`. Cheap to clone; a filter that crosses a
/// process boundary carries this and reconnects through `PgStore::connect`.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    dsn: SecretString,
    max_connections: u32,
    acquire_timeout: Duration,
}

impl StoreConfig {
    /// # Errors
    /// Returns `Configuration` if the DSN is empty.
    pub fn new(dsn: SecretString) -> Result<Self> {
        use secrecy::ExposeSecret;
        if dsn.expose_secret().trim().is_empty() {
            return Err(Fido2Error::Configuration(
                "store dsn is required".to_string(),
            ));
        }
        Ok(Self {
            dsn,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
        })
    }

    /// Load the DSN from `FIDO2SF_DSN`.
    ///
    /// # Errors
    /// Returns `Configuration` if the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        let dsn = std::env::var(ENV_STORE_DSN).map_err(|_| {
            Fido2Error::Configuration(format!("{ENV_STORE_DSN} is not set"))
        })?;
        Self::new(SecretString::from(dsn))
    }

    #[must_use]
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    #[must_use]
    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    #[must_use]
    pub fn dsn(&self) -> &SecretString {
        &self.dsn
    }

    #[must_use]
    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }

    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }
}
