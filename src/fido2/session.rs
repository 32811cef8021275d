//! Hand-off of suspended authentication state to the ceremony handler.
//!
//! The filter never keeps live handles in saved state: the ceremony handler
//! rebuilds its own store from `StoreConfig` when it resumes.

use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::future::Future;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::error::{Fido2Error, Result};

/// Stores suspended state under a fresh correlation id.
pub trait SessionStateRepository: Send + Sync {
    /// Persist `state` as opaque bytes tagged with `stage` and return its id.
    fn save<T: Serialize + Sync>(
        &self,
        stage: &str,
        state: &T,
    ) -> impl Future<Output = Result<Uuid>> + Send;
}

/// Process-local repository, for single-node deployments and tests.
#[derive(Debug, Default)]
pub struct MemorySessionStateRepository {
    entries: Mutex<HashMap<Uuid, (String, Vec<u8>)>>,
}

impl MemorySessionStateRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a saved state without consuming it.
    ///
    /// # Errors
    /// Returns `Session` if the id is unknown, the stage does not match, or the
    /// payload does not decode into `T`.
    pub async fn load<T: DeserializeOwned>(&self, id: Uuid, stage: &str) -> Result<T> {
        let entries = self.entries.lock().await;
        let (saved_stage, payload) = entries
            .get(&id)
            .ok_or_else(|| Fido2Error::Session(format!("unknown state id {id}")))?;
        if saved_stage != stage {
            return Err(Fido2Error::Session(format!(
                "state {id} belongs to stage {saved_stage}, expected {stage}"
            )));
        }
        Ok(serde_json::from_slice(payload)?)
    }

    /// Read and remove a saved state; a second `take` with the same id fails.
    /// Lookup, stage check and removal happen under one lock, so concurrent
    /// takes of the same id have a single winner. A stage mismatch leaves the
    /// entry in place.
    ///
    /// # Errors
    /// Same as `load`.
    pub async fn take<T: DeserializeOwned>(&self, id: Uuid, stage: &str) -> Result<T> {
        let payload = {
            let mut entries = self.entries.lock().await;
            let (saved_stage, _) = entries
                .get(&id)
                .ok_or_else(|| Fido2Error::Session(format!("unknown state id {id}")))?;
            if saved_stage != stage {
                return Err(Fido2Error::Session(format!(
                    "state {id} belongs to stage {saved_stage}, expected {stage}"
                )));
            }
            entries
                .remove(&id)
                .map(|(_, payload)| payload)
                .ok_or_else(|| Fido2Error::Session(format!("unknown state id {id}")))?
        };
        Ok(serde_json::from_slice(&payload)?)
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

impl SessionStateRepository for MemorySessionStateRepository {
    async fn save<T: Serialize + Sync>(&self, stage: &str, state: &T) -> Result<Uuid> {
        let payload = serde_json::to_vec(state)?;
        let id = Uuid::new_v4();
        self.entries
            .lock()
            .await
            .insert(id, (stage.to_string(), payload));
        Ok(id)
    }
}
