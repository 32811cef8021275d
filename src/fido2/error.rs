//! Error taxonomy shared by the store, the resolver and the filter.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Fido2Error {
    /// Missing or invalid filter/store configuration. Fatal for the filter instance.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The backing store could not serve the request.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] sqlx::Error),

    #[error("credential {credential_id} is already registered for user {user_id}")]
    DuplicateCredential {
        user_id: String,
        credential_id: String,
    },

    #[error("credential not found: {0}")]
    NotFound(String),

    /// The OS random source failed; challenges are never generated from a weaker source.
    #[error("secure random source unavailable: {0}")]
    CryptoSourceUnavailable(#[source] rand::Error),

    /// Caller input that does not fit the stored columns.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid credential id: {0}")]
    InvalidCredentialId(String),

    #[error("attribute {0} is missing from the authentication result")]
    MissingAttribute(String),

    #[error("session state error: {0}")]
    Session(String),
}

impl Fido2Error {
    /// Errors that must take the whole filter instance out of service.
    #[must_use]
    pub fn is_fatal_for_instance(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

impl From<sqlx::Error> for Fido2Error {
    fn from(err: sqlx::Error) -> Self {
        Self::StorageUnavailable(err)
    }
}

impl From<serde_json::Error> for Fido2Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Session(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Fido2Error>;
