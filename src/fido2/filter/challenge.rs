use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};

use crate::fido2::{
    error::{Fido2Error, Result},
    models::Credential,
};

/// Random bytes per challenge (hex-encoded to 128 characters).
pub const CHALLENGE_BYTES: usize = 64;

/// Source of challenge entropy. Implementations must be cryptographically
/// secure and must report failure instead of degrading.
pub trait ChallengeSource: Send + Sync {
    /// # Errors
    /// Returns the underlying random source error.
    fn fill(&self, buf: &mut [u8]) -> std::result::Result<(), rand::Error>;
}

/// Operating system CSPRNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsChallengeSource;

impl ChallengeSource for OsChallengeSource {
    fn fill(&self, buf: &mut [u8]) -> std::result::Result<(), rand::Error> {
        OsRng.try_fill_bytes(buf)
    }
}

/// Generate a fresh hex challenge.
///
/// # Errors
/// Returns `CryptoSourceUnavailable` if the source fails.
pub fn generate_challenge(source: &dyn ChallengeSource) -> Result<String> {
    let mut buf = [0u8; CHALLENGE_BYTES];
    source
        .fill(&mut buf)
        .map_err(Fido2Error::CryptoSourceUnavailable)?;
    Ok(hex::encode(buf))
}

/// Everything the ceremony handler needs to register or verify an authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeContext {
    pub scope: String,
    pub username: String,
    pub display_name: String,
    pub challenge: String,
    /// Existing credentials, for the exclude list (registration) or allow list (authentication).
    pub credentials: Vec<Credential>,
}

impl ChallengeContext {
    /// No credentials on file yet: the ceremony must register one.
    #[must_use]
    pub fn needs_registration(&self) -> bool {
        self.credentials.is_empty()
    }
}
