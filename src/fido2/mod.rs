//! FIDO2/WebAuthn second factor after primary authentication.
//!
//! - `enablement`: whether a principal must pass a second factor.
//! - `store`: credential lifecycle and replay-counter bookkeeping.
//! - `filter`: the processing step that prepares the ceremony and suspends.
//! - `session`: hand-off of suspended state to the ceremony handler.
//!
//! The WebAuthn ceremony itself (attestation and assertion verification) is
//! external; it calls back into `store::Fido2Store` once it has verified a
//! response.

pub mod enablement;
pub mod error;
pub mod filter;
pub mod models;
pub mod session;
pub mod store;

pub use enablement::EnablementPolicy;
pub use error::{Fido2Error, Result};
pub use filter::{
    AuthenticationContext, AuthenticationStep, ChallengeContext, EntityDescriptor,
    Fido2SecondFactor, FilterConfig, Handoff, StepOutcome, SuspendedState,
};
pub use models::{
    Credential, CredentialId, DEFAULT_FRIENDLY_NAME, Fido2Status, MAX_FRIENDLY_NAME_LEN,
    MAX_USER_ID_LEN, NewCredential,
};
pub use session::{MemorySessionStateRepository, SessionStateRepository};
pub use store::{Fido2Store, MemoryStore, PgStore, StoreConfig};
