//! # fido2sf
//!
//! FIDO2/WebAuthn second factor for an identity provider's authentication
//! pipeline. After the primary login, the `fido2::filter` step decides whether
//! the principal needs a second factor, prepares the challenge context and
//! suspends the pipeline for the external WebAuthn ceremony.
//!
//! Credentials and per-user status live in Postgres (`credentials` and
//! `userstatus` tables); the column layout matches existing deployments so
//! data can be shared with them.

pub mod cli;
pub mod fido2;
