//! Schema bootstrap for the credential store.
//!
//! Every statement is idempotent and the whole batch runs under a
//! transaction-scoped advisory lock, so concurrent first starts serialize
//! instead of racing on catalog entries.
//!
//! Tables that already exist are left alone. Older deployments created
//! `sign_counter` as INTEGER; rows from such a table decode fine, but a
//! counter above `i32::MAX` cannot be written to it.

/// Advisory lock key held while the schema statements run.
pub const SCHEMA_LOCK_ID: i64 = 4_201_207;

pub const LOCK_QUERY: &str = "SELECT pg_advisory_xact_lock($1)";

pub const CREATE_CREDENTIALS: &str = r"
    CREATE TABLE IF NOT EXISTS credentials (
        creation_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
        user_id VARCHAR(80) NOT NULL,
        credential_id VARCHAR(500) NOT NULL,
        credential BYTEA NOT NULL,
        algo INTEGER DEFAULT NULL,
        sign_counter BIGINT NOT NULL,
        friendly_name VARCHAR(100) DEFAULT 'Unnamed Token',
        UNIQUE (user_id, credential_id)
    )
";

pub const CREATE_CREDENTIALS_ID_INDEX: &str = r"
    CREATE INDEX IF NOT EXISTS credentials_credential_id_idx
    ON credentials (credential_id)
";

pub const CREATE_USERSTATUS: &str = r"
    CREATE TABLE IF NOT EXISTS userstatus (
        user_id VARCHAR(80) NOT NULL,
        fido2_status VARCHAR(16) NOT NULL DEFAULT 'FIDO2Disabled'
            CHECK (fido2_status IN ('FIDO2Disabled', 'FIDO2Enabled')),
        UNIQUE (user_id)
    )
";

/// Statements applied, in order, by `ensure_schema`.
pub const STATEMENTS: [&str; 3] = [
    CREATE_CREDENTIALS,
    CREATE_CREDENTIALS_ID_INDEX,
    CREATE_USERSTATUS,
];
