use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Row, postgres::PgRow};
use std::fmt;

use super::error::{Fido2Error, Result};

/// Label used when a credential is stored without a friendly name.
pub const DEFAULT_FRIENDLY_NAME: &str = "Unnamed Token";

/// Width of the `credentials.credential_id` column.
pub const MAX_CREDENTIAL_ID_LEN: usize = 500;

/// Width of the `user_id` columns, in characters.
pub const MAX_USER_ID_LEN: usize = 80;

/// Width of the `credentials.friendly_name` column, in characters.
pub const MAX_FRIENDLY_NAME_LEN: usize = 100;

/// Hex-encoded authenticator credential identifier (always lowercase).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialId(String);

impl CredentialId {
    #[must_use]
    pub fn from_bytes(raw: &[u8]) -> Self {
        Self(hex::encode(raw))
    }

    /// Parse a caller-supplied hex identifier.
    ///
    /// # Errors
    /// Returns `InvalidCredentialId` for empty, odd-length, non-hex or oversized input.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if value.len() > MAX_CREDENTIAL_ID_LEN || !valid_hex(value) {
            return Err(Fido2Error::InvalidCredentialId(value.to_string()));
        }
        Ok(Self(value.to_ascii_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Raw identifier bytes.
    ///
    /// # Errors
    /// Returns `InvalidCredentialId` if the stored text is not valid hex.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        hex::decode(&self.0).map_err(|_| Fido2Error::InvalidCredentialId(self.0.clone()))
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn valid_hex(value: &str) -> bool {
    Regex::new(r"^(?:[0-9a-fA-F]{2})+$").is_ok_and(|re| re.is_match(value))
}

/// Per-user second-factor status as recorded in `userstatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Fido2Status {
    Disabled,
    Enabled,
}

impl Fido2Status {
    #[must_use]
    pub fn as_db(self) -> &'static str {
        match self {
            Self::Disabled => "FIDO2Disabled",
            Self::Enabled => "FIDO2Enabled",
        }
    }

    pub(crate) fn from_db(value: &str) -> std::result::Result<Self, sqlx::Error> {
        match value {
            "FIDO2Disabled" => Ok(Self::Disabled),
            "FIDO2Enabled" => Ok(Self::Enabled),
            _ => Err(sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid userstatus.fido2_status value: {value}"),
            )))),
        }
    }

    /// Parse the admin-facing spelling (`enabled` / `disabled`).
    #[must_use]
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "enabled" => Some(Self::Enabled),
            "disabled" => Some(Self::Disabled),
            _ => None,
        }
    }
}

impl fmt::Display for Fido2Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Enabled => f.write_str("enabled"),
        }
    }
}

/// An enrolled authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub user_id: String,
    pub credential_id: CredentialId,
    pub public_key: Vec<u8>,
    pub algorithm: Option<i32>,
    pub sign_counter: u32,
    pub friendly_name: String,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for Credential {
    fn from_row(row: &'r PgRow) -> std::result::Result<Self, sqlx::Error> {
        // BIGINT in fresh schemas, INTEGER in older deployments
        let sign_counter = match row.try_get::<i64, _>("sign_counter") {
            Ok(value) => value,
            Err(sqlx::Error::ColumnDecode { .. }) => {
                i64::from(row.try_get::<i32, _>("sign_counter")?)
            }
            Err(err) => return Err(err),
        };
        let sign_counter = u32::try_from(sign_counter).map_err(|err| sqlx::Error::ColumnDecode {
            index: "sign_counter".to_string(),
            source: Box::new(err),
        })?;
        let friendly_name: Option<String> = row.try_get("friendly_name")?;

        Ok(Self {
            user_id: row.try_get("user_id")?,
            credential_id: CredentialId(row.try_get("credential_id")?),
            public_key: row.try_get("credential")?,
            algorithm: row.try_get("algo")?,
            sign_counter,
            friendly_name: friendly_name.unwrap_or_else(|| DEFAULT_FRIENDLY_NAME.to_string()),
            created_at: row.try_get("creation_date")?,
        })
    }
}

/// Arguments of a registration write, produced by the external ceremony.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub user_id: String,
    pub credential_id: CredentialId,
    pub public_key: Vec<u8>,
    pub algorithm: i32,
    pub sign_counter: u32,
    pub friendly_name: Option<String>,
}

impl NewCredential {
    #[must_use]
    pub fn friendly_name(&self) -> &str {
        self.friendly_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(DEFAULT_FRIENDLY_NAME)
    }

    /// Check the fields against the column widths before any write.
    ///
    /// # Errors
    /// Returns `InvalidInput` for an empty or oversized user id or an oversized
    /// friendly name.
    pub fn validate(&self) -> Result<()> {
        validate_user_id(&self.user_id)?;
        let name_len = self.friendly_name().chars().count();
        if name_len > MAX_FRIENDLY_NAME_LEN {
            return Err(Fido2Error::InvalidInput(format!(
                "friendly name is {name_len} characters, at most {MAX_FRIENDLY_NAME_LEN} allowed"
            )));
        }
        Ok(())
    }
}

/// # Errors
/// Returns `InvalidInput` for an empty user id or one longer than `MAX_USER_ID_LEN`.
pub fn validate_user_id(user_id: &str) -> Result<()> {
    let len = user_id.chars().count();
    if len == 0 {
        return Err(Fido2Error::InvalidInput("user id is empty".to_string()));
    }
    if len > MAX_USER_ID_LEN {
        return Err(Fido2Error::InvalidInput(format!(
            "user id is {len} characters, at most {MAX_USER_ID_LEN} allowed"
        )));
    }
    Ok(())
}
