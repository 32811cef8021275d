use secrecy::ExposeSecret;
use sqlx::{PgPool, Row, postgres::PgPoolOptions};
use tracing::{Instrument, Span, debug, instrument};

use super::{Fido2Store, StoreConfig, schema};
use crate::fido2::{
    error::{Fido2Error, Result},
    models::{Credential, CredentialId, Fido2Status, NewCredential, validate_user_id},
};

fn db_span(operation: &'static str, statement: &'static str) -> Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

/// Postgres-backed credential store.
#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a pool and make sure the schema exists.
    ///
    /// # Errors
    /// Returns `StorageUnavailable` if the database cannot be reached or the
    /// schema statements fail.
    #[instrument(skip(config))]
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections())
            .acquire_timeout(config.acquire_timeout())
            .connect(config.dsn().expose_secret())
            .await?;

        let store = Self { pool };
        store.ensure_schema().await?;

        Ok(store)
    }

    /// Wrap an existing pool. The caller is responsible for `ensure_schema`.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Fido2Store for PgStore {
    async fn ensure_schema(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(schema::LOCK_QUERY)
            .bind(schema::SCHEMA_LOCK_ID)
            .execute(&mut *tx)
            .instrument(db_span("SELECT", schema::LOCK_QUERY))
            .await?;

        for statement in schema::STATEMENTS {
            sqlx::query(statement)
                .execute(&mut *tx)
                .instrument(db_span("CREATE", statement))
                .await?;
        }

        tx.commit().await?;
        debug!("schema ensured");

        Ok(())
    }

    async fn user_status(&self, user_id: &str) -> Result<Option<Fido2Status>> {
        let query = r"
            SELECT fido2_status
            FROM userstatus
            WHERE user_id = $1
            LIMIT 1
        ";
        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let status: String = row.try_get("fido2_status")?;
        Ok(Some(Fido2Status::from_db(&status)?))
    }

    async fn set_user_status(&self, user_id: &str, status: Fido2Status) -> Result<()> {
        validate_user_id(user_id)?;
        let query = r"
            INSERT INTO userstatus (user_id, fido2_status)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
            SET fido2_status = EXCLUDED.fido2_status
        ";
        sqlx::query(query)
            .bind(user_id)
            .bind(status.as_db())
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await?;

        debug!(user_id, %status, "user status updated");
        Ok(())
    }

    async fn credential_exists(&self, credential_id: &CredentialId) -> Result<bool> {
        let query = "SELECT EXISTS(SELECT 1 FROM credentials WHERE credential_id = $1) AS found";
        let row = sqlx::query(query)
            .bind(credential_id.as_str())
            .fetch_one(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;

        let found: bool = row.try_get("found")?;
        debug!(%credential_id, found, "credential existence checked");
        Ok(found)
    }

    async fn store_credential(&self, credential: NewCredential) -> Result<()> {
        credential.validate()?;
        let query = r"
            INSERT INTO credentials
            (user_id, credential_id, credential, algo, sign_counter, friendly_name)
            VALUES ($1, $2, $3, $4, $5, $6)
        ";
        let result = sqlx::query(query)
            .bind(&credential.user_id)
            .bind(credential.credential_id.as_str())
            .bind(&credential.public_key)
            .bind(credential.algorithm)
            .bind(i64::from(credential.sign_counter))
            .bind(credential.friendly_name())
            .execute(&self.pool)
            .instrument(db_span("INSERT", query))
            .await;

        match result {
            Ok(_) => {
                debug!(
                    user_id = %credential.user_id,
                    credential_id = %credential.credential_id,
                    "credential stored"
                );
                Ok(())
            }
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                Err(Fido2Error::DuplicateCredential {
                    user_id: credential.user_id,
                    credential_id: credential.credential_id.to_string(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn list_credentials(&self, user_id: &str) -> Result<Vec<Credential>> {
        let query = r"
            SELECT creation_date, user_id, credential_id, credential, algo, sign_counter, friendly_name
            FROM credentials
            WHERE user_id = $1
            ORDER BY creation_date, credential_id
        ";
        let credentials = sqlx::query_as::<_, Credential>(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(db_span("SELECT", query))
            .await?;

        Ok(credentials)
    }

    async fn update_sign_counter(&self, credential_id: &CredentialId, value: u32) -> Result<()> {
        let query = "UPDATE credentials SET sign_counter = $1 WHERE credential_id = $2";
        let result = sqlx::query(query)
            .bind(i64::from(value))
            .bind(credential_id.as_str())
            .execute(&self.pool)
            .instrument(db_span("UPDATE", query))
            .await?;

        if result.rows_affected() == 0 {
            return Err(Fido2Error::NotFound(credential_id.to_string()));
        }

        debug!(%credential_id, value, "sign counter updated");
        Ok(())
    }

    async fn delete_credential(&self, credential_id: &CredentialId) -> Result<()> {
        let query = "DELETE FROM credentials WHERE credential_id = $1";
        let result = sqlx::query(query)
            .bind(credential_id.as_str())
            .execute(&self.pool)
            .instrument(db_span("DELETE", query))
            .await?;

        if result.rows_affected() == 0 {
            return Err(Fido2Error::NotFound(credential_id.to_string()));
        }

        debug!(%credential_id, "credential deleted");
        Ok(())
    }
}
