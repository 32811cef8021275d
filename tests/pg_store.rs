//! Postgres-backed credential store against a real server.
//!
//! Each test starts its own container and is skipped when no container
//! runtime is reachable.

mod common;

use anyhow::Result;
use common::PostgresContainer;
use fido2sf::fido2::{
    CredentialId, EnablementPolicy, Fido2Error, Fido2Status, Fido2Store, MAX_FRIENDLY_NAME_LEN,
    MAX_USER_ID_LEN, NewCredential, PgStore, StoreConfig,
};
use secrecy::SecretString;
use std::sync::Arc;

async fn setup() -> Result<Option<(PostgresContainer, PgStore, StoreConfig)>> {
    if let Err(err) = common::ensure_container_runtime() {
        eprintln!("Skipping integration test: {err}");
        return Ok(None);
    }

    let postgres = PostgresContainer::start().await?;
    let config = StoreConfig::new(SecretString::from(postgres.dsn()))?.with_max_connections(10);
    let store = PgStore::connect(&config).await?;
    Ok(Some((postgres, store, config)))
}

fn credential(user: &str, id: &str, public_key: Vec<u8>) -> Result<NewCredential> {
    Ok(NewCredential {
        user_id: user.to_string(),
        credential_id: CredentialId::parse(id)?,
        public_key,
        algorithm: -7,
        sign_counter: 0,
        friendly_name: None,
    })
}

#[tokio::test]
async fn schema_bootstrap_is_idempotent_under_concurrency() -> Result<()> {
    let Some((_postgres, store, config)) = setup().await? else {
        return Ok(());
    };

    let mut handles = Vec::new();
    for _ in 0..6 {
        let config = config.clone();
        handles.push(tokio::spawn(async move { PgStore::connect(&config).await }));
    }
    for handle in handles {
        handle.await??;
    }
    store.ensure_schema().await?;

    let tables: Vec<(String,)> = sqlx::query_as(
        "SELECT table_name::text FROM information_schema.tables \
         WHERE table_schema = 'public' ORDER BY table_name",
    )
    .fetch_all(store.pool())
    .await?;
    let tables: Vec<&str> = tables.iter().map(|(name,)| name.as_str()).collect();
    assert_eq!(tables, ["credentials", "userstatus"]);

    Ok(())
}

#[tokio::test]
async fn credential_lifecycle() -> Result<()> {
    let Some((_postgres, store, _config)) = setup().await? else {
        return Ok(());
    };

    let public_key: Vec<u8> = (0..=255u8).collect();
    store
        .store_credential(credential("alice", "0a0b0c", public_key.clone())?)
        .await?;
    store
        .store_credential(credential("alice", "0d0e0f", vec![0x00, 0xff])?)
        .await?;
    let id = CredentialId::parse("0A0B0C")?;

    assert!(store.credential_exists(&id).await?);
    assert!(!store.credential_exists(&CredentialId::parse("ffff")?).await?);

    let listed = store.list_credentials("alice").await?;
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].credential_id, id);
    assert_eq!(listed[0].public_key, public_key);
    assert_eq!(listed[0].algorithm, Some(-7));
    assert_eq!(listed[0].friendly_name, fido2sf::fido2::DEFAULT_FRIENDLY_NAME);

    store.update_sign_counter(&id, 5).await?;
    let listed = store.list_credentials("alice").await?;
    assert_eq!(listed[0].sign_counter, 5);

    store.update_sign_counter(&id, u32::MAX).await?;
    assert_eq!(store.list_credentials("alice").await?[0].sign_counter, u32::MAX);

    store.delete_credential(&id).await?;
    assert!(!store.credential_exists(&id).await?);
    assert!(matches!(
        store.delete_credential(&id).await,
        Err(Fido2Error::NotFound(_))
    ));
    assert!(matches!(
        store.update_sign_counter(&id, 6).await,
        Err(Fido2Error::NotFound(_))
    ));
    assert_eq!(store.list_credentials("alice").await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn concurrent_duplicate_registration_has_one_winner() -> Result<()> {
    let Some((_postgres, store, _config)) = setup().await? else {
        return Ok(());
    };
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for i in 0..8u8 {
        let store = Arc::clone(&store);
        let new = credential("bob", "b0b0", vec![i])?;
        handles.push(tokio::spawn(async move { store.store_credential(new).await }));
    }

    let mut winners = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await? {
            Ok(()) => winners += 1,
            Err(Fido2Error::DuplicateCredential { .. }) => duplicates += 1,
            Err(err) => return Err(err.into()),
        }
    }
    assert_eq!(winners, 1);
    assert_eq!(duplicates, 7);
    assert_eq!(store.list_credentials("bob").await?.len(), 1);

    // same credential id for another user is a separate row
    store
        .store_credential(credential("carol", "b0b0", vec![9])?)
        .await?;
    assert_eq!(store.list_credentials("carol").await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn stored_status_drives_enablement() -> Result<()> {
    let Some((_postgres, store, _config)) = setup().await? else {
        return Ok(());
    };
    let policy = EnablementPolicy::default();

    assert!(!store.is_2fa_enabled("dave", &policy).await?);
    assert!(
        store
            .is_2fa_enabled("dave", &policy.with_default_if_not_found(true))
            .await?
    );

    store.set_user_status("dave", Fido2Status::Enabled).await?;
    assert!(store.is_2fa_enabled("dave", &policy).await?);

    store.set_user_status("dave", Fido2Status::Disabled).await?;
    assert_eq!(store.user_status("dave").await?, Some(Fido2Status::Disabled));
    assert!(
        !store
            .is_2fa_enabled("dave", &policy.with_default_if_not_found(true))
            .await?
    );

    Ok(())
}

#[tokio::test]
async fn oversized_input_is_not_reported_as_outage() -> Result<()> {
    let Some((_postgres, store, _config)) = setup().await? else {
        return Ok(());
    };
    let long_user = "u".repeat(MAX_USER_ID_LEN + 1);

    let err = store
        .store_credential(credential(&long_user, "aa11", vec![1])?)
        .await
        .unwrap_err();
    assert!(matches!(err, Fido2Error::InvalidInput(_)), "{err}");

    let mut named = credential("erin", "aa11", vec![1])?;
    named.friendly_name = Some("n".repeat(MAX_FRIENDLY_NAME_LEN + 1));
    let err = store.store_credential(named).await.unwrap_err();
    assert!(matches!(err, Fido2Error::InvalidInput(_)), "{err}");

    let err = store
        .set_user_status(&long_user, Fido2Status::Enabled)
        .await
        .unwrap_err();
    assert!(matches!(err, Fido2Error::InvalidInput(_)), "{err}");

    // widths at the column limit still fit
    let mut widest = credential(&"u".repeat(MAX_USER_ID_LEN), "aa11", vec![1])?;
    widest.friendly_name = Some("n".repeat(MAX_FRIENDLY_NAME_LEN));
    store.store_credential(widest).await?;

    Ok(())
}

#[tokio::test]
async fn integer_sign_counter_column_is_readable() -> Result<()> {
    if let Err(err) = common::ensure_container_runtime() {
        eprintln!("Skipping integration test: {err}");
        return Ok(());
    }
    let postgres = PostgresContainer::start().await?;
    let config = StoreConfig::new(SecretString::from(postgres.dsn()))?;

    // table created by an older deployment with a 32-bit counter
    let pool = sqlx::PgPool::connect(&postgres.dsn()).await?;
    sqlx::query(
        "CREATE TABLE credentials (
            creation_date TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            user_id VARCHAR(80) NOT NULL,
            credential_id VARCHAR(500) NOT NULL,
            credential BYTEA NOT NULL,
            algo INT DEFAULT NULL,
            sign_counter INT NOT NULL,
            friendly_name VARCHAR(100) DEFAULT 'Unnamed Token',
            UNIQUE (user_id, credential_id)
        )",
    )
    .execute(&pool)
    .await?;

    let store = PgStore::connect(&config).await?;
    store
        .store_credential(credential("frank", "f00d", vec![7])?)
        .await?;
    store
        .update_sign_counter(&CredentialId::parse("f00d")?, 5)
        .await?;

    let listed = store.list_credentials("frank").await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].sign_counter, 5);

    Ok(())
}
