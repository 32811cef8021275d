use crate::fido2::{CredentialId, Fido2Store, PgStore, StoreConfig};
use anyhow::{Context, Result};
use std::io::Write;
use tracing::info;

#[derive(Debug)]
pub enum Command {
    List { user: String },
    Delete { credential_id: CredentialId },
}

#[derive(Debug)]
pub struct Args {
    pub store: StoreConfig,
    pub command: Command,
}

pub(crate) async fn run<S: Fido2Store>(
    store: &S,
    command: &Command,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::List { user } => {
            let credentials = store
                .list_credentials(user)
                .await
                .with_context(|| format!("failed to list credentials of {user}"))?;

            for credential in &credentials {
                let algorithm = credential
                    .algorithm
                    .map_or_else(|| "-".to_string(), |algo| algo.to_string());
                writeln!(
                    out,
                    "{}\t{}\t{}\t{}\t{}",
                    credential.credential_id,
                    algorithm,
                    credential.sign_counter,
                    credential.created_at.to_rfc3339(),
                    credential.friendly_name
                )?;
            }
        }
        Command::Delete { credential_id } => {
            store
                .delete_credential(credential_id)
                .await
                .with_context(|| format!("failed to delete credential {credential_id}"))?;
            info!(%credential_id, "credential deleted");
            writeln!(out, "deleted {credential_id}")?;
        }
    }

    Ok(())
}

/// # Errors
/// Returns an error if the store is unreachable or the credential is absent.
pub async fn execute(args: Args) -> Result<()> {
    let store = PgStore::connect(&args.store)
        .await
        .context("failed to connect to credential store")?;
    run(&store, &args.command, &mut std::io::stdout().lock()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fido2::{Fido2Error, MemoryStore, NewCredential};

    fn credential(user: &str, id: &str, name: Option<&str>) -> NewCredential {
        NewCredential {
            user_id: user.to_string(),
            credential_id: CredentialId::parse(id).unwrap(),
            public_key: vec![1, 2, 3],
            algorithm: -7,
            sign_counter: 0,
            friendly_name: name.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn lists_one_line_per_credential() -> Result<()> {
        let store = MemoryStore::new();
        store.store_credential(credential("alice", "aa01", Some("YubiKey"))).await?;
        store.store_credential(credential("alice", "aa02", None)).await?;
        store.store_credential(credential("bob", "bb01", None)).await?;

        let mut out = Vec::new();
        run(
            &store,
            &Command::List {
                user: "alice".to_string(),
            },
            &mut out,
        )
        .await?;

        let out = String::from_utf8(out)?;
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("aa01\t-7\t0\t"));
        assert!(lines[0].ends_with("\tYubiKey"));
        assert!(lines[1].ends_with("\tUnnamed Token"));
        Ok(())
    }

    #[tokio::test]
    async fn deleting_an_absent_credential_fails() -> Result<()> {
        let store = MemoryStore::new();
        store.store_credential(credential("alice", "aa01", None)).await?;
        let command = Command::Delete {
            credential_id: CredentialId::parse("aa01")?,
        };

        let mut out = Vec::new();
        run(&store, &command, &mut out).await?;
        assert_eq!(String::from_utf8(out)?, "deleted aa01\n");

        let err = run(&store, &command, &mut Vec::new()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Fido2Error>(),
            Some(Fido2Error::NotFound(_))
        ));
        Ok(())
    }
}
