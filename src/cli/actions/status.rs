use crate::fido2::{Fido2Status, Fido2Store, PgStore, StoreConfig};
use anyhow::{Context, Result};
use std::io::Write;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub store: StoreConfig,
    pub user: String,
    pub set: Option<Fido2Status>,
}

pub(crate) async fn run<S: Fido2Store>(
    store: &S,
    user: &str,
    set: Option<Fido2Status>,
    out: &mut impl Write,
) -> Result<()> {
    if let Some(status) = set {
        store
            .set_user_status(user, status)
            .await
            .with_context(|| format!("failed to set status of {user}"))?;
        info!(user, %status, "status updated");
    }

    let stored = store
        .user_status(user)
        .await
        .with_context(|| format!("failed to read status of {user}"))?;

    match stored {
        Some(status) => writeln!(out, "{user}: {status}")?,
        None => writeln!(out, "{user}: no status row")?,
    }

    Ok(())
}

/// # Errors
/// Returns an error if the store is unreachable.
pub async fn execute(args: Args) -> Result<()> {
    let store = PgStore::connect(&args.store)
        .await
        .context("failed to connect to credential store")?;
    run(&store, &args.user, args.set, &mut std::io::stdout().lock()).await
}
