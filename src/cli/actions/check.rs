use crate::fido2::{EnablementPolicy, Fido2Store, PgStore, StoreConfig};
use anyhow::{Context, Result};
use std::io::Write;

#[derive(Debug)]
pub struct Args {
    /// Absent when the policy does not consult the database.
    pub store: Option<StoreConfig>,
    pub user: String,
    pub policy: EnablementPolicy,
}

pub(crate) async fn run<S: Fido2Store>(
    store: &S,
    user: &str,
    policy: &EnablementPolicy,
    out: &mut impl Write,
) -> Result<()> {
    let enabled = store
        .is_2fa_enabled(user, policy)
        .await
        .with_context(|| format!("failed to resolve second factor for {user}"))?;

    if enabled {
        writeln!(out, "{user}: second factor required")?;
    } else {
        writeln!(out, "{user}: second factor not required")?;
    }

    Ok(())
}

/// Print the enablement decision for a user.
/// # Errors
/// Returns an error if the store is needed and unreachable.
pub async fn execute(args: Args) -> Result<()> {
    let mut stdout = std::io::stdout().lock();

    if !args.policy.use_database {
        let enabled = args.policy.resolve(None);
        let verdict = if enabled { "required" } else { "not required" };
        writeln!(stdout, "{}: second factor {verdict}", args.user)?;
        return Ok(());
    }

    let config = args
        .store
        .as_ref()
        .context("missing required argument: --dsn")?;
    let store = PgStore::connect(config)
        .await
        .context("failed to connect to credential store")?;
    run(&store, &args.user, &args.policy, &mut stdout).await
}
