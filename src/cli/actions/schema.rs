use crate::fido2::{PgStore, StoreConfig};
use anyhow::{Context, Result};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub store: StoreConfig,
}

/// Connect and create the tables. Connecting already runs the bootstrap, so
/// this is what an operator calls ahead of the first login.
/// # Errors
/// Returns an error if the store is unreachable or the DDL fails.
pub async fn execute(args: Args) -> Result<()> {
    PgStore::connect(&args.store)
        .await
        .context("failed to initialize credential store")?;

    info!("credential store schema is in place");
    println!("schema ok");

    Ok(())
}
