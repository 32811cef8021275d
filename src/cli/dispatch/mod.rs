use crate::cli::{
    actions::{Action, check, credentials, schema, status},
    commands::{
        ARG_CREDENTIAL_ID, ARG_DEFAULT_ENABLED, ARG_NO_DATABASE, ARG_NO_FORCE, ARG_SET,
        ARG_TOGGLE, ARG_USER, store::ARG_DSN, store::ARG_MAX_CONNECTIONS,
    },
};
use crate::fido2::{CredentialId, EnablementPolicy, Fido2Status, StoreConfig};
use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;

fn store_config(matches: &clap::ArgMatches) -> Result<StoreConfig> {
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let max_connections = matches
        .get_one::<u32>(ARG_MAX_CONNECTIONS)
        .copied()
        .unwrap_or(5);

    Ok(StoreConfig::new(SecretString::from(dsn))
        .context("invalid --dsn")?
        .with_max_connections(max_connections))
}

fn user(matches: &clap::ArgMatches) -> Result<String> {
    matches
        .get_one::<String>(ARG_USER)
        .cloned()
        .context("missing required argument: <user>")
}

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some(("schema", _)) => Ok(Action::Schema(schema::Args {
            store: store_config(matches)?,
        })),
        Some(("status", sub)) => {
            let set = sub
                .get_one::<String>(ARG_SET)
                .map(|value| {
                    Fido2Status::from_label(value)
                        .ok_or_else(|| anyhow!("invalid status: {value}"))
                })
                .transpose()?;
            Ok(Action::Status(status::Args {
                store: store_config(matches)?,
                user: user(sub)?,
                set,
            }))
        }
        Some(("credentials", sub)) => {
            let command = match sub.subcommand() {
                Some(("list", list)) => credentials::Command::List { user: user(list)? },
                Some(("delete", delete)) => {
                    let raw = delete
                        .get_one::<String>(ARG_CREDENTIAL_ID)
                        .context("missing required argument: <credential-id>")?;
                    credentials::Command::Delete {
                        credential_id: CredentialId::parse(raw)
                            .with_context(|| format!("invalid credential id: {raw}"))?,
                    }
                }
                _ => return Err(anyhow!("missing credentials subcommand")),
            };
            Ok(Action::Credentials(credentials::Args {
                store: store_config(matches)?,
                command,
            }))
        }
        Some(("check", sub)) => {
            let policy = EnablementPolicy::default()
                .with_default_if_not_found(sub.get_flag(ARG_DEFAULT_ENABLED))
                .with_use_database(!sub.get_flag(ARG_NO_DATABASE))
                .with_toggle(sub.get_flag(ARG_TOGGLE))
                .with_force(!sub.get_flag(ARG_NO_FORCE));
            // deciding from the toggle alone never touches the database
            let store = if policy.use_database {
                Some(store_config(matches)?)
            } else {
                None
            };
            Ok(Action::Check(check::Args {
                store,
                user: user(sub)?,
                policy,
            }))
        }
        _ => Err(anyhow!("missing subcommand")),
    }
}
