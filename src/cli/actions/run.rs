use crate::cli::actions::{Action, check, credentials, schema, status};
use anyhow::Result;

/// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Schema(args) => schema::execute(args).await,
        Action::Status(args) => status::execute(args).await,
        Action::Credentials(args) => credentials::execute(args).await,
        Action::Check(args) => check::execute(args).await,
    }
}
