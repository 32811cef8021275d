pub mod check;
pub mod credentials;
pub mod schema;
pub mod status;

// Internal "interpreter" for `Action`.
mod run;

#[derive(Debug)]
pub enum Action {
    Schema(schema::Args),
    Status(status::Args),
    Credentials(credentials::Args),
    Check(check::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
