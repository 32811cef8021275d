//! Second-factor processing step run after primary authentication.
//!
//! Flow Overview:
//! 1) Resolve the relying-party scope (configured, or derived once from the IdP entity id).
//! 2) Read the username attribute and ask the store whether 2FA applies.
//! 3) Bypass: hand the request back untouched, nothing is persisted.
//! 4) Otherwise list the user's credentials, generate a challenge and build a
//!    `ChallengeContext`.
//! 5) Save the suspended state under a fresh correlation id and redirect to the
//!    ceremony handler, which owns verification and the store callbacks.
//!
//! Failures never fall through to `Continue`: a store outage or a broken random
//! source aborts the attempt.

pub mod challenge;
pub mod config;
pub mod scope;

pub use challenge::{ChallengeContext, ChallengeSource, OsChallengeSource};
pub use config::FilterConfig;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info, instrument};
use url::Url;
use uuid::Uuid;

use super::{
    enablement::EnablementPolicy,
    error::{Fido2Error, Result},
    session::SessionStateRepository,
    store::Fido2Store,
};
use config::ValidatedConfig;

/// Stage tag of the state saved for the ceremony handler.
pub const STAGE: &str = "fido2sf:request";

/// Query parameter carrying the correlation id on the ceremony redirect.
pub const STATE_ID_PARAM: &str = "StateId";

/// Identity of one side of the authentication (IdP or SP).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub entity_id: String,
    pub metadata_set: String,
}

impl EntityDescriptor {
    #[must_use]
    pub fn new(entity_id: impl Into<String>, metadata_set: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            metadata_set: metadata_set.into(),
        }
    }
}

/// Upstream authentication result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationContext {
    pub attributes: HashMap<String, Vec<String>>,
    pub source: EntityDescriptor,
    pub destination: EntityDescriptor,
}

impl AuthenticationContext {
    #[must_use]
    pub fn new(source: EntityDescriptor, destination: EntityDescriptor) -> Self {
        Self {
            attributes: HashMap::new(),
            source,
            destination,
        }
    }

    #[must_use]
    pub fn with_attribute<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.attributes
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// First value of an attribute, if any.
    #[must_use]
    pub fn first_value(&self, name: &str) -> Option<&str> {
        self.attributes
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}

/// Where control goes after the step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Second factor not required; resume the pipeline.
    Continue,
    /// Pipeline suspended; the caller redirects to `Handoff::redirect`.
    Suspend(Handoff),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handoff {
    pub correlation_id: Uuid,
    pub redirect: Url,
}

/// State saved for the ceremony handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuspendedState {
    pub context: AuthenticationContext,
    pub challenge: ChallengeContext,
}

/// A processing step of the authentication pipeline.
pub trait AuthenticationStep: Send + Sync {
    fn handle(
        &self,
        context: &AuthenticationContext,
    ) -> impl Future<Output = Result<StepOutcome>> + Send;
}

pub struct Fido2SecondFactor<S, R> {
    config: ValidatedConfig,
    store: Arc<S>,
    sessions: Arc<R>,
    challenge_source: Arc<dyn ChallengeSource>,
    scope: OnceLock<String>,
}

impl<S, R> Fido2SecondFactor<S, R>
where
    S: Fido2Store,
    R: SessionStateRepository,
{
    /// Build a filter instance.
    ///
    /// # Errors
    /// Returns `Configuration` if a required attribute mapping or the ceremony
    /// URL is missing or invalid. The instance is not usable in that case.
    pub fn new(config: FilterConfig, store: Arc<S>, sessions: Arc<R>) -> Result<Self> {
        let config = config.validate().inspect_err(|err| {
            error!("fido2sf: could not initialize filter: {err}");
        })?;

        let scope = OnceLock::new();
        if let Some(configured) = &config.scope {
            let _ = scope.set(configured.clone());
        }

        Ok(Self {
            config,
            store,
            sessions,
            challenge_source: Arc::new(OsChallengeSource),
            scope,
        })
    }

    #[must_use]
    pub fn with_challenge_source(mut self, source: Arc<dyn ChallengeSource>) -> Self {
        self.challenge_source = source;
        self
    }

    /// Scope in use, once configured or derived.
    #[must_use]
    pub fn scope(&self) -> Option<&str> {
        self.scope.get().map(String::as_str)
    }

    fn resolve_scope(&self, context: &AuthenticationContext) -> Result<String> {
        if let Some(scope) = self.scope.get() {
            return Ok(scope.clone());
        }
        let derived = scope::derive_scope(&context.source.entity_id)?;
        debug!(scope = %derived, "derived relying-party scope");
        // a concurrent first request may have won; either value comes from the same rule
        Ok(self.scope.get_or_init(|| derived).clone())
    }

    fn attribute(&self, context: &AuthenticationContext, name: &str) -> Result<String> {
        context
            .first_value(name)
            .map(str::to_string)
            .ok_or_else(|| Fido2Error::MissingAttribute(name.to_string()))
    }

    fn policy_for(&self, context: &AuthenticationContext) -> EnablementPolicy {
        let mut policy = self.config.policy;
        if let Some(name) = &self.config.toggle_attribute {
            policy.toggle = context
                .first_value(name)
                .and_then(config::parse_bool)
                .unwrap_or(false);
        }
        policy
    }

    fn handoff(&self, correlation_id: Uuid) -> Handoff {
        let mut redirect = self.config.ceremony_url.clone();
        redirect
            .query_pairs_mut()
            .append_pair(STATE_ID_PARAM, &correlation_id.to_string());
        Handoff {
            correlation_id,
            redirect,
        }
    }
}

impl<S, R> AuthenticationStep for Fido2SecondFactor<S, R>
where
    S: Fido2Store,
    R: SessionStateRepository,
{
    #[instrument(skip_all, fields(idp = %context.source.entity_id))]
    async fn handle(&self, context: &AuthenticationContext) -> Result<StepOutcome> {
        let scope = self.resolve_scope(context).inspect_err(|err| {
            if err.is_fatal_for_instance() {
                error!("fido2sf: filter instance cannot serve requests: {err}");
            }
        })?;

        let username = self.attribute(context, &self.config.username_attribute)?;
        debug!(username = %username, "fido2sf: userid");

        let policy = self.policy_for(context);
        let enabled = self
            .store
            .is_2fa_enabled(&username, &policy)
            .await
            .inspect_err(|err| {
                error!(username = %username, "fido2sf: enablement lookup failed: {err}");
            })?;

        if !enabled {
            debug!(username = %username, "second factor not required, continuing");
            return Ok(StepOutcome::Continue);
        }

        let display_name = self.attribute(context, &self.config.display_name_attribute)?;
        let credentials = self
            .store
            .list_credentials(&username)
            .await
            .inspect_err(|err| {
                error!(username = %username, "fido2sf: listing credentials failed: {err}");
            })?;
        let challenge = challenge::generate_challenge(self.challenge_source.as_ref())
            .inspect_err(|err| error!("fido2sf: {err}"))?;

        let state = SuspendedState {
            context: context.clone(),
            challenge: ChallengeContext {
                scope,
                username,
                display_name,
                challenge,
                credentials,
            },
        };

        let correlation_id = self.sessions.save(STAGE, &state).await?;
        info!(
            username = %state.challenge.username,
            credentials = state.challenge.credentials.len(),
            %correlation_id,
            "suspending for FIDO2 ceremony"
        );

        Ok(StepOutcome::Suspend(self.handoff(correlation_id)))
    }
}
