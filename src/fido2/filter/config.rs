use url::Url;

use crate::fido2::{
    enablement::EnablementPolicy,
    error::{Fido2Error, Result},
};

const ENV_SCOPE: &str = "FIDO2SF_SCOPE";
const ENV_USERNAME_ATTRIBUTE: &str = "FIDO2SF_ATTRIB_USERNAME";
const ENV_DISPLAY_NAME_ATTRIBUTE: &str = "FIDO2SF_ATTRIB_DISPLAYNAME";
const ENV_TOGGLE_ATTRIBUTE: &str = "FIDO2SF_ATTRIB_TOGGLE";
const ENV_CEREMONY_URL: &str = "FIDO2SF_CEREMONY_URL";
const ENV_DEFAULT_ENABLE: &str = "FIDO2SF_DEFAULT_ENABLE";
const ENV_USE_DATABASE: &str = "FIDO2SF_USE_DATABASE";
const ENV_TOGGLE: &str = "FIDO2SF_TOGGLE";
const ENV_FORCE: &str = "FIDO2SF_FORCE";

/// Filter configuration. Validated by `validate` before a filter is built.
#[derive(Clone, Debug, Default)]
pub struct FilterConfig {
    scope: Option<String>,
    username_attribute: Option<String>,
    display_name_attribute: Option<String>,
    toggle_attribute: Option<String>,
    ceremony_url: Option<String>,
    policy: EnablementPolicy,
}

/// Checked form of `FilterConfig`.
#[derive(Clone, Debug)]
pub(crate) struct ValidatedConfig {
    pub scope: Option<String>,
    pub username_attribute: String,
    pub display_name_attribute: String,
    pub toggle_attribute: Option<String>,
    pub ceremony_url: Url,
    pub policy: EnablementPolicy,
}

impl FilterConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fixed relying-party scope. When unset it is derived from the IdP entity id.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    #[must_use]
    pub fn with_username_attribute(mut self, name: impl Into<String>) -> Self {
        self.username_attribute = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_display_name_attribute(mut self, name: impl Into<String>) -> Self {
        self.display_name_attribute = Some(name.into());
        self
    }

    /// Read `toggle` per request from this attribute instead of the static policy.
    #[must_use]
    pub fn with_toggle_attribute(mut self, name: impl Into<String>) -> Self {
        self.toggle_attribute = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_ceremony_url(mut self, url: impl Into<String>) -> Self {
        self.ceremony_url = Some(url.into());
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: EnablementPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn policy(&self) -> EnablementPolicy {
        self.policy
    }

    /// Load configuration from `FIDO2SF_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = EnablementPolicy::default();
        let policy = EnablementPolicy {
            default_if_not_found: parse_bool_env(ENV_DEFAULT_ENABLE)
                .unwrap_or(defaults.default_if_not_found),
            use_database: parse_bool_env(ENV_USE_DATABASE).unwrap_or(defaults.use_database),
            toggle: parse_bool_env(ENV_TOGGLE).unwrap_or(defaults.toggle),
            force: parse_bool_env(ENV_FORCE).unwrap_or(defaults.force),
        };

        Self {
            scope: non_empty_env(ENV_SCOPE),
            username_attribute: non_empty_env(ENV_USERNAME_ATTRIBUTE),
            display_name_attribute: non_empty_env(ENV_DISPLAY_NAME_ATTRIBUTE),
            toggle_attribute: non_empty_env(ENV_TOGGLE_ATTRIBUTE),
            ceremony_url: non_empty_env(ENV_CEREMONY_URL),
            policy,
        }
    }

    pub(crate) fn validate(self) -> Result<ValidatedConfig> {
        let username_attribute = required(self.username_attribute, "username attribute")?;
        let display_name_attribute =
            required(self.display_name_attribute, "display name attribute")?;
        let ceremony_url = required(self.ceremony_url, "ceremony url")?;
        let ceremony_url = Url::parse(&ceremony_url).map_err(|err| {
            Fido2Error::Configuration(format!("invalid ceremony url {ceremony_url}: {err}"))
        })?;

        let scope = match self.scope {
            Some(scope) if scope.trim().is_empty() => {
                return Err(Fido2Error::Configuration(
                    "scope must not be empty when set".to_string(),
                ));
            }
            scope => scope,
        };

        Ok(ValidatedConfig {
            scope,
            username_attribute,
            display_name_attribute,
            toggle_attribute: self.toggle_attribute,
            ceremony_url,
            policy: self.policy,
        })
    }
}

fn required(value: Option<String>, what: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Fido2Error::Configuration(format!("{what} is required")))
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_bool_env(key: &str) -> Option<bool> {
    std::env::var(key).ok().and_then(|value| parse_bool(&value))
}
