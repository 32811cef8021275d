//! Decides whether a principal must pass second-factor verification.
//!
//! | `use_database` | `force` | `toggle` | stored status | result |
//! |---|---|---|---|---|
//! | false | true  | t     | ignored  | `t` |
//! | false | false | true  | ignored  | `!default_if_not_found` |
//! | false | false | false | ignored  | `default_if_not_found` |
//! | true  | ignored | ignored | no row | `default_if_not_found` |
//! | true  | ignored | ignored | `Disabled` | `false` |
//! | true  | ignored | ignored | `Enabled`  | `true` |

use serde::{Deserialize, Serialize};

use super::models::Fido2Status;

/// Policy inputs of the enablement decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnablementPolicy {
    /// Outcome for users without a status row (and the base for `toggle` when not forced).
    pub default_if_not_found: bool,
    /// Consult the `userstatus` table.
    pub use_database: bool,
    /// Operator override; its meaning depends on `force`.
    pub toggle: bool,
    /// When set, `toggle` is the answer. Otherwise `toggle` flips `default_if_not_found`.
    pub force: bool,
}

impl Default for EnablementPolicy {
    fn default() -> Self {
        Self {
            default_if_not_found: false,
            use_database: true,
            toggle: false,
            force: true,
        }
    }
}

impl EnablementPolicy {
    #[must_use]
    pub fn with_default_if_not_found(mut self, value: bool) -> Self {
        self.default_if_not_found = value;
        self
    }

    #[must_use]
    pub fn with_use_database(mut self, value: bool) -> Self {
        self.use_database = value;
        self
    }

    #[must_use]
    pub fn with_toggle(mut self, value: bool) -> Self {
        self.toggle = value;
        self
    }

    #[must_use]
    pub fn with_force(mut self, value: bool) -> Self {
        self.force = value;
        self
    }

    /// Apply the decision table. `stored` is ignored unless `use_database` is set.
    #[must_use]
    pub fn resolve(&self, stored: Option<Fido2Status>) -> bool {
        if !self.use_database {
            return if self.force {
                self.toggle
            } else if self.toggle {
                !self.default_if_not_found
            } else {
                self.default_if_not_found
            };
        }

        match stored {
            None => self.default_if_not_found,
            Some(Fido2Status::Disabled) => false,
            Some(Fido2Status::Enabled) => true,
        }
    }
}
