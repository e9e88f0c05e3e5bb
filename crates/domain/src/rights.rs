//! The per-module rights mapping derived from or fetched with user info.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Module-scoped action grants, e.g. `{"user": ["read", "write"]}`.
///
/// The remote user-info payload carries this structurally untyped; it is
/// validated here, at the gateway boundary, so the session layer only ever
/// sees a well-formed mapping. Malformed input degrades to an empty
/// mapping rather than failing the login that carried it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rights(BTreeMap<String, BTreeSet<String>>);

impl Rights {
    /// Creates an empty rights mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a rights mapping from an untrusted JSON value.
    ///
    /// Expects an object of `module -> [action, ...]`; entries that are
    /// not string arrays are skipped, non-string actions are dropped, and
    /// any other top-level shape yields the empty mapping.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };

        let mut modules = BTreeMap::new();
        for (module, actions) in object {
            let Some(actions) = actions.as_array() else {
                continue;
            };

            let actions: BTreeSet<String> = actions
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect();

            if !actions.is_empty() {
                modules.insert(module.clone(), actions);
            }
        }

        Self(modules)
    }

    /// Adds an action grant for a module.
    pub fn grant(&mut self, module: &str, action: &str) {
        self.0
            .entry(module.to_owned())
            .or_default()
            .insert(action.to_owned());
    }

    /// Returns whether the module has at least one granted action.
    #[must_use]
    pub fn allows(&self, module: &str) -> bool {
        self.0.get(module).is_some_and(|actions| !actions.is_empty())
    }

    /// Returns whether a specific action is granted for a module.
    #[must_use]
    pub fn allows_action(&self, module: &str, action: &str) -> bool {
        self.0
            .get(module)
            .is_some_and(|actions| actions.contains(action))
    }

    /// Returns the granted actions for a module, if any.
    #[must_use]
    pub fn actions(&self, module: &str) -> Option<&BTreeSet<String>> {
        self.0.get(module)
    }

    /// Returns whether no module holds any grant.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the granted modules in sorted order.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}
