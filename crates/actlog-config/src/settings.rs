//! Configuration schema.
//!
//! An `ActivityConfig` is deserialized from TOML. Every field is optional;
//! an empty document yields the defaults below.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use actlog_contracts::{
    action::{EventSet, LifecycleEvent},
    error::ActivityResult,
};
use actlog_core::FailurePolicy;

fn default_user_model() -> String {
    "users".to_string()
}

fn default_principal_lookup() -> bool {
    true
}

/// Per-subject-type settings.
///
/// ```toml
/// [subjects.articles]
/// events = ["created", "updated"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubjectConfig {
    /// Lifecycle events to audit. Absent means all three; an empty list
    /// tracks the type without auditing anything.
    #[serde(default)]
    pub events: Option<Vec<String>>,
}

impl SubjectConfig {
    /// Parse `events` into an `EventSet`.
    ///
    /// Returns `ActivityError::ConfigError` for an unknown event name.
    pub fn event_set(&self) -> ActivityResult<EventSet> {
        match &self.events {
            None => Ok(EventSet::all()),
            Some(names) => names.iter().try_fold(EventSet::empty(), |set, name| {
                Ok(set.with(name.parse::<LifecycleEvent>()?))
            }),
        }
    }
}

/// The top-level structure deserialized from a TOML configuration file.
///
/// Example:
/// ```toml
/// user_model = "users"
/// principal_lookup = true
/// failure_policy = "propagate"
///
/// [contexts]
/// update_context = "update"
///
/// [subjects.articles]
/// events = ["created", "updated", "deleted"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivityConfig {
    /// Table holding principals. Only used when rendering DDL comments.
    #[serde(default = "default_user_model")]
    pub user_model: String,

    /// When false, `Responsible::Current` always resolves to no principal.
    #[serde(default = "default_principal_lookup")]
    pub principal_lookup: bool,

    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Relation name to context kind. When present it replaces the
    /// registry's default bindings; when absent the defaults stay.
    #[serde(default)]
    pub contexts: Option<BTreeMap<String, String>>,

    /// Subject type tag to its settings.
    #[serde(default)]
    pub subjects: BTreeMap<String, SubjectConfig>,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            user_model: default_user_model(),
            principal_lookup: default_principal_lookup(),
            failure_policy: FailurePolicy::default(),
            contexts: None,
            subjects: BTreeMap::new(),
        }
    }
}
