//! Logged actions and the lifecycle events that produce them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ActivityError;

/// The kind of action an activity record describes.
///
/// The three built-in kinds cover entity lifecycle transitions. Deployments
/// may log any other action name through `Custom`; it is stored as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Action {
    Create,
    Update,
    Delete,
    Custom(String),
}

impl Action {
    /// The persisted string form (`activity_logs.action`).
    pub fn as_str(&self) -> &str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Custom(name) => name,
        }
    }
}

impl From<String> for Action {
    fn from(value: String) -> Self {
        match value.as_str() {
            "create" => Action::Create,
            "update" => Action::Update,
            "delete" => Action::Delete,
            _ => Action::Custom(value),
        }
    }
}

impl From<&str> for Action {
    fn from(value: &str) -> Self {
        Action::from(value.to_string())
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        match action {
            Action::Custom(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lifecycle transition the hook dispatcher can be notified of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleEvent {
    /// After an entity has been created.
    Created,
    /// Before an update is committed, while original values are still known.
    Updated,
    /// After an entity has been deleted.
    Deleted,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 3] =
        [LifecycleEvent::Created, LifecycleEvent::Updated, LifecycleEvent::Deleted];

    /// The action recorded when this event fires.
    pub fn action(self) -> Action {
        match self {
            LifecycleEvent::Created => Action::Create,
            LifecycleEvent::Updated => Action::Update,
            LifecycleEvent::Deleted => Action::Delete,
        }
    }

    fn bit(self) -> u8 {
        match self {
            LifecycleEvent::Created => 0b001,
            LifecycleEvent::Updated => 0b010,
            LifecycleEvent::Deleted => 0b100,
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::Created => write!(f, "created"),
            LifecycleEvent::Updated => write!(f, "updated"),
            LifecycleEvent::Deleted => write!(f, "deleted"),
        }
    }
}

impl FromStr for LifecycleEvent {
    type Err = ActivityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(LifecycleEvent::Created),
            "updated" => Ok(LifecycleEvent::Updated),
            "deleted" => Ok(LifecycleEvent::Deleted),
            other => Err(ActivityError::ConfigError {
                reason: format!(
                    "unknown lifecycle event '{}' (expected created, updated or deleted)",
                    other
                ),
            }),
        }
    }
}

/// The subset of lifecycle events an entity type is audited for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventSet(u8);

impl EventSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn all() -> Self {
        Self(0b111)
    }

    /// Build a set from an explicit list of events.
    pub fn of(events: &[LifecycleEvent]) -> Self {
        events.iter().fold(Self::empty(), |set, event| set.with(*event))
    }

    pub fn with(self, event: LifecycleEvent) -> Self {
        Self(self.0 | event.bit())
    }

    pub fn contains(&self, event: LifecycleEvent) -> bool {
        self.0 & event.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = LifecycleEvent> {
        LifecycleEvent::ALL.into_iter().filter(move |e| self.contains(*e))
    }
}

impl Default for EventSet {
    fn default() -> Self {
        Self::all()
    }
}
