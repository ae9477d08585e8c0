//! Activity records, their identifiers, and the read-side query types.
//!
//! `ActivityRecord` is the canonical audit-log entry. It is written once by
//! the store and never changes afterwards, so its fields are only readable.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    action::Action,
    context::{ContextRecord, PendingContext},
};

/// Store-assigned identifier of an activity record (`activity_logs.id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityLogId(pub i64);

/// Store-assigned identifier of a context row, unique within its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(pub i64);

/// Identifier of the acting principal (`activity_logs.responsible_id`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub i64);

impl fmt::Display for ActivityLogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Polymorphic reference to an audited entity.
///
/// Maps to the `loggeable_type` / `loggeable_id` column pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectRef {
    pub subject_type: String,
    pub subject_id: String,
}

impl SubjectRef {
    pub fn new(subject_type: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            subject_type: subject_type.into(),
            subject_id: subject_id.into(),
        }
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.subject_type, self.subject_id)
    }
}

/// An immutable audit-log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    id: ActivityLogId,
    action: Action,
    subject: Option<SubjectRef>,
    principal_id: Option<PrincipalId>,
    created_at: DateTime<Utc>,
}

impl ActivityRecord {
    /// Assemble a record from persisted columns. Only stores call this.
    pub fn from_parts(
        id: ActivityLogId,
        action: Action,
        subject: Option<SubjectRef>,
        principal_id: Option<PrincipalId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self { id, action, subject, principal_id, created_at }
    }

    pub fn id(&self) -> ActivityLogId {
        self.id
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    /// The audited entity, or `None` for standalone system events.
    pub fn subject(&self) -> Option<&SubjectRef> {
        self.subject.as_ref()
    }

    /// The responsible principal, or `None` when nobody was authenticated.
    pub fn principal_id(&self) -> Option<PrincipalId> {
        self.principal_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A log that has been assembled but not yet written.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLog {
    pub action: Action,
    pub subject: Option<SubjectRef>,
    pub principal_id: Option<PrincipalId>,
    pub context: Option<PendingContext>,
}

/// The result of persisting a `PendingLog`: the record and its linked context.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredLog {
    pub record: ActivityRecord,
    pub context: Option<ContextRecord>,
}

/// Row filter shared by every store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityFilter {
    pub subject: Option<SubjectRef>,
    pub principal_id: Option<PrincipalId>,
    pub action: Option<Action>,
}

impl ActivityFilter {
    /// True if `record` satisfies every populated criterion.
    pub fn matches(&self, record: &ActivityRecord) -> bool {
        let subject_ok = match &self.subject {
            Some(subject) => record.subject() == Some(subject),
            None => true,
        };
        let principal_ok = match self.principal_id {
            Some(principal) => record.principal_id() == Some(principal),
            None => true,
        };
        let action_ok = match &self.action {
            Some(action) => record.action() == action,
            None => true,
        };
        subject_ok && principal_ok && action_ok
    }
}

/// A read-only query over activity records.
///
/// ```rust,ignore
/// let query = ActivityQuery::all()
///     .for_subject(SubjectRef::new("articles", "42"))
///     .action(Action::Update)
///     .with("update_context");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivityQuery {
    pub filter: ActivityFilter,
    /// Context relation names to eager-load on every result.
    pub with: Vec<String>,
}

impl ActivityQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_subject(mut self, subject: SubjectRef) -> Self {
        self.filter.subject = Some(subject);
        self
    }

    pub fn by_principal(mut self, principal_id: PrincipalId) -> Self {
        self.filter.principal_id = Some(principal_id);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.filter.action = Some(action);
        self
    }

    pub fn with(mut self, relation: impl Into<String>) -> Self {
        self.with.push(relation.into());
        self
    }
}

/// A query result: the record plus any eager-loaded contexts, keyed by
/// relation name. Relations with no row for this record are absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub record: ActivityRecord,
    pub contexts: BTreeMap<String, ContextRecord>,
}

impl ActivityEntry {
    pub fn context(&self, relation: &str) -> Option<&ContextRecord> {
        self.contexts.get(relation)
    }
}
