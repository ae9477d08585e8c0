//! Seam traits for the activity-log pipeline.
//!
//! These three traits are the whole contract with the outside world:
//!
//! - `Auditable`         : capability an entity type implements to be logged
//! - `ActivityStore`     : the backing store for records and contexts
//! - `PrincipalResolver` : the "who is acting right now" lookup
//!
//! The logger and dispatcher are written against these traits only; nothing
//! in the core knows which ORM, session system, or database sits behind them.

use std::sync::Arc;

use actlog_contracts::{
    action::EventSet,
    error::ActivityResult,
    record::{
        ActivityFilter, ActivityLogId, ActivityRecord, ContextId, PendingLog, PrincipalId,
        StoredLog, SubjectRef,
    },
    ContextRecord,
};

/// An entity type whose lifecycle can be audited.
///
/// `SUBJECT_TYPE` is the polymorphic type tag persisted in
/// `loggeable_type`; it must be registered with the logger before any of the
/// type's entities are logged.
///
/// ```rust,ignore
/// impl Auditable for Article {
///     const SUBJECT_TYPE: &'static str = "articles";
///
///     fn subject_id(&self) -> String {
///         self.id.to_string()
///     }
/// }
/// ```
pub trait Auditable {
    const SUBJECT_TYPE: &'static str;

    /// The entity's identifier, rendered as persisted in `loggeable_id`.
    fn subject_id(&self) -> String;

    /// Lifecycle events this type is audited for. Defaults to all three.
    fn audited_events() -> EventSet
    where
        Self: Sized,
    {
        EventSet::all()
    }

    fn subject_ref(&self) -> SubjectRef {
        SubjectRef::new(Self::SUBJECT_TYPE, self.subject_id())
    }
}

/// The backing store for activity records and their contexts.
///
/// Records are append-only from the core's perspective: the logger only ever
/// calls `persist` and the read methods. `delete` and `delete_context` exist
/// for store maintenance (retention jobs, tests) and must honor the
/// one-to-one cascade from a record to its context.
pub trait ActivityStore: Send + Sync {
    /// Write a record and its optional context as one unit.
    ///
    /// The record is written first so the context can reference its id.
    /// If the context write fails, the record write must not be visible
    /// either: a context row may never point at a missing parent.
    fn persist(&self, log: PendingLog) -> ActivityResult<StoredLog>;

    fn get(&self, id: ActivityLogId) -> ActivityResult<Option<ActivityRecord>>;

    /// All records matching `filter`, ordered by id ascending.
    fn query(&self, filter: &ActivityFilter) -> ActivityResult<Vec<ActivityRecord>>;

    /// The context row of `kind` owned by record `log_id`, if any.
    fn context(&self, log_id: ActivityLogId, kind: &str) -> ActivityResult<Option<ContextRecord>>;

    /// Delete a record and, by cascade, every context row it owns.
    ///
    /// Returns `false` if no record with `id` existed.
    fn delete(&self, id: ActivityLogId) -> ActivityResult<bool>;

    /// Delete a single context row. The owning record is left untouched.
    fn delete_context(&self, kind: &str, id: ContextId) -> ActivityResult<bool>;
}

impl<S: ActivityStore + ?Sized> ActivityStore for Arc<S> {
    fn persist(&self, log: PendingLog) -> ActivityResult<StoredLog> {
        (**self).persist(log)
    }

    fn get(&self, id: ActivityLogId) -> ActivityResult<Option<ActivityRecord>> {
        (**self).get(id)
    }

    fn query(&self, filter: &ActivityFilter) -> ActivityResult<Vec<ActivityRecord>> {
        (**self).query(filter)
    }

    fn context(&self, log_id: ActivityLogId, kind: &str) -> ActivityResult<Option<ContextRecord>> {
        (**self).context(log_id, kind)
    }

    fn delete(&self, id: ActivityLogId) -> ActivityResult<bool> {
        (**self).delete(id)
    }

    fn delete_context(&self, kind: &str, id: ContextId) -> ActivityResult<bool> {
        (**self).delete_context(kind, id)
    }
}

/// Looks up the principal acting in the current session.
///
/// Implementations must be synchronous and side-effect free. Returning
/// `None` means nobody is authenticated; it is not an error.
pub trait PrincipalResolver: Send + Sync {
    fn current_principal(&self) -> Option<PrincipalId>;
}

impl<F> PrincipalResolver for F
where
    F: Fn() -> Option<PrincipalId> + Send + Sync,
{
    fn current_principal(&self) -> Option<PrincipalId> {
        self()
    }
}
