//! The hook dispatcher: turns entity lifecycle notifications into logs.
//!
//! The repository layer calls the dispatcher at three points:
//!
//!   insert succeeded  → `on_created`
//!   before update     → `on_before_update` (original and dirty still known)
//!   delete succeeded  → `on_deleted`
//!
//! The dispatcher checks the entity type's audited event set, builds the
//! update diff, and hands off to `ActivityLogger::create_log`. What happens
//! when the log cannot be written is decided by `FailurePolicy`, never by
//! accident.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use actlog_contracts::{
    action::LifecycleEvent,
    context::{Attributes, PendingContext},
    error::ActivityResult,
    record::StoredLog,
};

use crate::{
    diff,
    logger::{ActivityLogger, Responsible},
    traits::Auditable,
};

/// What a failed log write means for the entity mutation that triggered it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Return the error to the caller, which must abort the mutation.
    #[default]
    Propagate,
    /// Report storage failures through `tracing` and let the mutation
    /// proceed. Configuration errors are still returned.
    BestEffort,
}

/// Dispatches lifecycle notifications of tracked entities to the logger.
pub struct HookDispatcher {
    logger: ActivityLogger,
    policy: FailurePolicy,
}

impl HookDispatcher {
    pub fn new(logger: ActivityLogger, policy: FailurePolicy) -> Self {
        Self { logger, policy }
    }

    pub fn logger(&self) -> &ActivityLogger {
        &self.logger
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Log the creation of `entity`.
    ///
    /// Returns `Ok(None)` when the type does not audit creations, or when
    /// the write failed under `FailurePolicy::BestEffort`.
    pub fn on_created<T: Auditable>(&self, entity: &T) -> ActivityResult<Option<StoredLog>> {
        self.dispatch(entity, LifecycleEvent::Created, None)
    }

    /// Log a pending update of `entity`.
    ///
    /// `original` is the persisted attribute map, `dirty` the attributes
    /// about to change. An empty dirty set writes nothing.
    pub fn on_before_update<T: Auditable>(
        &self,
        entity: &T,
        original: &Attributes,
        dirty: &Attributes,
    ) -> ActivityResult<Option<StoredLog>> {
        if !self.audits(entity, LifecycleEvent::Updated) {
            return Ok(None);
        }

        let diff = diff::build(original, dirty);
        if diff.is_empty() {
            debug!(
                subject = %entity.subject_ref(),
                "no attribute changed, update not logged"
            );
            return Ok(None);
        }

        let context = PendingContext::try_from(diff)?;
        self.dispatch(entity, LifecycleEvent::Updated, Some(context))
    }

    /// Log a pending update given the persisted and staged entity values.
    ///
    /// The dirty set is derived by comparing both snapshots field by field.
    pub fn on_before_update_from<T: Auditable + Serialize>(
        &self,
        original: &T,
        pending: &T,
    ) -> ActivityResult<Option<StoredLog>> {
        let before = diff::snapshot(original)?;
        let after = diff::snapshot(pending)?;
        let dirty = diff::dirty_attributes(&before, &after);
        self.on_before_update(pending, &before, &dirty)
    }

    /// Log the deletion of `entity`.
    pub fn on_deleted<T: Auditable>(&self, entity: &T) -> ActivityResult<Option<StoredLog>> {
        self.dispatch(entity, LifecycleEvent::Deleted, None)
    }

    /// True if `entity`'s type audits `event`.
    ///
    /// Unregistered types report `true` so the logger raises the
    /// configuration error instead of the event vanishing silently.
    fn audits<T: Auditable>(&self, entity: &T, event: LifecycleEvent) -> bool {
        match self.logger.audited_events(T::SUBJECT_TYPE) {
            Some(events) if !events.contains(event) => {
                debug!(
                    subject = %entity.subject_ref(),
                    event = %event,
                    "event not audited for subject type, skipping"
                );
                false
            }
            _ => true,
        }
    }

    fn dispatch<T: Auditable>(
        &self,
        entity: &T,
        event: LifecycleEvent,
        context: Option<PendingContext>,
    ) -> ActivityResult<Option<StoredLog>> {
        if !self.audits(entity, event) {
            return Ok(None);
        }

        let subject = entity.subject_ref();
        debug!(subject = %subject, event = %event, "dispatching lifecycle event");

        let result = self
            .logger
            .create_log(event.action(), context, Responsible::Current, Some(subject.clone()));

        match (result, self.policy) {
            (Ok(stored), _) => Ok(Some(stored)),
            (Err(err), FailurePolicy::BestEffort) if err.is_storage_failure() => {
                warn!(
                    subject = %subject,
                    event = %event,
                    error = %err,
                    "activity log write failed, continuing without a record"
                );
                Ok(None)
            }
            (Err(err), _) => Err(err),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
