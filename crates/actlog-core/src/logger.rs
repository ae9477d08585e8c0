//! The log assembler: the single write path for activity records.
//!
//! Every record, whether produced by the hook dispatcher or logged by hand,
//! goes through `ActivityLogger::create_log`:
//!
//!   Validate subject → Validate context → Resolve principal → Persist unit
//!
//! Configuration errors (unregistered subject type, unknown context kind)
//! are raised before anything is written. Storage errors are returned as-is;
//! the logger never retries and never drops a log silently.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use actlog_contracts::{
    action::{Action, EventSet},
    context::{LogContext, PendingContext},
    error::{ActivityError, ActivityResult},
    record::{
        ActivityEntry, ActivityLogId, ActivityQuery, ActivityRecord, PendingLog, PrincipalId,
        StoredLog, SubjectRef,
    },
};

use crate::{
    registry::ContextRegistry,
    relation::{self, Relation},
    traits::{ActivityStore, Auditable, PrincipalResolver},
};

/// Who is credited with a logged action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Responsible {
    /// Ask the configured `PrincipalResolver`. No resolver, or no current
    /// principal, persists null.
    #[default]
    Current,
    /// Use this value verbatim. `Explicit(None)` persists null without
    /// consulting the resolver.
    Explicit(Option<PrincipalId>),
}

impl From<PrincipalId> for Responsible {
    fn from(principal_id: PrincipalId) -> Self {
        Responsible::Explicit(Some(principal_id))
    }
}

/// Assembles and persists activity records.
///
/// Construct one logger per store at startup, register the subject types it
/// may log, and share it by reference.
pub struct ActivityLogger {
    store: Box<dyn ActivityStore>,
    registry: ContextRegistry,
    subjects: BTreeMap<String, EventSet>,
    resolver: Option<Box<dyn PrincipalResolver>>,
}

impl ActivityLogger {
    /// Create a logger with no principal resolver and no tracked subjects.
    pub fn new(store: Box<dyn ActivityStore>, registry: ContextRegistry) -> Self {
        Self {
            store,
            registry,
            subjects: BTreeMap::new(),
            resolver: None,
        }
    }

    /// Use `resolver` for `Responsible::Current` lookups.
    pub fn with_resolver(mut self, resolver: impl PrincipalResolver + 'static) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    /// Use a boxed resolver, or disable the lookup with `None`.
    pub fn set_resolver(&mut self, resolver: Option<Box<dyn PrincipalResolver>>) {
        self.resolver = resolver;
    }

    /// Register `T` as a loggable subject type with its default event set.
    pub fn track<T: Auditable>(&mut self) -> &mut Self {
        self.track_subject(T::SUBJECT_TYPE, T::audited_events())
    }

    /// Register a subject type tag with an explicit event set.
    ///
    /// Registering the same tag again replaces its event set.
    pub fn track_subject(&mut self, subject_type: impl Into<String>, events: EventSet) -> &mut Self {
        let subject_type = subject_type.into();
        debug!(subject_type = %subject_type, events = ?events, "subject type registered");
        self.subjects.insert(subject_type, events);
        self
    }

    /// The audited event set of `subject_type`, or `None` if unregistered.
    pub fn audited_events(&self, subject_type: &str) -> Option<EventSet> {
        self.subjects.get(subject_type).copied()
    }

    pub fn tracked_subjects(&self) -> impl Iterator<Item = (&str, EventSet)> {
        self.subjects.iter().map(|(name, events)| (name.as_str(), *events))
    }

    pub fn registry(&self) -> &ContextRegistry {
        &self.registry
    }

    pub fn store(&self) -> &dyn ActivityStore {
        self.store.as_ref()
    }

    /// Resolve the principal credited for an action.
    pub fn resolve_principal(&self, responsible: Responsible) -> Option<PrincipalId> {
        match responsible {
            Responsible::Explicit(principal_id) => principal_id,
            Responsible::Current => self
                .resolver
                .as_ref()
                .and_then(|resolver| resolver.current_principal()),
        }
    }

    /// Create and persist one activity record.
    ///
    /// # Pipeline
    ///
    /// 1. If `subject` is given, its type must be registered
    ///    (`UnregisteredSubject` otherwise). Without a subject the record is
    ///    standalone.
    /// 2. If `context` is given, its kind must be registered
    ///    (`UnknownContext`) and its fields must match the kind's columns
    ///    (`InvalidContext`).
    /// 3. Resolve the principal per `responsible`.
    /// 4. Persist record and context as one unit; the context references
    ///    the record's fresh id.
    ///
    /// A successful return means the record exists with a valid id and, if a
    /// context was supplied, the context exists and points at it.
    pub fn create_log(
        &self,
        action: Action,
        context: Option<PendingContext>,
        responsible: Responsible,
        subject: Option<SubjectRef>,
    ) -> ActivityResult<StoredLog> {
        // ── Step 1: Subject binding ──────────────────────────────────────────
        if let Some(subject) = &subject {
            if !self.subjects.contains_key(&subject.subject_type) {
                return Err(ActivityError::UnregisteredSubject {
                    subject_type: subject.subject_type.clone(),
                });
            }
        }

        // ── Step 2: Context shape ────────────────────────────────────────────
        if let Some(context) = &context {
            self.check_context(context)?;
        }

        // ── Step 3: Principal resolution ─────────────────────────────────────
        let principal_id = self.resolve_principal(responsible);

        // ── Step 4: Persist ──────────────────────────────────────────────────
        let stored = self.store.persist(PendingLog {
            action,
            subject,
            principal_id,
            context,
        })?;

        info!(
            log_id = %stored.record.id(),
            action = %stored.record.action(),
            subject = ?stored.record.subject().map(ToString::to_string),
            principal_id = ?stored.record.principal_id().map(|p| p.0),
            context = ?stored.context.as_ref().map(|c| c.kind.as_str()),
            "activity logged"
        );

        Ok(stored)
    }

    /// Log `action` against `entity`, crediting the current principal.
    pub fn log_for<T: Auditable>(
        &self,
        entity: &T,
        action: Action,
        context: Option<PendingContext>,
    ) -> ActivityResult<StoredLog> {
        self.create_log(action, context, Responsible::Current, Some(entity.subject_ref()))
    }

    fn check_context(&self, context: &PendingContext) -> ActivityResult<()> {
        let context_type = self
            .registry
            .context_type(&context.kind)
            .ok_or_else(|| ActivityError::UnknownContext { name: context.kind.clone() })?;

        let declared: BTreeSet<&str> = context_type.columns.iter().copied().collect();
        let present: BTreeSet<&str> = context.fields.keys().map(String::as_str).collect();
        if declared != present {
            return Err(ActivityError::InvalidContext {
                reason: format!(
                    "context '{}' declares columns {:?} but got {:?}",
                    context.kind, declared, present
                ),
            });
        }
        Ok(())
    }

    // ── Read side ────────────────────────────────────────────────────────────

    pub fn find(&self, id: ActivityLogId) -> ActivityResult<Option<ActivityRecord>> {
        self.store.get(id)
    }

    /// Run `query`, eager-loading every context relation it names.
    ///
    /// A relation name that is not bound in the registry is an
    /// `UnknownContext` error, raised before the store is queried.
    pub fn query(&self, query: &ActivityQuery) -> ActivityResult<Vec<ActivityEntry>> {
        let relations = query
            .with
            .iter()
            .map(|name| {
                self.registry
                    .resolve(name)
                    .map(|context_type| (name.clone(), context_type.kind))
                    .ok_or_else(|| ActivityError::UnknownContext { name: name.clone() })
            })
            .collect::<ActivityResult<Vec<_>>>()?;

        let records = self.store.query(&query.filter)?;
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let mut contexts = BTreeMap::new();
            for (name, kind) in &relations {
                if let Some(context) = self.store.context(record.id(), kind)? {
                    contexts.insert(name.clone(), context);
                }
            }
            entries.push(ActivityEntry { record, contexts });
        }
        Ok(entries)
    }

    /// Every record logged against `entity`, with all bound contexts loaded.
    pub fn activity_of<T: Auditable>(&self, entity: &T) -> ActivityResult<Vec<ActivityEntry>> {
        self.query(&self.with_all_contexts(ActivityQuery::all().for_subject(entity.subject_ref())))
    }

    /// Every record `principal_id` is responsible for.
    pub fn activity_by(&self, principal_id: PrincipalId) -> ActivityResult<Vec<ActivityEntry>> {
        self.query(&self.with_all_contexts(ActivityQuery::all().by_principal(principal_id)))
    }

    fn with_all_contexts(&self, query: ActivityQuery) -> ActivityQuery {
        self.registry
            .bindings()
            .fold(query, |query, (name, _)| query.with(name))
    }

    /// Resolve a named relation on `record`. See [`relation::resolve`].
    pub fn relation(&self, record: &ActivityRecord, name: &str) -> ActivityResult<Option<Relation>> {
        relation::resolve(self.store.as_ref(), &self.registry, record, name)
    }

    /// Typed access to a context relation.
    ///
    /// Returns `Ok(None)` if `name` is unbound or the record has no row for
    /// it; `ContextMismatch` if `name` is bound to a kind other than `C`.
    pub fn context_of<C: LogContext>(&self, record: &ActivityRecord, name: &str) -> ActivityResult<Option<C>> {
        let Some(context_type) = self.registry.resolve(name) else {
            return Ok(None);
        };
        if context_type.kind != C::KIND {
            return Err(ActivityError::ContextMismatch {
                expected: C::KIND.to_string(),
                found: context_type.kind.to_string(),
            });
        }
        self.store
            .context(record.id(), context_type.kind)?
            .map(|context| context.decode::<C>())
            .transpose()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    use serde_json::json;

    use actlog_contracts::{Attributes, UpdateContext};

    use crate::{
        registry::{ContextRegistry, UPDATE_CONTEXT},
        testing::{article, Article, MockStore},
    };

    use super::*;

    fn attrs(value: serde_json::Value) -> Attributes {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    fn logger_with(store: &MockStore) -> ActivityLogger {
        let mut logger = ActivityLogger::new(Box::new(store.clone()), ContextRegistry::with_defaults());
        logger.track::<Article>();
        logger
    }

    fn update_context(before: serde_json::Value, after: serde_json::Value) -> PendingContext {
        PendingContext::try_from(UpdateContext::new(attrs(before), attrs(after)).unwrap()).unwrap()
    }

    // ── Principal resolution ─────────────────────────────────────────────────

    #[test]
    fn explicit_null_principal_never_consults_resolver() {
        let store = MockStore::new();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let logger = logger_with(&store).with_resolver(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Some(PrincipalId(7))
        });

        let stored = logger
            .create_log(Action::Create, None, Responsible::Explicit(None), None)
            .unwrap();

        assert_eq!(stored.record.principal_id(), None);
        assert_eq!(calls.load(Ordering::SeqCst), 0, "resolver must not be called");
    }

    #[test]
    fn current_principal_comes_from_resolver() {
        let store = MockStore::new();
        let logger = logger_with(&store).with_resolver(|| Some(PrincipalId(7)));

        let stored = logger
            .create_log(Action::Create, None, Responsible::Current, None)
            .unwrap();

        assert_eq!(stored.record.principal_id(), Some(PrincipalId(7)));
    }

    #[test]
    fn explicit_principal_overrides_resolver() {
        let store = MockStore::new();
        let logger = logger_with(&store).with_resolver(|| Some(PrincipalId(7)));

        let stored = logger
            .create_log(Action::Delete, None, PrincipalId(3).into(), None)
            .unwrap();

        assert_eq!(stored.record.principal_id(), Some(PrincipalId(3)));
    }

    #[test]
    fn missing_resolver_persists_null() {
        let store = MockStore::new();
        let logger = logger_with(&store);

        let stored = logger
            .create_log(Action::Create, None, Responsible::Current, None)
            .unwrap();

        assert_eq!(stored.record.principal_id(), None);
    }

    #[test]
    fn anonymous_session_persists_null() {
        let store = MockStore::new();
        let logger = logger_with(&store).with_resolver(|| None);

        let stored = logger
            .create_log(Action::Create, None, Responsible::Current, None)
            .unwrap();

        assert_eq!(stored.record.principal_id(), None);
    }

    // ── Subject binding ──────────────────────────────────────────────────────

    #[test]
    fn subject_reference_is_persisted() {
        let store = MockStore::new();
        let logger = logger_with(&store);

        let stored = logger
            .log_for(&article(42, "Hello"), Action::Create, None)
            .unwrap();

        assert_eq!(stored.record.subject(), Some(&SubjectRef::new("articles", "42")));
        assert!(stored.context.is_none());
    }

    #[test]
    fn standalone_record_has_no_subject() {
        let store = MockStore::new();
        let logger = logger_with(&store);

        let stored = logger
            .create_log(Action::Custom("maintenance".to_string()), None, Responsible::Current, None)
            .unwrap();

        assert!(stored.record.subject().is_none());
        assert_eq!(store.records().len(), 1);
    }

    #[test]
    fn unregistered_subject_type_is_rejected_before_writing() {
        let store = MockStore::new();
        let logger = logger_with(&store);

        let err = logger
            .create_log(
                Action::Create,
                None,
                Responsible::Current,
                Some(SubjectRef::new("invoices", "1")),
            )
            .unwrap_err();

        assert!(matches!(err, ActivityError::UnregisteredSubject { .. }));
        assert!(err.is_config_error());
        assert_eq!(store.state.lock().unwrap().persist_calls, 0);
    }

    // ── Context attachment ───────────────────────────────────────────────────

    #[test]
    fn context_is_linked_to_fresh_record() {
        let store = MockStore::new();
        let logger = logger_with(&store);

        let stored = logger
            .log_for(
                &article(1, "A"),
                Action::Update,
                Some(update_context(json!({ "title": "A" }), json!({ "title": "B" }))),
            )
            .unwrap();

        let context = stored.context.expect("context must be persisted");
        assert_eq!(context.activity_log_id, stored.record.id());
        assert_eq!(context.kind, "update");
        assert_eq!(store.contexts().len(), 1);
    }

    #[test]
    fn unknown_context_kind_is_a_config_error() {
        let store = MockStore::new();
        let logger = logger_with(&store);

        let pending = PendingContext {
            kind: "approval".to_string(),
            fields: attrs(json!({ "approver": "dr-house" })),
        };
        let err = logger
            .create_log(Action::Update, Some(pending), Responsible::Current, None)
            .unwrap_err();

        assert!(matches!(err, ActivityError::UnknownContext { .. }));
        assert!(store.records().is_empty());
    }

    #[test]
    fn context_with_wrong_columns_is_rejected() {
        let store = MockStore::new();
        let logger = logger_with(&store);

        let pending = PendingContext {
            kind: "update".to_string(),
            fields: attrs(json!({ "before": {} })),
        };
        let err = logger
            .create_log(Action::Update, Some(pending), Responsible::Current, None)
            .unwrap_err();

        assert!(matches!(err, ActivityError::InvalidContext { .. }));
    }

    #[test]
    fn storage_failure_is_propagated() {
        let store = MockStore::failing();
        let logger = logger_with(&store);

        let err = logger
            .create_log(Action::Create, None, Responsible::Current, None)
            .unwrap_err();

        assert!(err.is_storage_failure());
        assert_eq!(store.state.lock().unwrap().persist_calls, 1, "no retries");
    }

    // ── Relations and queries ────────────────────────────────────────────────

    #[test]
    fn static_relations_resolve_from_the_record() {
        let store = MockStore::new();
        let logger = logger_with(&store);
        let stored = logger
            .create_log(Action::Create, None, PrincipalId(5).into(), Some(SubjectRef::new("articles", "9")))
            .unwrap();

        assert_eq!(
            logger.relation(&stored.record, "loggeable").unwrap(),
            Some(Relation::Subject(Some(SubjectRef::new("articles", "9"))))
        );
        assert_eq!(
            logger.relation(&stored.record, "responsible").unwrap(),
            Some(Relation::Responsible(Some(PrincipalId(5))))
        );
    }

    #[test]
    fn configured_context_relation_resolves_like_a_declared_one() {
        let store = MockStore::new();
        let mut registry = ContextRegistry::with_defaults();
        registry.clear_bindings();
        registry.bind("changes", "update").unwrap();
        let mut logger = ActivityLogger::new(Box::new(store.clone()), registry);
        logger.track::<Article>();

        let stored = logger
            .log_for(
                &article(1, "A"),
                Action::Update,
                Some(update_context(json!({ "published": false }), json!({ "published": true }))),
            )
            .unwrap();

        match logger.relation(&stored.record, "changes").unwrap() {
            Some(Relation::Context(Some(context))) => {
                assert_eq!(context.id, stored.context.unwrap().id);
            }
            other => panic!("expected a context relation, got {:?}", other),
        }

        let typed: UpdateContext = logger.context_of(&stored.record, "changes").unwrap().unwrap();
        assert_eq!(typed.after["published"], json!(true));

        // The default name is no longer bound, so it is undefined.
        assert_eq!(logger.relation(&stored.record, UPDATE_CONTEXT).unwrap(), None);
    }

    #[test]
    fn undefined_relation_is_absent() {
        let store = MockStore::new();
        let logger = logger_with(&store);
        let stored = logger
            .create_log(Action::Create, None, Responsible::Current, None)
            .unwrap();

        assert_eq!(logger.relation(&stored.record, "approval_context").unwrap(), None);
        assert!(logger
            .context_of::<UpdateContext>(&stored.record, "approval_context")
            .unwrap()
            .is_none());
    }

    #[test]
    fn bound_relation_without_row_is_empty_context() {
        let store = MockStore::new();
        let logger = logger_with(&store);
        let stored = logger
            .create_log(Action::Create, None, Responsible::Current, None)
            .unwrap();

        assert_eq!(
            logger.relation(&stored.record, UPDATE_CONTEXT).unwrap(),
            Some(Relation::Context(None))
        );
    }

    #[test]
    fn query_eager_loads_requested_contexts() {
        let store = MockStore::new();
        let logger = logger_with(&store).with_resolver(|| Some(PrincipalId(7)));
        let post = article(3, "Post");

        logger.log_for(&post, Action::Create, None).unwrap();
        logger
            .log_for(
                &post,
                Action::Update,
                Some(update_context(json!({ "title": "Post" }), json!({ "title": "Post v2" }))),
            )
            .unwrap();
        logger.log_for(&article(4, "Other"), Action::Create, None).unwrap();

        let history = logger.activity_of(&post).unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].context(UPDATE_CONTEXT).is_none());
        assert!(history[1].context(UPDATE_CONTEXT).is_some());

        let updates = logger
            .query(&ActivityQuery::all().action(Action::Update).with(UPDATE_CONTEXT))
            .unwrap();
        assert_eq!(updates.len(), 1);

        assert_eq!(logger.activity_by(PrincipalId(7)).unwrap().len(), 3);
        assert!(logger.activity_by(PrincipalId(8)).unwrap().is_empty());
    }

    #[test]
    fn query_with_unbound_relation_fails() {
        let store = MockStore::new();
        let logger = logger_with(&store);

        let err = logger
            .query(&ActivityQuery::all().with("approval_context"))
            .unwrap_err();
        assert!(matches!(err, ActivityError::UnknownContext { .. }));
    }
}
