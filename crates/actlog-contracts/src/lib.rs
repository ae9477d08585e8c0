//! # actlog-contracts
//!
//! Shared record types, context payloads, and errors for the activity-log
//! core.
//!
//! All crates in the workspace import from here. No pipeline logic lives in
//! this crate, only data definitions and their invariants.

pub mod action;
pub mod context;
pub mod error;
pub mod record;

pub use action::{Action, EventSet, LifecycleEvent};
pub use context::{Attributes, ContextRecord, LogContext, PendingContext, UpdateContext};
pub use error::{ActivityError, ActivityResult};
pub use record::{
    ActivityEntry, ActivityFilter, ActivityLogId, ActivityQuery, ActivityRecord, ContextId,
    PendingLog, PrincipalId, StoredLog, SubjectRef,
};

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn attrs(value: serde_json::Value) -> Attributes {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {}", other),
        }
    }

    // ── Action ───────────────────────────────────────────────────────────────

    #[test]
    fn action_serializes_as_lowercase_string() {
        assert_eq!(serde_json::to_string(&Action::Create).unwrap(), "\"create\"");
        assert_eq!(serde_json::to_string(&Action::Update).unwrap(), "\"update\"");
        assert_eq!(serde_json::to_string(&Action::Delete).unwrap(), "\"delete\"");
    }

    #[test]
    fn custom_action_keeps_its_name() {
        let action: Action = serde_json::from_str("\"publish\"").unwrap();
        assert_eq!(action, Action::Custom("publish".to_string()));
        assert_eq!(action.to_string(), "publish");
    }

    #[test]
    fn known_action_strings_parse_to_builtin_variants() {
        assert_eq!(Action::from("delete"), Action::Delete);
        assert_eq!(Action::from("update"), Action::Update);
    }

    // ── EventSet ─────────────────────────────────────────────────────────────

    #[test]
    fn default_event_set_audits_everything() {
        let set = EventSet::default();
        for event in LifecycleEvent::ALL {
            assert!(set.contains(event), "{event} should be audited by default");
        }
    }

    #[test]
    fn event_set_of_subset() {
        let set = EventSet::of(&[LifecycleEvent::Created, LifecycleEvent::Deleted]);
        assert!(set.contains(LifecycleEvent::Created));
        assert!(!set.contains(LifecycleEvent::Updated));
        assert!(set.contains(LifecycleEvent::Deleted));
        assert_eq!(set.iter().count(), 2);
    }

    #[test]
    fn lifecycle_event_parse_rejects_unknown_names() {
        assert_eq!("updated".parse::<LifecycleEvent>().unwrap(), LifecycleEvent::Updated);
        let err = "saved".parse::<LifecycleEvent>().unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("saved"));
    }

    // ── UpdateContext ────────────────────────────────────────────────────────

    #[test]
    fn update_context_rejects_mismatched_keys() {
        let err = UpdateContext::new(attrs(json!({ "a": 1 })), attrs(json!({ "b": 2 }))).unwrap_err();
        assert!(matches!(err, ActivityError::InvalidContext { .. }));
    }

    #[test]
    fn update_context_pending_has_declared_columns() {
        let ctx = UpdateContext::new(attrs(json!({ "b": 2 })), attrs(json!({ "b": 5 }))).unwrap();
        let pending = PendingContext::try_from(ctx).unwrap();

        assert_eq!(pending.kind, "update");
        assert_eq!(pending.table(), "update_log_contexts");
        assert_eq!(pending.fields["before"], json!({ "b": 2 }));
        assert_eq!(pending.fields["after"], json!({ "b": 5 }));
    }

    #[test]
    fn context_record_decode_checks_kind() {
        let record = ContextRecord {
            id: ContextId(1),
            activity_log_id: ActivityLogId(1),
            kind: "approval".to_string(),
            fields: attrs(json!({ "before": {}, "after": {} })),
        };

        match record.decode::<UpdateContext>() {
            Err(ActivityError::ContextMismatch { expected, found }) => {
                assert_eq!(expected, "update");
                assert_eq!(found, "approval");
            }
            other => panic!("expected ContextMismatch, got {:?}", other),
        }
    }

    #[test]
    fn context_record_decode_rejects_mismatched_key_sets() {
        let record = ContextRecord {
            id: ContextId(2),
            activity_log_id: ActivityLogId(4),
            kind: "update".to_string(),
            fields: attrs(json!({
                "before": { "title": "a" },
                "after": { "title": "b", "body": "new" }
            })),
        };

        let err = record.decode::<UpdateContext>().unwrap_err();
        assert!(matches!(err, ActivityError::InvalidContext { .. }), "got: {:?}", err);
        assert!(err.to_string().contains("key sets differ"), "got: {}", err);
    }

    #[test]
    fn context_record_decodes_structured_values() {
        let record = ContextRecord {
            id: ContextId(3),
            activity_log_id: ActivityLogId(9),
            kind: "update".to_string(),
            fields: attrs(json!({
                "before": { "tags": ["a"], "meta": { "draft": true } },
                "after": { "tags": ["a", "b"], "meta": { "draft": false } }
            })),
        };

        let ctx: UpdateContext = record.decode().unwrap();
        assert_eq!(ctx.before["meta"], json!({ "draft": true }));
        assert_eq!(ctx.after["tags"], json!(["a", "b"]));
    }

    // ── ActivityFilter ───────────────────────────────────────────────────────

    #[test]
    fn filter_matches_every_populated_criterion() {
        let record = ActivityRecord::from_parts(
            ActivityLogId(1),
            Action::Update,
            Some(SubjectRef::new("articles", "42")),
            Some(PrincipalId(7)),
            Utc::now(),
        );

        let filter = ActivityQuery::all()
            .for_subject(SubjectRef::new("articles", "42"))
            .by_principal(PrincipalId(7))
            .action(Action::Update)
            .filter;
        assert!(filter.matches(&record));

        let wrong_action = ActivityQuery::all().action(Action::Delete).filter;
        assert!(!wrong_action.matches(&record));

        let wrong_subject = ActivityQuery::all()
            .for_subject(SubjectRef::new("articles", "43"))
            .filter;
        assert!(!wrong_subject.matches(&record));
    }

    #[test]
    fn filter_on_principal_skips_anonymous_records() {
        let record = ActivityRecord::from_parts(
            ActivityLogId(2),
            Action::Create,
            None,
            None,
            Utc::now(),
        );
        assert!(ActivityFilter::default().matches(&record));
        assert!(!ActivityQuery::all().by_principal(PrincipalId(1)).filter.matches(&record));
    }

    // ── ActivityError display messages ───────────────────────────────────────

    #[test]
    fn error_unregistered_subject_display() {
        let err = ActivityError::UnregisteredSubject {
            subject_type: "invoices".to_string(),
        };
        assert!(err.to_string().contains("invoices"));
        assert!(err.is_config_error());
    }

    #[test]
    fn error_storage_failed_display() {
        let err = ActivityError::storage("disk full");
        let msg = err.to_string();
        assert!(msg.contains("storage failure"));
        assert!(msg.contains("disk full"));
        assert!(!err.is_config_error());
        assert!(err.is_storage_failure());
    }

    #[test]
    fn error_unknown_context_display() {
        let err = ActivityError::UnknownContext {
            name: "approval_context".to_string(),
        };
        assert!(err.to_string().contains("approval_context"));
        assert!(err.is_config_error());
    }
}
