//! Test doubles shared by the core's unit tests.

use std::sync::{Arc, Mutex};

use chrono::Utc;

use actlog_contracts::{
    error::{ActivityError, ActivityResult},
    record::{
        ActivityFilter, ActivityLogId, ActivityRecord, ContextId, PendingLog, StoredLog,
    },
    ContextRecord, EventSet,
};

use crate::traits::{ActivityStore, Auditable};

#[derive(Default)]
pub(crate) struct MockState {
    pub(crate) records: Vec<ActivityRecord>,
    pub(crate) contexts: Vec<ContextRecord>,
    pub(crate) persist_calls: u32,
}

/// A store that keeps rows in vectors and can be told to fail every write.
#[derive(Clone, Default)]
pub(crate) struct MockStore {
    pub(crate) state: Arc<Mutex<MockState>>,
    pub(crate) fail_writes: bool,
}

impl MockStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing() -> Self {
        Self { fail_writes: true, ..Self::default() }
    }

    pub(crate) fn records(&self) -> Vec<ActivityRecord> {
        self.state.lock().unwrap().records.clone()
    }

    pub(crate) fn contexts(&self) -> Vec<ContextRecord> {
        self.state.lock().unwrap().contexts.clone()
    }
}

impl ActivityStore for MockStore {
    fn persist(&self, log: PendingLog) -> ActivityResult<StoredLog> {
        let mut state = self.state.lock().unwrap();
        state.persist_calls += 1;
        if self.fail_writes {
            return Err(ActivityError::storage("mock store rejects writes"));
        }

        let id = ActivityLogId(state.records.len() as i64 + 1);
        let record = ActivityRecord::from_parts(
            id,
            log.action,
            log.subject,
            log.principal_id,
            Utc::now(),
        );
        state.records.push(record.clone());

        let context = log.context.map(|pending| ContextRecord {
            id: ContextId(state.contexts.len() as i64 + 1),
            activity_log_id: id,
            kind: pending.kind,
            fields: pending.fields,
        });
        if let Some(context) = &context {
            state.contexts.push(context.clone());
        }

        Ok(StoredLog { record, context })
    }

    fn get(&self, id: ActivityLogId) -> ActivityResult<Option<ActivityRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.records.iter().find(|r| r.id() == id).cloned())
    }

    fn query(&self, filter: &ActivityFilter) -> ActivityResult<Vec<ActivityRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state.records.iter().filter(|r| filter.matches(r)).cloned().collect())
    }

    fn context(&self, log_id: ActivityLogId, kind: &str) -> ActivityResult<Option<ContextRecord>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .contexts
            .iter()
            .find(|c| c.activity_log_id == log_id && c.kind == kind)
            .cloned())
    }

    fn delete(&self, id: ActivityLogId) -> ActivityResult<bool> {
        let mut state = self.state.lock().unwrap();
        let before = state.records.len();
        state.records.retain(|r| r.id() != id);
        state.contexts.retain(|c| c.activity_log_id != id);
        Ok(state.records.len() != before)
    }

    fn delete_context(&self, kind: &str, id: ContextId) -> ActivityResult<bool> {
        let mut state = self.state.lock().unwrap();
        let before = state.contexts.len();
        state.contexts.retain(|c| !(c.kind == kind && c.id == id));
        Ok(state.contexts.len() != before)
    }
}

/// A tracked entity audited for every lifecycle event.
#[derive(Debug, Clone, serde::Serialize)]
pub(crate) struct Article {
    pub(crate) id: u32,
    pub(crate) title: String,
    pub(crate) published: bool,
}

impl Auditable for Article {
    const SUBJECT_TYPE: &'static str = "articles";

    fn subject_id(&self) -> String {
        self.id.to_string()
    }
}

/// A tracked entity that only audits deletions.
#[derive(Debug, Clone, serde::Serialize)]
pub(crate) struct Session {
    pub(crate) token: String,
}

impl Auditable for Session {
    const SUBJECT_TYPE: &'static str = "sessions";

    fn subject_id(&self) -> String {
        self.token.clone()
    }

    fn audited_events() -> EventSet {
        EventSet::of(&[actlog_contracts::LifecycleEvent::Deleted])
    }
}

pub(crate) fn article(id: u32, title: &str) -> Article {
    Article { id, title: title.to_string(), published: false }
}
