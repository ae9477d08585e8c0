//! Relational tables shared by every backend.
//!
//! `Tables` models the two-table layout directly: one `activity_logs` table
//! keyed by record id, and one `<kind>_log_contexts` table per context kind
//! keyed by context id. Every change is expressed as a `Row` so the file
//! backend can journal exactly what the memory backend applies.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use actlog_contracts::{
    context::table_name,
    error::{ActivityError, ActivityResult},
    record::{
        ActivityFilter, ActivityLogId, ActivityRecord, ContextId, PendingLog, StoredLog,
    },
    ContextRecord,
};

/// One journaled change to the tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub(crate) enum Row {
    Log { record: ActivityRecord },
    Context { context: ContextRecord },
    DeleteLog { id: ActivityLogId },
    DeleteContext { kind: String, id: ContextId },
}

#[derive(Debug)]
pub(crate) struct Tables {
    logs: BTreeMap<ActivityLogId, ActivityRecord>,
    /// Context tables by kind.
    contexts: BTreeMap<String, BTreeMap<ContextId, ContextRecord>>,
    next_log_id: i64,
    next_context_ids: BTreeMap<String, i64>,
}

impl Default for Tables {
    fn default() -> Self {
        Self {
            logs: BTreeMap::new(),
            contexts: BTreeMap::new(),
            next_log_id: 1,
            next_context_ids: BTreeMap::new(),
        }
    }
}

impl Tables {
    /// Assign ids to `log` without changing the tables.
    pub(crate) fn stage(&self, log: PendingLog, created_at: DateTime<Utc>) -> StoredLog {
        let id = ActivityLogId(self.next_log_id);
        let record = ActivityRecord::from_parts(id, log.action, log.subject, log.principal_id, created_at);

        let context = log.context.map(|pending| {
            let context_id = self.next_context_ids.get(&pending.kind).copied().unwrap_or(1);
            ContextRecord {
                id: ContextId(context_id),
                activity_log_id: id,
                kind: pending.kind,
                fields: pending.fields,
            }
        });

        StoredLog { record, context }
    }

    /// The rows that write `stored`: parent first, then its context.
    pub(crate) fn rows_of(stored: &StoredLog) -> Vec<Row> {
        let mut rows = vec![Row::Log { record: stored.record.clone() }];
        if let Some(context) = &stored.context {
            rows.push(Row::Context { context: context.clone() });
        }
        rows
    }

    /// Apply a staged log as one unit.
    ///
    /// If the context row is rejected the parent row is removed again, so
    /// either both rows are visible or neither is.
    pub(crate) fn commit(&mut self, stored: &StoredLog) -> ActivityResult<()> {
        let record_id = stored.record.id();
        self.apply(Row::Log { record: stored.record.clone() })?;

        if let Some(context) = &stored.context {
            if let Err(err) = self.apply(Row::Context { context: context.clone() }) {
                self.logs.remove(&record_id);
                return Err(err);
            }
        }
        Ok(())
    }

    /// Apply one row. Returns whether a delete removed anything.
    pub(crate) fn apply(&mut self, row: Row) -> ActivityResult<bool> {
        match row {
            Row::Log { record } => {
                let id = record.id();
                if self.logs.contains_key(&id) {
                    return Err(ActivityError::storage(format!(
                        "duplicate key: activity_logs.id = {}",
                        id
                    )));
                }
                self.next_log_id = self.next_log_id.max(id.0 + 1);
                self.logs.insert(id, record);
                Ok(true)
            }

            Row::Context { context } => {
                // activity_log_id REFERENCES activity_logs (id)
                if !self.logs.contains_key(&context.activity_log_id) {
                    return Err(ActivityError::storage(format!(
                        "foreign key violation: {}.activity_log_id = {} has no parent",
                        table_name(&context.kind),
                        context.activity_log_id
                    )));
                }
                let table = self.contexts.entry(context.kind.clone()).or_default();
                if table.contains_key(&context.id) {
                    return Err(ActivityError::storage(format!(
                        "duplicate key: {}.id = {}",
                        table_name(&context.kind),
                        context.id
                    )));
                }
                // One-to-one: a record owns at most one row per context table.
                if table.values().any(|c| c.activity_log_id == context.activity_log_id) {
                    return Err(ActivityError::storage(format!(
                        "unique violation: {}.activity_log_id = {}",
                        table_name(&context.kind),
                        context.activity_log_id
                    )));
                }
                let next = self.next_context_ids.entry(context.kind.clone()).or_insert(1);
                *next = (*next).max(context.id.0 + 1);
                table.insert(context.id, context);
                Ok(true)
            }

            Row::DeleteLog { id } => {
                let existed = self.logs.remove(&id).is_some();
                // ON DELETE CASCADE
                for table in self.contexts.values_mut() {
                    table.retain(|_, c| c.activity_log_id != id);
                }
                Ok(existed)
            }

            Row::DeleteContext { kind, id } => Ok(self
                .contexts
                .get_mut(&kind)
                .map(|table| table.remove(&id).is_some())
                .unwrap_or(false)),
        }
    }

    pub(crate) fn get(&self, id: ActivityLogId) -> Option<ActivityRecord> {
        self.logs.get(&id).cloned()
    }

    pub(crate) fn query(&self, filter: &ActivityFilter) -> Vec<ActivityRecord> {
        self.logs
            .values()
            .filter(|record| filter.matches(record))
            .cloned()
            .collect()
    }

    pub(crate) fn context(&self, log_id: ActivityLogId, kind: &str) -> Option<ContextRecord> {
        self.contexts
            .get(kind)
            .and_then(|table| table.values().find(|c| c.activity_log_id == log_id))
            .cloned()
    }

    pub(crate) fn contains_log(&self, id: ActivityLogId) -> bool {
        self.logs.contains_key(&id)
    }

    pub(crate) fn contains_context(&self, kind: &str, id: ContextId) -> bool {
        self.contexts
            .get(kind)
            .map(|table| table.contains_key(&id))
            .unwrap_or(false)
    }

    pub(crate) fn log_count(&self) -> usize {
        self.logs.len()
    }

    pub(crate) fn context_count(&self) -> usize {
        self.contexts.values().map(BTreeMap::len).sum()
    }
}
