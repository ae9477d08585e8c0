//! In-memory implementation of `ActivityStore`.
//!
//! `InMemoryActivityStore` keeps both tables behind one `Mutex`, so a
//! persist writes the record and its context under a single lock: other
//! threads observe either both rows or neither. Clones share the same
//! tables, which lets tests keep a handle after moving a clone into a
//! logger.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::debug;

use actlog_contracts::{
    error::{ActivityError, ActivityResult},
    record::{
        ActivityFilter, ActivityLogId, ActivityRecord, ContextId, PendingLog, StoredLog,
    },
    ContextRecord,
};
use actlog_core::traits::ActivityStore;

use crate::tables::{Row, Tables};

/// A process-local activity store.
#[derive(Clone, Default)]
pub struct InMemoryActivityStore {
    pub(crate) state: Arc<Mutex<Tables>>,
}

impl InMemoryActivityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in `activity_logs`.
    pub fn record_count(&self) -> usize {
        self.lock().map(|t| t.log_count()).unwrap_or(0)
    }

    /// Number of rows across every context table.
    pub fn context_count(&self) -> usize {
        self.lock().map(|t| t.context_count()).unwrap_or(0)
    }

    fn lock(&self) -> ActivityResult<MutexGuard<'_, Tables>> {
        self.state
            .lock()
            .map_err(|e| ActivityError::storage(format!("activity store lock poisoned: {}", e)))
    }
}

impl ActivityStore for InMemoryActivityStore {
    fn persist(&self, log: PendingLog) -> ActivityResult<StoredLog> {
        let mut tables = self.lock()?;
        let stored = tables.stage(log, Utc::now());
        tables.commit(&stored)?;

        debug!(
            log_id = %stored.record.id(),
            context_id = ?stored.context.as_ref().map(|c| c.id.0),
            "activity record stored in memory"
        );
        Ok(stored)
    }

    fn get(&self, id: ActivityLogId) -> ActivityResult<Option<ActivityRecord>> {
        Ok(self.lock()?.get(id))
    }

    fn query(&self, filter: &ActivityFilter) -> ActivityResult<Vec<ActivityRecord>> {
        Ok(self.lock()?.query(filter))
    }

    fn context(&self, log_id: ActivityLogId, kind: &str) -> ActivityResult<Option<ContextRecord>> {
        Ok(self.lock()?.context(log_id, kind))
    }

    fn delete(&self, id: ActivityLogId) -> ActivityResult<bool> {
        self.lock()?.apply(Row::DeleteLog { id })
    }

    fn delete_context(&self, kind: &str, id: ContextId) -> ActivityResult<bool> {
        self.lock()?.apply(Row::DeleteContext { kind: kind.to_string(), id })
    }
}
