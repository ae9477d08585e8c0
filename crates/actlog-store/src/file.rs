//! Append-only JSONL implementation of `ActivityStore`.
//!
//! Every change is journaled as one JSON line (`Row`) and the tables are
//! rebuilt by replaying the journal on open. A persist commits the record
//! and its context to the in-memory tables, then writes both rows in a
//! single buffered write followed by a flush; a failed write rolls the
//! commit back. Deletes are journaled as tombstone rows and nothing is ever
//! rewritten in place.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info};

use actlog_contracts::{
    error::{ActivityError, ActivityResult},
    record::{
        ActivityFilter, ActivityLogId, ActivityRecord, ContextId, PendingLog, StoredLog,
    },
    ContextRecord,
};
use actlog_core::traits::ActivityStore;

use crate::tables::{Row, Tables};

/// A durable activity store backed by a line-delimited JSON journal.
pub struct JsonlActivityStore {
    path: PathBuf,
    state: Mutex<Tables>,
}

impl JsonlActivityStore {
    /// Open the journal at `path`, replaying any rows it already holds.
    ///
    /// A missing file is an empty store; it is created on the first write.
    /// A line that cannot be parsed or applied fails the open with a
    /// `StorageFailed` error naming the line.
    pub fn open(path: impl Into<PathBuf>) -> ActivityResult<Self> {
        let path = path.into();
        let mut tables = Tables::default();
        let mut replayed = 0usize;

        if path.exists() {
            let file = File::open(&path).map_err(|e| {
                ActivityError::storage(format!("failed to open journal '{}': {}", path.display(), e))
            })?;

            for (line_num, line) in BufReader::new(file).lines().enumerate() {
                let line = line.map_err(|e| {
                    ActivityError::storage(format!("failed to read journal line {}: {}", line_num + 1, e))
                })?;

                if line.trim().is_empty() {
                    continue;
                }

                let row: Row = serde_json::from_str(&line).map_err(|e| {
                    ActivityError::storage(format!("failed to parse journal line {}: {}", line_num + 1, e))
                })?;
                tables.apply(row).map_err(|e| {
                    ActivityError::storage(format!("failed to replay journal line {}: {}", line_num + 1, e))
                })?;
                replayed += 1;
            }
        }

        info!(
            path = %path.display(),
            rows = replayed,
            records = tables.log_count(),
            "activity journal opened"
        );

        Ok(Self { path, state: Mutex::new(tables) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live rows in `activity_logs`.
    pub fn record_count(&self) -> usize {
        self.lock().map(|t| t.log_count()).unwrap_or(0)
    }

    fn lock(&self) -> ActivityResult<MutexGuard<'_, Tables>> {
        self.state
            .lock()
            .map_err(|e| ActivityError::storage(format!("activity store lock poisoned: {}", e)))
    }

    /// Append `rows` with one write and flush.
    fn append(&self, rows: &[Row]) -> ActivityResult<()> {
        let mut buffer = String::new();
        for row in rows {
            let json = serde_json::to_string(row)
                .map_err(|e| ActivityError::storage(format!("failed to serialize row: {}", e)))?;
            buffer.push_str(&json);
            buffer.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                ActivityError::storage(format!("failed to open journal '{}': {}", self.path.display(), e))
            })?;

        file.write_all(buffer.as_bytes())
            .map_err(|e| ActivityError::storage(format!("failed to write journal: {}", e)))?;
        file.flush()
            .map_err(|e| ActivityError::storage(format!("failed to flush journal: {}", e)))?;

        Ok(())
    }
}

impl ActivityStore for JsonlActivityStore {
    fn persist(&self, log: PendingLog) -> ActivityResult<StoredLog> {
        let mut tables = self.lock()?;
        let stored = tables.stage(log, Utc::now());

        // Commit first so a rejected unit never reaches the journal; undo it
        // if the journal write fails.
        tables.commit(&stored)?;
        if let Err(err) = self.append(&Tables::rows_of(&stored)) {
            tables.apply(Row::DeleteLog { id: stored.record.id() })?;
            return Err(err);
        }

        debug!(
            log_id = %stored.record.id(),
            path = %self.path.display(),
            "activity record journaled"
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
        let mut tables = self.lock()?;
        if !tables.contains_log(id) {
            return Ok(false);
        }
        let row = Row::DeleteLog { id };
        self.append(std::slice::from_ref(&row))?;
        tables.apply(row)
    }

    fn delete_context(&self, kind: &str, id: ContextId) -> ActivityResult<bool> {
        let mut tables = self.lock()?;
        if !tables.contains_context(kind, id) {
            return Ok(false);
        }
        let row = Row::DeleteContext { kind: kind.to_string(), id };
        self.append(std::slice::from_ref(&row))?;
        tables.apply(row)
    }
}
