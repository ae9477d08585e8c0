//! # actlog-store
//!
//! Storage backends for the activity-log core.
//!
//! ## Overview
//!
//! Both backends implement [`ActivityStore`](actlog_core::traits::ActivityStore)
//! over the same relational model: an `activity_logs` table plus one
//! `<kind>_log_contexts` table per context kind, with a one-to-one foreign
//! key from context to record and cascade delete.
//!
//! - [`InMemoryActivityStore`] keeps the tables in process memory.
//! - [`JsonlActivityStore`] journals every row to an append-only JSONL file
//!   and replays it on open.
//! - [`schema`] renders matching SQL DDL for relational databases.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use actlog_store::JsonlActivityStore;
//! use actlog_core::{ActivityLogger, ContextRegistry};
//!
//! let store = JsonlActivityStore::open("activity.jsonl")?;
//! let logger = ActivityLogger::new(Box::new(store), ContextRegistry::with_defaults());
//! ```

pub mod file;
pub mod memory;
pub mod schema;
mod tables;

pub use file::JsonlActivityStore;
pub use memory::InMemoryActivityStore;
pub use schema::{create_statements, drop_statements, Dialect};

// ── Tests ─────────────────────────────────────────────────────────────────────
