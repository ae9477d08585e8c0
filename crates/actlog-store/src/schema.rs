//! DDL for the relational layout of the activity log.
//!
//! Two kinds of table:
//!
//!   activity_logs(id, created_at, loggeable_type, loggeable_id, action, responsible_id)
//!   <kind>_log_contexts(id, <columns...>, activity_log_id → activity_logs.id ON DELETE CASCADE)
//!
//! One context table is rendered per kind registered in the
//! `ContextRegistry`, with one JSON column per declared payload column.

use actlog_core::registry::{ContextRegistry, ContextType};

/// Target SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    fn id_column(self) -> &'static str {
        match self {
            Dialect::Postgres => "BIGSERIAL PRIMARY KEY",
            Dialect::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
        }
    }

    fn timestamp(self) -> &'static str {
        match self {
            Dialect::Postgres => "TIMESTAMPTZ",
            Dialect::Sqlite => "TEXT",
        }
    }

    fn json(self) -> &'static str {
        match self {
            Dialect::Postgres => "JSONB",
            Dialect::Sqlite => "TEXT",
        }
    }

    fn bigint(self) -> &'static str {
        match self {
            Dialect::Postgres => "BIGINT",
            Dialect::Sqlite => "INTEGER",
        }
    }
}

/// Statements creating every table and index, in dependency order.
pub fn create_statements(registry: &ContextRegistry, dialect: Dialect) -> Vec<String> {
    let mut statements = vec![
        activity_logs_table(dialect),
        "CREATE INDEX IF NOT EXISTS activity_logs_loggeable_index \
         ON activity_logs (loggeable_type, loggeable_id)"
            .to_string(),
        "CREATE INDEX IF NOT EXISTS activity_logs_responsible_id_index \
         ON activity_logs (responsible_id)"
            .to_string(),
    ];
    statements.extend(registry.types().map(|t| context_table(t, dialect)));
    statements
}

/// Statements dropping every table, children first.
pub fn drop_statements(registry: &ContextRegistry) -> Vec<String> {
    let mut statements: Vec<String> = registry
        .types()
        .map(|t| format!("DROP TABLE IF EXISTS {}", t.table()))
        .collect();
    statements.push("DROP TABLE IF EXISTS activity_logs".to_string());
    statements
}

fn activity_logs_table(dialect: Dialect) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS activity_logs (\n    \
         id {id},\n    \
         created_at {ts} NOT NULL,\n    \
         loggeable_type VARCHAR(255),\n    \
         loggeable_id VARCHAR(255),\n    \
         action VARCHAR(255) NOT NULL,\n    \
         responsible_id {bigint}\n)",
        id = dialect.id_column(),
        ts = dialect.timestamp(),
        bigint = dialect.bigint(),
    )
}

fn context_table(context_type: &ContextType, dialect: Dialect) -> String {
    let mut columns = vec![format!("id {}", dialect.id_column())];
    columns.extend(
        context_type
            .columns
            .iter()
            .map(|column| format!("\"{}\" {} NOT NULL", column, dialect.json())),
    );
    columns.push(format!(
        "activity_log_id {} NOT NULL UNIQUE REFERENCES activity_logs (id) ON DELETE CASCADE",
        dialect.bigint()
    ));

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        context_type.table(),
        columns.join(",\n    ")
    )
}
