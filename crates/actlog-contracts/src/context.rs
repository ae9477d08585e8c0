//! Action-specific context payloads attached to activity records.
//!
//! A context is a row in its own table (`<kind>_log_contexts`) holding a
//! structured payload and a one-to-one foreign key to its activity record.
//! Typed payloads implement `LogContext`; the store only ever sees the
//! untyped column map, so new context kinds need no schema change in the
//! activity record itself.

use std::collections::BTreeSet;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    error::{ActivityError, ActivityResult},
    record::{ActivityLogId, ContextId},
};

/// A flat attribute snapshot: field name to structured value.
pub type Attributes = Map<String, Value>;

/// Name of the table holding contexts of `kind`.
pub fn table_name(kind: &str) -> String {
    format!("{}_log_contexts", kind)
}

/// A typed context payload.
///
/// `KIND` is the stable type key used by registries and table names.
/// `COLUMNS` lists the top-level fields the payload serializes to; they
/// become the columns of the context table.
pub trait LogContext: Serialize + DeserializeOwned {
    const KIND: &'static str;
    const COLUMNS: &'static [&'static str];

    /// Check payload invariants. Runs on every write and every decode.
    fn validate(&self) -> ActivityResult<()> {
        Ok(())
    }
}

/// The before/after diff recorded for update actions.
///
/// `before` and `after` always share the same key set: only fields that
/// changed are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateContext {
    /// Prior values of the changed fields.
    pub before: Attributes,
    /// New values of the changed fields.
    pub after: Attributes,
}

impl UpdateContext {
    /// Build a context, rejecting mismatched key sets.
    pub fn new(before: Attributes, after: Attributes) -> ActivityResult<Self> {
        let ctx = Self { before, after };
        ctx.validate()?;
        Ok(ctx)
    }

    /// True when no field changed; such an update is never logged.
    pub fn is_empty(&self) -> bool {
        self.after.is_empty()
    }

    /// Names of the changed fields, in key order.
    pub fn changed_fields(&self) -> impl Iterator<Item = &str> {
        self.after.keys().map(String::as_str)
    }

    pub fn validate(&self) -> ActivityResult<()> {
        let before: BTreeSet<&String> = self.before.keys().collect();
        let after: BTreeSet<&String> = self.after.keys().collect();
        if before != after {
            return Err(ActivityError::InvalidContext {
                reason: format!(
                    "update context key sets differ: before {:?}, after {:?}",
                    before, after
                ),
            });
        }
        Ok(())
    }
}

impl LogContext for UpdateContext {
    const KIND: &'static str = "update";
    const COLUMNS: &'static [&'static str] = &["before", "after"];

    fn validate(&self) -> ActivityResult<()> {
        UpdateContext::validate(self)
    }
}

/// A context that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingContext {
    /// Registered context kind (e.g. `"update"`).
    pub kind: String,
    /// Column values, one entry per declared column.
    pub fields: Attributes,
}

impl PendingContext {
    /// Serialize a typed context into its column map.
    ///
    /// Fails with `InvalidContext` if the payload does not serialize to an
    /// object whose keys are exactly `C::COLUMNS`.
    pub fn from_typed<C: LogContext>(context: &C) -> ActivityResult<Self> {
        context.validate()?;
        let fields = match serde_json::to_value(context)? {
            Value::Object(map) => map,
            other => {
                return Err(ActivityError::InvalidContext {
                    reason: format!(
                        "context '{}' must serialize to an object, got {}",
                        C::KIND,
                        other
                    ),
                })
            }
        };

        let declared: BTreeSet<&str> = C::COLUMNS.iter().copied().collect();
        let present: BTreeSet<&str> = fields.keys().map(String::as_str).collect();
        if declared != present {
            return Err(ActivityError::InvalidContext {
                reason: format!(
                    "context '{}' declares columns {:?} but serialized {:?}",
                    C::KIND,
                    declared,
                    present
                ),
            });
        }

        Ok(Self { kind: C::KIND.to_string(), fields })
    }

    pub fn table(&self) -> String {
        table_name(&self.kind)
    }
}

impl TryFrom<UpdateContext> for PendingContext {
    type Error = ActivityError;

    fn try_from(context: UpdateContext) -> ActivityResult<Self> {
        context.validate()?;
        Self::from_typed(&context)
    }
}

/// A persisted context row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub id: ContextId,
    /// The owning activity record. Deleting it deletes this row.
    pub activity_log_id: ActivityLogId,
    pub kind: String,
    pub fields: Attributes,
}

impl ContextRecord {
    pub fn table(&self) -> String {
        table_name(&self.kind)
    }

    /// Decode the stored columns into the typed payload `C`.
    ///
    /// A row that decodes but breaks `C`'s invariants is `InvalidContext`.
    pub fn decode<C: LogContext>(&self) -> ActivityResult<C> {
        if self.kind != C::KIND {
            return Err(ActivityError::ContextMismatch {
                expected: C::KIND.to_string(),
                found: self.kind.clone(),
            });
        }
        let context: C = serde_json::from_value(Value::Object(self.fields.clone()))?;
        context.validate()?;
        Ok(context)
    }
}
