//! Field-level before/after diffs for update actions.
//!
//! The diff is minimal: only fields in the dirty set are recorded, and
//! `before` is the original snapshot restricted to exactly those keys.
//! No field is redacted here; callers that store sensitive attributes must
//! strip them from the snapshots they pass in.

use serde::Serialize;
use serde_json::Value;

use actlog_contracts::{
    context::{Attributes, UpdateContext},
    error::{ActivityError, ActivityResult},
};

/// Build the update context from the persisted (`original`) and staged
/// (`dirty`) attribute maps.
///
/// `after` is `dirty` as given. `before` holds the original value of every
/// key in `after`; a key the original never had is recorded as `null` so
/// both maps keep the same key set. Keys present only in `original` are
/// dropped.
pub fn build(original: &Attributes, dirty: &Attributes) -> UpdateContext {
    let after = dirty.clone();
    let before = after
        .keys()
        .map(|key| (key.clone(), original.get(key).cloned().unwrap_or(Value::Null)))
        .collect();

    UpdateContext { before, after }
}

/// The attributes of `current` whose value differs from `original`.
///
/// Used when the caller has two full snapshots rather than a tracked dirty
/// set. A key missing from `original` counts as changed; a key missing from
/// `current` is ignored (attributes are never removed by an update).
pub fn dirty_attributes(original: &Attributes, current: &Attributes) -> Attributes {
    current
        .iter()
        .filter(|(key, value)| original.get(*key) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// Serialize an entity into its attribute map.
///
/// Fails with `InvalidContext` when the entity does not serialize to a JSON
/// object, since a non-object has no named fields to diff.
pub fn snapshot<T: Serialize + ?Sized>(entity: &T) -> ActivityResult<Attributes> {
    match serde_json::to_value(entity)? {
        Value::Object(map) => Ok(map),
        other => Err(ActivityError::InvalidContext {
            reason: format!("entity snapshot must be an object, got {}", other),
        }),
    }
}
