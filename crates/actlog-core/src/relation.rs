//! Named relations of an activity record.
//!
//! Two relations are declared statically on every record: `loggeable` (the
//! audited subject) and `responsible` (the acting principal). Any other name
//! is looked up in the context registry and, if bound, resolved as a
//! one-to-one relation to that context table. Unknown names resolve to
//! `None`; nothing is fabricated.

use actlog_contracts::{
    error::ActivityResult,
    record::{ActivityRecord, PrincipalId, SubjectRef},
    ContextRecord,
};

use crate::{registry::ContextRegistry, traits::ActivityStore};

/// Relation name of the polymorphic subject.
pub const LOGGEABLE: &str = "loggeable";

/// Relation name of the responsible principal.
pub const RESPONSIBLE: &str = "responsible";

/// The value of a named relation on an activity record.
#[derive(Debug, Clone, PartialEq)]
pub enum Relation {
    /// The audited entity reference, absent for standalone records.
    Subject(Option<SubjectRef>),
    /// The responsible principal, absent when nobody was authenticated.
    Responsible(Option<PrincipalId>),
    /// A registry-bound context; `None` when the record has no such row.
    Context(Option<ContextRecord>),
}

/// Resolve relation `name` on `record`.
///
/// Static relations win over registry bindings of the same name.
pub fn resolve(
    store: &dyn ActivityStore,
    registry: &ContextRegistry,
    record: &ActivityRecord,
    name: &str,
) -> ActivityResult<Option<Relation>> {
    match name {
        LOGGEABLE => Ok(Some(Relation::Subject(record.subject().cloned()))),
        RESPONSIBLE => Ok(Some(Relation::Responsible(record.principal_id()))),
        _ => match registry.resolve(name) {
            Some(context_type) => {
                let context = store.context(record.id(), context_type.kind)?;
                Ok(Some(Relation::Context(context)))
            }
            None => Ok(None),
        },
    }
}
