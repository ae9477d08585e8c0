//! Typed registry of context kinds and the relation names bound to them.
//!
//! Context types are registered in code (`register::<C>()`), which fixes
//! their kind, table, and columns. Relation names are bound to kinds at
//! startup, usually from configuration, so a deployment can expose a new
//! context relation without touching the activity record type.

use std::collections::BTreeMap;

use actlog_contracts::{
    context::{table_name, LogContext, UpdateContext},
    error::{ActivityError, ActivityResult},
};

/// Relation name the update context is bound to by default.
pub const UPDATE_CONTEXT: &str = "update_context";

/// Static description of a registered context kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextType {
    pub kind: &'static str,
    pub columns: &'static [&'static str],
}

impl ContextType {
    pub fn of<C: LogContext>() -> Self {
        Self { kind: C::KIND, columns: C::COLUMNS }
    }

    pub fn table(&self) -> String {
        table_name(self.kind)
    }
}

/// Registered context kinds plus relation-name bindings.
#[derive(Debug, Clone, Default)]
pub struct ContextRegistry {
    types: BTreeMap<&'static str, ContextType>,
    bindings: BTreeMap<String, &'static str>,
}

impl ContextRegistry {
    /// An empty registry with no context kinds at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in registry: `UpdateContext` bound as `"update_context"`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register::<UpdateContext>();
        registry
            .bindings
            .insert(UPDATE_CONTEXT.to_string(), UpdateContext::KIND);
        registry
    }

    /// Register the context type `C`. Re-registering a kind is a no-op.
    pub fn register<C: LogContext>(&mut self) -> &mut Self {
        self.types.insert(C::KIND, ContextType::of::<C>());
        self
    }

    /// Bind relation `name` to the registered kind `kind`.
    ///
    /// Returns `UnknownContext` if `kind` was never registered. Binding an
    /// existing name replaces the previous binding.
    pub fn bind(&mut self, name: impl Into<String>, kind: &str) -> ActivityResult<&mut Self> {
        let context_type = self
            .types
            .get(kind)
            .ok_or_else(|| ActivityError::UnknownContext { name: kind.to_string() })?;
        self.bindings.insert(name.into(), context_type.kind);
        Ok(self)
    }

    /// Drop every relation binding, keeping the registered kinds.
    pub fn clear_bindings(&mut self) {
        self.bindings.clear();
    }

    /// Resolve a relation name to its context type.
    pub fn resolve(&self, name: &str) -> Option<&ContextType> {
        self.bindings.get(name).and_then(|kind| self.types.get(kind))
    }

    /// Look up a registered kind directly.
    pub fn context_type(&self, kind: &str) -> Option<&ContextType> {
        self.types.get(kind)
    }

    pub fn types(&self) -> impl Iterator<Item = &ContextType> {
        self.types.values()
    }

    /// `(relation name, context type)` pairs in name order.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &ContextType)> {
        self.bindings
            .iter()
            .filter_map(|(name, kind)| self.types.get(kind).map(|t| (name.as_str(), t)))
    }
}
