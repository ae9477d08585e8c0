//! Loading a configuration and assembling the pipeline from it.
//!
//! Assembly order:
//!
//! 1. `registry` binds every `[contexts]` entry against the compiled-in
//!    context types. An entry naming an unregistered kind fails with
//!    `UnknownContext`.
//! 2. `build_logger` validates every `[subjects]` entry, then creates the
//!    logger, attaches the resolver unless `principal_lookup = false`, and
//!    tracks each subject type with its event set.
//! 3. `build_dispatcher` wraps the logger with the configured
//!    `FailurePolicy`.

use std::path::Path;

use tracing::{debug, warn};

use actlog_contracts::error::{ActivityError, ActivityResult};
use actlog_core::{
    traits::{ActivityStore, PrincipalResolver},
    ActivityLogger, ContextRegistry, HookDispatcher,
};

use crate::settings::ActivityConfig;

impl ActivityConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `ActivityError::ConfigError` if the TOML is malformed or does
    /// not match the `ActivityConfig` schema.
    pub fn from_toml_str(s: &str) -> ActivityResult<Self> {
        toml::from_str(s).map_err(|e| ActivityError::ConfigError {
            reason: format!("failed to parse activity config TOML: {}", e),
        })
    }

    /// Read the file at `path` and parse it as TOML.
    pub fn from_file(path: &Path) -> ActivityResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ActivityError::ConfigError {
            reason: format!("failed to read activity config '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// Apply `[contexts]` to `base`, which holds the compiled-in types.
    pub fn registry(&self, mut base: ContextRegistry) -> ActivityResult<ContextRegistry> {
        let Some(contexts) = &self.contexts else {
            return Ok(base);
        };

        base.clear_bindings();
        for (name, kind) in contexts {
            base.bind(name.as_str(), kind)?;
            debug!(relation = %name, kind = %kind, "context relation bound");
        }
        if contexts.is_empty() {
            warn!("[contexts] is empty; records will expose no context relations");
        }
        Ok(base)
    }

    /// Build an `ActivityLogger` over `store`.
    ///
    /// `resolver` is ignored when `principal_lookup` is false.
    pub fn build_logger(
        &self,
        store: Box<dyn ActivityStore>,
        registry: ContextRegistry,
        resolver: Option<Box<dyn PrincipalResolver>>,
    ) -> ActivityResult<ActivityLogger> {
        // Validate every subject before building anything.
        let subjects = self
            .subjects
            .iter()
            .map(|(name, subject)| {
                subject
                    .event_set()
                    .map(|events| (name.clone(), events))
                    .map_err(|e| match e {
                        ActivityError::ConfigError { reason } => ActivityError::ConfigError {
                            reason: format!("subject '{}': {}", name, reason),
                        },
                        other => other,
                    })
            })
            .collect::<ActivityResult<Vec<_>>>()?;

        let mut logger = ActivityLogger::new(store, registry);

        if self.principal_lookup {
            logger.set_resolver(resolver);
        } else if resolver.is_some() {
            debug!("principal lookup disabled; resolver ignored");
        }

        for (name, events) in subjects {
            logger.track_subject(name, events);
        }

        Ok(logger)
    }

    /// Build a `HookDispatcher` with the configured failure policy.
    pub fn build_dispatcher(
        &self,
        store: Box<dyn ActivityStore>,
        registry: ContextRegistry,
        resolver: Option<Box<dyn PrincipalResolver>>,
    ) -> ActivityResult<HookDispatcher> {
        let logger = self.build_logger(store, registry, resolver)?;
        Ok(HookDispatcher::new(logger, self.failure_policy))
    }
}
