//! # actlog-config
//!
//! TOML configuration for the activity-log core.
//!
//! ## Overview
//!
//! [`ActivityConfig`] declares which relation names map to which context
//! kinds, whether the current principal is looked up, how hook failures are
//! handled, and which subject types are audited for which events. It then
//! assembles an [`ActivityLogger`](actlog_core::ActivityLogger) or a
//! [`HookDispatcher`](actlog_core::HookDispatcher) from those settings.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::path::Path;
//! use actlog_config::ActivityConfig;
//! use actlog_core::ContextRegistry;
//!
//! let config = ActivityConfig::from_file(Path::new("activity.toml"))?;
//! let registry = config.registry(ContextRegistry::with_defaults())?;
//! let hooks = config.build_dispatcher(Box::new(store), registry, Some(Box::new(resolver)))?;
//! ```

pub mod loader;
pub mod settings;

pub use settings::{ActivityConfig, SubjectConfig};

// ── Tests ─────────────────────────────────────────────────────────────────────
