//! # actlog-core
//!
//! The event-interception and log-assembly pipeline of the activity-log core.
//!
//! This crate provides:
//! - The three seam traits (`Auditable`, `ActivityStore`, `PrincipalResolver`)
//! - The `ActivityLogger` that validates, resolves, and persists logs
//! - The `HookDispatcher` that maps lifecycle events onto the logger
//! - The diff builder and the typed context registry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use actlog_core::{ActivityLogger, ContextRegistry, FailurePolicy, HookDispatcher};
//!
//! let mut logger = ActivityLogger::new(Box::new(store), ContextRegistry::with_defaults())
//!     .with_resolver(|| session.current_user_id());
//! logger.track::<Article>();
//!
//! let hooks = HookDispatcher::new(logger, FailurePolicy::Propagate);
//! hooks.on_created(&article)?;
//! ```

pub mod diff;
pub mod dispatcher;
pub mod logger;
pub mod registry;
pub mod relation;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::{FailurePolicy, HookDispatcher};
pub use logger::{ActivityLogger, Responsible};
pub use registry::{ContextRegistry, ContextType, UPDATE_CONTEXT};
pub use relation::Relation;
pub use traits::{ActivityStore, Auditable, PrincipalResolver};
