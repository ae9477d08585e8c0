//! Error types for the activity-log pipeline.
//!
//! All fallible operations return `ActivityResult<T>`. Configuration errors
//! are raised at the point of use; storage errors are propagated verbatim and
//! never retried by the core.

use thiserror::Error;

/// The unified error type for the activity-log core.
#[derive(Debug, Error)]
pub enum ActivityError {
    /// A context name or kind was referenced that no registry entry declares.
    #[error("context '{name}' is not registered")]
    UnknownContext { name: String },

    /// A subject was supplied whose type was never registered for auditing.
    #[error("subject type '{subject_type}' has no registered polymorphic mapping")]
    UnregisteredSubject { subject_type: String },

    /// A context row was decoded as a different context type than it holds.
    #[error("context type mismatch: expected '{expected}', found '{found}'")]
    ContextMismatch { expected: String, found: String },

    /// A context payload does not fit its declared shape.
    #[error("invalid context payload: {reason}")]
    InvalidContext { reason: String },

    /// The backing store could not read or persist a row.
    #[error("storage failure: {reason}")]
    StorageFailed { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },
}

impl ActivityError {
    /// Shorthand for a `StorageFailed` error.
    pub fn storage(reason: impl Into<String>) -> Self {
        Self::StorageFailed { reason: reason.into() }
    }

    /// True for errors caused by missing or inconsistent configuration.
    ///
    /// These are raised immediately at the call site and are never worth
    /// retrying.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownContext { .. } | Self::UnregisteredSubject { .. } | Self::ConfigError { .. }
        )
    }

    pub fn is_storage_failure(&self) -> bool {
        matches!(self, Self::StorageFailed { .. })
    }
}

impl From<serde_json::Error> for ActivityError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidContext { reason: err.to_string() }
    }
}

/// Convenience alias used throughout the activity-log crates.
pub type ActivityResult<T> = Result<T, ActivityError>;
