//! Structured errors for the orchestration layer.

use std::fmt;

/// Categories of runtime errors for consistent handling at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// Missing or invalid configuration (thread id, workspace path, credentials).
    Configuration,
    /// A resource failed to open or initialize (e.g. checkpointer storage).
    ResourceInit,
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeErrorKind::Configuration => write!(f, "configuration"),
            RuntimeErrorKind::ResourceInit => write!(f, "resource_init"),
        }
    }
}

/// Error surfaced by model resolution, the checkpointer registry, and agent
/// assembly. Never retried and never recovered locally; callers see the
/// failure at the point of detection.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    /// Error category.
    pub kind: RuntimeErrorKind,
    /// One-line summary suitable for display. Never contains secret values.
    pub message: String,
    /// Optional additional details (e.g. underlying IO error text).
    pub details: Option<String>,
}

impl RuntimeError {
    /// Creates a new runtime error.
    pub fn new(kind: RuntimeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(RuntimeErrorKind::Configuration, message)
    }

    /// Creates a resource initialization error wrapping an underlying cause.
    pub fn resource_init(message: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self {
            kind: RuntimeErrorKind::ResourceInit,
            message: message.into(),
            details: Some(cause.to_string()),
        }
    }

    /// Returns true when this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        self.kind == RuntimeErrorKind::Configuration
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// Result type for orchestration operations.
pub type RuntimeResult<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_display() {
        let err = RuntimeError::configuration("thread id required");
        assert_eq!(err.to_string(), "thread id required");
        assert!(err.is_configuration());
        assert!(err.details.is_none());
    }

    #[test]
    fn test_resource_init_error_carries_cause() {
        let err = RuntimeError::resource_init(
            "failed to open checkpoint store for thread t1",
            "permission denied",
        );
        assert_eq!(err.kind, RuntimeErrorKind::ResourceInit);
        assert_eq!(err.details.as_deref(), Some("permission denied"));
        assert!(!err.is_configuration());
    }
}
