//! Error types for the Mindshift session engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the whole session engine.
///
/// Remote failures (transport, authority-reported, undo rejection) are
/// recoverable: the orchestrator reports them through the turn log and keeps
/// the session alive. Registry construction errors are the only ones meant to
/// abort startup.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShiftError {
    /// The remote session authority could not be reached or answered non-2xx.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The authority answered `success: false`.
    #[error("Authority error: {0}")]
    Authority(String),

    /// The authority rejected a rollback request.
    #[error("Undo rejected: {0}")]
    UndoRejected(String),

    /// A request is already in flight for this session.
    #[error("Session is busy with another request")]
    Busy,

    /// The session reached a terminal step and accepts no further mutation.
    #[error("Session '{0}' is complete")]
    SessionComplete(String),

    /// An operation requires a started session.
    #[error("Session '{0}' has not been started")]
    NotStarted(String),

    /// `start`/`resume` was called on a session that already has a step.
    #[error("Session '{0}' is already started")]
    AlreadyStarted(String),

    /// Two sub-flows registered the same step identifier.
    #[error("Step '{step_id}' is claimed by both {first} and {second}")]
    DuplicateStep {
        step_id: String,
        first: String,
        second: String,
    },

    /// Any other step registry construction failure.
    #[error("Registry error: {0}")]
    Registry(String),

    /// User input failed a guardrail check.
    #[error("Guardrail violation: {0}")]
    Guardrail(String),

    /// The caller exceeded the request budget for its window.
    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShiftError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates an Authority error
    pub fn authority(message: impl Into<String>) -> Self {
        Self::Authority(message.into())
    }

    /// Creates a Guardrail error
    pub fn guardrail(message: impl Into<String>) -> Self {
        Self::Guardrail(message.into())
    }

    /// Creates a Registry error
    pub fn registry(message: impl Into<String>) -> Self {
        Self::Registry(message.into())
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// True for failures that came back from (or on the way to) the authority.
    ///
    /// These never terminate a session; the user may retry the same input.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Authority(_) | Self::UndoRejected(_)
        )
    }

    /// Check if this is a busy rejection
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy)
    }

    /// Check if this is a guardrail violation
    pub fn is_guardrail(&self) -> bool {
        matches!(self, Self::Guardrail(_))
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ShiftError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ShiftError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ShiftError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ShiftError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (used at collaborator boundaries)
impl From<anyhow::Error> for ShiftError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, ShiftError>`.
pub type Result<T> = std::result::Result<T, ShiftError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_errors_are_recoverable() {
        assert!(ShiftError::transport("connection refused").is_remote());
        assert!(ShiftError::authority("unknown session").is_remote());
        assert!(ShiftError::UndoRejected("stale".into()).is_remote());
        assert!(!ShiftError::Busy.is_remote());
        assert!(!ShiftError::guardrail("empty").is_remote());
    }

    #[test]
    fn test_duplicate_step_message_names_both_owners() {
        let err = ShiftError::DuplicateStep {
            step_id: "digging_deeper_start".into(),
            first: "shared/digging_deeper".into(),
            second: "problem_shifting/digging_deeper".into(),
        };
        let message = err.to_string();
        assert!(message.contains("digging_deeper_start"));
        assert!(message.contains("shared/digging_deeper"));
        assert!(message.contains("problem_shifting/digging_deeper"));
    }

    #[test]
    fn test_json_error_converts_to_serialization() {
        let err: ShiftError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, ShiftError::Serialization { ref format, .. } if format == "JSON"));
    }
}
