/// Unified error handling for ruta
///
/// Selection and command construction errors are raised immediately and never
/// retried internally. Only `NoServerAvailable` reflects a condition that may
/// clear up on its own once the topology changes.

use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

pub use crate::config::ConfigError;

/// Main error type for ruta operations
#[derive(Debug, Error)]
pub enum RutaError {
    /// Disallowed mode / tag set / max staleness combination
    #[error("Invalid read preference: {message}")]
    InvalidReadPreference { message: String },

    /// Selection kept yielding an empty eligible set until the timeout elapsed
    #[error("No server available for read preference {read_preference} after {timeout:?}")]
    NoServerAvailable {
        read_preference: String,
        timeout: Duration,
    },

    /// A command intent is missing a required field or carries a malformed one
    #[error("Cannot build {command} command: {message}")]
    CommandConstruction { command: String, message: String },

    /// A topology snapshot violates its invariants
    #[error("Invalid topology: {message}")]
    InvalidTopology { message: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// File errors (topology and config files)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed topology or document input
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for ruta operations
pub type RutaResult<T> = Result<T, RutaError>;

/// Convenience methods for creating specific error types
impl RutaError {
    /// Create an invalid read preference error
    pub fn invalid_read_preference<S: Into<String>>(message: S) -> Self {
        RutaError::InvalidReadPreference {
            message: message.into(),
        }
    }

    /// Create a no-server-available error
    pub fn no_server_available<S: Into<String>>(read_preference: S, timeout: Duration) -> Self {
        RutaError::NoServerAvailable {
            read_preference: read_preference.into(),
            timeout,
        }
    }

    /// Create a command construction error
    pub fn command<C: Into<String>, S: Into<String>>(command: C, message: S) -> Self {
        RutaError::CommandConstruction {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a command construction error for an absent required field
    pub fn missing_field<C: Into<String>>(command: C, field: &str) -> Self {
        RutaError::CommandConstruction {
            command: command.into(),
            message: format!("missing required field '{}'", field),
        }
    }

    /// Create an invalid topology error
    pub fn invalid_topology<S: Into<String>>(message: S) -> Self {
        RutaError::InvalidTopology {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        RutaError::Serialization(message.into())
    }

    /// Check if this error is recoverable (waiting may help)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RutaError::NoServerAvailable { .. } | RutaError::Io(_))
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            RutaError::Config(_) => ErrorSeverity::Critical,
            RutaError::InvalidTopology { .. } => ErrorSeverity::Critical,
            RutaError::NoServerAvailable { .. } => ErrorSeverity::Warning,
            RutaError::Io(_) => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels for logging and monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical errors that require immediate attention
    Critical,
    /// Errors caused by the caller, e.g. a malformed intent
    Error,
    /// Warnings about potential issues
    Warning,
    /// Informational messages about recoverable issues
    Info,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Warning => write!(f, "WARNING"),
            ErrorSeverity::Info => write!(f, "INFO"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = RutaError::invalid_read_preference("primary cannot carry tag sets");
        assert!(matches!(error, RutaError::InvalidReadPreference { .. }));
        assert_eq!(
            error.to_string(),
            "Invalid read preference: primary cannot carry tag sets"
        );
    }

    #[test]
    fn test_missing_field_names_the_field() {
        let error = RutaError::missing_field("createIndexes", "key");
        assert_eq!(
            error.to_string(),
            "Cannot build createIndexes command: missing required field 'key'"
        );
    }

    #[test]
    fn test_error_severity() {
        let config_error = RutaError::Config(ConfigError::ValidationError("test".to_string()));
        assert_eq!(config_error.severity(), ErrorSeverity::Critical);

        let wait_error = RutaError::no_server_available("nearest", Duration::from_secs(30));
        assert_eq!(wait_error.severity(), ErrorSeverity::Warning);

        let command_error = RutaError::missing_field("insert", "documents");
        assert_eq!(command_error.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_error_recoverability() {
        let wait_error = RutaError::no_server_available("secondary", Duration::from_millis(10));
        assert!(wait_error.is_recoverable());

        let pref_error = RutaError::invalid_read_preference("bad");
        assert!(!pref_error.is_recoverable());

        let command_error = RutaError::command("delete", "empty deletes");
        assert!(!command_error.is_recoverable());
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(ErrorSeverity::Critical.to_string(), "CRITICAL");
        assert_eq!(ErrorSeverity::Info.to_string(), "INFO");
    }
}
