//! Error types for Tether

use std::fmt;
use std::path::PathBuf;

/// Result type alias using [`Error`]
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Main error type for Tether
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Registration-time error, fatal to the registration call
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    /// Dispatch-time error, recoverable through the invalid-target callback
    #[error("Request error: {0}")]
    Request(#[from] RequestError),

    /// Error raised by an invoked method or one of its hooks
    #[error("Handler error: {0}")]
    Handler(#[source] anyhow::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while registering plugins and callables
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    /// Directory does not exist, is not a directory, or cannot be read
    #[error("Invalid directory '{}': {reason}", path.display())]
    InvalidDirectory {
        /// Offending path
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },

    /// Options that cannot be interpreted
    #[error("Malformed options for '{name}': {reason}")]
    MalformedOptions {
        /// Declaration the options belong to
        name: String,
        /// What is wrong with them
        reason: String,
    },

    /// Plugin exposes none of the recognized capabilities
    #[error("Unrecognized plugin '{0}': it implements no known capability")]
    UnrecognizedPlugin(String),

    /// Declaration conflicting with an earlier one
    #[error("Incompatible declaration for '{name}': {reason}")]
    IncompatibleDeclaration {
        /// Declared name
        name: String,
        /// Nature of the conflict
        reason: String,
    },

    /// No declaring scope matches a callable name
    #[error("Unknown callable '{0}'")]
    UnknownCallable(String),

    /// No registry provider accepts a registration kind
    #[error("No registry provider accepts {0} registrations")]
    NoProvider(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors raised while dispatching an inbound call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RequestError {
    /// Unknown class, method or function, or a name that is not exported
    #[error("Invalid target: {0}")]
    InvalidTarget(String),

    /// Call descriptor with unusable fields
    #[error("Malformed call: {0}")]
    MalformedCall(String),
}

impl Error {
    /// Wrap an application error raised by a method or hook
    pub fn handler(err: impl Into<anyhow::Error>) -> Self {
        Error::Handler(err.into())
    }

    /// Check if this is a registration-time error
    pub fn is_setup(&self) -> bool {
        matches!(self, Error::Setup(_))
    }

    /// Check if this is a dispatch-time error
    pub fn is_request(&self) -> bool {
        matches!(self, Error::Request(_))
    }
}

impl SetupError {
    /// Create an invalid directory error
    pub fn invalid_directory(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        SetupError::InvalidDirectory {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a malformed options error
    pub fn malformed(name: impl Into<String>, reason: impl fmt::Display) -> Self {
        SetupError::MalformedOptions {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an incompatible declaration error
    pub fn incompatible(name: impl Into<String>, reason: impl fmt::Display) -> Self {
        SetupError::IncompatibleDeclaration {
            name: name.into(),
            reason: reason.to_string(),
        }
    }
}

impl RequestError {
    /// Create an invalid target error
    pub fn invalid_target(msg: impl fmt::Display) -> Self {
        RequestError::InvalidTarget(msg.to_string())
    }

    /// Create a malformed call error
    pub fn malformed(msg: impl fmt::Display) -> Self {
        RequestError::MalformedCall(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_display() {
        let err = Error::from(SetupError::UnknownCallable("Sample".to_string()));
        assert!(err.is_setup());
        assert_eq!(err.to_string(), "Setup error: Unknown callable 'Sample'");

        let err = SetupError::invalid_directory("/nope", "not found");
        assert!(err.to_string().contains("/nope"));
    }

    #[test]
    fn test_request_error() {
        let err: Error = RequestError::invalid_target("Sample.missing").into();
        assert!(err.is_request());
        assert!(err.to_string().contains("Sample.missing"));
    }

    #[test]
    fn test_handler_error_keeps_source() {
        let err = Error::handler(anyhow::anyhow!("boom"));
        assert!(matches!(err, Error::Handler(_)));
        assert_eq!(err.to_string(), "Handler error: boom");
    }
}
