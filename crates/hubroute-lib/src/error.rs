use std::path::PathBuf;

use thiserror::Error;

/// Convenient result alias for the hubroute library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Raised when a request or configuration value is malformed.
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Raised when the optimiser cannot produce a result for a well-formed request.
    #[error("route computation failed: {message}")]
    Computation { message: String },

    /// Raised when the real-time service is created outside of a tokio runtime.
    #[error("no tokio runtime available; create the service from within a runtime or pass a handle")]
    RuntimeUnavailable,

    /// Raised when a configuration file cannot be parsed.
    #[error("failed to load configuration from {path}: {message}")]
    ConfigLoad { path: PathBuf, message: String },

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for JSON (de)serialisation errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub(crate) fn computation(message: impl Into<String>) -> Self {
        Error::Computation {
            message: message.into(),
        }
    }

    /// Whether the error was caused by caller input rather than an internal failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_names_field() {
        let err = Error::validation("origin.latitude", "must be within [-90, 90], got 91");
        assert_eq!(
            err.to_string(),
            "invalid origin.latitude: must be within [-90, 90], got 91"
        );
        assert!(err.is_validation());
    }

    #[test]
    fn computation_is_not_validation() {
        let err = Error::computation("hub required but none supplied");
        assert!(!err.is_validation());
        assert!(err.to_string().contains("hub required"));
    }
}
