//! Error types for sccoc

use thiserror::Error;

/// sccoc error types
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration or malformed value
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Error message
        message: String,
    },

    /// Object lookup failed
    #[error("{kind} {name:?} not found")]
    NotFound {
        /// Object kind
        kind: &'static str,
        /// Object name
        name: String,
    },

    /// Object already exists
    #[error("{kind} {name:?} already exists")]
    AlreadyExists {
        /// Object kind
        kind: &'static str,
        /// Object name
        name: String,
    },

    /// Namespace allocation annotation missing or unusable
    #[error("unable to find annotation {annotation}: {message}")]
    Allocation {
        /// Annotation key
        annotation: String,
        /// Error message
        message: String,
    },

    /// Strategy could not be built from a constraint
    #[error("Invalid strategy: {message}")]
    Strategy {
        /// Error message
        message: String,
    },

    /// No constraint admitted the pod
    #[error("unable to validate against any security context constraint: {message}")]
    Forbidden {
        /// Collected validation failures
        message: String,
    },

    /// Container engine operation failed
    #[error("Container engine error: {message}")]
    Engine {
        /// Error message
        message: String,
    },

    /// Permission denied
    #[error("Permission denied: {operation}")]
    PermissionDenied {
        /// Operation that was denied
        operation: String,
    },

    /// System error from nix
    #[error("System error: {0}")]
    System(#[from] nix::Error),
}

impl Error {
    /// Shorthand for [`Error::InvalidConfig`]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Result type alias for sccoc operations
pub type Result<T> = std::result::Result<T, Error>;
