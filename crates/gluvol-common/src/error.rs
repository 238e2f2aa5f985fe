//! Common error types for the gluvol driver.

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`GluvolError`].
pub type GluvolResult<T> = Result<T, GluvolError>;

/// Coarse classification of a [`GluvolError`].
///
/// The protocol layer maps these onto its own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unknown volume, or a volume whose mount is missing.
    NotFound,
    /// Missing or malformed backend options.
    InvalidArgument,
    /// Target directory already in use.
    Conflict,
    /// Volume still attached.
    Busy,
    /// Filesystem or external command failure.
    Io,
    /// Snapshot read or write failure.
    Persistence,
    /// Broken internal invariant.
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::InvalidArgument => write!(f, "invalid_argument"),
            Self::Conflict => write!(f, "conflict"),
            Self::Busy => write!(f, "busy"),
            Self::Io => write!(f, "io"),
            Self::Persistence => write!(f, "persistence"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Errors returned by the volume driver.
#[derive(Error, Diagnostic, Debug)]
pub enum GluvolError {
    /// Volume not found.
    #[error("Volume not found: {name}")]
    #[diagnostic(code(gluvol::volume::not_found))]
    VolumeNotFound {
        /// The volume name that was not found.
        name: String,
    },

    /// The mount a volume is bound to does not exist.
    #[error("Mount not found: {key}")]
    #[diagnostic(
        code(gluvol::mount::not_found),
        help("The state file references a mount that is gone; remove and re-create the volume")
    )]
    MountNotFound {
        /// The mount key that was not found.
        key: String,
    },

    /// Missing or malformed options.
    #[error("Invalid argument: {message}")]
    #[diagnostic(
        code(gluvol::invalid_argument),
        help("Pass the remote volume as -o voluri=<server>[,<server>...]:<volume>")
    )]
    InvalidArgument {
        /// The error message.
        message: String,
    },

    /// Resource already exists in an incompatible form.
    #[error("Conflict: {message}")]
    #[diagnostic(code(gluvol::conflict))]
    Conflict {
        /// The error message.
        message: String,
    },

    /// Volume is still attached.
    #[error("Volume {name} is in use ({connections} active connections)")]
    #[diagnostic(
        code(gluvol::volume::busy),
        help("Unmount the volume from every consumer before removing it")
    )]
    Busy {
        /// The volume name.
        name: String,
        /// Current number of attachments.
        connections: u32,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(gluvol::io))]
    Io(#[from] std::io::Error),

    /// External command failed.
    #[error("Command `{command}` failed: {message}")]
    #[diagnostic(code(gluvol::command))]
    Command {
        /// The command line that was run.
        command: String,
        /// Exit status or captured output.
        message: String,
    },

    /// Snapshot could not be read or written.
    #[error("Persistence error: {message}")]
    #[diagnostic(
        code(gluvol::persistence),
        help("In-memory state is still valid; the state file is stale until the next successful save")
    )]
    Persistence {
        /// The error message.
        message: String,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    #[diagnostic(code(gluvol::serialization))]
    Serialization(String),

    /// Internal error (should not happen).
    #[error("Internal error: {message}")]
    #[diagnostic(
        code(gluvol::internal),
        help("This is a bug, please report it")
    )]
    Internal {
        /// The error message.
        message: String,
    },
}

impl GluvolError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::VolumeNotFound { .. } | Self::MountNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::Busy { .. } => ErrorKind::Busy,
            Self::Io(_) | Self::Command { .. } => ErrorKind::Io,
            Self::Persistence { .. } | Self::Serialization(_) => ErrorKind::Persistence,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Shorthand for [`GluvolError::InvalidArgument`].
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Shorthand for [`GluvolError::Persistence`].
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for GluvolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
