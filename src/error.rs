//! Error types for the clouds stack manager.
//!
//! Every layer owns its own error enum: templates, local stacks, the remote
//! service boundary, the remote stack model and the change-set engine. They
//! all fold into [`CloudsError`] so commands can use `?` across layers.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the clouds stack manager.
#[derive(Debug, Error)]
pub enum CloudsError {
    /// Template format and serialization errors.
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    /// Local stack (on-disk) errors.
    #[error("Local stack error: {0}")]
    LocalStack(#[from] LocalStackError),

    /// Remote stack model errors.
    #[error("Remote stack error: {0}")]
    RemoteStack(#[from] RemoteStackError),

    /// Change-set engine errors.
    #[error("Change set error: {0}")]
    ChangeSet(#[from] ChangeSetError),

    /// Errors reported by the remote service, carried verbatim.
    #[error("{0}")]
    Service(#[from] ServiceError),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A command precondition was not met.
    #[error("{0}")]
    CommandFailed(String),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Template format and serialization errors.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// The text parses neither as JSON nor as YAML.
    #[error("Unable to determine template format: {reason}")]
    UndetectableFormat {
        /// Parser message of the last attempted format.
        reason: String,
    },

    /// The text does not parse in the format it was tagged with.
    #[error("Template is not valid {format}: {reason}")]
    FormatMismatch {
        /// The format the template claimed to be.
        format: String,
        /// Parser message.
        reason: String,
    },

    /// Unknown format name or file extension.
    #[error("Invalid template format: {0}")]
    InvalidFormat(String),

    /// The document could not be rendered.
    #[error("Failed to serialize template as {format}: {reason}")]
    Serialize {
        /// Target format.
        format: String,
        /// Serializer message.
        reason: String,
    },

    /// The document cannot be expressed in the requested format.
    #[error("Cannot convert template to {format}: {reason}")]
    Conversion {
        /// Target format.
        format: String,
        /// Conversion failure.
        reason: String,
    },
}

/// Errors of the on-disk stack representation.
#[derive(Debug, Error)]
pub enum LocalStackError {
    /// No directory exists for the stack.
    #[error("No such local stack: {name} ({path})")]
    NotFound {
        /// Stack name.
        name: String,
        /// Expected stack directory.
        path: PathBuf,
    },

    /// The stack directory has no template file.
    #[error("Local stack {name} has no template file")]
    MissingTemplate {
        /// Stack name.
        name: String,
    },

    /// The template file exists but does not parse.
    #[error("Failed parsing template file {path}: {reason}")]
    InvalidTemplate {
        /// Template file path.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// The parameters file exists but is not a flat scalar mapping.
    #[error("Failed parsing parameters file {path}: {reason}")]
    InvalidParameters {
        /// Parameters file path.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// The destination stack exists and overwriting was not forced.
    #[error("Local stack {name} already exists, use --force to overwrite")]
    AlreadyExists {
        /// Stack name.
        name: String,
    },

    /// Filesystem failure on a stack file.
    #[error("Failed to access {path}: {source}")]
    Io {
        /// Path being accessed.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },
}

/// A failure reported by the remote infrastructure service.
///
/// The message is the service's own text and is never rewritten.
#[derive(Debug, Clone, Error)]
#[error("{operation} failed: {message}")]
pub struct ServiceError {
    /// API operation that failed.
    pub operation: String,
    /// Service error code, when one was returned.
    pub code: Option<String>,
    /// Service error message.
    pub message: String,
}

/// Remote stack model errors.
#[derive(Debug, Error)]
pub enum RemoteStackError {
    /// The stack does not exist remotely.
    #[error("Stack {name} does not exist")]
    StackNotFound {
        /// Stack name.
        name: String,
    },

    /// An operation required a loaded snapshot.
    #[error("Stack {name} has not been loaded")]
    NotLoaded {
        /// Stack name.
        name: String,
    },

    /// Fetching events failed, typically because the stack is gone.
    #[error("Cannot fetch events for stack {name}: {source}")]
    EventsUnavailable {
        /// Stack name.
        name: String,
        /// Underlying service error.
        source: ServiceError,
    },
}

/// Change-set engine errors.
#[derive(Debug, Error)]
pub enum ChangeSetError {
    /// A change set with this name is already known for the stack.
    #[error("Change set {name} already exists for stack {stack}")]
    AlreadyExists {
        /// Stack name.
        stack: String,
        /// Change-set name.
        name: String,
    },

    /// No change set with this name is known for the stack.
    #[error("Change set {name} does not exist for stack {stack}")]
    NotFound {
        /// Stack name.
        stack: String,
        /// Change-set name.
        name: String,
    },

    /// The owning stack must be loaded (or known to be absent) first.
    #[error("Stack {stack} must be loaded before managing change sets")]
    StackNotLoaded {
        /// Stack name.
        stack: String,
    },

    /// The operation is not valid in the change set's current state.
    #[error("Cannot {operation} change set {name} in state {state}")]
    InvalidTransition {
        /// Change-set name.
        name: String,
        /// Current state.
        state: String,
        /// Rejected operation.
        operation: String,
    },

    /// Creation did not reach a terminal status in time.
    #[error("Change set {name} did not finish creating after {attempts} checks")]
    CreateTimeout {
        /// Change-set name.
        name: String,
        /// Number of status checks made.
        attempts: u32,
    },

    /// The service rejected the change set.
    #[error("Change set {name} failed: {reason}")]
    CreateFailed {
        /// Change-set name.
        name: String,
        /// Status reason reported by the service.
        reason: String,
    },
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The .env file exists but could not be loaded.
    #[error("Failed to load environment file {path}: {message}")]
    DotEnv {
        /// Path of the .env file.
        path: PathBuf,
        /// Loader message.
        message: String,
    },

    /// The stacks root exists but is not a directory.
    #[error("Stacks root is not a directory: {path}")]
    InvalidStacksRoot {
        /// Configured stacks root.
        path: PathBuf,
    },
}

/// Result type alias for clouds operations.
pub type Result<T> = std::result::Result<T, CloudsError>;

/// Result type alias for calls across the remote service boundary.
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Service message returned when an update would not change anything.
const NO_UPDATES_MESSAGE: &str = "No updates are to be performed";

impl CloudsError {
    /// Creates a command precondition failure.
    #[must_use]
    pub fn command(message: impl Into<String>) -> Self {
        Self::CommandFailed(message.into())
    }
}

impl ServiceError {
    /// Creates a service error for an operation.
    #[must_use]
    pub fn new(operation: impl Into<String>, code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            code,
            message: message.into(),
        }
    }

    /// Returns true if the service refused an update because nothing changed.
    #[must_use]
    pub fn is_no_updates(&self) -> bool {
        self.message.contains(NO_UPDATES_MESSAGE)
    }

    /// Returns true if the service reported the stack as missing.
    #[must_use]
    pub fn is_stack_missing(&self) -> bool {
        self.message.contains("does not exist")
    }
}

impl TemplateError {
    /// Creates a format mismatch error.
    #[must_use]
    pub fn mismatch(format: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        Self::FormatMismatch {
            format: format.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl LocalStackError {
    /// Wraps an IO error with the path it occurred on.
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
