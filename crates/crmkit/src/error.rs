//! Error types for primitive reconciliation.
//!
//! Errors are categorized so callers can tell a refused operation (the
//! cluster is in a state where the request would be unsafe) from a broken
//! definition or a failed cluster command.

use thiserror::Error;

/// Categories of reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The CIB returned text that is not a well-formed definition
    Parse,
    /// The declared resource cannot be rendered into a command
    InvalidInput,
    /// The request conflicts with the live configuration
    Conflict,
    /// The request was refused to protect a running or missing resource
    Refused,
    /// A cluster command ran and failed
    Command,
    /// The cluster tooling could not be reached at all
    Transport,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Parse => "Malformed CIB definition",
            Self::InvalidInput => "Invalid resource declaration",
            Self::Conflict => "Conflicts with live configuration",
            Self::Refused => "Operation refused",
            Self::Command => "Cluster command failed",
            Self::Transport => "Cluster tooling unavailable",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Parse => "Inspect the object with `crm configure show <name>`",
            Self::InvalidInput => "Fix the declaration; quotes, backslashes and control characters cannot be embedded",
            Self::Conflict => "Delete and recreate the resource explicitly, or rename the declaration",
            Self::Refused => "Bring the resource into the required state first (stop before delete, create before start)",
            Self::Command => "Check the diagnostic output and re-run; already applied commands are not repeated",
            Self::Transport => "Make sure crm and crm_resource are installed and on PATH",
        }
    }
}

/// Errors that can occur while reconciling a primitive.
#[derive(Debug, Error)]
pub enum Error {
    /// The CIB definition could not be parsed
    #[error("cannot parse definition of '{name}': {message}")]
    Parse {
        /// Name of the queried object
        name: String,
        /// What was wrong with the text
        message: String,
    },

    /// A same-named object exists but is not a primitive
    #[error("object '{name}' exists but is a {kind}, not a primitive")]
    NotPrimitive {
        /// Name of the queried object
        name: String,
        /// Leading keyword of the definition (group, clone, ms, ...)
        kind: String,
    },

    /// Declared agent differs from the live agent
    #[error("existing primitive '{name}' has agent '{current}' but '{desired}' was declared")]
    AgentMismatch {
        /// Primitive name
        name: String,
        /// Agent found in the CIB
        current: String,
        /// Agent requested by the declaration
        desired: String,
    },

    /// Delete was requested for a running resource
    #[error("cannot delete running primitive '{name}'")]
    ResourceBusy {
        /// Primitive name
        name: String,
    },

    /// Start or stop was requested for a resource that does not exist
    #[error("cannot {action} non-existent primitive '{name}'")]
    NotFound {
        /// Primitive name
        name: String,
        /// Requested lifecycle action
        action: String,
    },

    /// A key or value cannot be embedded safely in a command
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue {
        /// Attribute key (or the key itself when the key is invalid)
        key: String,
        /// Why the text was rejected
        reason: String,
    },

    /// Name or agent of a declaration is unusable
    #[error("invalid primitive declaration: {0}")]
    InvalidSpec(String),

    /// A cluster command reported failure
    #[error("command failed: {command}: {diagnostic}")]
    ExternalCommand {
        /// The command text that was applied
        command: String,
        /// Diagnostic output from the cluster tool
        diagnostic: String,
    },

    /// IO error while talking to the cluster tooling
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Parse { .. } => ErrorCategory::Parse,
            Error::InvalidValue { .. } | Error::InvalidSpec(_) => ErrorCategory::InvalidInput,
            Error::NotPrimitive { .. } | Error::AgentMismatch { .. } => ErrorCategory::Conflict,
            Error::ResourceBusy { .. } | Error::NotFound { .. } => ErrorCategory::Refused,
            Error::ExternalCommand { .. } => ErrorCategory::Command,
            Error::Io(_) => ErrorCategory::Transport,
        }
    }

    /// Whether this error is a safety guard refusing the request.
    pub fn is_refusal(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Refused | ErrorCategory::Conflict
        )
    }

    pub(crate) fn parse(name: &str, message: impl Into<String>) -> Self {
        Error::Parse {
            name: name.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_value(key: &str, reason: impl Into<String>) -> Self {
        Error::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;
