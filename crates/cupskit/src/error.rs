//! Error types for destination reconciliation.
//!
//! Errors are categorized so callers can distinguish a bad declaration
//! (fix the manifest) from a failing query or mutation (look at the CUPS
//! scheduler). Each variant carries the context needed to diagnose the
//! failure without re-running with more verbosity.

use thiserror::Error;

/// Categories of reconciliation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The declaration itself is structurally invalid for the requested
    /// operation; no commands were issued after detection.
    Validation,
    /// A read-only query reported an error stream; live state could not be
    /// observed safely.
    Query,
    /// A mutating command reported an error the engine does not continue
    /// past.
    Command,
    /// Tool output did not have the expected shape.
    Parse,
    /// The CUPS command-line tools are missing or could not be executed.
    Environment,
}

impl ErrorCategory {
    /// Whether this category means the caller's declaration needs fixing
    /// rather than the system.
    pub fn is_declaration(&self) -> bool {
        matches!(self, Self::Validation)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Validation => "Invalid destination declaration",
            Self::Query => "Could not read live destination state",
            Self::Command => "A CUPS command failed",
            Self::Parse => "Unexpected CUPS tool output",
            Self::Environment => "CUPS tools unavailable",
        }
    }
}

/// Errors that can occur while reconciling destinations.
#[derive(Debug, Error)]
pub enum Error {
    /// The CUPS command-line tools could not be found or executed.
    #[error("CUPS command-line tools not found; install cups-client and ensure lpstat is on PATH")]
    CupsUnavailable,

    /// A printer declaration with state `present` is missing its URI.
    #[error("a connection URI is required to install printer '{name}'")]
    MissingUri {
        /// Name of the declared printer
        name: String,
    },

    /// A class declaration with state `present` has no members.
    #[error("class '{name}' has no members; an empty class cannot be created")]
    EmptyClass {
        /// Name of the declared class
        name: String,
    },

    /// A declared class member does not exist as a printer.
    #[error("printer '{member}' does not exist and cannot be added to class '{class_name}'")]
    MissingMember {
        /// The missing member printer
        member: String,
        /// The class that declared it
        class_name: String,
    },

    /// A declared driver model is not present in the driver catalog.
    #[error("unable to determine make and model for driver '{model}'")]
    UnknownModel {
        /// The declared model name
        model: String,
    },

    /// The declaration is structurally invalid in some other way.
    #[error("invalid destination declaration: {message}")]
    InvalidSpec {
        /// What is wrong with the declaration
        message: String,
    },

    /// A read-only query reported an error stream.
    #[error("failed to query class '{name}': {stderr}")]
    QueryFailed {
        /// The destination being queried
        name: String,
        /// The tool's error output, trimmed
        stderr: String,
    },

    /// A mutating command reported an error the engine treats as fatal.
    #[error("`{command}` reported an error: {stderr}")]
    CommandFailed {
        /// The command line that was run
        command: String,
        /// The tool's error output, trimmed
        stderr: String,
    },

    /// Tool output could not be parsed.
    #[error("malformed tool output: {message}")]
    Parse {
        /// What was malformed and where
        message: String,
    },

    /// A command could not be spawned at all.
    #[error("failed to run {command}")]
    Spawn {
        /// The command that failed to start
        command: String,
        /// The underlying IO error
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Get the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::CupsUnavailable | Error::Spawn { .. } => ErrorCategory::Environment,
            Error::MissingUri { .. }
            | Error::EmptyClass { .. }
            | Error::MissingMember { .. }
            | Error::UnknownModel { .. }
            | Error::InvalidSpec { .. } => ErrorCategory::Validation,
            Error::QueryFailed { .. } => ErrorCategory::Query,
            Error::CommandFailed { .. } => ErrorCategory::Command,
            Error::Parse { .. } => ErrorCategory::Parse,
        }
    }

    /// Whether the caller's declaration needs fixing rather than the system.
    pub fn is_declaration(&self) -> bool {
        self.category().is_declaration()
    }

    /// Create an `InvalidSpec` error from anything printable.
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        Error::InvalidSpec {
            message: message.into(),
        }
    }
}

/// Result type for reconciliation operations.
pub type Result<T> = std::result::Result<T, Error>;
