//! Error handling module for the eSim installer
//!
//! Provides the typed errors every pipeline step returns. How an error is
//! treated (abort, tolerate, skip the component) is decided by the step's
//! failure policy, not by the error itself; the one exception is
//! [`InstallerError::Usage`], which always stops the run.

use std::path::PathBuf;

use thiserror::Error;

use crate::install_state::InstallTransitionError;

/// Main error type for the eSim installer
#[derive(Error, Debug)]
pub enum InstallerError {
    /// IO errors (file operations, terminal, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad command line or bad answer to a binary prompt
    #[error("Usage error: {0}")]
    Usage(String),

    /// A bundled archive or installer bundle is not where it should be
    #[error("Missing bundled archive: {}", .0.display())]
    MissingArchive(PathBuf),

    /// An external command could not be launched at all
    #[error("Command failed to start: {label}: {source}")]
    Spawn {
        label: String,
        #[source]
        source: std::io::Error,
    },

    /// An external command ran and exited unsuccessfully
    #[error("Command failed (exit code {code}): {label}")]
    CommandFailed { label: String, code: i32 },

    /// Filesystem layout problems (unexpected archive contents, bad paths)
    #[error("Filesystem error: {0}")]
    Filesystem(String),

    /// Operator prompt could not be read
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Install stage state machine transition errors
    #[error("Install transition error: {0}")]
    Transition(#[from] InstallTransitionError),

    /// General errors (catch-all for edge cases)
    #[error("{0}")]
    General(String),
}

/// Result type alias for installer operations
pub type Result<T> = std::result::Result<T, InstallerError>;

impl InstallerError {
    /// Create a usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Create a missing-archive error
    pub fn missing_archive(path: impl Into<PathBuf>) -> Self {
        Self::MissingArchive(path.into())
    }

    /// Create a command failure from a label and exit code (-1 when killed by a signal)
    pub fn command_failed(label: impl Into<String>, code: Option<i32>) -> Self {
        Self::CommandFailed {
            label: label.into(),
            code: code.unwrap_or(-1),
        }
    }

    /// Create a filesystem error
    pub fn filesystem(msg: impl Into<String>) -> Self {
        Self::Filesystem(msg.into())
    }

    /// Create a prompt error
    pub fn prompt(msg: impl Into<String>) -> Self {
        Self::Prompt(msg.into())
    }

    /// Create a general error
    pub fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }

    /// Usage errors stop the run whatever the step's failure policy says.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    /// True when the program itself was not found (as opposed to failing).
    pub fn is_program_missing(&self) -> bool {
        matches!(
            self,
            Self::Spawn { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
