//! Error types for undosh
//!
//! This module defines every error a shell command can produce. The variants
//! follow the classic file-operation taxonomy (not found, is a directory,
//! permission denied, ...) so that a failed command can be reported to the
//! interactive session with a precise, human-readable message.
//!
//! "Nothing to undo" and a declined confirmation are *not* errors; they are
//! reported through [`crate::command::Outcome::NothingDone`].

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Type alias for Results in undosh
pub type Result<T> = std::result::Result<T, ShellError>;

/// Main error type for all shell operations
#[derive(Debug, Error)]
pub enum ShellError {
    /// A required path does not exist
    #[error("No such file or directory: {path:?}")]
    NotFound {
        /// Path that was looked up
        path: PathBuf,
    },

    /// A directory was required but something else was found
    #[error("Not a directory: {path:?}")]
    NotADirectory {
        /// Offending path
        path: PathBuf,
    },

    /// A file was required but a directory was found
    #[error("Is a directory: {path:?}")]
    IsADirectory {
        /// Offending path
        path: PathBuf,
    },

    /// OS-level permission failure or a safety check rejection
    #[error("Permission denied: {path:?} ({reason})")]
    PermissionDenied {
        /// Path the operation was refused on
        path: PathBuf,
        /// Why it was refused
        reason: String,
    },

    /// Destination conflict the operation cannot resolve
    #[error("File exists: {path:?}")]
    FileExists {
        /// Conflicting destination
        path: PathBuf,
    },

    /// Malformed command arguments
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No command registered under this name
    #[error("Command not found: {0}")]
    CommandNotFound(String),

    /// The undo log contains a line that cannot be parsed
    #[error("Invalid undo log entry at line {line}: {reason}")]
    InvalidLog {
        /// 1-based line number in the log file
        line: usize,
        /// What is wrong with it
        reason: String,
    },

    /// I/O errors that do not map onto a more specific kind
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Errors reading or writing JSON configuration
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Walk directory error from walkdir crate
    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Zip archive could not be read or written
    #[error("Zip archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Line editor failure
    #[error("Readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    /// Generic error for unexpected conditions
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShellError {
    /// Create a not-found error for a path
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        ShellError::NotFound { path: path.into() }
    }

    /// Create a permission error with the reason it was refused
    pub fn permission_denied(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ShellError::PermissionDenied {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid-argument error with a custom message
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        ShellError::InvalidArgument(msg.into())
    }

    /// Create an internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        ShellError::Internal(msg.into())
    }

    /// Map an OS error onto the shell taxonomy, attaching the path involved.
    ///
    /// Kinds without a dedicated variant are kept as [`ShellError::Io`].
    pub fn from_io(err: io::Error, path: &Path) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ShellError::not_found(path),
            io::ErrorKind::PermissionDenied => {
                ShellError::permission_denied(path, "no permission")
            }
            io::ErrorKind::AlreadyExists => ShellError::FileExists {
                path: path.to_path_buf(),
            },
            _ => ShellError::Io(err),
        }
    }

    /// Check if this error was raised by a safety check or the OS refusing access
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ShellError::PermissionDenied { .. })
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            ShellError::CommandNotFound(name) => {
                format!("{}: command not found. Type 'help' to list commands.", name)
            }
            ShellError::IsADirectory { path } => {
                format!("{} is a directory. Use -r to operate recursively.", path.display())
            }
            ShellError::PermissionDenied { path, reason } => {
                format!("Permission denied for {}: {}", path.display(), reason)
            }
            ShellError::InvalidLog { line, .. } => {
                format!("{} The undo log may have been edited by hand (line {}).", self, line)
            }
            _ => self.to_string(),
        }
    }
}

/// Extension for attaching a path to raw I/O results
pub(crate) trait IoResultExt<T> {
    /// Convert an `io::Result` into a [`Result`] using [`ShellError::from_io`]
    fn at(self, path: &Path) -> Result<T>;
}

impl<T> IoResultExt<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T> {
        self.map_err(|err| ShellError::from_io(err, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ShellError::not_found("/tmp/missing");
        assert_eq!(err.to_string(), "No such file or directory: \"/tmp/missing\"");
    }

    #[test]
    fn test_from_io_maps_kinds() {
        let path = Path::new("/x");
        let err = ShellError::from_io(io::Error::new(io::ErrorKind::NotFound, "gone"), path);
        assert!(matches!(err, ShellError::NotFound { .. }));

        let err = ShellError::from_io(io::Error::new(io::ErrorKind::PermissionDenied, "no"), path);
        assert!(err.is_permission_denied());

        let err = ShellError::from_io(io::Error::new(io::ErrorKind::AlreadyExists, "dup"), path);
        assert!(matches!(err, ShellError::FileExists { .. }));

        let err = ShellError::from_io(io::Error::new(io::ErrorKind::Other, "boom"), path);
        assert!(matches!(err, ShellError::Io(_)));
    }

    #[test]
    fn test_user_message() {
        let err = ShellError::CommandNotFound("frobnicate".to_string());
        assert!(err.user_message().contains("help"));
    }
}
