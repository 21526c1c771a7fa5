//! Error types for the packaging pipeline.
//!
//! Every stage returns [`Result`]. The variants map onto the failure classes a
//! packaging run can hit: bad configuration, dependency resolution, a missing
//! runtime, external tool failures and staging filesystem errors.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for packaging operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the packaging pipeline.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad or missing descriptor, no sources, ambiguous or misconfigured entry point.
    #[error("{0}")]
    Config(String),

    /// The dependency resolution tool failed.
    #[error("Error getting top-level dependencies: {source}")]
    DependencyResolution {
        /// Underlying failure
        #[source]
        source: Box<Error>,
    },

    /// No usable runtime executable could be located on the host.
    #[error("Unable to locate Node.js executable: {0}")]
    RuntimeNotFound(String),

    /// An external tool could not be spawned.
    #[error("Failed to execute `{command}`: {error}")]
    CommandFailed {
        /// Command that was being spawned
        command: String,
        /// Spawn error
        error: std::io::Error,
    },

    /// An external tool ran but reported failure.
    #[error("`{command}` failed with exit code {code:?}{}", format_stderr(.stderr))]
    ExternalTool {
        /// Command line that failed
        command: String,
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Captured standard error, may be empty
        stderr: String,
    },

    /// A staging filesystem operation failed.
    #[error("Failed {context} `{}`: {error}", .path.display())]
    Fs {
        /// What was being done
        context: &'static str,
        /// Path the operation targeted
        path: PathBuf,
        /// Underlying IO error
        error: std::io::Error,
    },

    /// IO errors without path context.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Directory traversal errors.
    #[error("Directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// Path is not below the expected base directory.
    #[error("Path error: {0}")]
    StripPrefix(#[from] std::path::StripPrefixError),

    /// Anything else.
    #[error("{0}")]
    GenericError(String),
}

fn format_stderr(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

impl Error {
    /// Wraps a failure of the dependency resolution tool.
    pub fn dependency_resolution(source: Error) -> Self {
        Self::DependencyResolution {
            source: Box::new(source),
        }
    }

    /// Short name of the failure class, used when reporting.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "ConfigError",
            Self::DependencyResolution { .. } => "DependencyResolutionError",
            Self::RuntimeNotFound(_) => "RuntimeNotFoundError",
            Self::CommandFailed { .. } | Self::ExternalTool { .. } => "ExternalToolError",
            Self::Fs { .. } | Self::IoError(_) | Self::WalkDir(_) | Self::StripPrefix(_) => {
                "StagingIOError"
            }
            Self::Json(_) | Self::GenericError(_) => "Error",
        }
    }
}

/// Attaches filesystem context to IO results.
pub trait ErrorExt<T> {
    /// Converts an IO error into [`Error::Fs`] naming the operation and path.
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T>;
}

impl<T> ErrorExt<T> for std::result::Result<T, std::io::Error> {
    fn fs_context(self, context: &'static str, path: impl AsRef<Path>) -> Result<T> {
        self.map_err(|error| Error::Fs {
            context,
            path: path.as_ref().to_path_buf(),
            error,
        })
    }
}

/// Converts `Option`s and foreign errors into [`Error::GenericError`] with a message.
pub trait Context<T> {
    /// Attaches a message to the failure.
    fn context<C: std::fmt::Display>(self, context: C) -> Result<T>;
}

impl<T> Context<T> for Option<T> {
    fn context<C: std::fmt::Display>(self, context: C) -> Result<T> {
        self.ok_or_else(|| Error::GenericError(context.to_string()))
    }
}

impl<T> Context<T> for Result<T> {
    fn context<C: std::fmt::Display>(self, context: C) -> Result<T> {
        self.map_err(|e| Error::GenericError(format!("{context}: {e}")))
    }
}

/// Returns early with an [`Error::GenericError`] built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::bundler::Error::GenericError(format!($($arg)*)))
    };
}

/// Returns early with an [`Error::Config`] built from a format string.
#[macro_export]
macro_rules! config_bail {
    ($($arg:tt)*) => {
        return Err($crate::bundler::Error::Config(format!($($arg)*)))
    };
}
