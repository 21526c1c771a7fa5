//! Top-level error types for the `bootpack` CLI.
//!
//! Pipeline failures are [`crate::bundler::Error`]; this module wraps them together
//! with CLI argument problems so `main` has a single error type to report.

use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, BundlerError>;

/// Main error type surfaced by the CLI
#[derive(Error, Debug)]
pub enum BundlerError {
    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Packaging pipeline errors
    #[error("{0}")]
    Bundler(#[from] crate::bundler::Error),
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Conflicting arguments
    #[error("Conflicting arguments: {arguments:?}")]
    ConflictingArguments {
        /// Arguments that conflict
        arguments: Vec<String>,
    },
}

impl BundlerError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        use crate::bundler::Error;

        match self {
            Self::Bundler(Error::Config(_)) => vec![
                "Check that the package path points at a directory with a package.json".into(),
                "Use --sources and --main to select the files to package explicitly".into(),
            ],
            Self::Bundler(Error::DependencyResolution { .. }) => vec![
                "Run `npm install` in the package directory and fix any reported problems".into(),
                "Use --dep-override to skip automatic dependency resolution".into(),
            ],
            Self::Bundler(Error::RuntimeNotFound(_)) => vec![
                "Install Node.js and make sure `node` is on PATH".into(),
                "Or pass the runtime explicitly with --node <path>".into(),
            ],
            Self::Bundler(Error::CommandFailed { .. } | Error::ExternalTool { .. }) => vec![
                "Re-run with --debug to see the full tool output".into(),
                "External tools are not retried; re-run the command once the problem is fixed"
                    .into(),
            ],
            Self::Bundler(Error::Fs { .. }) => vec![
                "Check permissions and free space for the staging and output directories".into(),
                "Re-run with --clean to start from an empty staging directory".into(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}
