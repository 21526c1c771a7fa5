//! Packages a Node.js application into a single self-unpacking executable.
//!
//! The [`bundler`] module holds the packaging pipeline: configuration,
//! dependency resolution, staging, archiving and freezing. The [`bootstrap`]
//! module is the runtime side, unpacking a payload once per build and
//! launching the application.
//!
//! It can be used both as a CLI tool and as a library dependency.

pub mod bootstrap;
pub mod bundler;
pub mod cli;
pub mod error;
pub mod metadata;

// Re-export commonly used types
pub use error::{BundlerError, CliError, Result};
