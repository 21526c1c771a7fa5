//! Executable building and pipeline orchestration.
//!
//! - [`checksum`] - SHA256 checksum of the produced executable
//! - [`freezer`] - the [`Freezer`] seam and the `pkg` implementation
//! - [`orchestrator`] - the [`Packager`] running every stage
//! - [`tool_detection`] - lookup of external tools on `PATH`

pub mod checksum;
pub mod freezer;
mod orchestrator;
pub(crate) mod tool_detection;

pub use freezer::{FreezeRequest, Freezer, PkgFreezer};
pub use orchestrator::{PackReport, Packager};
