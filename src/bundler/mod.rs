//! Packaging pipeline for Node.js applications.
//!
//! Turns a package directory into a single self-unpacking executable:
//!
//! 1. [`SettingsBuilder`] resolves the configuration ([`settings`])
//! 2. the production dependency set is resolved with npm ([`deps`])
//! 3. sources, runtime and dependencies are staged and pruned ([`staging`])
//! 4. payload archives and `metadata.json` are written ([`archive`])
//! 5. the bootstrap loader is staged ([`loader`]) and frozen ([`builder`])
//!
//! [`Packager`] runs the stages in order.

pub mod archive;
pub mod builder;
pub mod deps;
pub mod error;
pub mod loader;
pub mod settings;
pub mod staging;
pub mod utils;

pub use builder::{Freezer, PackReport, Packager, PkgFreezer};
pub use deps::{DependencyAmendments, DependencyManifest, Npm, PackageManager};
pub use error::{Context, Error, ErrorExt, Result};
pub use settings::{Platform, Settings, SettingsBuilder, Target};
