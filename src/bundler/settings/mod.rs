//! Configuration structures for packaging runs.
//!
//! [`SettingsBuilder`] turns a package reference plus command-line overrides
//! into an immutable [`Settings`] record consumed by every pipeline stage.

mod builder;
mod core;
pub mod paths;
mod target;

pub use self::core::{
    DEPENDENCIES_STAGING_DIR, LOADER_STAGING_DIR, NODE_MODULES_DIR, SOURCES_STAGING_DIR,
    Settings,
};
pub use builder::{DEFAULT_STAGING_DIR, SettingsBuilder};
pub use target::{DEFAULT_TARGET, Platform, Target};
