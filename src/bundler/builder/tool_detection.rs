//! External tool detection.
//!
//! Each lookup runs once per process; results are cached.

use std::{path::PathBuf, sync::LazyLock};

/// The package manager used for dependency resolution and installs.
pub static NPM: LazyLock<Option<PathBuf>> = LazyLock::new(|| find("npm"));

/// A globally installed freezing tool.
pub static PKG: LazyLock<Option<PathBuf>> = LazyLock::new(|| find("pkg"));

/// Package runner used to fetch the freezing tool when it is not installed.
pub static NPX: LazyLock<Option<PathBuf>> = LazyLock::new(|| find("npx"));

/// Node.js runtime on the host.
pub static NODE: LazyLock<Option<PathBuf>> = LazyLock::new(|| find("node"));

fn find(tool: &str) -> Option<PathBuf> {
    match which::which(tool) {
        Ok(path) => {
            log::debug!("Found {} at: {}", tool, path.display());
            Some(path)
        }
        Err(e) => {
            log::debug!("{} not found in PATH: {}", tool, e);
            None
        }
    }
}
