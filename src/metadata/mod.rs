//! Package descriptor (`package.json`) discovery and parsing.

use crate::bundler::{Error, ErrorExt, Result};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

/// File name of the package descriptor.
pub const PACKAGE_JSON: &str = "package.json";

/// The fields of `package.json` the packager cares about.
///
/// Everything else in the descriptor is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageJson {
    /// Package name
    #[serde(default)]
    pub name: Option<String>,

    /// Entry point, relative to the package root
    #[serde(default)]
    pub main: Option<String>,

    /// Production dependencies as declared (ranges, not resolved versions)
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

/// A located descriptor: where it is and what it says.
#[derive(Debug, Clone)]
pub struct PackageManifest {
    /// Directory containing the descriptor
    pub package_root: PathBuf,

    /// Full path of the descriptor file
    pub descriptor_path: PathBuf,

    /// Parsed content
    pub package: PackageJson,
}

/// Resolves a package reference to the descriptor path it names.
///
/// A reference ending in `.json` (any case) is the descriptor itself; anything
/// else is a package directory containing `package.json`.
pub fn descriptor_path(package_ref: &Path) -> PathBuf {
    let is_descriptor = package_ref
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_descriptor {
        package_ref.to_path_buf()
    } else {
        package_ref.join(PACKAGE_JSON)
    }
}

/// Locates and parses the descriptor referenced by `package_ref`.
///
/// Fails with [`Error::Config`] when the descriptor does not exist or is not
/// valid JSON.
pub fn load_manifest(package_ref: &Path) -> Result<PackageManifest> {
    let descriptor_path = descriptor_path(package_ref);
    if !descriptor_path.is_file() {
        return Err(Error::Config(format!(
            "package.json not found. Looking for: \"{}\"",
            descriptor_path.display()
        )));
    }

    let content =
        std::fs::read_to_string(&descriptor_path).fs_context("reading", &descriptor_path)?;
    let package: PackageJson = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "Failed to parse \"{}\": {}",
            descriptor_path.display(),
            e
        ))
    })?;

    let package_root = descriptor_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();

    log::debug!(
        "Loaded {} (name: {:?}, main: {:?})",
        descriptor_path.display(),
        package.name,
        package.main
    );

    Ok(PackageManifest {
        package_root,
        descriptor_path,
        package,
    })
}
