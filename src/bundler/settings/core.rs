//! Core Settings struct and implementations.

use super::{Target, paths};
use crate::bundler::{Result, deps::DependencyAmendments};
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

/// Staged application sources, relative to the staging root.
pub const SOURCES_STAGING_DIR: &str = "app_sources";

/// Isolated install unit for the application dependencies.
pub const DEPENDENCIES_STAGING_DIR: &str = "app_node_modules";

/// Loader unit: loader script, its dependencies and the payload archives.
pub const LOADER_STAGING_DIR: &str = "bootstrap";

/// Installed dependency tree inside an install unit.
pub const NODE_MODULES_DIR: &str = "node_modules";

/// Resolved configuration of one packaging run.
///
/// Constructed once by [`SettingsBuilder`](super::SettingsBuilder) and read by
/// every pipeline stage. All paths are absolute and normalised.
///
/// Invariants: `sources` is non-empty and contains `entry_point`; the staging
/// root and the output directory exist.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Application name, used for the executable and the unpack directory.
    app_name: String,

    /// Directory containing `package.json`.
    package_root: PathBuf,

    /// The `package.json` file itself.
    descriptor_path: PathBuf,

    /// Application source files.
    sources: BTreeSet<PathBuf>,

    /// Source file the runtime executes first.
    entry_point: PathBuf,

    /// Common ancestor of package root, entry point and sources.
    ///
    /// Staged and archived sources are laid out relative to it, so sources
    /// from sibling packages keep their relative position.
    common_root: PathBuf,

    /// Root of the staging tree.
    staging_root: PathBuf,

    /// Path of the executable to produce.
    output_file: PathBuf,

    /// Freezing-tool target.
    target: Target,

    /// Show debug output and keep the console uncleared when the app starts.
    debug: bool,

    /// Ask the freezing tool for its debug output.
    debug_pkg: bool,

    /// Remove the staging tree after a successful run.
    clean: bool,

    /// Explicit runtime executable instead of looking one up.
    runtime_override: Option<PathBuf>,

    /// Caller changes to the resolved dependency set.
    amendments: DependencyAmendments,
}

impl Settings {
    /// Returns the application name.
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Returns the package root.
    pub fn package_root(&self) -> &Path {
        &self.package_root
    }

    /// Returns the `package.json` path.
    pub fn descriptor_path(&self) -> &Path {
        &self.descriptor_path
    }

    /// Returns the application sources.
    pub fn sources(&self) -> &BTreeSet<PathBuf> {
        &self.sources
    }

    /// Returns the entry point.
    pub fn entry_point(&self) -> &Path {
        &self.entry_point
    }

    /// Returns the common root of all sources.
    pub fn common_root(&self) -> &Path {
        &self.common_root
    }

    /// Returns the staging root.
    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    /// Returns the output executable path.
    pub fn output_file(&self) -> &Path {
        &self.output_file
    }

    /// Returns the target.
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Whether debug output is enabled.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Whether the freezing tool runs in debug mode.
    pub fn debug_pkg(&self) -> bool {
        self.debug_pkg
    }

    /// Whether the staging tree is removed after packaging.
    pub fn clean(&self) -> bool {
        self.clean
    }

    /// Returns the explicit runtime executable, if any.
    pub fn runtime_override(&self) -> Option<&Path> {
        self.runtime_override.as_deref()
    }

    /// Returns the dependency amendments.
    pub fn amendments(&self) -> &DependencyAmendments {
        &self.amendments
    }

    /// Directory holding the staged sources.
    pub fn sources_staging_dir(&self) -> PathBuf {
        self.staging_root.join(SOURCES_STAGING_DIR)
    }

    /// Install unit for the application dependencies.
    pub fn dependencies_unit_dir(&self) -> PathBuf {
        self.staging_root.join(DEPENDENCIES_STAGING_DIR)
    }

    /// Installed application dependency tree.
    pub fn dependencies_staging_dir(&self) -> PathBuf {
        self.dependencies_unit_dir().join(NODE_MODULES_DIR)
    }

    /// Staged runtime executable.
    pub fn runtime_staging_path(&self) -> PathBuf {
        self.staging_root.join(self.target.runtime_file_name())
    }

    /// Loader unit directory.
    pub fn loader_staging_dir(&self) -> PathBuf {
        self.staging_root.join(LOADER_STAGING_DIR)
    }

    /// Where `source` lands inside the staged sources.
    pub fn staged_source_path(&self, source: &Path) -> Result<PathBuf> {
        let rel = source.strip_prefix(&self.common_root)?;
        Ok(self.sources_staging_dir().join(rel))
    }

    /// Entry point relative to the unpacked sources, with forward slashes.
    pub fn entry_point_relative(&self) -> Result<String> {
        paths::to_slash_relative(&self.entry_point, &self.common_root)
    }

    /// Creates a new Settings instance (used by SettingsBuilder).
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        app_name: String,
        package_root: PathBuf,
        descriptor_path: PathBuf,
        sources: BTreeSet<PathBuf>,
        entry_point: PathBuf,
        common_root: PathBuf,
        staging_root: PathBuf,
        output_file: PathBuf,
        target: Target,
        flags: Flags,
        runtime_override: Option<PathBuf>,
        amendments: DependencyAmendments,
    ) -> Self {
        Self {
            app_name,
            package_root,
            descriptor_path,
            sources,
            entry_point,
            common_root,
            staging_root,
            output_file,
            target,
            debug: flags.debug,
            debug_pkg: flags.debug_pkg,
            clean: flags.clean,
            runtime_override,
            amendments,
        }
    }
}

/// Boolean switches carried from the command line.
#[derive(Clone, Copy, Debug, Default)]
pub(super) struct Flags {
    pub debug: bool,
    pub debug_pkg: bool,
    pub clean: bool,
}
