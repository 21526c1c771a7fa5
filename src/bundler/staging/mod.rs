//! Staging of sources, runtime and dependencies.
//!
//! Everything lands below the staging root laid out by [`Settings`]; the
//! archiver picks the three subtrees up from there.

pub mod prune;

pub use prune::{PruneReport, prune};

use crate::bundler::{
    builder::tool_detection::NODE,
    deps::{DependencyManifest, PackageManager},
    error::{Error, Result},
    settings::{NODE_MODULES_DIR, Settings},
    utils::fs::{copy_file, create_dir_all, is_executable_file, write_file},
};
use crate::metadata::PACKAGE_JSON;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

/// Copies every source and the package descriptor into the sources staging
/// directory, keeping their position relative to the common root.
pub async fn stage_sources(settings: &Settings) -> Result<()> {
    for source in settings.sources() {
        copy_file(source, &settings.staged_source_path(source)?).await?;
    }

    let descriptor = settings.descriptor_path();
    copy_file(descriptor, &settings.staged_source_path(descriptor)?).await?;

    log::debug!(
        "Staged {} sources into {}",
        settings.sources().len(),
        settings.sources_staging_dir().display()
    );
    Ok(())
}

/// Finds the runtime executable: the explicit override, else `node` on `PATH`.
pub fn locate_runtime(runtime_override: Option<&Path>) -> Result<PathBuf> {
    let candidate = match runtime_override {
        Some(path) => path.to_path_buf(),
        None => NODE
            .clone()
            .ok_or_else(|| Error::RuntimeNotFound("node was not found in PATH".into()))?,
    };

    if !is_executable_file(&candidate) {
        return Err(Error::RuntimeNotFound(format!(
            "\"{}\" is not an executable file",
            candidate.display()
        )));
    }
    Ok(candidate)
}

/// Copies the runtime executable into the staging root.
///
/// A runtime staged by an earlier run is reused unless an explicit override is set.
pub async fn stage_runtime(settings: &Settings) -> Result<PathBuf> {
    let staged = settings.runtime_staging_path();
    if settings.runtime_override().is_none() && is_executable_file(&staged) {
        log::debug!("Reusing staged runtime {}", staged.display());
        return Ok(staged);
    }

    let runtime = locate_runtime(settings.runtime_override())?;
    log::debug!("Get node executable from \"{}\"", runtime.display());
    copy_file(&runtime, &staged).await?;
    Ok(staged)
}

/// A self-contained directory with a `package.json` and installed dependencies.
///
/// Used for the application's dependencies and for the loader's.
#[derive(Debug)]
pub struct InstallUnit {
    /// Directory the unit lives in
    pub dir: PathBuf,
    /// Content of the unit's `package.json`
    pub descriptor: Value,
    /// Files copied into the unit: source path and path relative to `dir`
    pub files: Vec<(PathBuf, PathBuf)>,
}

impl InstallUnit {
    /// A unit with only `name` and `dependencies` in its descriptor.
    pub fn new(dir: impl Into<PathBuf>, name: &str, dependencies: &DependencyManifest) -> Self {
        Self {
            dir: dir.into(),
            descriptor: json!({ "name": name, "dependencies": dependencies }),
            files: Vec::new(),
        }
    }

    fn has_dependencies(&self) -> bool {
        self.descriptor
            .get("dependencies")
            .and_then(Value::as_object)
            .is_some_and(|deps| !deps.is_empty())
    }

    /// Installed dependency tree of the unit.
    pub fn node_modules(&self) -> PathBuf {
        self.dir.join(NODE_MODULES_DIR)
    }

    /// Writes the descriptor, copies the files and installs the dependencies.
    ///
    /// Without dependencies the install is skipped and an empty `node_modules`
    /// is created instead.
    pub async fn install<P: PackageManager>(&self, package_manager: &P) -> Result<()> {
        create_dir_all(&self.dir, false).await?;

        let descriptor = serde_json::to_string_pretty(&self.descriptor)?;
        log::debug!("Write \"{}\": {}", PACKAGE_JSON, descriptor);
        write_file(&self.dir.join(PACKAGE_JSON), descriptor).await?;

        for (source, rel) in &self.files {
            copy_file(source, &self.dir.join(rel)).await?;
        }

        if self.has_dependencies() {
            log::debug!("Run npm install in {}", self.dir.display());
            package_manager.install(&self.dir).await?;
        } else {
            log::debug!("No dependencies for {}, skipping install", self.dir.display());
            create_dir_all(&self.node_modules(), false).await?;
        }
        Ok(())
    }
}

/// Installs the application dependencies into their unit and prunes the result.
pub async fn stage_dependencies<P: PackageManager>(
    settings: &Settings,
    package_manager: &P,
    dependencies: &DependencyManifest,
) -> Result<PruneReport> {
    let unit = InstallUnit::new(
        settings.dependencies_unit_dir(),
        &format!("{}-node-modules", settings.app_name()),
        dependencies,
    );
    unit.install(package_manager).await?;

    log::debug!("Clean-lean node_modules..");
    prune(unit.node_modules()).await
}
