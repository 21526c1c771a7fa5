//! Payload archives and build metadata.
//!
//! A payload is four files written side by side: the runtime, the pruned
//! dependency tree and the staged sources as tar.gz containers, plus
//! `metadata.json` identifying the build.

mod tarball;

pub use tarball::{extract_tar_gz, pack_dir, pack_file};

use crate::bundler::{
    error::{Error, ErrorExt, Result},
    settings::Settings,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Runtime executable container.
pub const RUNTIME_ARCHIVE: &str = "node.tar.gz";

/// Dependency tree container.
pub const DEPENDENCIES_ARCHIVE: &str = "node_modules.tar.gz";

/// Application sources container.
pub const SOURCES_ARCHIVE: &str = "app_sources.tar.gz";

/// Build metadata file.
pub const METADATA_FILE: &str = "metadata.json";

/// Every file of a payload, in the order they are written.
pub const PAYLOAD_FILES: [&str; 4] = [
    RUNTIME_ARCHIVE,
    DEPENDENCIES_ARCHIVE,
    SOURCES_ARCHIVE,
    METADATA_FILE,
];

/// Identity of one packaging run, embedded next to the archives and persisted
/// in the unpack directory once unpacking completes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildMetadata {
    /// Application name, also the unpack directory name
    pub name: String,
    /// Build identifier, fresh for every run
    pub uuid: String,
    /// Entry point relative to the unpacked `app/` directory, forward slashes
    pub main: String,
    /// Target the executable was built for
    #[serde(default)]
    pub target: String,
    /// File name of the runtime inside the runtime container
    #[serde(default)]
    pub runtime: String,
    /// Keep the console uncleared when launching
    #[serde(default)]
    pub debug: bool,
}

impl BuildMetadata {
    /// Metadata for a new build of `settings`, with a fresh identifier.
    pub fn for_build(settings: &Settings) -> Result<Self> {
        Ok(Self {
            name: settings.app_name().to_string(),
            uuid: uuid::Uuid::new_v4().to_string(),
            main: settings.entry_point_relative()?,
            target: settings.target().to_string(),
            runtime: settings.target().runtime_file_name().to_string(),
            debug: settings.debug(),
        })
    }

    /// Reads metadata from a JSON file.
    pub fn read(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).fs_context("reading", path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Writes metadata as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).fs_context("writing", path)
    }
}

/// Locations of the payload files in one directory.
#[derive(Clone, Debug)]
pub struct PayloadSet {
    dir: PathBuf,
}

impl PayloadSet {
    /// The payload stored in `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the payload.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Runtime container.
    pub fn runtime(&self) -> PathBuf {
        self.dir.join(RUNTIME_ARCHIVE)
    }

    /// Dependencies container.
    pub fn dependencies(&self) -> PathBuf {
        self.dir.join(DEPENDENCIES_ARCHIVE)
    }

    /// Sources container.
    pub fn sources(&self) -> PathBuf {
        self.dir.join(SOURCES_ARCHIVE)
    }

    /// Metadata file.
    pub fn metadata(&self) -> PathBuf {
        self.dir.join(METADATA_FILE)
    }
}

/// Writes the payload of `settings` into the loader directory.
///
/// Expects the runtime, sources and dependencies to be staged already.
pub async fn create_payload(settings: &Settings) -> Result<(PayloadSet, BuildMetadata)> {
    let payload = PayloadSet::new(settings.loader_staging_dir());
    let metadata = BuildMetadata::for_build(settings)?;

    let runtime = settings.runtime_staging_path();
    let runtime_name = settings.target().runtime_file_name();
    let sources = settings.sources_staging_dir();
    let dependencies = settings.dependencies_staging_dir();
    let set = payload.clone();
    let meta = metadata.clone();

    tokio::task::spawn_blocking(move || -> Result<()> {
        std::fs::create_dir_all(set.dir()).fs_context("creating directory", set.dir())?;

        log::debug!("Archiving runtime {}", runtime.display());
        pack_file(&runtime, runtime_name, &set.runtime())?;

        let count = pack_dir(&dependencies, &set.dependencies())?;
        log::debug!("Archived {} dependency files", count);

        let count = pack_dir(&sources, &set.sources())?;
        log::debug!("Archived {} source files", count);

        meta.write(&set.metadata())
    })
    .await
    .map_err(|e| Error::GenericError(format!("Archiving task failed: {e}")))??;

    log::debug!("Build {} written to {}", metadata.uuid, payload.dir().display());
    Ok((payload, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_json_shape() {
        let metadata = BuildMetadata {
            name: "demo".into(),
            uuid: "A".into(),
            main: "src/index.js".into(),
            target: "node20-win-x64".into(),
            runtime: "node.exe".into(),
            debug: false,
        };
        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&metadata).unwrap()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "name": "demo",
                "uuid": "A",
                "main": "src/index.js",
                "target": "node20-win-x64",
                "runtime": "node.exe",
                "debug": false
            })
        );
    }

    #[test]
    fn metadata_without_optional_fields_parses() {
        let metadata: BuildMetadata =
            serde_json::from_str(r#"{"name":"demo","uuid":"A","main":"index.js"}"#).unwrap();
        assert!(!metadata.debug);
        assert!(metadata.target.is_empty());
        assert!(metadata.runtime.is_empty());
    }

    #[test]
    fn metadata_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(METADATA_FILE);
        let metadata = BuildMetadata {
            name: "demo".into(),
            uuid: uuid::Uuid::new_v4().to_string(),
            main: "index.js".into(),
            target: "node20-linux-x64".into(),
            runtime: "node".into(),
            debug: true,
        };
        metadata.write(&path).unwrap();
        assert_eq!(BuildMetadata::read(&path).unwrap(), metadata);
    }
}
