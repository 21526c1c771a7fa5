//! Staging of the bootstrap loader.
//!
//! The loader script and its descriptor ship inside this binary. The loader
//! unit is the loader directory that already holds the payload: the script,
//! a `package.json` that tells the freezing tool which payload files to embed,
//! and the loader's own installed dependencies.

use crate::bundler::{
    archive::PAYLOAD_FILES,
    deps::PackageManager,
    error::{Context, Result},
    settings::Settings,
    staging::InstallUnit,
    utils::fs::write_file,
};
use crate::metadata::PACKAGE_JSON;
use serde_json::{Value, json};
use std::path::PathBuf;

/// File name of the loader script.
pub const LOADER_SCRIPT: &str = "bootstrap.cjs";

/// Loader script source.
pub const LOADER_SOURCE: &str = include_str!("../../assets/bootstrap/bootstrap.cjs");

/// Loader descriptor, pinning the loader's dependencies.
pub const LOADER_DESCRIPTOR: &str = include_str!("../../assets/bootstrap/package.json");

/// Paths of a staged loader, as the freezing tool needs them.
#[derive(Clone, Debug)]
pub struct StagedLoader {
    /// Loader script
    pub script: PathBuf,
    /// Loader `package.json`
    pub descriptor: PathBuf,
}

/// Builds the descriptor of the loader unit for `app_name`.
pub fn loader_descriptor(app_name: &str) -> Result<Value> {
    let mut descriptor: Value = serde_json::from_str(LOADER_DESCRIPTOR)?;
    let object = descriptor
        .as_object_mut()
        .context("embedded loader descriptor is not a JSON object")?;

    object.insert("name".into(), json!(format!("{app_name}-bootpack")));
    object.insert("pkg".into(), json!({ "assets": PAYLOAD_FILES }));
    Ok(descriptor)
}

/// Writes the loader script and descriptor into the loader directory and
/// installs the loader dependencies.
pub async fn stage_loader<P: PackageManager>(
    settings: &Settings,
    package_manager: &P,
) -> Result<StagedLoader> {
    let dir = settings.loader_staging_dir();
    let script = dir.join(LOADER_SCRIPT);

    log::debug!("Stage bootstrap script \"{}\"..", script.display());
    write_file(&script, LOADER_SOURCE).await?;

    let unit = InstallUnit {
        dir: dir.clone(),
        descriptor: loader_descriptor(settings.app_name())?,
        files: Vec::new(),
    };
    unit.install(package_manager).await?;

    Ok(StagedLoader {
        script,
        descriptor: dir.join(PACKAGE_JSON),
    })
}
