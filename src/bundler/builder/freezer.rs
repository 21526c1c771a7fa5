//! The freezing-tool seam and its `pkg` implementation.

use super::tool_detection::{NPX, PKG};
use crate::bundler::{
    error::{Error, Result},
    settings::Target,
    utils::process::run_captured,
};
use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};

/// Package fetched through `npx` when `pkg` is not installed.
pub const PKG_PACKAGE: &str = "@yao-pkg/pkg";

/// What to freeze and where to put it.
#[derive(Clone, Copy, Debug)]
pub struct FreezeRequest<'a> {
    /// Loader script to freeze
    pub script: &'a Path,
    /// Loader `package.json` listing the assets to embed
    pub config: &'a Path,
    /// Target to build for
    pub target: &'a Target,
    /// Executable to write
    pub output: &'a Path,
    /// Ask the tool for debug output
    pub debug: bool,
}

impl FreezeRequest<'_> {
    /// Command-line arguments for `pkg`.
    pub fn pkg_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            self.script.into(),
            "--config".into(),
            self.config.into(),
            "--target".into(),
            self.target.as_str().into(),
            "--output".into(),
            self.output.into(),
        ];
        if self.debug {
            args.push("--debug".into());
        }
        args
    }
}

/// Turns a staged loader into a standalone executable.
///
/// A failed freeze is returned as is, never retried.
#[allow(async_fn_in_trait)]
pub trait Freezer {
    /// Produces `request.output`.
    async fn freeze(&self, request: &FreezeRequest<'_>) -> Result<()>;
}

/// [`Freezer`] running the `pkg` command.
#[derive(Clone, Debug)]
pub struct PkgFreezer {
    program: PathBuf,
    leading_args: Vec<OsString>,
}

impl PkgFreezer {
    /// Uses `pkg` from `PATH`, else runs it through `npx`.
    pub fn detect() -> Result<Self> {
        if let Some(pkg) = PKG.as_ref() {
            return Ok(Self {
                program: pkg.clone(),
                leading_args: Vec::new(),
            });
        }
        if let Some(npx) = NPX.as_ref() {
            log::debug!("pkg not installed, using npx {}", PKG_PACKAGE);
            return Ok(Self {
                program: npx.clone(),
                leading_args: vec!["--yes".into(), PKG_PACKAGE.into()],
            });
        }
        Err(Error::CommandFailed {
            command: "pkg".into(),
            error: io::Error::new(io::ErrorKind::NotFound, "neither pkg nor npx found in PATH"),
        })
    }
}

impl Freezer for PkgFreezer {
    async fn freeze(&self, request: &FreezeRequest<'_>) -> Result<()> {
        let args: Vec<OsString> = self
            .leading_args
            .iter()
            .cloned()
            .chain(request.pkg_args())
            .collect();
        let cwd = request.script.parent().unwrap_or(Path::new("."));

        let stdout = run_captured(&self.program, &args, cwd).await?;
        log::debug!("{}", stdout.trim());
        Ok(())
    }
}
