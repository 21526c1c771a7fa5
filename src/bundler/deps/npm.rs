//! The package manager seam and its npm implementation.

use crate::bundler::{
    builder::tool_detection::NPM,
    error::{Error, Result},
    utils::process::run_captured,
};
use std::{
    io,
    path::{Path, PathBuf},
};

const OMIT_NON_PRODUCTION: [&str; 3] = ["--omit=dev", "--omit=peer", "--omit=optional"];

/// Operations the pipeline needs from a package manager.
///
/// Every call blocks until the tool exits; failures are returned, never retried.
#[allow(async_fn_in_trait)]
pub trait PackageManager {
    /// Writes a lock file for the production dependencies of the package in `package_root`.
    async fn generate_lockfile(&self, package_root: &Path) -> Result<()>;

    /// Returns the production dependency tree of `package_root` as `npm ls --json` output.
    async fn list_production_tree(&self, package_root: &Path) -> Result<String>;

    /// Installs the dependencies declared by the `package.json` in `unit_dir` into
    /// `unit_dir/node_modules`.
    async fn install(&self, unit_dir: &Path) -> Result<()>;
}

/// [`PackageManager`] backed by the `npm` executable.
#[derive(Clone, Debug)]
pub struct Npm {
    program: PathBuf,
}

impl Npm {
    /// Uses the `npm` found on `PATH`.
    pub fn detect() -> Result<Self> {
        match NPM.as_ref() {
            Some(program) => Ok(Self::with_program(program.clone())),
            None => Err(Error::CommandFailed {
                command: "npm".into(),
                error: io::Error::new(io::ErrorKind::NotFound, "npm was not found in PATH"),
            }),
        }
    }

    /// Uses a specific npm executable.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl PackageManager for Npm {
    async fn generate_lockfile(&self, package_root: &Path) -> Result<()> {
        let mut args = vec!["install", "--package-lock-only"];
        args.extend(OMIT_NON_PRODUCTION);
        run_captured(&self.program, &args, package_root).await?;
        Ok(())
    }

    async fn list_production_tree(&self, package_root: &Path) -> Result<String> {
        let mut args = vec!["ls", "--package-lock-only"];
        args.extend(OMIT_NON_PRODUCTION);
        args.extend(["--depth=0", "--json", "--silent"]);
        run_captured(&self.program, &args, package_root).await
    }

    async fn install(&self, unit_dir: &Path) -> Result<()> {
        run_captured(
            &self.program,
            ["install", ".", "--no-bin-links", "--omit=dev", "--omit=optional"],
            unit_dir,
        )
        .await?;
        Ok(())
    }
}
