//! Production dependency resolution.
//!
//! Asks the package manager for the production dependency tree of the
//! application and reduces it to the top-level, registry-origin packages with
//! pinned versions. Local packages (`file:` and `link:`) are never installed
//! from the registry, but what they depend on is.

mod amendments;
mod npm;
pub mod tree;

pub use amendments::{DependencyAmendments, DependencySpec};
pub use npm::{Npm, PackageManager};
pub use tree::{Origin, ResolvedDependency};

use crate::bundler::{
    error::{Error, Result},
    utils::fs::remove_file,
};
use std::{collections::BTreeMap, path::Path};

/// Package name to pinned version.
pub type DependencyManifest = BTreeMap<String, String>;

/// Lock file consulted by the package manager.
pub const LOCK_FILE: &str = "package-lock.json";

/// Resolves the external production dependencies of the package in `package_root`.
///
/// A lock file is generated when the package has none, and removed again
/// afterwards whether resolution succeeds or not.
///
/// # Errors
///
/// Any failure is returned as [`Error::DependencyResolution`] carrying the cause.
pub async fn resolve_dependencies<P: PackageManager>(
    package_manager: &P,
    package_root: &Path,
) -> Result<DependencyManifest> {
    let lock_file = package_root.join(LOCK_FILE);
    let generated = !lock_file.exists();

    let result = query_tree(package_manager, package_root, generated).await;

    if generated {
        log::debug!("Removing generated {}", lock_file.display());
        if let Err(e) = remove_file(&lock_file).await {
            log::warn!("Error removing {}: {}", LOCK_FILE, e);
        }
    }

    let manifest = result.map_err(Error::dependency_resolution)?;
    log::debug!("Top-level dependencies: {:?}", manifest);
    Ok(manifest)
}

async fn query_tree<P: PackageManager>(
    package_manager: &P,
    package_root: &Path,
    generate_lockfile: bool,
) -> Result<DependencyManifest> {
    if generate_lockfile {
        log::debug!("No {} in {}, generating one", LOCK_FILE, package_root.display());
        package_manager.generate_lockfile(package_root).await?;
    }

    let output = package_manager.list_production_tree(package_root).await?;
    let tree: tree::NpmListOutput = serde_json::from_str(&output)?;
    Ok(tree::collect_external_dependencies(&tree.dependencies))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, path::PathBuf};

    /// Writes a lock file when asked and answers `ls` with a canned tree.
    struct FakeNpm {
        tree: std::result::Result<&'static str, &'static str>,
        calls: RefCell<Vec<String>>,
    }

    impl FakeNpm {
        fn new(tree: std::result::Result<&'static str, &'static str>) -> Self {
            Self {
                tree,
                calls: RefCell::default(),
            }
        }
    }

    impl PackageManager for FakeNpm {
        async fn generate_lockfile(&self, package_root: &Path) -> Result<()> {
            self.calls.borrow_mut().push("lock".into());
            std::fs::write(package_root.join(LOCK_FILE), "{}")?;
            Ok(())
        }

        async fn list_production_tree(&self, _package_root: &Path) -> Result<String> {
            self.calls.borrow_mut().push("ls".into());
            match self.tree {
                Ok(tree) => Ok(tree.to_string()),
                Err(stderr) => Err(Error::ExternalTool {
                    command: "npm ls".into(),
                    code: Some(1),
                    stderr: stderr.into(),
                }),
            }
        }

        async fn install(&self, _unit_dir: &Path) -> Result<()> {
            unreachable!("resolution never installs")
        }
    }

    const TREE: &str = r#"{"name":"app","dependencies":{"chalk":{"version":"5.3.0","resolved":"https://r/chalk.tgz"}}}"#;

    fn lock_path(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join(LOCK_FILE)
    }

    #[tokio::test]
    async fn generated_lockfile_is_removed_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let npm = FakeNpm::new(Ok(TREE));

        let manifest = resolve_dependencies(&npm, dir.path()).await.unwrap();

        assert_eq!(manifest["chalk"], "5.3.0");
        assert_eq!(*npm.calls.borrow(), vec!["lock", "ls"]);
        assert!(!lock_path(&dir).exists());
    }

    #[tokio::test]
    async fn generated_lockfile_is_removed_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let npm = FakeNpm::new(Err("ELSPROBLEMS"));

        let err = resolve_dependencies(&npm, dir.path()).await.unwrap_err();

        assert!(matches!(err, Error::DependencyResolution { .. }));
        assert!(err.to_string().contains("Error getting top-level dependencies"));
        assert!(!lock_path(&dir).exists());
    }

    #[tokio::test]
    async fn existing_lockfile_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(lock_path(&dir), "{\"lockfileVersion\":3}").unwrap();
        let npm = FakeNpm::new(Ok(TREE));

        resolve_dependencies(&npm, dir.path()).await.unwrap();

        assert_eq!(*npm.calls.borrow(), vec!["ls"]);
        assert!(lock_path(&dir).exists());
    }

    #[tokio::test]
    async fn invalid_json_is_a_resolution_error() {
        let dir = tempfile::tempdir().unwrap();
        let npm = FakeNpm::new(Ok("not json"));

        let err = resolve_dependencies(&npm, dir.path()).await.unwrap_err();
        assert_eq!(err.kind(), "DependencyResolutionError");
    }
}
