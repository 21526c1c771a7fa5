//! Packaging pipeline orchestration.

use super::{
    checksum::calculate_sha256,
    freezer::{FreezeRequest, Freezer, PkgFreezer},
};
use crate::{
    bail,
    bundler::{
        Result,
        archive::create_payload,
        deps::{DependencyManifest, Npm, PackageManager, resolve_dependencies},
        error::ErrorExt,
        loader::stage_loader,
        settings::Settings,
        staging::{self, PruneReport},
        utils::fs::remove_dir_all,
    },
    metadata::load_manifest,
};
use std::path::PathBuf;

/// Outcome of a successful packaging run.
#[derive(Clone, Debug)]
pub struct PackReport {
    /// The produced executable
    pub output: PathBuf,
    /// Its size in bytes
    pub size: u64,
    /// Hex-encoded SHA-256 of the executable
    pub checksum: String,
    /// Build identifier embedded in the executable
    pub build_id: String,
    /// Dependencies packaged with the application
    pub dependencies: DependencyManifest,
    /// What pruning removed from the dependency tree
    pub prune: PruneReport,
}

/// Runs the packaging stages in order.
///
/// Generic over the package manager and the freezing tool so that either can be
/// replaced, in tests or by library users.
///
/// # Examples
///
/// ```no_run
/// use bootpack::bundler::{Packager, SettingsBuilder};
///
/// # async fn example() -> bootpack::bundler::Result<()> {
/// let settings = SettingsBuilder::new("./my-app").build().await?;
/// let report = Packager::detect(settings)?.pack().await?;
/// println!("Created {} ({} bytes)", report.output.display(), report.size);
/// println!("SHA256: {}", report.checksum);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Packager<P, F> {
    settings: Settings,
    package_manager: P,
    freezer: F,
}

impl Packager<Npm, PkgFreezer> {
    /// Creates a packager using `npm` and `pkg` from the host.
    pub fn detect(settings: Settings) -> Result<Self> {
        Ok(Self::new(settings, Npm::detect()?, PkgFreezer::detect()?))
    }
}

impl<P: PackageManager, F: Freezer> Packager<P, F> {
    /// Creates a packager from explicit collaborators.
    pub fn new(settings: Settings, package_manager: P, freezer: F) -> Self {
        Self {
            settings,
            package_manager,
            freezer,
        }
    }

    /// Returns the settings of this run.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Packages the application into a single executable.
    ///
    /// Stages run strictly one after another; the first failure aborts the run
    /// and leaves the staging tree in place for inspection.
    pub async fn pack(&self) -> Result<PackReport> {
        let settings = &self.settings;
        log::info!(
            "Package node application \"{}\" from \"{}\"...",
            settings.app_name(),
            settings.package_root().display()
        );

        log::info!("Stage application sources..");
        staging::stage_sources(settings).await?;

        log::info!("Stage node executable..");
        staging::stage_runtime(settings).await?;

        log::info!("Stage node modules..");
        let dependencies = self.dependencies().await?;
        let prune = staging::stage_dependencies(settings, &self.package_manager, &dependencies)
            .await?;

        log::info!("Archive..");
        let (payload, metadata) = create_payload(settings).await?;

        log::info!("Stage bootstrap loader..");
        let loader = stage_loader(settings, &self.package_manager).await?;
        log::debug!("Loader staged in {}", payload.dir().display());

        log::info!("Create executable package..");
        let request = FreezeRequest {
            script: &loader.script,
            config: &loader.descriptor,
            target: settings.target(),
            output: settings.output_file(),
            debug: settings.debug_pkg(),
        };
        self.freezer.freeze(&request).await?;

        let output = settings.output_file().to_path_buf();
        let size = tokio::fs::metadata(&output)
            .await
            .fs_context("reading metadata of", &output)?
            .len();
        if size == 0 {
            bail!(
                "Freezing produced an empty executable: {}",
                output.display()
            );
        }
        let checksum = calculate_sha256(&output).await?;

        if settings.clean() {
            log::debug!("Removing staging directory {}", settings.staging_root().display());
            remove_dir_all(settings.staging_root()).await?;
        }

        log::info!("✓ Created {}", output.display());
        Ok(PackReport {
            output,
            size,
            checksum,
            build_id: metadata.uuid,
            dependencies,
            prune,
        })
    }

    /// The dependency set to install: resolved by the package manager, then amended.
    async fn dependencies(&self) -> Result<DependencyManifest> {
        let settings = &self.settings;
        let amendments = settings.amendments();

        let resolved = if amendments.replaces_resolution() {
            log::debug!("Dependency override given, skipping resolution");
            DependencyManifest::new()
        } else {
            resolve_dependencies(&self.package_manager, settings.package_root()).await?
        };

        let declared = load_manifest(settings.descriptor_path())?.package.dependencies;
        Ok(amendments.apply(resolved, &declared))
    }
}
