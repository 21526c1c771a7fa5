//! Bootstrap runtime: unpack the payload once per build, then launch the app.
//!
//! ```text
//! CheckStaleness ──stale──> Unpack ──> Launch
//!        └────────fresh──────────────────^
//! ```
//!
//! The unpack directory is `<base>/<name>`. A build is fresh when the
//! `metadata.json` persisted there carries the same identifier as the one
//! embedded in the payload. The persisted copy is written only after every
//! archive was extracted, so an interrupted unpack is redone on the next start.

use crate::bundler::{
    archive::{BuildMetadata, METADATA_FILE, PayloadSet, extract_tar_gz},
    error::{ErrorExt, Result},
    settings::{NODE_MODULES_DIR, Target},
    utils::fs::is_executable_file,
};
use std::{
    io,
    path::{Path, PathBuf},
    process::Command,
};

/// Default unpack base directory name, below the system temp directory.
pub const BASE_FOLDER: &str = "bootpack-bootstrap-app";

/// Directory the sources are unpacked into.
pub const APP_DIR: &str = "app";

/// Unpacks archives.
pub trait Extractor {
    /// Extracts `archive` into `dest`, creating it if needed.
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()>;
}

/// Starts the application and the console around it.
pub trait Launcher {
    /// Clears the terminal before the application takes over.
    fn clear_console(&self) -> Result<()>;

    /// Runs `runtime main` with inherited stdio, blocks, and returns its exit code.
    fn launch(&self, runtime: &Path, main: &Path) -> Result<i32>;
}

/// [`Extractor`] for the tar.gz payload containers.
#[derive(Clone, Copy, Debug, Default)]
pub struct TarGzExtractor;

impl Extractor for TarGzExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<()> {
        let files = extract_tar_gz(archive, dest)?;
        log::debug!("Extracted {} files into {}", files.len(), dest.display());
        Ok(())
    }
}

/// [`Launcher`] spawning a child process.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn clear_console(&self) -> Result<()> {
        use crossterm::{
            cursor::MoveTo,
            execute,
            terminal::{Clear, ClearType},
        };
        execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0))?;
        Ok(())
    }

    fn launch(&self, runtime: &Path, main: &Path) -> Result<i32> {
        log::debug!("Running {} {}", runtime.display(), main.display());
        let status = Command::new(runtime)
            .arg(main)
            .status()
            .fs_context("launching runtime", runtime)?;
        // killed by a signal
        Ok(status.code().unwrap_or(1))
    }
}

/// Result of comparing the embedded build with the unpacked one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Staleness {
    /// The unpacked build matches; nothing to extract.
    Fresh,
    /// Missing, incomplete or from another build; unpack first.
    Stale,
}

/// Compares the embedded metadata with the persisted one, if any.
pub fn check_staleness(embedded: &BuildMetadata, persisted: Option<&BuildMetadata>) -> Staleness {
    match persisted {
        Some(p) if p.uuid == embedded.uuid => Staleness::Fresh,
        _ => Staleness::Stale,
    }
}

/// Reads the persisted metadata. Missing, unreadable and malformed files all
/// count as absent.
pub fn read_persisted(path: &Path) -> Option<BuildMetadata> {
    if !path.exists() {
        return None;
    }
    match BuildMetadata::read(path) {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            log::debug!("Ignoring persisted metadata {}: {}", path.display(), e);
            None
        }
    }
}

/// File name of the unpacked runtime for a build.
///
/// The name recorded at build time wins; older payloads without it fall back
/// to the target.
fn runtime_file_name(metadata: &BuildMetadata) -> &str {
    if !metadata.runtime.is_empty() {
        return &metadata.runtime;
    }
    match metadata.target.parse::<Target>() {
        Ok(target) => target.runtime_file_name(),
        Err(_) if cfg!(windows) => "node.exe",
        Err(_) => "node",
    }
}

/// The bootstrap state machine for one payload.
#[derive(Debug)]
pub struct Bootstrap<E = TarGzExtractor, L = ProcessLauncher> {
    payload: PayloadSet,
    metadata: BuildMetadata,
    unpack_dir: PathBuf,
    extractor: E,
    launcher: L,
}

impl Bootstrap {
    /// Opens the payload in `assets_dir` with the default extractor and launcher.
    pub fn open(assets_dir: &Path, unpack_base: Option<&Path>) -> Result<Self> {
        Self::with(assets_dir, unpack_base, TarGzExtractor, ProcessLauncher)
    }
}

impl<E: Extractor, L: Launcher> Bootstrap<E, L> {
    /// Opens the payload in `assets_dir`.
    ///
    /// The unpack base defaults to [`BASE_FOLDER`] in the system temp directory.
    pub fn with(
        assets_dir: &Path,
        unpack_base: Option<&Path>,
        extractor: E,
        launcher: L,
    ) -> Result<Self> {
        let payload = PayloadSet::new(assets_dir);
        let metadata = BuildMetadata::read(&payload.metadata())?;
        let base = unpack_base
            .map(Path::to_path_buf)
            .unwrap_or_else(|| std::env::temp_dir().join(BASE_FOLDER));

        Ok(Self {
            unpack_dir: base.join(&metadata.name),
            payload,
            metadata,
            extractor,
            launcher,
        })
    }

    /// Embedded build metadata.
    pub fn metadata(&self) -> &BuildMetadata {
        &self.metadata
    }

    /// Directory the application is unpacked into.
    pub fn unpack_dir(&self) -> &Path {
        &self.unpack_dir
    }

    /// Unpacked runtime executable.
    pub fn runtime_path(&self) -> PathBuf {
        self.unpack_dir.join(runtime_file_name(&self.metadata))
    }

    /// Unpacked entry point.
    pub fn main_path(&self) -> PathBuf {
        self.unpack_dir.join(APP_DIR).join(&self.metadata.main)
    }

    /// Checks the unpacked build and unpacks the payload when it is stale.
    pub fn prepare(&self) -> Result<Staleness> {
        let persisted = read_persisted(&self.unpack_dir.join(METADATA_FILE));
        let staleness = check_staleness(&self.metadata, persisted.as_ref());

        if staleness == Staleness::Stale {
            log::debug!(
                "New build detected (\"{}\" != \"{}\")",
                self.metadata.uuid,
                persisted.as_ref().map_or("<none>", |p| p.uuid.as_str())
            );
            self.unpack()?;
        } else {
            log::debug!("Build {} already unpacked", self.metadata.uuid);
        }
        Ok(staleness)
    }

    fn unpack(&self) -> Result<()> {
        let dir = &self.unpack_dir;
        log::debug!("Setting-up app in \"{}\"", dir.display());
        std::fs::create_dir_all(dir).fs_context("creating directory", dir)?;

        self.extractor.extract(&self.payload.runtime(), dir)?;
        let runtime = self.runtime_path();
        if !is_executable_file(&runtime) {
            log::warn!("Unpacked runtime {} is not executable", runtime.display());
        }

        let node_modules = dir.join(NODE_MODULES_DIR);
        remove_dir_if_exists(&node_modules)?;
        self.extractor
            .extract(&self.payload.dependencies(), &node_modules)?;

        let app = dir.join(APP_DIR);
        remove_dir_if_exists(&app)?;
        self.extractor.extract(&self.payload.sources(), &app)?;

        let marker = dir.join(METADATA_FILE);
        std::fs::copy(self.payload.metadata(), &marker).fs_context("writing", &marker)?;
        Ok(())
    }

    /// Prepares the unpack directory, then runs the application and returns its exit code.
    pub fn run(&self) -> Result<i32> {
        self.prepare()?;
        if !self.metadata.debug {
            self.launcher.clear_console()?;
        }
        self.launcher.launch(&self.runtime_path(), &self.main_path())
    }
}

fn remove_dir_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing directory", path),
    }
}
