//! Builder for constructing Settings.

use super::{Settings, Target, core::Flags, paths};
use crate::{
    bundler::{
        Error, ErrorExt, Result,
        deps::DependencyAmendments,
        utils::fs::create_dir_all,
    },
    config_bail,
    metadata::load_manifest,
};
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

/// Default staging directory, relative to the working directory.
pub const DEFAULT_STAGING_DIR: &str = ".bootpack-cache";

/// Extensions collected when no source globs are given.
const DEFAULT_SOURCE_EXTENSIONS: &[&str] = &["js", "cjs", "mjs", "json"];

/// Builder for constructing [`Settings`].
///
/// Resolves a package reference and caller overrides into the immutable
/// configuration of a packaging run, creating the staging and output
/// directories on the way.
///
/// # Examples
///
/// ```no_run
/// use bootpack::bundler::SettingsBuilder;
///
/// # async fn example() -> bootpack::bundler::Result<()> {
/// let settings = SettingsBuilder::new("./my-app")
///     .output("dist")
///     .target("node20-linux-x64")
///     .build()
///     .await?;
/// println!("packaging {} into {}", settings.app_name(), settings.output_file().display());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    package_ref: PathBuf,
    sources: Vec<String>,
    main: Option<String>,
    name: Option<String>,
    output: Option<PathBuf>,
    target: Option<String>,
    staging: Option<PathBuf>,
    working_dir: Option<PathBuf>,
    runtime: Option<PathBuf>,
    amendments: DependencyAmendments,
    flags: Flags,
}

impl SettingsBuilder {
    /// Creates a builder for the package at `package_ref`.
    ///
    /// `package_ref` is a package directory or the path of its `package.json`.
    pub fn new<P: AsRef<Path>>(package_ref: P) -> Self {
        Self {
            package_ref: package_ref.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    /// Sets explicit source globs. Brace groups such as `*.{js,json}` are allowed.
    ///
    /// Default: every script and JSON file below the entry point's directory.
    pub fn sources<I, S>(mut self, globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = globs.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the entry point, relative to the package root.
    ///
    /// Default: `main` from `package.json`.
    pub fn main(mut self, main: impl Into<String>) -> Self {
        self.main = Some(main.into());
        self
    }

    /// Sets the application name.
    ///
    /// Default: `name` from `package.json`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the output directory, or the output file when the path has an extension.
    ///
    /// Default: the working directory.
    pub fn output<P: AsRef<Path>>(mut self, output: P) -> Self {
        self.output = Some(output.as_ref().to_path_buf());
        self
    }

    /// Sets the freezing-tool target.
    ///
    /// Default: [`DEFAULT_TARGET`](super::target::DEFAULT_TARGET).
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Sets the staging directory.
    ///
    /// Default: [`DEFAULT_STAGING_DIR`] in the working directory.
    pub fn staging<P: AsRef<Path>>(mut self, staging: P) -> Self {
        self.staging = Some(staging.as_ref().to_path_buf());
        self
    }

    /// Sets the directory relative paths and globs are resolved against.
    ///
    /// Default: the process working directory.
    pub fn working_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Uses `runtime` as the Node.js executable instead of searching `PATH`.
    pub fn runtime<P: AsRef<Path>>(mut self, runtime: P) -> Self {
        self.runtime = Some(runtime.as_ref().to_path_buf());
        self
    }

    /// Sets changes applied to the resolved dependency set.
    pub fn amendments(mut self, amendments: DependencyAmendments) -> Self {
        self.amendments = amendments;
        self
    }

    /// Enables debug output.
    pub fn debug(mut self, debug: bool) -> Self {
        self.flags.debug = debug;
        self
    }

    /// Enables the freezing tool's debug output.
    pub fn debug_pkg(mut self, debug_pkg: bool) -> Self {
        self.flags.debug_pkg = debug_pkg;
        self
    }

    /// Wipes the staging directory before packaging, and removes it afterwards.
    pub fn clean(mut self, clean: bool) -> Self {
        self.flags.clean = clean;
        self
    }

    /// Resolves the configuration and prepares the staging and output directories.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `package.json` is missing, no source matches,
    /// the entry point is not among the sources or cannot be determined.
    pub async fn build(self) -> Result<Settings> {
        let working_dir = match self.working_dir {
            Some(dir) => paths::absolute(&dir)?,
            None => std::env::current_dir().fs_context("reading current directory", ".")?,
        };

        let manifest = load_manifest(&paths::absolute_from(&self.package_ref, &working_dir)?)?;
        let package_root = paths::absolute(&manifest.package_root)?;
        let descriptor_path = paths::absolute(&manifest.descriptor_path)?;

        let app_name = self
            .name
            .or(manifest.package.name)
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(format!(
                    "No \"name\" in \"{}\", please specify the name",
                    descriptor_path.display()
                ))
            })?;

        let staging_root = paths::absolute_from(
            self.staging
                .as_deref()
                .unwrap_or(Path::new(DEFAULT_STAGING_DIR)),
            &working_dir,
        )?;
        if package_root.starts_with(&staging_root) || working_dir.starts_with(&staging_root) {
            config_bail!(
                "Staging directory \"{}\" must not contain the package or working directory",
                staging_root.display()
            );
        }

        let declared_main = self
            .main
            .or(manifest.package.main)
            .filter(|m| !m.trim().is_empty())
            .map(|m| paths::absolute_from(Path::new(&m), &package_root))
            .transpose()?;

        let (patterns, mut sources) = if self.sources.is_empty() {
            let dir = declared_main
                .as_deref()
                .and_then(Path::parent)
                .unwrap_or(&package_root);
            let patterns = paths::patterns_below(dir, DEFAULT_SOURCE_EXTENSIONS);
            let sources = paths::match_sources(&patterns, &working_dir)?;
            (patterns, sources)
        } else {
            let sources = paths::expand_sources(&self.sources, &working_dir)?;
            (self.sources, sources)
        };
        // staged on its own, never an entry point candidate
        sources.remove(&descriptor_path);
        sources.retain(|s| !s.starts_with(&staging_root));
        if sources.is_empty() {
            config_bail!(
                "No source files found matching the glob pattern: \"{}\"",
                patterns.join(", ")
            );
        }
        log::debug!("Matched {} source files", sources.len());

        let entry_point = resolve_entry_point(declared_main, &sources)?;

        let common_root = paths::common_root(
            [package_root.as_path(), entry_point.as_path()]
                .into_iter()
                .chain(sources.iter().map(PathBuf::as_path)),
        )
        .ok_or_else(|| {
            Error::Config("Sources and package root share no common directory".into())
        })?;

        let target: Target = match self.target {
            Some(target) => target.parse()?,
            None => Target::default(),
        };

        let output = paths::absolute_from(
            self.output.as_deref().unwrap_or(Path::new(".")),
            &working_dir,
        )?;
        let output_file = if output.extension().is_some() {
            output
        } else {
            output.join(target.executable_file_name(&app_name))
        };

        let settings = Settings::new(
            app_name,
            package_root,
            descriptor_path,
            sources,
            entry_point,
            common_root,
            staging_root,
            output_file,
            target,
            self.flags,
            self.runtime
                .map(|r| paths::absolute_from(&r, &working_dir))
                .transpose()?,
            self.amendments,
        );

        create_folders(&settings).await?;

        Ok(settings)
    }
}

/// Picks the entry point: the declared one if it is a source, or the only source.
fn resolve_entry_point(declared: Option<PathBuf>, sources: &BTreeSet<PathBuf>) -> Result<PathBuf> {
    match declared {
        Some(main) if sources.contains(&main) => Ok(main),
        Some(main) => Err(Error::Config(format!(
            "Main entry point \"{}\" was not found in sources",
            main.display()
        ))),
        None => match sources.first() {
            Some(only) if sources.len() == 1 => Ok(only.clone()),
            _ => Err(Error::Config(
                "Unable to identify main entrypoint file, please specify the main".into(),
            )),
        },
    }
}

async fn create_folders(settings: &Settings) -> Result<()> {
    create_dir_all(settings.staging_root(), settings.clean()).await?;
    if let Some(output_dir) = settings.output_file().parent() {
        create_dir_all(output_dir, false).await?;
    }
    create_dir_all(&settings.sources_staging_dir(), false).await?;
    create_dir_all(&settings.dependencies_unit_dir(), false).await?;
    Ok(())
}
