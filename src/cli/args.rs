//! Command line argument parsing and validation.

use crate::{
    bundler::{
        DependencyAmendments, SettingsBuilder,
        deps::DependencySpec,
        settings::{DEFAULT_STAGING_DIR, DEFAULT_TARGET},
    },
    error::{CliError, Result},
};
use clap::Parser;
use std::path::PathBuf;

/// Package a Node.js application into a single self-unpacking executable
#[derive(Parser, Debug)]
#[command(
    name = "bootpack",
    version,
    about = "Package a Node.js application into a single self-unpacking executable",
    long_about = "Packages the sources, production dependencies and a Node.js runtime of an
application into one executable. On first start the executable unpacks itself
into a temp directory, then runs the application with the bundled runtime.

Usage:
  bootpack ./my-app
  bootpack ./my-app/package.json --output dist --target node20-linux-x64
  bootpack . --sources 'src/**/*.js' 'config/*.json' --main src/server.js

Exit code 0 = executable guaranteed to exist at the output path."
)]
pub struct Args {
    /// Package directory, or the path of its package.json
    #[arg(value_name = "PACKAGE", default_value = ".")]
    pub package: PathBuf,

    /// Source globs to package; brace groups like *.{js,json} are allowed
    ///
    /// Default: every .js, .cjs, .mjs and .json file below the entry point's directory.
    #[arg(long, value_name = "GLOB", num_args = 1..)]
    pub sources: Vec<String>,

    /// Entry point, relative to the package directory [default: "main" from package.json]
    #[arg(long, value_name = "FILE")]
    pub main: Option<String>,

    /// Application name [default: "name" from package.json]
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Output directory, or output file when the path has an extension
    #[arg(short, long, value_name = "PATH", default_value = ".")]
    pub output: PathBuf,

    /// Target to build for, e.g. node20-linux-x64
    #[arg(short, long, value_name = "TARGET", default_value = DEFAULT_TARGET)]
    pub target: String,

    /// Staging directory
    #[arg(long, value_name = "DIR", default_value = DEFAULT_STAGING_DIR)]
    pub staging: PathBuf,

    /// Wipe the staging directory before packaging and remove it afterwards
    #[arg(short, long)]
    pub clean: bool,

    /// Show debug output, and keep the console when the packaged app starts
    #[arg(short, long)]
    pub debug: bool,

    /// Run the freezing tool in debug mode
    #[arg(long)]
    pub debug_pkg: bool,

    /// Print nothing but errors
    #[arg(short, long, conflicts_with = "debug")]
    pub quiet: bool,

    /// Node.js executable to bundle [default: node on PATH]
    #[arg(long, value_name = "PATH", env = "BOOTPACK_NODE")]
    pub node: Option<PathBuf>,

    /// Add dependencies to the resolved set (name or name@version)
    #[arg(long, value_name = "DEP", num_args = 1..)]
    pub dep_add: Vec<String>,

    /// Remove dependencies from the resolved set
    #[arg(long, value_name = "NAME", num_args = 1..)]
    pub dep_exclude: Vec<String>,

    /// Package exactly these dependencies and skip resolution (name or name@version)
    #[arg(long, value_name = "DEP", num_args = 1..)]
    pub dep_override: Vec<String>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> std::result::Result<(), CliError> {
        if self.target.contains(',') {
            return Err(CliError::InvalidArguments {
                reason: format!(
                    "only one target per run is supported, got \"{}\"",
                    self.target
                ),
            });
        }

        let added = self.parse_specs(&self.dep_add)?;
        let conflicting: Vec<String> = added
            .iter()
            .filter(|spec| self.dep_exclude.contains(&spec.name))
            .map(|spec| format!("--dep-add {} / --dep-exclude {}", spec, spec.name))
            .collect();
        if !conflicting.is_empty() {
            return Err(CliError::ConflictingArguments {
                arguments: conflicting,
            });
        }

        self.parse_specs(&self.dep_override)?;
        Ok(())
    }

    fn parse_specs(&self, raw: &[String]) -> std::result::Result<Vec<DependencySpec>, CliError> {
        raw.iter()
            .map(|s| {
                s.parse().map_err(|e: crate::bundler::Error| CliError::InvalidArguments {
                    reason: e.to_string(),
                })
            })
            .collect()
    }

    /// Dependency amendments requested on the command line.
    pub fn amendments(&self) -> Result<DependencyAmendments> {
        Ok(DependencyAmendments {
            replace: if self.dep_override.is_empty() {
                None
            } else {
                Some(self.parse_specs(&self.dep_override)?)
            },
            add: self.parse_specs(&self.dep_add)?,
            exclude: self.dep_exclude.clone(),
        })
    }

    /// Settings builder carrying every option.
    pub fn settings_builder(&self) -> Result<SettingsBuilder> {
        let mut builder = SettingsBuilder::new(&self.package)
            .sources(self.sources.iter().cloned())
            .output(&self.output)
            .target(self.target.clone())
            .staging(&self.staging)
            .clean(self.clean)
            .debug(self.debug)
            .debug_pkg(self.debug_pkg)
            .amendments(self.amendments()?);

        if let Some(main) = &self.main {
            builder = builder.main(main.clone());
        }
        if let Some(name) = &self.name {
            builder = builder.name(name.clone());
        }
        if let Some(node) = &self.node {
            builder = builder.runtime(node);
        }
        Ok(builder)
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Output manager for colored terminal output
    output: super::OutputManager,
    debug: bool,
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.debug, args.quiet),
            debug: args.debug,
        }
    }
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Whether debug output was requested
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Log level for `env_logger`, unless `RUST_LOG` says otherwise
    pub fn log_level(&self) -> log::LevelFilter {
        if self.debug {
            log::LevelFilter::Debug
        } else if self.output.is_quiet() {
            log::LevelFilter::Error
        } else {
            log::LevelFilter::Warn
        }
    }

    /// Print verbose message if in verbose mode
    pub fn verbose_println(&self, message: &str) -> std::io::Result<()> {
        self.output.verbose(message)
    }

    /// Print success message
    pub fn success(&self, message: &str) -> std::io::Result<()> {
        self.output.success(message)
    }

    /// Print warning message
    pub fn warn(&self, message: &str) -> std::io::Result<()> {
        self.output.warn(message)
    }

    /// Print progress message
    pub fn progress(&self, message: &str) -> std::io::Result<()> {
        self.output.progress(message)
    }

    /// Print section header
    pub fn section(&self, title: &str) -> std::io::Result<()> {
        self.output.section(title)
    }

    /// Print indented text
    pub fn indent(&self, message: &str) -> std::io::Result<()> {
        self.output.indent(message)
    }
}
