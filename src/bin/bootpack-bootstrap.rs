//! Native bootstrap runtime for bootpack payloads.
//!
//! Reads the payload from `--assets` (default: the directory of this
//! executable), unpacks it when the build changed, and runs the application
//! with the unpacked Node.js runtime. Exits with the application's exit code.

use anyhow::Context;
use bootpack::bootstrap::Bootstrap;
use clap::Parser;
use crossterm::style::Stylize;
use std::{path::PathBuf, process};

#[derive(Parser, Debug)]
#[command(name = "bootpack-bootstrap", version, about)]
struct Args {
    /// Directory the application is unpacked into [default: <temp>/bootpack-bootstrap-app]
    #[arg(long, value_name = "DIR")]
    unpack_path: Option<PathBuf>,

    /// Directory holding the payload archives and metadata.json
    #[arg(long, value_name = "DIR", env = "BOOTPACK_ASSETS")]
    assets: Option<PathBuf>,
}

fn run(args: Args) -> anyhow::Result<i32> {
    let assets = match args.assets {
        Some(dir) => dir,
        None => std::env::current_exe()
            .context("locating the bootstrap executable")?
            .parent()
            .map(PathBuf::from)
            .context("bootstrap executable has no parent directory")?,
    };

    let bootstrap = Bootstrap::open(&assets, args.unpack_path.as_deref())
        .with_context(|| format!("opening payload in {}", assets.display()))?;

    let level = if bootstrap.metadata().debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    log::debug!(
        "Bootstrap for \"{}\" (build {})",
        bootstrap.metadata().name,
        bootstrap.metadata().uuid
    );
    Ok(bootstrap.run()?)
}

fn main() {
    let exit_code = match run(Args::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", format!("!!!> Fatal error: {e:#}").red());
            1
        }
    };

    process::exit(exit_code);
}
