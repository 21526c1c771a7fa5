//! bootpack - package a Node.js application into a single self-unpacking executable.
//!
//! Exit code 0 guarantees the executable exists at the output path.

use bootpack::cli::{self, Args, RuntimeConfig};
use std::process;

#[tokio::main]
async fn main() {
    let args = Args::parse_args();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(RuntimeConfig::from(&args).log_level())
        .parse_default_env()
        .init();

    // Run CLI and get exit code
    let exit_code = match cli::run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    };

    process::exit(exit_code);
}
