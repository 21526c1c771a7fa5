//! Command line interface for bootpack.
//!
//! Parses arguments, runs the packaging pipeline and reports the outcome.

mod args;
mod output;

pub use args::{Args, RuntimeConfig};
pub use output::OutputManager;

use crate::{
    bundler::{PackReport, Packager, Platform},
    error::Result,
};

/// Main CLI entry point.
///
/// Pipeline failures are reported here, once, and turned into exit code 1.
pub async fn run(args: Args) -> Result<i32> {
    let config = RuntimeConfig::from(&args);

    match execute(&args, &config).await {
        Ok(report) => {
            print_report(&config, &report)?;
            Ok(0)
        }
        Err(e) => {
            log::error!("Failed to create executable package: {e:?}");
            config.output().error(&format!("Failed to create executable package: {e}"))?;
            for suggestion in e.recovery_suggestions() {
                config.indent(&suggestion)?;
            }
            Ok(1)
        }
    }
}

async fn execute(args: &Args, config: &RuntimeConfig) -> Result<PackReport> {
    args.validate()?;

    let settings = args.settings_builder()?.build().await?;
    let packager = Packager::detect(settings)?;
    let settings = packager.settings();
    config.progress(&format!(
        "Package node application \"{}\" for {}...",
        settings.app_name(),
        settings.target()
    ))?;
    if settings.target().platform() != Platform::host() && settings.runtime_override().is_none() {
        config.warn(&format!(
            "Target {} differs from this host; the host node runtime will be embedded (use --node)",
            settings.target()
        ))?;
    }
    config.verbose_println(&format!(
        "Entry point: {}",
        settings.entry_point().display()
    ))?;
    config.verbose_println(&format!(
        "Staging in: {}",
        settings.staging_root().display()
    ))?;

    Ok(packager.pack().await?)
}

fn print_report(config: &RuntimeConfig, report: &PackReport) -> Result<()> {
    config.success(&format!("Created {}", report.output.display()))?;
    config.indent(&format!("Size: {} bytes", report.size))?;
    config.indent(&format!("SHA256: {}", report.checksum))?;
    config.indent(&format!("Build: {}", report.build_id))?;

    if config.debug() {
        config.section("Dependencies")?;
        if report.dependencies.is_empty() {
            config.indent("(none)")?;
        }
        for (name, version) in &report.dependencies {
            config.indent(&format!("{name}@{version}"))?;
        }
        config.verbose_println(&format!(
            "Pruned {} files ({} KB)",
            report.prune.files_removed,
            report.prune.bytes_reclaimed / 1024
        ))?;
    }
    Ok(())
}
