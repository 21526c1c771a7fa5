//! User-facing terminal output.
//!
//! Progress, success and warning lines go through [`OutputManager`] so verbosity
//! is decided in one place. Diagnostics go through `log` instead.

use crossterm::style::{Color, Stylize};
use std::io::{self, Write};

/// Colored, verbosity-aware console output.
#[derive(Debug, Clone)]
pub struct OutputManager {
    verbose: bool,
    quiet: bool,
}

impl OutputManager {
    /// Creates an output manager.
    ///
    /// `verbose` enables [`verbose`](Self::verbose) lines; `quiet` silences
    /// everything except errors.
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self { verbose, quiet }
    }

    /// Whether only errors are printed.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Whether verbose lines are printed.
    pub fn is_verbose(&self) -> bool {
        self.verbose && !self.quiet
    }

    fn line(&self, prefix: &str, color: Color, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{} {}", prefix.with(color).bold(), message)
    }

    /// Prints a line only in verbose mode.
    pub fn verbose(&self, message: &str) -> io::Result<()> {
        if !self.is_verbose() {
            return Ok(());
        }
        self.line("[DEBUG] >", Color::DarkGrey, message)
    }

    /// Prints a progress line.
    pub fn progress(&self, message: &str) -> io::Result<()> {
        self.line(">>>>", Color::Green, message)
    }

    /// Prints a success line.
    pub fn success(&self, message: &str) -> io::Result<()> {
        self.line("✓", Color::Green, message)
    }

    /// Prints a warning line.
    pub fn warn(&self, message: &str) -> io::Result<()> {
        self.line("⚠", Color::Yellow, message)
    }

    /// Prints a section header.
    pub fn section(&self, title: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(io::stdout().lock(), "\n{}", title.yellow().bold())
    }

    /// Prints an indented detail line.
    pub fn indent(&self, message: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(io::stdout().lock(), "    {message}")
    }

    /// Prints an error line to stderr. Never silenced.
    pub fn error(&self, message: &str) -> io::Result<()> {
        writeln!(io::stderr().lock(), "{} {}", "✗".red().bold(), message.red())
    }
}
