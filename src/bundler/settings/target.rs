//! Target platform identifiers.

use crate::bundler::error::{Error, Result};
use std::{fmt, str::FromStr};

/// Operating system family of a target.
///
/// Parsed from the platform token of a freezing-tool target such as
/// `node20-win-x64` (`win`) or `latest-macos-arm64` (`macos`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Platform {
    /// Windows (`win`, `windows`)
    Windows,
    /// macOS (`macos`, `mac`, `darwin`)
    MacOs,
    /// glibc Linux (`linux`)
    Linux,
    /// musl Linux (`alpine`, `linuxstatic`)
    Alpine,
    /// FreeBSD (`freebsd`)
    FreeBsd,
}

impl Platform {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "win" | "windows" | "win32" => Some(Self::Windows),
            "macos" | "mac" | "darwin" => Some(Self::MacOs),
            "linux" => Some(Self::Linux),
            "alpine" | "linuxstatic" => Some(Self::Alpine),
            "freebsd" => Some(Self::FreeBsd),
            _ => None,
        }
    }

    /// Platform of the machine running this process.
    pub fn host() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else if cfg!(target_os = "macos") {
            Self::MacOs
        } else if cfg!(target_os = "freebsd") {
            Self::FreeBsd
        } else {
            Self::Linux
        }
    }
}

/// A freezing-tool target identifier, e.g. `node20-win-x64`.
///
/// The raw string is passed through to the tool untouched; the platform is
/// derived from it to name the runtime and output files. When no platform
/// token is present the host platform is assumed, matching the tool's default.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Target {
    raw: String,
    platform: Platform,
}

/// Default target when none is given on the command line.
pub const DEFAULT_TARGET: &str = "node20-win-x64";

impl Target {
    /// Returns the identifier as given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the operating system family.
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Whether executables for this target carry an `.exe` suffix.
    pub fn is_windows(&self) -> bool {
        self.platform == Platform::Windows
    }

    /// File name of the staged and unpacked runtime executable.
    pub fn runtime_file_name(&self) -> &'static str {
        if self.is_windows() { "node.exe" } else { "node" }
    }

    /// File name of the produced executable for an application called `name`.
    pub fn executable_file_name(&self, name: &str) -> String {
        if self.is_windows() {
            format!("{name}.exe")
        } else {
            name.to_string()
        }
    }
}

impl FromStr for Target {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim();
        if raw.is_empty() {
            return Err(Error::Config("Target platform cannot be empty".into()));
        }
        if raw.contains(',') {
            return Err(Error::Config(format!(
                "Only one target platform is supported per run, got \"{raw}\""
            )));
        }

        let platform = raw
            .to_ascii_lowercase()
            .split('-')
            .find_map(Platform::from_token)
            .unwrap_or_else(Platform::host);

        Ok(Self {
            raw: raw.to_string(),
            platform,
        })
    }
}

impl Default for Target {
    fn default() -> Self {
        Self {
            raw: DEFAULT_TARGET.to_string(),
            platform: Platform::Windows,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
