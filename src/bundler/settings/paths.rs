//! Path helpers for configuration: normalisation, common roots and source globbing.

use crate::bundler::error::{Error, ErrorExt, Result};
use path_absolutize::Absolutize;
use std::{
    collections::BTreeSet,
    path::{Component, Path, PathBuf},
};

/// Dependency directories never count as application sources.
const EXCLUDED_DIR: &str = "node_modules";

/// Makes `path` absolute against the current directory and removes `.`/`..` segments.
///
/// The path does not have to exist.
pub fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(path
        .absolutize()
        .fs_context("resolving absolute path of", path)?
        .into_owned())
}

/// Like [`absolute`] but resolves relative paths against `base` instead of the
/// current directory.
pub fn absolute_from(path: &Path, base: &Path) -> Result<PathBuf> {
    Ok(path
        .absolutize_from(base)
        .fs_context("resolving absolute path of", path)?
        .into_owned())
}

/// Longest shared path-segment prefix of all `paths`.
///
/// Inputs are expected to be absolute and normalised. Returns `None` for an
/// empty input or when the paths share no prefix at all (different drives).
pub fn common_root<'a, I>(paths: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut iter = paths.into_iter();
    let first = iter.next()?;
    let mut prefix: Vec<Component<'a>> = first.components().collect();

    for path in iter {
        let shared = prefix
            .iter()
            .zip(path.components())
            .take_while(|(a, b)| *a == b)
            .count();
        prefix.truncate(shared);
    }

    if prefix.is_empty() {
        None
    } else {
        Some(prefix.iter().collect())
    }
}

/// Expands shell-style brace groups: `src/*.{js,json}` → `src/*.js`, `src/*.json`.
///
/// Groups may be nested and repeated. A pattern without a complete group is
/// returned unchanged.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some(open) = pattern.find('{') else {
        return vec![pattern.to_string()];
    };

    // find the matching close brace, honouring nesting
    let mut depth = 0usize;
    let mut close = None;
    let mut splits = Vec::new();
    for (i, ch) in pattern[open..].char_indices() {
        let i = open + i;
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(i);
                    break;
                }
            }
            ',' if depth == 1 => splits.push(i),
            _ => {}
        }
    }
    let Some(close) = close else {
        return vec![pattern.to_string()];
    };

    let head = &pattern[..open];
    let tail = &pattern[close + 1..];
    let mut bounds = vec![open];
    bounds.extend(splits);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| expand_braces(&format!("{head}{}{tail}", &pattern[w[0] + 1..w[1]])))
        .collect()
}

/// Expands `patterns` (relative to `base`) into a set of absolute file paths.
///
/// Brace groups are expanded first. Directories and anything inside a
/// `node_modules` directory are skipped.
pub fn expand_sources(patterns: &[String], base: &Path) -> Result<BTreeSet<PathBuf>> {
    let expanded: Vec<String> = patterns.iter().flat_map(|p| expand_braces(p)).collect();
    match_sources(&expanded, base)
}

/// Patterns matching every file with one of `extensions` below `dir`.
///
/// `dir` is taken literally: glob metacharacters and braces in it never act as
/// pattern syntax.
pub fn patterns_below(dir: &Path, extensions: &[&str]) -> Vec<String> {
    let dir = glob::Pattern::escape(&dir.to_string_lossy());
    extensions
        .iter()
        .map(|ext| format!("{dir}/**/*.{ext}"))
        .collect()
}

/// Matches brace-free glob `patterns` (relative to `base`) against the file system.
pub fn match_sources(patterns: &[String], base: &Path) -> Result<BTreeSet<PathBuf>> {
    let mut sources = BTreeSet::new();
    let base = absolute(base)?;

    for pattern in patterns {
        let pattern_path = absolute_from(Path::new(pattern), &base)?;
        let pattern_str = pattern_path.to_string_lossy().replace('\\', "/");
        log::debug!("Expanding source glob {}", pattern_str);

        let entries = glob::glob(&pattern_str).map_err(|e| {
            Error::Config(format!("Invalid source glob \"{pattern}\": {e}"))
        })?;
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    log::warn!("Skipping unreadable path while globbing: {}", e);
                    continue;
                }
            };
            let path = absolute(&path)?;
            if !path.is_file() || is_in_excluded_dir(path.strip_prefix(&base).unwrap_or(&path)) {
                continue;
            }
            sources.insert(path);
        }
    }

    Ok(sources)
}

fn is_in_excluded_dir(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(name) if name == EXCLUDED_DIR))
}

/// Renders `path` relative to `root` with forward slashes, for metadata and archives.
pub fn to_slash_relative(path: &Path, root: &Path) -> Result<String> {
    let rel = path.strip_prefix(root)?;
    Ok(rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}
