//! Removal of files an installed dependency tree does not need at runtime.

use crate::bundler::{
    error::{Error, Result},
    utils::fs::{TreeStats, WalkAction, WalkEntry, tree_stats, walk_tree},
};
use std::path::{Path, PathBuf};

/// Entry names (lower-cased) removed wherever they appear.
const NAMES_TO_DELETE: &[&str] = &[
    "tsconfig.json",
    "license",
    "test",
    "tests",
    "benchmark",
    "benchmarks",
    "example",
    "examples",
    "help",
    "man",
    "doc",
    "docs",
    "types",
    "rollup",
    "makefile",
    "tsconfig",
    "tsconfigs",
    ".github",
    ".eslintrc",
];

/// Extensions (lower-cased, with the dot) removed wherever they appear.
const EXTENSIONS_TO_DELETE: &[&str] = &[".md", ".ts", ".png", ".yaml", ".yml", ".map", ".cmd"];

/// What a pruning pass removed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PruneReport {
    /// Files removed, including files inside removed directories
    pub files_removed: u64,
    /// Directories removed at the top of a deleted subtree
    pub dirs_removed: u64,
    /// Bytes reclaimed
    pub bytes_reclaimed: u64,
}

/// Extension of `name` the way Node's `path.extname` sees it: a leading dot
/// alone does not start an extension.
fn extension(name: &str) -> Option<&str> {
    let dot = name.rfind('.')?;
    (dot > 0).then(|| &name[dot..])
}

fn decide(entry: &WalkEntry) -> WalkAction {
    if entry.file_type.is_symlink() {
        return WalkAction::Delete;
    }

    let name = entry.name.to_lowercase();
    let excluded = NAMES_TO_DELETE.contains(&name.as_str())
        || extension(&name).is_some_and(|ext| EXTENSIONS_TO_DELETE.contains(&ext));

    if excluded {
        WalkAction::Delete
    } else if entry.file_type.is_dir() {
        WalkAction::Recurse
    } else {
        WalkAction::Keep
    }
}

/// Prunes `node_modules` in place. Blocking.
///
/// Only entries named in the exclusion lists and symlinks are removed; a missing
/// directory is left alone.
pub fn prune_node_modules(node_modules: &Path) -> Result<PruneReport> {
    if !node_modules.is_dir() {
        log::debug!("Nothing to prune at {}", node_modules.display());
        return Ok(PruneReport::default());
    }

    let before = tree_stats(node_modules)?;
    let summary = walk_tree(node_modules, decide)?;
    if summary.delete_failures > 0 {
        log::warn!(
            "{} entries in {} could not be pruned and were kept",
            summary.delete_failures,
            node_modules.display()
        );
    }
    let after = tree_stats(node_modules)?;

    let report = report(before, after, summary.dirs_deleted);
    log::debug!(
        "Removed {} files in total of {} KB",
        report.files_removed,
        report.bytes_reclaimed / 1024
    );
    Ok(report)
}

fn report(before: TreeStats, after: TreeStats, dirs_removed: u64) -> PruneReport {
    PruneReport {
        files_removed: before.file_count.saturating_sub(after.file_count),
        dirs_removed,
        bytes_reclaimed: before.total_size.saturating_sub(after.total_size),
    }
}

/// Runs [`prune_node_modules`] on the blocking thread pool.
pub async fn prune(node_modules: PathBuf) -> Result<PruneReport> {
    tokio::task::spawn_blocking(move || prune_node_modules(&node_modules))
        .await
        .map_err(|e| Error::GenericError(format!("Pruning task failed: {e}")))?
}
