//! File system utilities for staging.
//!
//! Provides idempotent directory creation and removal, file copies with automatic
//! parent creation, and a generic tree walker shared by the pruner and size
//! accounting.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::{
    fs::FileType,
    io,
    path::{Path, PathBuf},
};
use tokio::fs;
use walkdir::WalkDir;

/// Creates all of the directories of the specified path, erasing it first if specified.
pub async fn create_dir_all(path: &Path, erase: bool) -> Result<()> {
    if erase {
        remove_dir_all(path).await?;
    }

    // create_dir_all is already idempotent - succeeds even if dir exists
    fs::create_dir_all(path)
        .await
        .fs_context("creating directory", path)
}

/// Removes the directory and its contents if it exists.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()), // Idempotent
        Err(e) => Err(e).fs_context("removing directory", path),
    }
}

/// Removes a file if it exists.
pub async fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing file", path),
    }
}

/// Copies a regular file from one path to another, creating any parent
/// directories of the destination path as necessary.
///
/// Fails if the source path is a directory or doesn't exist. Permission bits are
/// carried over, so executables stay executable.
pub async fn copy_file(from: &Path, to: &Path) -> Result<()> {
    let metadata = fs::metadata(from)
        .await
        .fs_context("reading metadata of", from)?;
    if !metadata.is_file() {
        return Err(Error::GenericError(format!("{from:?} is not a file")));
    }
    if let Some(dest_dir) = to.parent() {
        fs::create_dir_all(dest_dir)
            .await
            .fs_context("creating directory", dest_dir)?;
    }
    fs::copy(from, to).await.fs_context("copying file to", to)?;
    Ok(())
}

/// Writes `contents` to `path`, creating parent directories as needed.
pub async fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .fs_context("creating directory", parent)?;
    }
    fs::write(path, contents).await.fs_context("writing", path)
}

/// What [`walk_tree`] does with an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Leave the entry alone and do not descend into it.
    Keep,
    /// Delete the entry (recursively for directories).
    Delete,
    /// Descend into the directory. Treated as [`WalkAction::Keep`] for non-directories.
    Recurse,
}

/// An entry visited by [`walk_tree`].
#[derive(Debug)]
pub struct WalkEntry {
    /// Full path of the entry
    pub path: PathBuf,
    /// File name of the entry
    pub name: String,
    /// File type, symlinks are not followed
    pub file_type: FileType,
    /// Size in bytes (the link itself for symlinks)
    pub len: u64,
}

/// Counters accumulated by [`walk_tree`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkSummary {
    /// Non-directory entries deleted
    pub files_deleted: u64,
    /// Directories deleted
    pub dirs_deleted: u64,
    /// Entries whose deletion failed and that were left in place
    pub delete_failures: u64,
}

/// Walks `root` depth-first in name order, asking `decide` what to do with each entry.
///
/// Entries are never followed through symlinks. A failed deletion is logged and
/// counted, and the walk goes on. Blocking, callers in async code run it through
/// `spawn_blocking`.
pub fn walk_tree<F>(root: &Path, mut decide: F) -> Result<WalkSummary>
where
    F: FnMut(&WalkEntry) -> WalkAction,
{
    let mut summary = WalkSummary::default();
    let mut it = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1)
        .into_iter();

    while let Some(entry) = it.next() {
        let entry = entry?;
        let metadata = entry.metadata()?;
        let walk_entry = WalkEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            file_type: entry.file_type(),
            len: metadata.len(),
            path: entry.into_path(),
        };
        let is_dir = walk_entry.file_type.is_dir();

        match decide(&walk_entry) {
            WalkAction::Recurse => {}
            WalkAction::Keep => {
                if is_dir {
                    it.skip_current_dir();
                }
            }
            WalkAction::Delete => {
                if is_dir {
                    it.skip_current_dir();
                }
                let removed = if is_dir {
                    std::fs::remove_dir_all(&walk_entry.path)
                } else {
                    std::fs::remove_file(&walk_entry.path)
                };
                match removed {
                    Ok(()) if is_dir => summary.dirs_deleted += 1,
                    Ok(()) => summary.files_deleted += 1,
                    Err(e) => {
                        log::warn!("Failed to delete {}: {}", walk_entry.path.display(), e);
                        summary.delete_failures += 1;
                    }
                }
            }
        }
    }

    Ok(summary)
}

/// File count and total size of a tree.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TreeStats {
    /// Number of non-directory entries
    pub file_count: u64,
    /// Sum of their sizes in bytes
    pub total_size: u64,
}

/// Counts files and bytes below `root`. A missing root counts as empty.
pub fn tree_stats(root: &Path) -> Result<TreeStats> {
    let mut stats = TreeStats::default();
    if !root.exists() {
        return Ok(stats);
    }
    walk_tree(root, |entry| {
        if entry.file_type.is_dir() {
            WalkAction::Recurse
        } else {
            stats.file_count += 1;
            stats.total_size += entry.len;
            WalkAction::Keep
        }
    })?;
    Ok(stats)
}

/// Returns true when `path` is a regular file usable as an executable.
///
/// On non-Windows hosts at least one execute bit must be set.
pub fn is_executable_file(path: &Path) -> bool {
    let Ok(metadata) = std::fs::metadata(path) else {
        return false;
    };
    if !metadata.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        metadata.permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        true
    }
}
