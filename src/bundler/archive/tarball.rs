//! Deterministic gzip-compressed tar containers.

use crate::bundler::error::{Error, ErrorExt, Result};
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use std::{
    fs::{self, File},
    io::{BufReader, BufWriter, Write},
    path::{Component, Path, PathBuf},
};
use tar::{EntryType, Header};

fn header(entry_type: EntryType, mode: u32, size: u64) -> Header {
    let mut header = Header::new_gnu();
    header.set_entry_type(entry_type);
    header.set_mtime(0);
    header.set_uid(0);
    header.set_gid(0);
    header.set_mode(mode);
    header.set_size(size);
    header
}

fn file_mode(metadata: &fs::Metadata) -> u32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 != 0 {
            return 0o755;
        }
    }
    let _ = metadata;
    0o644
}

fn finish<W: Write>(builder: tar::Builder<GzEncoder<W>>, dest: &Path) -> Result<()> {
    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .and_then(|mut w| w.flush())
        .fs_context("writing archive", dest)
}

fn create(dest: &Path) -> Result<tar::Builder<GzEncoder<BufWriter<File>>>> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).fs_context("creating directory", parent)?;
    }
    let file = File::create(dest).fs_context("creating archive", dest)?;
    let mut builder = tar::Builder::new(GzEncoder::new(BufWriter::new(file), Compression::best()));
    builder.follow_symlinks(false);
    Ok(builder)
}

/// Archives the contents of `root` into `dest`, with paths relative to `root`.
///
/// Entries are sorted and carry no timestamps or owners, so identical trees give
/// identical bytes. Symlinks are skipped. Returns the number of files archived.
pub fn pack_dir(root: &Path, dest: &Path) -> Result<u64> {
    let mut builder = create(dest)?;
    let mut files = 0;

    for entry in walkdir::WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(1)
    {
        let entry = entry?;
        let rel = entry.path().strip_prefix(root)?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            let mut header = header(EntryType::Directory, 0o755, 0);
            builder
                .append_data(&mut header, rel, std::io::empty())
                .fs_context("archiving", entry.path())?;
        } else if file_type.is_file() {
            let metadata = entry.metadata()?;
            let mut header = header(EntryType::Regular, file_mode(&metadata), metadata.len());
            let file = File::open(entry.path()).fs_context("opening", entry.path())?;
            builder
                .append_data(&mut header, rel, BufReader::new(file))
                .fs_context("archiving", entry.path())?;
            files += 1;
        } else {
            log::debug!("Skipping {} while archiving", entry.path().display());
        }
    }

    finish(builder, dest)?;
    Ok(files)
}

/// Archives a single file into `dest` as the only entry, named `name`.
pub fn pack_file(file: &Path, name: &str, dest: &Path) -> Result<()> {
    let mut builder = create(dest)?;
    let metadata = fs::metadata(file).fs_context("reading metadata of", file)?;
    let mut header = header(EntryType::Regular, file_mode(&metadata), metadata.len());
    let reader = File::open(file).fs_context("opening", file)?;
    builder
        .append_data(&mut header, name, BufReader::new(reader))
        .fs_context("archiving", file)?;
    finish(builder, dest)
}

/// Extracts a tar.gz archive into `dest_dir`, creating it if needed.
///
/// Entries that would land outside `dest_dir` are rejected. Returns the paths
/// of the extracted files, relative to `dest_dir`.
pub fn extract_tar_gz(archive_path: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dest_dir).fs_context("creating directory", dest_dir)?;

    let file = File::open(archive_path).fs_context("opening archive", archive_path)?;
    let mut archive = tar::Archive::new(GzDecoder::new(BufReader::new(file)));
    let mut extracted = Vec::new();

    for entry in archive.entries().fs_context("reading archive", archive_path)? {
        let mut entry = entry.fs_context("reading archive", archive_path)?;
        let relative_path: PathBuf = entry
            .path()
            .fs_context("reading archive", archive_path)?
            .into_owned();

        if relative_path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(Error::GenericError(format!(
                "Invalid path in archive {}: {}",
                archive_path.display(),
                relative_path.display()
            )));
        }

        let absolute_path = dest_dir.join(&relative_path);
        match entry.header().entry_type() {
            EntryType::Directory => {
                fs::create_dir_all(&absolute_path)
                    .fs_context("creating directory", &absolute_path)?;
            }
            EntryType::Regular => {
                if let Some(parent) = absolute_path.parent() {
                    fs::create_dir_all(parent).fs_context("creating directory", parent)?;
                }
                entry
                    .unpack(&absolute_path)
                    .fs_context("extracting", &absolute_path)?;
                extracted.push(relative_path);
            }
            other => log::debug!(
                "Skipping {:?} entry {} in {}",
                other,
                relative_path.display(),
                archive_path.display()
            ),
        }
    }

    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn round_trip_preserves_layout_and_bytes() {
        let src = tempfile::tempdir().unwrap();
        touch(src.path(), "index.js", "console.log('hi')");
        touch(src.path(), "lib/util.js", "module.exports = {}");
        touch(src.path(), "lib/deep/data.json", "{\"a\":1}");
        fs::create_dir_all(src.path().join("empty")).unwrap();

        let out = tempfile::tempdir().unwrap();
        let archive = out.path().join("app.tar.gz");
        assert_eq!(pack_dir(src.path(), &archive).unwrap(), 3);

        let dest = out.path().join("unpacked");
        let mut files = extract_tar_gz(&archive, &dest).unwrap();
        files.sort();
        assert_eq!(
            files,
            vec![
                PathBuf::from("index.js"),
                PathBuf::from("lib/deep/data.json"),
                PathBuf::from("lib/util.js"),
            ]
        );
        assert_eq!(
            fs::read_to_string(dest.join("lib/util.js")).unwrap(),
            "module.exports = {}"
        );
        assert!(dest.join("empty").is_dir());
    }

    #[test]
    fn identical_trees_give_identical_bytes() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        // written in different orders
        touch(a.path(), "z.js", "z");
        touch(a.path(), "a/b.js", "b");
        touch(b.path(), "a/b.js", "b");
        touch(b.path(), "z.js", "z");

        let out = tempfile::tempdir().unwrap();
        pack_dir(a.path(), &out.path().join("a.tar.gz")).unwrap();
        pack_dir(b.path(), &out.path().join("b.tar.gz")).unwrap();

        assert_eq!(
            fs::read(out.path().join("a.tar.gz")).unwrap(),
            fs::read(out.path().join("b.tar.gz")).unwrap()
        );
    }

    #[cfg(unix)]
    #[test]
    fn single_file_keeps_execute_bit() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let runtime = dir.path().join("node-binary");
        fs::write(&runtime, "#!/bin/sh\nexit 0\n").unwrap();
        fs::set_permissions(&runtime, fs::Permissions::from_mode(0o700)).unwrap();

        let archive = dir.path().join("node.tar.gz");
        pack_file(&runtime, "node", &archive).unwrap();

        let dest = dir.path().join("out");
        assert_eq!(extract_tar_gz(&archive, &dest).unwrap(), vec![PathBuf::from("node")]);
        let mode = fs::metadata(dest.join("node")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn empty_tree_round_trips() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let archive = out.path().join("empty.tar.gz");
        assert_eq!(pack_dir(src.path(), &archive).unwrap(), 0);
        assert!(extract_tar_gz(&archive, &out.path().join("x")).unwrap().is_empty());
    }
}
