//! File system utilities for the build workspace.
//!
//! Idempotent removal that tolerates missing paths, recursive directory copy
//! with overwrite semantics, and empty-directory pruning.

use crate::bundler::error::{Error, ErrorExt, Result};
use std::{
    io,
    path::{Path, PathBuf},
};
use tokio::fs;

/// Removes the directory and its contents if it exists.
///
/// "Not found" is success; any other error is returned with the path attached.
pub async fn remove_dir_all(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing directory", path),
    }
}

/// Removes a single file if it exists.
pub async fn remove_file(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("removing file", path),
    }
}

/// Removes `path` whether it is a file or a directory.
pub async fn remove_path(path: &Path) -> Result<()> {
    match fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => remove_dir_all(path).await,
        Ok(_) => remove_file(path).await,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).fs_context("inspecting path", path),
    }
}

/// Returns true if `path` exists. Permission errors count as absent.
pub async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Recursively copies a directory from one path to another, creating any
/// parent directories of the destination path as necessary.
///
/// Existing destination files are overwritten and symlinks are followed, so
/// the destination only ever holds regular files and directories. Fails if
/// the source path is not a directory or doesn't exist.
///
/// Returns the number of files copied.
pub async fn copy_dir(from: &Path, to: &Path) -> Result<usize> {
    let meta = fs::metadata(from)
        .await
        .fs_context("reading source directory", from)?;
    if !meta.is_dir() {
        return Err(Error::GenericError(format!(
            "{} is not a directory",
            from.display()
        )));
    }
    fs::create_dir_all(to)
        .await
        .fs_context("creating directory", to)?;

    let mut copied = 0;
    for entry in walkdir::WalkDir::new(from).follow_links(true) {
        let entry = entry?;
        debug_assert!(entry.path().starts_with(from));
        let rel_path = entry.path().strip_prefix(from)?;
        let dest_path = to.join(rel_path);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest_path)
                .await
                .fs_context("creating directory", &dest_path)?;
        } else {
            fs::copy(entry.path(), &dest_path)
                .await
                .fs_context("copying file", entry.path())?;
            copied += 1;
        }
    }

    log::debug!(
        "Copied {} files from {} to {}",
        copied,
        from.display(),
        to.display()
    );
    Ok(copied)
}

/// Returns the first candidate that exists, in order.
pub fn first_existing<I, P>(candidates: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    candidates
        .into_iter()
        .map(|p| p.as_ref().to_path_buf())
        .find(|p| p.exists())
}

/// Removes `start` and then each parent while it is empty, stopping at
/// `stop` (never removed) or the first non-empty directory.
///
/// Blocking; call from a blocking context. Returns the directories removed.
pub fn prune_empty_dirs(start: &Path, stop: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    let mut current = Some(start);

    while let Some(dir) = current {
        if !dir.starts_with(stop) || dir == stop {
            break;
        }
        current = dir.parent();

        let mut entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e).fs_context("reading directory", dir),
        };
        if entries.next().is_some() {
            break;
        }

        std::fs::remove_dir(dir).fs_context("removing empty directory", dir)?;
        removed.push(dir.to_path_buf());
    }

    Ok(removed)
}

/// Moves `from` to `to`, merging into `to` if it already exists.
///
/// Directories present on both sides are merged recursively; files in `from`
/// replace files in `to`. Blocking; call from a blocking context.
pub fn move_dir_merge(from: &Path, to: &Path) -> Result<()> {
    if !to.exists() {
        if let Some(parent) = to.parent() {
            std::fs::create_dir_all(parent).fs_context("creating directory", parent)?;
        }
        return std::fs::rename(from, to).fs_context("moving directory", from);
    }

    for entry in std::fs::read_dir(from).fs_context("reading directory", from)? {
        let entry = entry.fs_context("reading directory", from)?;
        let src = entry.path();
        let dest = to.join(entry.file_name());
        let is_dir = entry
            .file_type()
            .fs_context("inspecting path", &src)?
            .is_dir();

        if is_dir && dest.is_dir() {
            move_dir_merge(&src, &dest)?;
        } else {
            if dest.is_dir() {
                std::fs::remove_dir_all(&dest).fs_context("removing directory", &dest)?;
            } else if dest.exists() {
                std::fs::remove_file(&dest).fs_context("removing file", &dest)?;
            }
            std::fs::rename(&src, &dest).fs_context("moving file", &src)?;
        }
    }

    std::fs::remove_dir(from).fs_context("removing directory", from)
}
