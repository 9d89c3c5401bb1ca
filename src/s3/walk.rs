use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::error::{Result, UploadError};

/// Lazily enumerate every non-directory entry under `root`
///
/// Entries are sorted by file name within each directory, so two walks over
/// the same tree yield the same order. Symlinks are not followed; a link is
/// yielded like a file. Traversal errors are yielded in place and the caller
/// decides whether to stop.
pub fn walk_files(root: &Path) -> impl Iterator<Item = Result<PathBuf>> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_dir() => None,
            Ok(entry) => Some(Ok(entry.into_path())),
            Err(e) => Some(Err(UploadError::from(e))),
        })
}
