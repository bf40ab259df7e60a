// Source directory listing

use std::io;
use std::path::{Component, Path};

use walkdir::WalkDir;

use crate::types::{FileEntry, WalkError};

/// List every regular file under `source_dir`, recursively.
///
/// Symlinks are followed and entries come back in file-name order, so two
/// walks of the same tree yield the same sequence. A symlink pointing back at
/// one of its ancestors fails with [`WalkError::Cycle`].
pub fn list_files(source_dir: &Path) -> Result<Vec<FileEntry>, WalkError> {
    let metadata = std::fs::metadata(source_dir).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => WalkError::NotFound(source_dir.to_path_buf()),
        _ => WalkError::Io {
            path: source_dir.to_path_buf(),
            source: e,
        },
    })?;
    if !metadata.is_dir() {
        return Err(WalkError::NotADirectory(source_dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(source_dir)
        .follow_links(true)
        .min_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| walk_error(source_dir, e))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(source_dir).map_err(|_| WalkError::Io {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidInput, "entry outside source directory"),
        })?;

        files.push(FileEntry {
            key: object_key(relative).ok_or_else(|| WalkError::Io {
                path: path.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidData, "file name is not valid UTF-8"),
            })?,
            path: path.to_path_buf(),
        });
    }

    Ok(files)
}

/// Relative path to object key: normal components joined by `/`.
pub fn object_key(relative: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(parts.join("/"))
}

fn walk_error(source_dir: &Path, e: walkdir::Error) -> WalkError {
    let path = e
        .path()
        .unwrap_or(source_dir)
        .to_path_buf();

    if let Some(ancestor) = e.loop_ancestor() {
        return WalkError::Cycle {
            path,
            ancestor: ancestor.to_path_buf(),
        };
    }

    let source = e
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("directory walk failed"));
    WalkError::Io { path, source }
}
