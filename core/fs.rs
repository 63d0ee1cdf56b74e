use log;
use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    /// Symlinks, sockets and anything else that is neither a plain file nor a directory.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub kind: EntryKind,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn dir(name: impl Into<String>) -> Self {
        Self::new(name, EntryKind::Directory)
    }

    pub fn file(name: impl Into<String>) -> Self {
        Self::new(name, EntryKind::File)
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

#[derive(Error, Debug)]
pub enum DirectoryReadError {
    #[error("Directory not found: {0}")]
    NotFound(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to read directory '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DirectoryReadError {
    fn from_io(path: &Path, err: io::Error) -> Self {
        let path = path.to_path_buf();
        match err.kind() {
            io::ErrorKind::NotFound => DirectoryReadError::NotFound(path),
            io::ErrorKind::PermissionDenied => DirectoryReadError::PermissionDenied(path),
            io::ErrorKind::NotADirectory => DirectoryReadError::NotADirectory(path),
            _ => DirectoryReadError::Io { path, source: err },
        }
    }
}

/// Lists the immediate children of a directory.
pub trait DirectoryReader {
    fn list_directory(&self, path: &Path) -> Result<Vec<DirEntry>, DirectoryReadError>;
}

/// Reads straight from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsReader;

impl DirectoryReader for FsReader {
    fn list_directory(&self, path: &Path) -> Result<Vec<DirEntry>, DirectoryReadError> {
        log::trace!("Listing directory: {}", path.display());
        let read_dir = fs::read_dir(path).map_err(|e| DirectoryReadError::from_io(path, e))?;

        let mut entries = Vec::new();
        for entry_result in read_dir {
            let entry = entry_result.map_err(|e| DirectoryReadError::from_io(path, e))?;
            // file_type() does not follow symlinks
            let kind = match entry.file_type() {
                Ok(ft) if ft.is_dir() => EntryKind::Directory,
                Ok(ft) if ft.is_file() => EntryKind::File,
                Ok(_) => EntryKind::Other,
                Err(e) => {
                    log::debug!(
                        "Could not determine type of {}: {}",
                        entry.path().display(),
                        e
                    );
                    EntryKind::Other
                }
            };
            entries.push(DirEntry::new(
                entry.file_name().to_string_lossy().into_owned(),
                kind,
            ));
        }
        Ok(entries)
    }
}

/// Directories before everything else, then by name.
pub fn compare_entries(a_is_dir: bool, a_name: &str, b_is_dir: bool, b_name: &str) -> Ordering {
    b_is_dir.cmp(&a_is_dir).then_with(|| a_name.cmp(b_name))
}

pub fn sort_entries(entries: &mut [DirEntry]) {
    entries.sort_by(|a, b| compare_entries(a.is_dir(), &a.name, b.is_dir(), &b.name));
}

/// Joins a parent key and a child name into a forward-slash relative path.
pub fn join_rel(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

/// Resolves a forward-slash relative key against the project root.
pub fn abs_path(root: &Path, rel: &str) -> PathBuf {
    rel.split('/')
        .filter(|segment| !segment.is_empty())
        .fold(root.to_path_buf(), |acc, segment| acc.join(segment))
}
