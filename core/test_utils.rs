use crate::fs::{DirEntry, DirectoryReadError, DirectoryReader, abs_path};
use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const PROJECT_ROOT: &str = "/proj";

#[derive(Debug, Default)]
pub struct FakeReader {
    dirs: HashMap<PathBuf, Vec<DirEntry>>,
    calls: Cell<usize>,
}

impl FakeReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the listing for `rel`, relative to [`PROJECT_ROOT`].
    pub fn dir(mut self, rel: &str, entries: Vec<DirEntry>) -> Self {
        self.dirs
            .insert(abs_path(Path::new(PROJECT_ROOT), rel), entries);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl DirectoryReader for FakeReader {
    fn list_directory(&self, path: &Path) -> Result<Vec<DirEntry>, DirectoryReadError> {
        self.calls.set(self.calls.get() + 1);
        self.dirs
            .get(path)
            .cloned()
            .ok_or_else(|| DirectoryReadError::NotFound(path.to_path_buf()))
    }
}

/// A small project with nested, dot and ignored entries.
pub fn sample_project() -> FakeReader {
    FakeReader::new()
        .dir(
            "",
            vec![
                DirEntry::dir("src"),
                DirEntry::dir("docs"),
                DirEntry::dir(".github"),
                DirEntry::dir("node_modules"),
                DirEntry::file("README.md"),
                DirEntry::file(".env"),
                DirEntry::file("Cargo.toml"),
            ],
        )
        .dir(
            "src",
            vec![
                DirEntry::dir("lib"),
                DirEntry::dir("bin"),
                DirEntry::dir(".cache"),
                DirEntry::file("main.rs"),
                DirEntry::file("util.rs"),
                DirEntry::file(".secret"),
            ],
        )
        .dir(
            "src/lib",
            vec![
                DirEntry::file("a.rs"),
                DirEntry::file("b.rs"),
                DirEntry::dir("generated"),
            ],
        )
        .dir("src/lib/generated", vec![DirEntry::file("x.rs")])
        .dir("src/bin", vec![DirEntry::file("tool.rs")])
        .dir("src/.cache", vec![DirEntry::file("blob")])
        .dir(
            "docs",
            vec![DirEntry::file("guide.md"), DirEntry::file(".draft.md")],
        )
        .dir(
            ".github",
            vec![DirEntry::dir("workflows"), DirEntry::file("CODEOWNERS")],
        )
        .dir(".github/workflows", vec![DirEntry::file("ci.yml")])
        .dir("node_modules", vec![DirEntry::dir("pkg")])
        .dir("node_modules/pkg", vec![DirEntry::file("index.js")])
}

/// Ignores `node_modules` and `generated` anywhere, plus every dot path.
pub fn sample_oracle() -> impl Fn(&str) -> bool {
    |rel: &str| {
        rel.trim_end_matches('/').split('/').any(|segment| {
            segment == "node_modules" || segment == "generated" || segment.starts_with('.')
        })
    }
}
