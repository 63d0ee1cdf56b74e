//! Markdown rendering of a derived selection.

use crate::error::Result;
use crate::fs::{DirectoryReader, EntryKind, abs_path, join_rel, sort_entries};
use crate::oracle::{IgnoreOracle, is_ignored};
use crate::rules::RuleSet;
use crate::sanitize::{ContentSanitizer, escape_code_fences};
use chrono::{DateTime, Utc};
use log;
use serde::Serialize;
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

const BINARY_SNIFF_LEN: usize = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewOptions {
    pub enabled: bool,
    pub max_file_size: u64,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_file_size: crate::config::DEFAULT_MAX_PREVIEW_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EntryCount {
    pub directories: usize,
    pub files: usize,
    pub bytes: u64,
}

pub struct Renderer<'a> {
    root: &'a Path,
    reader: &'a dyn DirectoryReader,
    filter: &'a dyn IgnoreOracle,
    sanitizer: &'a dyn ContentSanitizer,
    preview: PreviewOptions,
    generated_at: Option<DateTime<Utc>>,
}

impl<'a> Renderer<'a> {
    /// `filter` must already carry the overrides and excludes of the rule set.
    pub fn new(
        root: &'a Path,
        reader: &'a dyn DirectoryReader,
        filter: &'a dyn IgnoreOracle,
        sanitizer: &'a dyn ContentSanitizer,
    ) -> Self {
        Self {
            root,
            reader,
            filter,
            sanitizer,
            preview: PreviewOptions::default(),
            generated_at: None,
        }
    }

    pub fn with_preview(mut self, preview: PreviewOptions) -> Self {
        self.preview = preview;
        self
    }

    pub fn with_timestamp(mut self, generated_at: Option<DateTime<Utc>>) -> Self {
        self.generated_at = generated_at;
        self
    }

    pub fn render<W: Write>(&self, rules: &RuleSet, out: &mut W) -> Result<EntryCount> {
        let mut count = EntryCount::default();
        writeln!(out, "# Project Structure for {}", self.root.display())?;
        writeln!(out)?;
        if let Some(ts) = self.generated_at {
            writeln!(out, "_Generated: {}_", ts.to_rfc3339())?;
            writeln!(out)?;
        }

        for rel in &rules.loose_files {
            if is_ignored(self.filter, rel, false) {
                log::debug!("Loose file '{}' is filtered out", rel);
                continue;
            }
            self.write_file(out, rel, rel, 0, &mut count)?;
        }

        for rel in &rules.roots {
            if is_ignored(self.filter, rel, true) {
                log::debug!("Root '{}' is filtered out", rel);
                continue;
            }
            writeln!(out, "- **{}/**", rel)?;
            count.directories += 1;
            self.write_dir(out, rel, 1, &mut count)?;
        }

        out.flush()?;
        log::info!(
            "Rendered {} directories and {} files ({} bytes)",
            count.directories,
            count.files,
            count.bytes
        );
        Ok(count)
    }

    /// Same traversal as [`render`](Self::render), without output or previews.
    pub fn count(&self, rules: &RuleSet) -> Result<EntryCount> {
        let quiet = Renderer {
            preview: PreviewOptions {
                enabled: false,
                ..self.preview
            },
            generated_at: None,
            ..*self
        };
        quiet.render(rules, &mut io::sink())
    }

    fn write_dir<W: Write>(
        &self,
        out: &mut W,
        rel: &str,
        depth: usize,
        count: &mut EntryCount,
    ) -> Result<()> {
        let mut entries = match self.reader.list_directory(&abs_path(self.root, rel)) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Skipping unreadable directory '{}': {}", rel, e);
                return Ok(());
            }
        };
        sort_entries(&mut entries);

        let indent = "  ".repeat(depth);
        for entry in entries {
            let child = join_rel(rel, &entry.name);
            match entry.kind {
                EntryKind::Directory => {
                    if is_ignored(self.filter, &child, true) {
                        continue;
                    }
                    writeln!(out, "{}- **{}/**", indent, entry.name)?;
                    count.directories += 1;
                    self.write_dir(out, &child, depth + 1, count)?;
                }
                EntryKind::File => {
                    if is_ignored(self.filter, &child, false) {
                        continue;
                    }
                    self.write_file(out, &child, &entry.name, depth, count)?;
                }
                EntryKind::Other => {
                    log::trace!("Skipping non-regular entry '{}'", child);
                }
            }
        }
        Ok(())
    }

    fn write_file<W: Write>(
        &self,
        out: &mut W,
        rel: &str,
        label: &str,
        depth: usize,
        count: &mut EntryCount,
    ) -> Result<()> {
        let path = abs_path(self.root, rel);
        let size = match fs::metadata(&path) {
            Ok(meta) => meta.len(),
            Err(e) => {
                log::warn!("Skipping unreadable file '{}': {}", rel, e);
                return Ok(());
            }
        };
        count.files += 1;
        count.bytes += size;

        let indent = "  ".repeat(depth);
        if size > 0 {
            writeln!(out, "{}- {} ({} bytes)", indent, label, size)?;
        } else {
            writeln!(out, "{}- {}", indent, label)?;
        }

        if let Some(content) = self.read_preview(&path, size) {
            let cleaned = self.sanitizer.sanitize(&content);
            let escaped = escape_code_fences(&cleaned);
            let body = escaped.trim_end_matches('\n');
            if !body.trim().is_empty() {
                writeln!(out, "{}  - Content preview:", indent)?;
                writeln!(out, "```")?;
                writeln!(out, "{}", body)?;
                writeln!(out, "```")?;
            }
        }
        Ok(())
    }

    /// Text content for small, non-binary, UTF-8 files.
    fn read_preview(&self, path: &Path, size: u64) -> Option<String> {
        if !self.preview.enabled || size == 0 {
            return None;
        }
        if size > self.preview.max_file_size {
            log::debug!("No preview for {}: {} bytes over limit", path.display(), size);
            return None;
        }
        let mut bytes = Vec::with_capacity(size as usize);
        if let Err(e) = fs::File::open(path).and_then(|mut f| f.read_to_end(&mut bytes)) {
            log::warn!("Could not read {} for preview: {}", path.display(), e);
            return None;
        }
        let sniff = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
        if sniff.contains(&0) {
            log::debug!("No preview for binary file {}", path.display());
            return None;
        }
        match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(_) => {
                log::debug!("No preview for non-UTF-8 file {}", path.display());
                None
            }
        }
    }
}
