use crate::config::Config;
use crate::error::{AppError, Result};
use crate::rules::Override;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use log;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const DOT_FILE_PATTERN: &str = ".*";

pub trait IgnoreOracle {
    fn ignores(&self, rel_path: &str) -> bool;

    /// Whether names starting with `.` are left out unless the user opts in.
    fn hides_dot_files(&self) -> bool {
        true
    }
}

impl<F> IgnoreOracle for F
where
    F: Fn(&str) -> bool,
{
    fn ignores(&self, rel_path: &str) -> bool {
        self(rel_path)
    }
}

/// Asks the oracle about `rel`, and for directories also about `rel/`.
pub fn is_ignored(oracle: &dyn IgnoreOracle, rel: &str, is_dir: bool) -> bool {
    oracle.ignores(rel) || (is_dir && oracle.ignores(&format!("{}/", rel)))
}

/// A dot entry only counts as one while the oracle hides dot files.
pub fn is_dot_entry(oracle: &dyn IgnoreOracle, name: &str) -> bool {
    oracle.hides_dot_files() && name.starts_with('.')
}

/// Ordered gitignore lines anchored at the project root. Later lines win.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    root: PathBuf,
    lines: Vec<String>,
    hide_dot_files: bool,
}

impl IgnoreRules {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            lines: Vec::new(),
            hide_dot_files: false,
        }
    }

    /// Root `.gitignore`, built-in and configured skips, then the dot-file convention.
    pub fn from_config(root: &Path, config: &Config) -> Result<Self> {
        let mut rules = Self::new(root);

        if config.general.use_gitignore {
            let gitignore_path = root.join(".gitignore");
            match fs::read_to_string(&gitignore_path) {
                Ok(content) => {
                    log::debug!("Loaded ignore rules from {}", gitignore_path.display());
                    for line in content.lines() {
                        rules.push_line(line);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    log::trace!("No .gitignore at {}", gitignore_path.display());
                }
                Err(e) => {
                    return Err(AppError::FileRead {
                        path: gitignore_path,
                        source: e,
                    });
                }
            }
        }

        for dir in config.effective_skip_dirs() {
            rules.push_line(&format!("{}/", dir.trim_end_matches('/')));
        }
        for file in config.effective_skip_files() {
            rules.push_line(&file);
        }
        if config.general.ignore_dot_files {
            rules.push_line(DOT_FILE_PATTERN);
            rules.hide_dot_files = true;
        }

        let output_path = config.output_path(root);
        if let Ok(rel) = output_path.strip_prefix(root) {
            let rel = rel.to_string_lossy().replace('\\', "/");
            if !rel.is_empty() {
                log::trace!("Excluding output document from traversal: {}", rel);
                rules.push_line(&format!("/{}", escape_pattern(&rel)));
            }
        }

        log::debug!("Assembled {} ignore rule lines", rules.lines.len());
        Ok(rules)
    }

    pub fn push_line(&mut self, line: &str) {
        let trimmed = line.trim_end();
        if trimmed.trim().is_empty() || trimmed.trim_start().starts_with('#') {
            return;
        }
        self.lines.push(trimmed.to_string());
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Re-includes each override path, and everything beneath it for directories.
    pub fn with_overrides(&self, overrides: &[Override]) -> Self {
        let mut next = self.clone();
        for item in overrides {
            let path = escape_pattern(item.path.trim_start_matches("./"));
            next.lines.push(format!("!/{}", path));
            if item.is_dir {
                next.lines.push(format!("!/{}/**", path));
            }
        }
        next
    }

    /// Carves deselected subtrees out of otherwise included roots.
    pub fn with_excludes(&self, excludes: &[String]) -> Self {
        let mut next = self.clone();
        for rel in excludes {
            let path = escape_pattern(rel);
            next.lines.push(format!("/{}", path));
            next.lines.push(format!("/{}/**", path));
        }
        next
    }

    pub fn build(&self) -> Result<GitignoreOracle> {
        let mut builder = GitignoreBuilder::new(&self.root);
        for line in &self.lines {
            builder.add_line(None, line).map_err(|e| {
                log::error!("Invalid ignore pattern \"{}\": {}", line, e);
                AppError::Pattern(format!("Invalid ignore pattern \"{}\": {}", line, e))
            })?;
        }
        let matcher = builder.build()?;
        Ok(GitignoreOracle {
            matcher,
            hide_dot_files: self.hide_dot_files,
        })
    }
}

#[derive(Debug, Clone)]
pub struct GitignoreOracle {
    matcher: Gitignore,
    hide_dot_files: bool,
}

impl IgnoreOracle for GitignoreOracle {
    fn ignores(&self, rel_path: &str) -> bool {
        let is_dir = rel_path.ends_with('/');
        let trimmed = rel_path.trim_end_matches('/');
        if trimmed.is_empty() {
            return false;
        }
        let ignored = self
            .matcher
            .matched_path_or_any_parents(Path::new(trimmed), is_dir)
            .is_ignore();
        log::trace!("Ignore check {} -> {}", rel_path, ignored);
        ignored
    }

    fn hides_dot_files(&self) -> bool {
        self.hide_dot_files
    }
}

/// Escapes glob metacharacters so a literal path can be used as a pattern.
fn escape_pattern(path: &str) -> String {
    let mut escaped = String::with_capacity(path.len());
    for ch in path.chars() {
        if matches!(ch, '*' | '?' | '[' | ']' | '\\' | '!' | '#') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
