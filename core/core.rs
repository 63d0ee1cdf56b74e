pub mod config;
pub mod error;
pub mod fs;
pub mod oracle;
pub mod output_formats;
pub mod render;
pub mod rules;
pub mod sanitize;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::{Config, split_list};
pub use error::{AppError, Result};
pub use fs::{DirEntry, DirectoryReadError, DirectoryReader, EntryKind, FsReader};
pub use oracle::{GitignoreOracle, IgnoreOracle, IgnoreRules, is_ignored};
pub use output_formats::{BuiltinIgnores, get_builtin_ignore_patterns};
pub use render::{EntryCount, PreviewOptions, Renderer};
pub use rules::{
    Override, ReviewItem, RuleSet, explicit_excludes, review_candidates, selected_loose_files,
    selected_roots,
};
pub use sanitize::{ContentSanitizer, NoopSanitizer, SecretRedactor};
pub use tree::{Node, Selection, SelectionTree, TopLevelEntry, VisibleRow};
