use crate::fs::{DirectoryReader, abs_path, join_rel, sort_entries};
use crate::oracle::{IgnoreOracle, is_dot_entry, is_ignored};
use crate::tree::{ROOT_KEY, Selection, SelectionTree};
use log;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Override {
    pub path: String,
    pub is_dir: bool,
}

impl Override {
    pub fn new(path: impl Into<String>, is_dir: bool) -> Self {
        Self {
            path: path.into(),
            is_dir,
        }
    }
}

/// An excluded-by-default entry offered to the user before generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewItem {
    pub rel_path: String,
    pub name: String,
    pub is_dir: bool,
    /// Directly under the project root rather than under a selected directory.
    pub top_level: bool,
}

impl ReviewItem {
    pub fn to_override(&self) -> Override {
        Override::new(self.rel_path.clone(), self.is_dir)
    }
}

pub fn is_within(path: &str, ancestor: &str) -> bool {
    path == ancestor
        || (path.len() > ancestor.len()
            && path.starts_with(ancestor)
            && path.as_bytes()[ancestor.len()] == b'/')
}

/// Directories with any selection whose ancestors are all unselected, in tree order.
pub fn selected_roots(tree: &SelectionTree) -> Vec<String> {
    tree.preorder()
        .into_iter()
        .filter(|node| node.is_dir && node.selection.is_selected())
        .filter(|node| {
            tree.ancestors(&node.rel_path)
                .iter()
                .all(|a| tree.get(a).is_some_and(|n| n.selection == Selection::None))
        })
        .map(|node| node.rel_path.clone())
        .collect()
}

/// Unselected nodes sitting somewhere under a selected root.
pub fn explicit_excludes(tree: &SelectionTree) -> Vec<String> {
    let roots = selected_roots(tree);
    tree.preorder()
        .into_iter()
        .filter(|node| node.selection == Selection::None)
        .filter(|node| {
            tree.ancestors(&node.rel_path)
                .iter()
                .any(|a| roots.iter().any(|r| r == a))
        })
        .map(|node| node.rel_path.clone())
        .collect()
}

/// Selected files with no selected directory above them.
pub fn selected_loose_files(tree: &SelectionTree) -> Vec<String> {
    tree.preorder()
        .into_iter()
        .filter(|node| !node.is_dir && node.selection.is_selected())
        .filter(|node| {
            tree.ancestors(&node.rel_path)
                .iter()
                .all(|a| tree.get(a).is_some_and(|n| n.selection == Selection::None))
        })
        .map(|node| node.rel_path.clone())
        .collect()
}

/// Dot/ignored entries that would be silently left out: the unselected
/// top-level ones, then the unselected immediate children of each selected
/// root. Children of roots that were never expanded are listed on demand.
pub fn review_candidates(
    tree: &SelectionTree,
    root: &Path,
    reader: &dyn DirectoryReader,
    oracle: &dyn IgnoreOracle,
) -> Vec<ReviewItem> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for node in tree.children_of(ROOT_KEY) {
        if node.is_excluded_by_default() && node.selection == Selection::None {
            seen.insert(node.rel_path.clone());
            items.push(ReviewItem {
                rel_path: node.rel_path.clone(),
                name: node.name.clone(),
                is_dir: node.is_dir,
                top_level: true,
            });
        }
    }

    for dir in selected_roots(tree) {
        let Some(node) = tree.get(&dir) else {
            continue;
        };
        let children: Vec<(String, String, bool, bool)> = if node.is_loaded() {
            tree.children_of(&dir)
                .filter(|c| c.is_excluded_by_default() && c.selection == Selection::None)
                .map(|c| (c.rel_path.clone(), c.name.clone(), c.is_dir, true))
                .collect()
        } else {
            let mut entries = match reader.list_directory(&abs_path(root, &dir)) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("Skipping review of '{}': {}", dir, e);
                    continue;
                }
            };
            sort_entries(&mut entries);
            entries
                .into_iter()
                .map(|e| {
                    let rel = join_rel(&dir, &e.name);
                    let is_dir = e.is_dir();
                    let excluded =
                        is_dot_entry(oracle, &e.name) || is_ignored(oracle, &rel, is_dir);
                    (rel, e.name, is_dir, excluded)
                })
                .filter(|(_, _, _, excluded)| *excluded)
                .collect()
        };

        for (rel_path, name, is_dir, _) in children {
            if seen.insert(rel_path.clone()) {
                items.push(ReviewItem {
                    rel_path,
                    name,
                    is_dir,
                    top_level: false,
                });
            }
        }
    }

    log::debug!("Found {} review candidates", items.len());
    items
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleSet {
    pub roots: Vec<String>,
    pub excludes: Vec<String>,
    pub loose_files: Vec<String>,
    pub overrides: Vec<Override>,
}

impl RuleSet {
    /// Combines the tree's derived views with the entries re-included at review.
    ///
    /// Reviewed paths become overrides, as do selected roots that are
    /// themselves dot/ignored. Excludes at or beneath a reviewed path are
    /// dropped. Reviewed paths outside every selected root are walked or
    /// listed on their own.
    pub fn derive(tree: &SelectionTree, reviewed: &[ReviewItem]) -> Self {
        let mut roots = selected_roots(tree);
        let mut loose_files = selected_loose_files(tree);
        let mut excludes = explicit_excludes(tree);

        let mut overrides: Vec<Override> = Vec::new();
        for item in reviewed {
            let o = item.to_override();
            if !overrides.contains(&o) {
                overrides.push(o);
            }
        }
        for dir in &roots {
            if let Some(node) = tree.get(dir) {
                if node.is_excluded_by_default() {
                    let o = Override::new(dir.clone(), true);
                    if !overrides.contains(&o) {
                        overrides.push(o);
                    }
                }
            }
        }

        excludes.retain(|ex| !reviewed.iter().any(|item| is_within(ex, &item.rel_path)));

        let base_roots = roots.clone();
        for item in reviewed {
            if base_roots.iter().any(|r| is_within(&item.rel_path, r)) {
                continue;
            }
            let target = if item.is_dir {
                &mut roots
            } else {
                &mut loose_files
            };
            if !target.contains(&item.rel_path) {
                target.push(item.rel_path.clone());
            }
        }

        log::debug!(
            "Derived rules: {} roots, {} excludes, {} loose files, {} overrides",
            roots.len(),
            excludes.len(),
            loose_files.len(),
            overrides.len()
        );
        Self {
            roots,
            excludes,
            loose_files,
            overrides,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty() && self.loose_files.is_empty()
    }
}
