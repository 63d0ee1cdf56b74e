//! Lazily populated selection tree.
//!
//! Nodes live in a flat arena keyed by their forward-slash path relative to
//! the project root; `""` is the synthetic root. Parent and child links are
//! plain keys. Every operation takes `&self` and returns a fresh snapshot, so
//! a caller can keep earlier snapshots around for undo.

use crate::error::{AppError, Result};
use crate::fs::{DirectoryReader, abs_path, join_rel, sort_entries};
use crate::oracle::{IgnoreOracle, is_dot_entry, is_ignored};
use indexmap::IndexMap;
use log;
use serde::Serialize;
use std::path::Path;

pub const ROOT_KEY: &str = "";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    None = 0,
    Partial = 1,
    All = 2,
}

impl Selection {
    pub fn is_selected(self) -> bool {
        self != Selection::None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub rel_path: String,
    pub is_dir: bool,
    pub is_dot: bool,
    pub ignored: bool,
    pub expanded: bool,
    pub selection: Selection,
    /// `None` only for the root.
    pub parent_rel: Option<String>,
    /// `None` until the directory has been listed. Always `None` for files.
    pub children: Option<Vec<String>>,
}

impl Node {
    fn new(name: &str, rel_path: String, is_dir: bool, is_dot: bool, ignored: bool) -> Self {
        Self {
            name: name.to_string(),
            rel_path,
            is_dir,
            is_dot,
            ignored,
            expanded: false,
            selection: Selection::None,
            parent_rel: None,
            children: None,
        }
    }

    /// Dot and ignored nodes are never swept up by a bulk include.
    pub fn is_excluded_by_default(&self) -> bool {
        self.is_dot || self.ignored
    }

    pub fn is_loaded(&self) -> bool {
        self.children.is_some()
    }

    pub fn is_root(&self) -> bool {
        self.parent_rel.is_none()
    }
}

/// A top-level entry as discovered by the initial listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopLevelEntry {
    pub name: String,
    pub is_dir: bool,
    pub is_dot: bool,
    pub ignored: bool,
}

impl TopLevelEntry {
    pub fn new(name: &str, is_dir: bool, oracle: &dyn IgnoreOracle) -> Self {
        Self {
            name: name.to_string(),
            is_dir,
            is_dot: is_dot_entry(oracle, name),
            ignored: is_ignored(oracle, name, is_dir),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleRow {
    pub key: String,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionTree {
    nodes: IndexMap<String, Node>,
}

impl SelectionTree {
    /// Builds the root plus one node per entry, in the order given.
    pub fn initialize(entries: &[TopLevelEntry]) -> Self {
        let mut nodes = IndexMap::with_capacity(entries.len() + 1);
        let mut root = Node::new("", ROOT_KEY.to_string(), true, false, false);
        root.children = Some(entries.iter().map(|e| e.name.clone()).collect());
        nodes.insert(ROOT_KEY.to_string(), root);

        for entry in entries {
            let mut node = Node::new(
                &entry.name,
                entry.name.clone(),
                entry.is_dir,
                entry.is_dot,
                entry.ignored,
            );
            node.parent_rel = Some(ROOT_KEY.to_string());
            node.selection = if node.is_excluded_by_default() {
                Selection::None
            } else {
                Selection::All
            };
            nodes.insert(node.rel_path.clone(), node);
        }

        let mut tree = Self { nodes };
        tree.recompute(ROOT_KEY);
        log::debug!("Initialized selection tree with {} top-level entries", entries.len());
        tree
    }

    /// Lists `root` once and builds the initial tree from it.
    pub fn from_listing(
        root: &Path,
        reader: &dyn DirectoryReader,
        oracle: &dyn IgnoreOracle,
    ) -> Self {
        let mut entries = match reader.list_directory(root) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Could not list project root, starting empty: {}", e);
                Vec::new()
            }
        };
        sort_entries(&mut entries);
        let top_level: Vec<TopLevelEntry> = entries
            .iter()
            .map(|e| TopLevelEntry::new(&e.name, e.is_dir(), oracle))
            .collect();
        Self::initialize(&top_level)
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn root(&self) -> &Node {
        &self.nodes[ROOT_KEY]
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.root().children.as_ref().is_none_or(|c| c.is_empty())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn children_of(&self, key: &str) -> impl Iterator<Item = &Node> {
        self.nodes
            .get(key)
            .and_then(|n| n.children.as_ref())
            .into_iter()
            .flatten()
            .filter_map(|child| self.nodes.get(child))
    }

    /// Ancestor keys from the parent upwards, excluding the root.
    pub fn ancestors(&self, key: &str) -> Vec<&str> {
        let mut out = Vec::new();
        let mut current = self.nodes.get(key).and_then(|n| n.parent_rel.as_deref());
        while let Some(parent) = current {
            if parent == ROOT_KEY {
                break;
            }
            out.push(parent);
            current = self.nodes.get(parent).and_then(|n| n.parent_rel.as_deref());
        }
        out
    }

    /// Every discovered node except the root, depth-first in child order.
    pub fn preorder(&self) -> Vec<&Node> {
        let mut out = Vec::with_capacity(self.nodes.len().saturating_sub(1));
        let mut stack: Vec<&str> = self
            .root()
            .children
            .iter()
            .flatten()
            .rev()
            .map(String::as_str)
            .collect();
        while let Some(key) = stack.pop() {
            let Some(node) = self.nodes.get(key) else {
                continue;
            };
            out.push(node);
            if let Some(children) = &node.children {
                stack.extend(children.iter().rev().map(String::as_str));
            }
        }
        out
    }

    fn node(&self, key: &str) -> Result<&Node> {
        self.nodes
            .get(key)
            .ok_or_else(|| AppError::InvalidKey(key.to_string()))
    }

    fn non_root(&self, key: &str) -> Result<&Node> {
        if key == ROOT_KEY {
            return Err(AppError::InvalidKey(key.to_string()));
        }
        self.node(key)
    }

    /// Lists `key` the first time it is called for a directory. Already
    /// loaded directories and files are returned unchanged without reading.
    pub fn load_children(
        &self,
        key: &str,
        root: &Path,
        reader: &dyn DirectoryReader,
        oracle: &dyn IgnoreOracle,
    ) -> Result<Self> {
        let parent = self.node(key)?;
        if !parent.is_dir || parent.is_loaded() {
            log::trace!("Skipping load for '{}': not an unloaded directory", key);
            return Ok(self.clone());
        }

        let dir_path = abs_path(root, key);
        let mut entries = match reader.list_directory(&dir_path) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Treating '{}' as empty: {}", key, e);
                Vec::new()
            }
        };
        sort_entries(&mut entries);

        let inherit_all = parent.selection == Selection::All;
        let mut next = self.clone();
        let mut child_keys = Vec::with_capacity(entries.len());
        for entry in &entries {
            let rel = join_rel(key, &entry.name);
            let is_dir = entry.is_dir();
            let mut node = Node::new(
                &entry.name,
                rel.clone(),
                is_dir,
                is_dot_entry(oracle, &entry.name),
                is_ignored(oracle, &rel, is_dir),
            );
            node.parent_rel = Some(key.to_string());
            node.selection = if inherit_all && !node.is_excluded_by_default() {
                Selection::All
            } else {
                Selection::None
            };
            log::trace!(
                "Discovered '{}' (dir: {}, dot: {}, ignored: {}, selection: {:?})",
                rel,
                is_dir,
                node.is_dot,
                node.ignored,
                node.selection
            );
            next.nodes.insert(rel.clone(), node);
            child_keys.push(rel);
        }

        log::debug!("Loaded {} children under '{}'", child_keys.len(), key);
        if let Some(parent) = next.nodes.get_mut(key) {
            parent.children = Some(child_keys);
        }
        Ok(next)
    }

    /// Sets `key` and its loaded subtree to `target`, then recomputes every
    /// ancestor. A bulk `All` stops at dot/ignored nodes: they and everything
    /// below them are set to `None` instead.
    pub fn set_selection(&self, key: &str, target: Selection) -> Result<Self> {
        if target == Selection::Partial {
            return Err(AppError::InvalidArgument(
                "selection target must be none or all".to_string(),
            ));
        }
        self.non_root(key)?;

        let mut next = self.clone();
        let mut stack: Vec<(String, bool)> = vec![(key.to_string(), false)];
        while let Some((current, forced_none)) = stack.pop() {
            let Some(node) = next.nodes.get_mut(&current) else {
                continue;
            };
            let forced_none =
                forced_none || (target == Selection::All && node.is_excluded_by_default());
            node.selection = if forced_none { Selection::None } else { target };
            if let Some(children) = &node.children {
                stack.extend(children.iter().map(|c| (c.clone(), forced_none)));
            }
        }

        next.propagate_upward(key);
        log::debug!("Set selection of '{}' to {:?}", key, target);
        Ok(next)
    }

    pub fn set_expanded(&self, key: &str, expanded: bool) -> Result<Self> {
        let node = self.non_root(key)?;
        if !node.is_dir || node.expanded == expanded {
            return Ok(self.clone());
        }
        let mut next = self.clone();
        if let Some(node) = next.nodes.get_mut(key) {
            node.expanded = expanded;
        }
        Ok(next)
    }

    /// Loads on first use, then marks the directory expanded.
    pub fn expand(
        &self,
        key: &str,
        root: &Path,
        reader: &dyn DirectoryReader,
        oracle: &dyn IgnoreOracle,
    ) -> Result<Self> {
        self.non_root(key)?;
        self.load_children(key, root, reader, oracle)?
            .set_expanded(key, true)
    }

    /// Rows currently on screen: pre-order, descending only into expanded,
    /// loaded directories.
    pub fn visible_rows(&self) -> Vec<VisibleRow> {
        let mut rows = Vec::new();
        let mut stack: Vec<(&str, usize)> = self
            .root()
            .children
            .iter()
            .flatten()
            .rev()
            .map(|c| (c.as_str(), 0))
            .collect();
        while let Some((key, depth)) = stack.pop() {
            let Some(node) = self.nodes.get(key) else {
                continue;
            };
            rows.push(VisibleRow {
                key: key.to_string(),
                depth,
            });
            if node.is_dir && node.expanded {
                if let Some(children) = &node.children {
                    stack.extend(children.iter().rev().map(|c| (c.as_str(), depth + 1)));
                }
            }
        }
        rows
    }

    fn propagate_upward(&mut self, key: &str) {
        let mut current = self.nodes.get(key).and_then(|n| n.parent_rel.clone());
        while let Some(parent) = current {
            self.recompute(&parent);
            current = self.nodes.get(&parent).and_then(|n| n.parent_rel.clone());
        }
    }

    fn recompute(&mut self, key: &str) {
        let Some(node) = self.nodes.get(key) else {
            return;
        };
        let children: Vec<(Selection, bool)> = self
            .children_of(key)
            .map(|c| (c.selection, c.is_excluded_by_default()))
            .collect();
        let updated = aggregate(node.selection, &children);
        if let Some(node) = self.nodes.get_mut(key) {
            node.selection = updated;
        }
    }
}

/// Tri-state value of a directory given its current value and its children
/// as `(selection, excluded_by_default)`.
///
/// An untouched dot/ignored child does not stop its parent from being `All`.
/// A directory with no selectable children and nothing selected keeps its own
/// explicit include.
pub fn aggregate(current: Selection, children: &[(Selection, bool)]) -> Selection {
    if children.is_empty() {
        return current;
    }
    let any_selected = children.iter().any(|(s, _)| s.is_selected());
    let any_eligible = children.iter().any(|(_, excluded)| !excluded);
    let all_covered = children
        .iter()
        .all(|(s, excluded)| *s == Selection::All || (*excluded && *s == Selection::None));

    if !any_selected {
        if !any_eligible && current == Selection::All {
            Selection::All
        } else {
            Selection::None
        }
    } else if all_covered {
        Selection::All
    } else {
        Selection::Partial
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::DirEntry;
    use crate::test_utils::{FakeReader, PROJECT_ROOT, sample_oracle, sample_project};
    use proptest::prelude::*;

    fn entry(name: &str, is_dir: bool, ignored: bool) -> TopLevelEntry {
        TopLevelEntry {
            name: name.to_string(),
            is_dir,
            is_dot: name.starts_with('.'),
            ignored,
        }
    }

    fn scenario_b() -> (SelectionTree, FakeReader) {
        let reader = FakeReader::new().dir(
            "src",
            vec![
                DirEntry::file("a.js"),
                DirEntry::dir("node_modules"),
                DirEntry::dir("lib"),
            ],
        );
        let tree = SelectionTree::initialize(&[
            entry("src", true, false),
            entry("README.md", false, false),
            entry(".env", false, false),
        ]);
        let oracle = |rel: &str| rel.contains("node_modules");
        let tree = tree
            .load_children("src", Path::new(PROJECT_ROOT), &reader, &oracle)
            .unwrap();
        (tree, reader)
    }

    fn sel(tree: &SelectionTree, key: &str) -> Selection {
        tree.get(key).unwrap().selection
    }

    /// Independent restatement of the tri-state invariant.
    fn assert_tri_state(tree: &SelectionTree) {
        for node in tree.preorder() {
            let Some(children) = &node.children else {
                continue;
            };
            if children.is_empty() {
                continue;
            }
            let kids: Vec<&Node> = children.iter().map(|c| tree.get(c).unwrap()).collect();
            let all_none = kids.iter().all(|k| k.selection == Selection::None);
            let covered = kids.iter().all(|k| {
                k.selection == Selection::All
                    || (k.is_excluded_by_default() && k.selection == Selection::None)
            });
            let has_eligible = kids.iter().any(|k| !k.is_excluded_by_default());
            let expected_ok = match node.selection {
                Selection::All => covered,
                Selection::None => all_none,
                Selection::Partial => !covered && !all_none,
            };
            let keeps_explicit = all_none && !has_eligible && node.selection == Selection::All;
            assert!(
                expected_ok || keeps_explicit,
                "tri-state violated at '{}': {:?} with children {:?}",
                node.rel_path,
                node.selection,
                kids.iter()
                    .map(|k| (&k.rel_path, k.selection))
                    .collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn initialize_selects_plain_entries_only() {
        let tree = SelectionTree::initialize(&[
            entry("src", true, false),
            entry("README.md", false, false),
            entry(".env", false, false),
        ]);

        assert_eq!(
            tree.root().children.as_ref().unwrap(),
            &vec!["src".to_string(), "README.md".to_string(), ".env".to_string()]
        );
        assert_eq!(sel(&tree, "src"), Selection::All);
        assert_eq!(sel(&tree, "README.md"), Selection::All);
        assert_eq!(sel(&tree, ".env"), Selection::None);
        assert!(tree.get(".env").unwrap().is_dot);
        assert!(!tree.get("src").unwrap().is_loaded());
        assert!(!tree.get("src").unwrap().expanded);
        assert_eq!(tree.root().parent_rel, None);
        assert_eq!(tree.get("src").unwrap().parent_rel.as_deref(), Some(""));
    }

    #[test]
    fn initialize_leaves_ignored_entries_unselected() {
        let tree = SelectionTree::initialize(&[entry("node_modules", true, true)]);
        assert_eq!(sel(&tree, "node_modules"), Selection::None);
    }

    #[test]
    fn load_children_sorts_and_inherits_all() {
        let (tree, _) = scenario_b();
        let src = tree.get("src").unwrap();

        assert_eq!(
            src.children.as_ref().unwrap(),
            &vec![
                "src/lib".to_string(),
                "src/node_modules".to_string(),
                "src/a.js".to_string()
            ]
        );
        assert_eq!(sel(&tree, "src/lib"), Selection::All);
        assert_eq!(sel(&tree, "src/a.js"), Selection::All);
        assert_eq!(sel(&tree, "src/node_modules"), Selection::None);
        assert!(tree.get("src/node_modules").unwrap().ignored);
        assert_eq!(sel(&tree, "src"), Selection::All);
    }

    #[test]
    fn load_children_checks_directories_with_trailing_slash() {
        let reader =
            FakeReader::new().dir("", vec![DirEntry::dir("build"), DirEntry::file("build.rs")]);
        let oracle = |rel: &str| rel == "build/";
        let tree = SelectionTree::from_listing(Path::new(PROJECT_ROOT), &reader, &oracle);

        assert!(tree.get("build").unwrap().ignored);
        assert!(!tree.get("build.rs").unwrap().ignored);
    }

    struct ShowDotFiles;

    impl IgnoreOracle for ShowDotFiles {
        fn ignores(&self, _rel_path: &str) -> bool {
            false
        }

        fn hides_dot_files(&self) -> bool {
            false
        }
    }

    #[test]
    fn dot_entries_are_ordinary_when_dot_files_are_shown() {
        let reader = FakeReader::new()
            .dir("", vec![DirEntry::dir("src"), DirEntry::file(".env")])
            .dir("src", vec![DirEntry::file("main.rs"), DirEntry::file(".eslintrc")]);
        let tree = SelectionTree::from_listing(Path::new(PROJECT_ROOT), &reader, &ShowDotFiles)
            .expand("src", Path::new(PROJECT_ROOT), &reader, &ShowDotFiles)
            .unwrap();

        assert!(!tree.get(".env").unwrap().is_dot);
        assert_eq!(sel(&tree, ".env"), Selection::All);
        assert!(!tree.get("src/.eslintrc").unwrap().is_dot);
        assert_eq!(sel(&tree, "src/.eslintrc"), Selection::All);
        assert_eq!(sel(&tree, "src"), Selection::All);
    }

    #[test]
    fn load_children_under_unselected_parent_selects_nothing() {
        let reader = FakeReader::new().dir("docs", vec![DirEntry::file("guide.md")]);
        let tree = SelectionTree::initialize(&[entry("docs", true, false)])
            .set_selection("docs", Selection::None)
            .unwrap()
            .load_children("docs", Path::new(PROJECT_ROOT), &reader, &|_: &str| false)
            .unwrap();

        assert_eq!(sel(&tree, "docs/guide.md"), Selection::None);
    }

    #[test]
    fn load_children_treats_read_failure_as_empty() {
        let reader = FakeReader::new();
        let tree = SelectionTree::initialize(&[entry("locked", true, false)]);
        let next = tree
            .load_children("locked", Path::new(PROJECT_ROOT), &reader, &|_: &str| false)
            .unwrap();

        assert_eq!(next.get("locked").unwrap().children, Some(Vec::new()));
        assert_eq!(sel(&next, "locked"), Selection::All);
    }

    #[test]
    fn load_children_does_not_rescan_loaded_directories() {
        let (tree, reader) = scenario_b();
        assert_eq!(reader.calls(), 1);

        let again = tree
            .load_children("src", Path::new(PROJECT_ROOT), &reader, &|_: &str| false)
            .unwrap();
        assert_eq!(reader.calls(), 1);
        assert_eq!(again, tree);
    }

    #[test]
    fn load_children_on_file_is_a_no_op() {
        let (tree, reader) = scenario_b();
        let next = tree
            .load_children("README.md", Path::new(PROJECT_ROOT), &reader, &|_: &str| false)
            .unwrap();
        assert_eq!(next, tree);
        assert_eq!(reader.calls(), 1);
    }

    #[test]
    fn load_children_does_not_mutate_input_snapshot() {
        let reader = FakeReader::new().dir("src", vec![DirEntry::file("a.js")]);
        let before = SelectionTree::initialize(&[entry("src", true, false)]);
        let snapshot = before.clone();
        let _after = before
            .load_children("src", Path::new(PROJECT_ROOT), &reader, &|_: &str| false)
            .unwrap();
        assert_eq!(before, snapshot);
    }

    #[test]
    fn deselecting_a_child_makes_parent_partial() {
        let (tree, _) = scenario_b();
        let tree = tree.set_selection("src/lib", Selection::None).unwrap();

        assert_eq!(sel(&tree, "src/lib"), Selection::None);
        assert_eq!(sel(&tree, "src"), Selection::Partial);
    }

    #[test]
    fn reselecting_parent_keeps_ignored_children_out() {
        let (tree, _) = scenario_b();
        let tree = tree
            .set_selection("src/lib", Selection::None)
            .unwrap()
            .set_selection("src", Selection::All)
            .unwrap();

        assert_eq!(sel(&tree, "src"), Selection::All);
        assert_eq!(sel(&tree, "src/lib"), Selection::All);
        assert_eq!(sel(&tree, "src/a.js"), Selection::All);
        assert_eq!(sel(&tree, "src/node_modules"), Selection::None);
    }

    #[test]
    fn deselecting_every_child_makes_parent_none() {
        let (tree, _) = scenario_b();
        let tree = tree
            .set_selection("src/lib", Selection::None)
            .unwrap()
            .set_selection("src/a.js", Selection::None)
            .unwrap();

        assert_eq!(sel(&tree, "src"), Selection::None);
    }

    #[test]
    fn selecting_a_dot_node_directly_leaves_it_unselected() {
        let (tree, _) = scenario_b();
        let tree = tree.set_selection(".env", Selection::All).unwrap();
        assert_eq!(sel(&tree, ".env"), Selection::None);
    }

    #[test]
    fn bulk_include_does_not_pass_through_dot_directories() {
        let reader = sample_project();
        let oracle = sample_oracle();
        let root = Path::new(PROJECT_ROOT);
        let tree = SelectionTree::from_listing(root, &reader, &oracle)
            .load_children(".github", root, &reader, &oracle)
            .unwrap()
            .set_selection(".github", Selection::All)
            .unwrap();

        assert_eq!(sel(&tree, ".github"), Selection::None);
        for child in tree.children_of(".github") {
            assert_eq!(child.selection, Selection::None, "{}", child.rel_path);
        }
    }

    #[test]
    fn explicit_child_selection_bubbles_into_ignored_parent() {
        let reader = FakeReader::new()
            .dir("", vec![DirEntry::dir(".config")])
            .dir(".config", vec![DirEntry::file("app.toml")]);
        // only the dot convention, so app.toml itself is selectable
        let oracle = |_: &str| false;
        let root = Path::new(PROJECT_ROOT);
        let tree = SelectionTree::from_listing(root, &reader, &oracle)
            .load_children(".config", root, &reader, &oracle)
            .unwrap()
            .set_selection(".config/app.toml", Selection::All)
            .unwrap();

        assert_eq!(sel(&tree, ".config/app.toml"), Selection::All);
        assert_eq!(sel(&tree, ".config"), Selection::All);
        assert_tri_state(&tree);
    }

    #[test]
    fn directory_with_only_excluded_children_keeps_explicit_include() {
        let reader = FakeReader::new().dir("env", vec![DirEntry::file(".env")]);
        let root = Path::new(PROJECT_ROOT);
        let tree = SelectionTree::initialize(&[entry("env", true, false)])
            .load_children("env", root, &reader, &|_: &str| false)
            .unwrap();
        assert_eq!(sel(&tree, "env"), Selection::All);

        let tree = tree.set_selection("env/.env", Selection::All).unwrap();
        assert_eq!(sel(&tree, "env"), Selection::All);

        let tree = tree.set_selection("env", Selection::None).unwrap();
        assert_eq!(sel(&tree, "env"), Selection::None);
        assert_tri_state(&tree);
    }

    #[test]
    fn set_selection_rejects_partial_target() {
        let (tree, _) = scenario_b();
        let err = tree.set_selection("src", Selection::Partial).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn unknown_keys_are_rejected_everywhere() {
        let (tree, reader) = scenario_b();
        let root = Path::new(PROJECT_ROOT);

        assert!(matches!(
            tree.set_selection("nope", Selection::All),
            Err(AppError::InvalidKey(k)) if k == "nope"
        ));
        assert!(matches!(
            tree.set_expanded("nope", true),
            Err(AppError::InvalidKey(_))
        ));
        assert!(matches!(
            tree.load_children("nope", root, &reader, &|_: &str| false),
            Err(AppError::InvalidKey(_))
        ));
        assert!(matches!(
            tree.expand("nope", root, &reader, &|_: &str| false),
            Err(AppError::InvalidKey(_))
        ));
    }

    #[test]
    fn root_is_not_selectable_or_expandable() {
        let (tree, _) = scenario_b();
        assert!(matches!(
            tree.set_selection(ROOT_KEY, Selection::All),
            Err(AppError::InvalidKey(_))
        ));
        assert!(matches!(
            tree.set_expanded(ROOT_KEY, false),
            Err(AppError::InvalidKey(_))
        ));
    }

    #[test]
    fn visible_rows_follow_expansion() {
        let (tree, reader) = scenario_b();
        let keys = |t: &SelectionTree| -> Vec<(String, usize)> {
            t.visible_rows().into_iter().map(|r| (r.key, r.depth)).collect()
        };

        assert_eq!(
            keys(&tree),
            vec![
                ("src".to_string(), 0),
                ("README.md".to_string(), 0),
                (".env".to_string(), 0)
            ]
        );

        let expanded = tree.set_expanded("src", true).unwrap();
        assert_eq!(
            keys(&expanded),
            vec![
                ("src".to_string(), 0),
                ("src/lib".to_string(), 1),
                ("src/node_modules".to_string(), 1),
                ("src/a.js".to_string(), 1),
                ("README.md".to_string(), 0),
                (".env".to_string(), 0)
            ]
        );

        // expanded but never loaded: only its own row
        let lib_expanded = expanded.set_expanded("src/lib", true).unwrap();
        assert_eq!(lib_expanded.visible_rows().len(), 6);
        assert_eq!(reader.calls(), 1);
    }

    #[test]
    fn expand_loads_on_first_use() {
        let reader = sample_project();
        let oracle = sample_oracle();
        let root = Path::new(PROJECT_ROOT);
        let tree = SelectionTree::from_listing(root, &reader, &oracle);
        let calls_after_root = reader.calls();

        let tree = tree.expand("src", root, &reader, &oracle).unwrap();
        assert!(tree.get("src").unwrap().expanded);
        assert!(tree.get("src").unwrap().is_loaded());
        assert_eq!(reader.calls(), calls_after_root + 1);

        let tree = tree
            .set_expanded("src", false)
            .unwrap()
            .expand("src", root, &reader, &oracle)
            .unwrap();
        assert_eq!(reader.calls(), calls_after_root + 1);
        assert!(tree.get("src").unwrap().expanded);
    }

    #[test]
    fn set_expanded_on_file_is_a_no_op() {
        let (tree, _) = scenario_b();
        let next = tree.set_expanded("README.md", true).unwrap();
        assert!(!next.get("README.md").unwrap().expanded);
    }

    #[test]
    fn ancestors_stop_before_root() {
        let reader = sample_project();
        let oracle = sample_oracle();
        let root = Path::new(PROJECT_ROOT);
        let tree = SelectionTree::from_listing(root, &reader, &oracle)
            .load_children("src", root, &reader, &oracle)
            .unwrap()
            .load_children("src/lib", root, &reader, &oracle)
            .unwrap();

        assert_eq!(tree.ancestors("src/lib/a.rs"), vec!["src/lib", "src"]);
        assert!(tree.ancestors("src").is_empty());
    }

    #[test]
    fn aggregate_rules() {
        use Selection::*;
        assert_eq!(aggregate(None, &[(All, false), (All, false)]), All);
        assert_eq!(aggregate(None, &[(All, false), (None, true)]), All);
        assert_eq!(aggregate(All, &[(All, false), (None, false)]), Partial);
        assert_eq!(aggregate(All, &[(None, false), (None, true)]), None);
        assert_eq!(aggregate(All, &[(None, true)]), All);
        assert_eq!(aggregate(Partial, &[(None, true)]), None);
        assert_eq!(aggregate(None, &[(Partial, false)]), Partial);
        assert_eq!(aggregate(All, &[]), All);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Expand(usize),
        Select(usize, bool),
        Collapse(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            any::<usize>().prop_map(Op::Expand),
            (any::<usize>(), any::<bool>()).prop_map(|(i, b)| Op::Select(i, b)),
            any::<usize>().prop_map(Op::Collapse),
        ]
    }

    fn pick(tree: &SelectionTree, idx: usize) -> String {
        let keys: Vec<&str> = tree.keys().filter(|k| !k.is_empty()).collect();
        keys[idx % keys.len()].to_string()
    }

    fn run_ops(ops: &[Op]) -> SelectionTree {
        let reader = sample_project();
        let oracle = sample_oracle();
        let root = Path::new(PROJECT_ROOT);
        let mut tree = SelectionTree::from_listing(root, &reader, &oracle);
        for op in ops {
            tree = match op {
                Op::Expand(i) => tree.expand(&pick(&tree, *i), root, &reader, &oracle).unwrap(),
                Op::Select(i, all) => {
                    let target = if *all { Selection::All } else { Selection::None };
                    tree.set_selection(&pick(&tree, *i), target).unwrap()
                }
                Op::Collapse(i) => tree.set_expanded(&pick(&tree, *i), false).unwrap(),
            };
        }
        tree
    }

    proptest! {
        #[test]
        fn tri_state_invariant_holds_after_any_operations(
            ops in prop::collection::vec(op_strategy(), 0..40)
        ) {
            let tree = run_ops(&ops);
            assert_tri_state(&tree);
        }

        #[test]
        fn select_all_is_idempotent(
            ops in prop::collection::vec(op_strategy(), 0..30),
            idx in any::<usize>()
        ) {
            let tree = run_ops(&ops);
            let key = pick(&tree, idx);
            let once = tree.set_selection(&key, Selection::All).unwrap();
            let twice = once.set_selection(&key, Selection::All).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn select_all_never_includes_dot_or_ignored_descendants(
            ops in prop::collection::vec(op_strategy(), 0..30),
            idx in any::<usize>()
        ) {
            let tree = run_ops(&ops);
            let key = pick(&tree, idx);
            let next = tree.set_selection(&key, Selection::All).unwrap();
            for node in next.preorder() {
                let in_subtree = node.rel_path == key
                    || next.ancestors(&node.rel_path).contains(&key.as_str());
                if in_subtree && node.is_excluded_by_default() {
                    prop_assert_eq!(node.selection, Selection::None);
                }
            }
        }
    }
}
