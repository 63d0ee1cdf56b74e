use codecontext_core::rules::{RuleSet, review_candidates};
use codecontext_core::{
    DirectoryReader, IgnoreOracle, ReviewItem, Result, Selection, SelectionTree, VisibleRow,
};
use log;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Select,
    Review,
    Generate,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    Expand,
    Collapse,
    Toggle,
    ToggleAll,
    Undo,
    Confirm,
    Quit,
}

pub struct Session<'a> {
    root: &'a Path,
    reader: &'a dyn DirectoryReader,
    oracle: &'a dyn IgnoreOracle,
    tree: SelectionTree,
    history: Vec<SelectionTree>,
    cursor: usize,
    phase: Phase,
    review: Vec<ReviewItem>,
    marks: Vec<bool>,
    review_cursor: usize,
    message: Option<String>,
}

impl<'a> Session<'a> {
    pub fn new(
        root: &'a Path,
        reader: &'a dyn DirectoryReader,
        oracle: &'a dyn IgnoreOracle,
    ) -> Self {
        let tree = SelectionTree::from_listing(root, reader, oracle);
        Self::with_tree(root, reader, oracle, tree)
    }

    pub fn with_tree(
        root: &'a Path,
        reader: &'a dyn DirectoryReader,
        oracle: &'a dyn IgnoreOracle,
        tree: SelectionTree,
    ) -> Self {
        Self {
            root,
            reader,
            oracle,
            tree,
            history: Vec::new(),
            cursor: 0,
            phase: Phase::Select,
            review: Vec::new(),
            marks: Vec::new(),
            review_cursor: 0,
            message: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tree(&self) -> &SelectionTree {
        &self.tree
    }

    pub fn root(&self) -> &Path {
        self.root
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn rows(&self) -> Vec<VisibleRow> {
        self.tree.visible_rows()
    }

    pub fn review_items(&self) -> &[ReviewItem] {
        &self.review
    }

    pub fn marks(&self) -> &[bool] {
        &self.marks
    }

    pub fn review_cursor(&self) -> usize {
        self.review_cursor
    }

    pub fn can_undo(&self) -> bool {
        !self.history.is_empty()
    }

    /// One-line status shown under the list; cleared by the next action.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn handle(&mut self, action: Action) -> Result<()> {
        self.message = None;
        match self.phase {
            Phase::Select => self.handle_select(action),
            Phase::Review => {
                self.handle_review(action);
                Ok(())
            }
            Phase::Generate | Phase::Quit => Ok(()),
        }
    }

    fn handle_select(&mut self, action: Action) -> Result<()> {
        let rows = self.tree.visible_rows();
        if rows.is_empty() {
            match action {
                Action::Quit => self.phase = Phase::Quit,
                Action::Confirm => self.message = Some("Nothing selected.".to_string()),
                _ => {}
            }
            return Ok(());
        }
        self.cursor = self.cursor.min(rows.len() - 1);
        let key = rows[self.cursor].key.clone();

        match action {
            Action::Up => self.cursor = (self.cursor + rows.len() - 1) % rows.len(),
            Action::Down => self.cursor = (self.cursor + 1) % rows.len(),
            Action::Expand => {
                self.tree = self.tree.expand(&key, self.root, self.reader, self.oracle)?;
            }
            Action::Collapse => self.collapse_or_jump(&key, &rows)?,
            Action::Toggle | Action::ToggleAll => {
                let Some(node) = self.tree.get(&key) else {
                    return Ok(());
                };
                let current = node.selection;
                if node.is_excluded_by_default() && current != Selection::All {
                    self.message = Some(format!(
                        "'{}' is ignored by default. Press Enter and include it at the review step.",
                        node.name
                    ));
                    return Ok(());
                }
                let target = if current == Selection::All {
                    Selection::None
                } else {
                    Selection::All
                };
                let next = self.tree.set_selection(&key, target)?;
                if next != self.tree {
                    self.history.push(std::mem::replace(&mut self.tree, next));
                }
            }
            Action::Undo => match self.history.pop() {
                Some(previous) => {
                    self.tree = previous;
                    let len = self.tree.visible_rows().len();
                    self.cursor = self.cursor.min(len.saturating_sub(1));
                }
                None => self.message = Some("Nothing to undo.".to_string()),
            },
            Action::Confirm => self.confirm_selection(),
            Action::Quit => self.phase = Phase::Quit,
        }
        Ok(())
    }

    fn collapse_or_jump(&mut self, key: &str, rows: &[VisibleRow]) -> Result<()> {
        let expanded_dir = self
            .tree
            .get(key)
            .is_some_and(|n| n.is_dir && n.expanded);
        if expanded_dir {
            self.tree = self.tree.set_expanded(key, false)?;
            return Ok(());
        }
        let parent = self.tree.get(key).and_then(|n| n.parent_rel.clone());
        if let Some(parent) = parent.filter(|p| !p.is_empty()) {
            if let Some(idx) = rows.iter().position(|r| r.key == parent) {
                self.cursor = idx;
            }
        }
        Ok(())
    }

    fn confirm_selection(&mut self) {
        if RuleSet::derive(&self.tree, &[]).is_empty() {
            self.message = Some("Nothing selected.".to_string());
            return;
        }
        self.review = review_candidates(&self.tree, self.root, self.reader, self.oracle);
        self.marks = vec![false; self.review.len()];
        self.review_cursor = 0;
        if self.review.is_empty() {
            log::debug!("No ignored entries to review, generating directly");
            self.phase = Phase::Generate;
        } else {
            self.phase = Phase::Review;
        }
    }

    fn handle_review(&mut self, action: Action) {
        let len = self.review.len();
        match action {
            Action::Up if len > 0 => self.review_cursor = (self.review_cursor + len - 1) % len,
            Action::Down if len > 0 => self.review_cursor = (self.review_cursor + 1) % len,
            Action::Toggle => {
                if let Some(mark) = self.marks.get_mut(self.review_cursor) {
                    *mark = !*mark;
                }
            }
            Action::ToggleAll => {
                let all_marked = self.marks.iter().all(|m| *m);
                self.marks.iter_mut().for_each(|m| *m = !all_marked);
            }
            Action::Undo | Action::Collapse => self.phase = Phase::Select,
            Action::Confirm => self.phase = Phase::Generate,
            Action::Quit => self.phase = Phase::Quit,
            _ => {}
        }
    }

    /// Review items the user chose to bring back.
    pub fn reviewed(&self) -> Vec<ReviewItem> {
        self.review
            .iter()
            .zip(&self.marks)
            .filter(|(_, marked)| **marked)
            .map(|(item, _)| item.clone())
            .collect()
    }

    pub fn rule_set(&self) -> RuleSet {
        RuleSet::derive(&self.tree, &self.reviewed())
    }
}
