//! Raw-mode terminal front end for [`Session`].

use crate::log_buffer;
use crate::session::{Action, Phase, Session};
use anyhow::{Context, Result};
use codecontext_core::{Node, Selection};
use colored::*;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::Print,
    terminal::{self, ClearType},
};
use log;
use std::io::{self, Stdout, Write};

const HEADER_LINES: usize = 3;
const FOOTER_LINES: usize = 3;

const SELECT_HELP: &str =
    "↑/↓ move  → open  ← close  space/a toggle  u undo  enter continue  q quit";
const REVIEW_HELP: &str = "↑/↓ move  space toggle  a toggle all  u back  enter generate  q quit";

/// Maps a key press to an action for the given phase.
pub fn key_to_action(key: KeyEvent, phase: Phase) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }
    match (phase, key.code) {
        (_, KeyCode::Up | KeyCode::Char('k')) => Some(Action::Up),
        (_, KeyCode::Down | KeyCode::Char('j')) => Some(Action::Down),
        (_, KeyCode::Enter) => Some(Action::Confirm),
        (_, KeyCode::Char('q') | KeyCode::Esc) => Some(Action::Quit),
        (_, KeyCode::Char(' ')) => Some(Action::Toggle),
        (_, KeyCode::Char('u')) => Some(Action::Undo),
        (Phase::Select, KeyCode::Char('a')) => Some(Action::Toggle),
        (Phase::Select, KeyCode::Right | KeyCode::Char('l')) => Some(Action::Expand),
        (Phase::Select, KeyCode::Left | KeyCode::Char('h')) => Some(Action::Collapse),
        (Phase::Review, KeyCode::Char('a')) => Some(Action::ToggleAll),
        (Phase::Review, KeyCode::Left | KeyCode::Char('h')) => Some(Action::Undo),
        _ => None,
    }
}

pub fn checkbox(selection: Selection) -> &'static str {
    match selection {
        Selection::All => "[x]",
        Selection::Partial => "[-]",
        Selection::None => "[ ]",
    }
}

/// Plain text of one tree row, without cursor or colour.
pub fn row_label(node: &Node, depth: usize) -> String {
    let marker = match (node.is_dir, node.expanded) {
        (true, true) => "▾",
        (true, false) => "▸",
        (false, _) => " ",
    };
    let suffix = if node.is_dir { "/" } else { "" };
    format!(
        "{}{} {} {}{}",
        "  ".repeat(depth),
        marker,
        checkbox(node.selection),
        node.name,
        suffix
    )
}

/// First and one-past-last index of the rows to draw so `cursor` stays visible.
pub fn scroll_window(len: usize, cursor: usize, height: usize) -> (usize, usize) {
    let height = height.max(1);
    if len <= height {
        return (0, len);
    }
    let start = cursor
        .saturating_sub(height / 2)
        .min(len - height);
    (start, start + height)
}

struct TerminalGuard {
    stdout: Stdout,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode().context("Failed to enable raw terminal mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)
            .context("Failed to prepare terminal")?;
        log_buffer::hold();
        Ok(Self { stdout })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(self.stdout, cursor::Show, terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
        log_buffer::release();
    }
}

/// Runs the session until the user generates or quits and returns the final phase.
pub fn run(session: &mut Session) -> Result<Phase> {
    let mut guard = TerminalGuard::enter()?;
    draw(&mut guard.stdout, session)?;

    loop {
        if let Event::Key(key) = event::read().context("Failed to read terminal event")? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let Some(action) = key_to_action(key, session.phase()) else {
                continue;
            };
            log::trace!("Key {:?} -> {:?}", key.code, action);
            session
                .handle(action)
                .context("Failed to apply selection change")?;
            match session.phase() {
                Phase::Generate | Phase::Quit => break,
                Phase::Select | Phase::Review => draw(&mut guard.stdout, session)?,
            }
        }
    }

    Ok(session.phase())
}

fn draw(stdout: &mut Stdout, session: &Session) -> Result<()> {
    let (_, term_rows) = terminal::size().unwrap_or((80, 24));
    let body_height = (term_rows as usize).saturating_sub(HEADER_LINES + FOOTER_LINES);

    queue!(stdout, terminal::Clear(ClearType::All), cursor::MoveTo(0, 0))?;

    let (title, lines, help) = match session.phase() {
        Phase::Review => (
            "These entries are ignored by default. Mark any you want to include:".to_string(),
            review_lines(session, body_height),
            REVIEW_HELP,
        ),
        _ => (
            format!("Select files and folders in {}", session.root().display()),
            select_lines(session, body_height),
            SELECT_HELP,
        ),
    };

    queue!(stdout, Print(format!("{}\r\n\r\n", title.bold())))?;
    for line in lines {
        queue!(stdout, Print(format!("{}\r\n", line)))?;
    }
    queue!(stdout, Print("\r\n"))?;
    if let Some(message) = session.message() {
        queue!(stdout, Print(format!("{}\r\n", message.yellow())))?;
    }
    queue!(stdout, Print(format!("{}\r\n", help.dimmed())))?;
    stdout.flush()?;
    Ok(())
}

fn select_lines(session: &Session, height: usize) -> Vec<String> {
    let rows = session.rows();
    if rows.is_empty() {
        return vec!["(empty directory)".dimmed().to_string()];
    }
    let (start, end) = scroll_window(rows.len(), session.cursor(), height);
    rows[start..end]
        .iter()
        .enumerate()
        .filter_map(|(offset, row)| {
            let node = session.tree().get(&row.key)?;
            let label = row_label(node, row.depth);
            let styled = if node.is_excluded_by_default() {
                label.dimmed().to_string()
            } else {
                label
            };
            Some(if start + offset == session.cursor() {
                format!("{} {}", ">".cyan().bold(), styled.reversed())
            } else {
                format!("  {}", styled)
            })
        })
        .collect()
}

fn review_lines(session: &Session, height: usize) -> Vec<String> {
    let items = session.review_items();
    let (start, end) = scroll_window(items.len(), session.review_cursor(), height);
    items[start..end]
        .iter()
        .enumerate()
        .map(|(offset, item)| {
            let idx = start + offset;
            let mark = if session.marks().get(idx).copied().unwrap_or(false) {
                "[x]"
            } else {
                "[ ]"
            };
            let suffix = if item.is_dir { "/" } else { "" };
            let label = format!("{} {}{}", mark, item.rel_path, suffix);
            if idx == session.review_cursor() {
                format!("{} {}", ">".cyan().bold(), label.reversed())
            } else {
                format!("  {}", label)
            }
        })
        .collect()
}
