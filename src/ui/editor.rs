//! Input line editing
//!
//! [`InputEditor`] turns keys into buffer changes and reports what the
//! screen has to do about them as an [`Effect`]. It never touches the
//! terminal itself, which keeps it usable from any thread and easy to test.

use unicode_width::UnicodeWidthChar;

use crate::history::HistoryRing;
use crate::ui::keymapper::{ConsoleKey, KeyInput};

/// Entries per row when listing completions
pub const SUGGESTIONS_PER_ROW: usize = 5;

/// The line being typed and the cursor inside it.
///
/// The cursor is a char index and always stays within `0..=len`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffer {
    chars: Vec<char>,
    cursor: usize,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at the cursor and step past the new char
    pub fn insert(&mut self, ch: char) {
        self.chars.insert(self.cursor, ch);
        self.cursor += 1;
    }

    /// Backspace
    pub fn delete_before(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        self.chars.remove(self.cursor);
        true
    }

    /// Delete
    pub fn delete_after(&mut self) -> bool {
        if self.cursor >= self.chars.len() {
            return false;
        }
        self.chars.remove(self.cursor);
        true
    }

    /// Replace the whole line, cursor to the end
    pub fn replace(&mut self, text: &str) {
        self.chars = text.chars().collect();
        self.cursor = self.chars.len();
    }

    pub fn clear(&mut self) {
        self.chars.clear();
        self.cursor = 0;
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    pub fn move_right(&mut self) -> bool {
        if self.cursor >= self.chars.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn move_home(&mut self) -> bool {
        let moved = self.cursor != 0;
        self.cursor = 0;
        moved
    }

    pub fn move_end(&mut self) -> bool {
        let moved = self.cursor != self.chars.len();
        self.cursor = self.chars.len();
        moved
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn is_at_end(&self) -> bool {
        self.cursor == self.chars.len()
    }

    /// Display columns left of the cursor
    pub fn cursor_columns(&self) -> usize {
        columns(&self.chars[..self.cursor])
    }

    /// Display columns of the whole line
    pub fn columns(&self) -> usize {
        columns(&self.chars)
    }
}

fn columns(chars: &[char]) -> usize {
    chars.iter().map(|c| c.width().unwrap_or(0)).sum()
}

/// What the screen must do after a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Nothing visible changed
    None,
    /// A char was appended at the end of the line
    Echo(char),
    /// Only the cursor moved
    MoveCursor,
    /// Redraw the whole input line
    Redraw,
    /// A line was entered
    Submit(String),
    /// Enter on an empty line
    Blank,
    /// Tab on this prefix
    Complete(String),
    /// Escape while an overlay screen is shown
    LeaveScreen,
    /// Ctrl+C
    Interrupt,
}

/// Edit buffer plus command history
#[derive(Debug, Clone, Default)]
pub struct InputEditor {
    pub buffer: EditBuffer,
    pub history: HistoryRing,
}

impl InputEditor {
    pub fn new(history_length: usize) -> Self {
        Self {
            buffer: EditBuffer::new(),
            history: HistoryRing::new(history_length),
        }
    }

    /// Apply one key
    pub fn handle_key(&mut self, key: &KeyInput, on_main: bool) -> Effect {
        if key.key == ConsoleKey::Interrupt {
            return Effect::Interrupt;
        }

        // Overlays own every key but Escape
        if !on_main {
            return match key.key {
                ConsoleKey::Escape => Effect::LeaveScreen,
                _ => Effect::None,
            };
        }

        match key.key {
            ConsoleKey::Enter => {
                let line = self.buffer.text();
                self.buffer.clear();
                if line.trim().is_empty() {
                    Effect::Blank
                } else {
                    Effect::Submit(line)
                }
            }
            ConsoleKey::Backspace => redraw_if(self.buffer.delete_before()),
            ConsoleKey::Delete => redraw_if(self.buffer.delete_after()),
            ConsoleKey::Left => move_if(self.buffer.move_left()),
            ConsoleKey::Right => move_if(self.buffer.move_right()),
            ConsoleKey::Home => move_if(self.buffer.move_home()),
            ConsoleKey::End => move_if(self.buffer.move_end()),
            ConsoleKey::Up => {
                let current = self.buffer.text();
                match self.history.older(&current) {
                    Some(entry) => {
                        self.buffer.replace(entry);
                        Effect::Redraw
                    }
                    None => Effect::None,
                }
            }
            ConsoleKey::Down => match self.history.newer() {
                Some(Some(entry)) => {
                    self.buffer.replace(entry);
                    Effect::Redraw
                }
                Some(None) => {
                    self.buffer.clear();
                    Effect::Redraw
                }
                None => Effect::None,
            },
            ConsoleKey::Tab => {
                let prefix = self.buffer.text();
                if prefix.trim().is_empty() {
                    Effect::None
                } else {
                    Effect::Complete(prefix)
                }
            }
            ConsoleKey::Char(_) => match key.printable() {
                Some(ch) => {
                    let at_end = self.buffer.is_at_end();
                    self.buffer.insert(ch);
                    if at_end {
                        Effect::Echo(ch)
                    } else {
                        Effect::Redraw
                    }
                }
                None => Effect::None,
            },
            ConsoleKey::Escape | ConsoleKey::Interrupt => Effect::None,
        }
    }
}

fn redraw_if(changed: bool) -> Effect {
    if changed {
        Effect::Redraw
    } else {
        Effect::None
    }
}

fn move_if(moved: bool) -> Effect {
    if moved {
        Effect::MoveCursor
    } else {
        Effect::None
    }
}

/// Names starting with `prefix`; CVar names come before command names
pub fn complete<'a>(
    prefix: &str,
    cvars: impl IntoIterator<Item = &'a str>,
    commands: impl IntoIterator<Item = &'a str>,
) -> Vec<String> {
    cvars
        .into_iter()
        .chain(commands)
        .filter(|name| name.starts_with(prefix))
        .map(str::to_string)
        .collect()
}

/// Lay suggestions out in tab separated rows
pub fn format_suggestions(suggestions: &[String]) -> Vec<String> {
    suggestions
        .chunks(SUGGESTIONS_PER_ROW)
        .map(|row| row.iter().map(|name| format!("{}\t", name)).collect())
        .collect()
}
