//! Terminal device abstraction.
//!
//! Output and key input are separate traits: the listener blocks in
//! [`KeyReader::read_key`] while any thread may write through a
//! [`Terminal`]. The crossterm device never asks the terminal where the
//! cursor is (that query would compete with the blocking key read); it
//! follows its own output with a [`CursorModel`] instead.

use std::io::{self, Write};

use crossterm::{
    cursor::{Hide, MoveTo, Show},
    event::{self, Event, KeyEventKind},
    execute, queue,
    style::{Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType, ScrollUp, SetTitle},
};
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthChar;

use crate::ui::keymapper::{KeyInput, KeyMapper};

/// The sixteen classic console colours plus the terminal's own default
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsoleColor {
    /// Whatever the user's terminal is configured with
    Default,
    Black,
    DarkBlue,
    DarkGreen,
    DarkCyan,
    DarkRed,
    DarkMagenta,
    DarkYellow,
    Gray,
    DarkGray,
    Blue,
    Green,
    Cyan,
    Red,
    Magenta,
    Yellow,
    White,
}

impl ConsoleColor {
    /// Convert to crossterm Color
    pub fn to_crossterm(self) -> crossterm::style::Color {
        use crossterm::style::Color;
        match self {
            ConsoleColor::Default => Color::Reset,
            ConsoleColor::Black => Color::Black,
            ConsoleColor::DarkBlue => Color::DarkBlue,
            ConsoleColor::DarkGreen => Color::DarkGreen,
            ConsoleColor::DarkCyan => Color::DarkCyan,
            ConsoleColor::DarkRed => Color::DarkRed,
            ConsoleColor::DarkMagenta => Color::DarkMagenta,
            ConsoleColor::DarkYellow => Color::DarkYellow,
            ConsoleColor::Gray => Color::Grey,
            ConsoleColor::DarkGray => Color::DarkGrey,
            ConsoleColor::Blue => Color::Blue,
            ConsoleColor::Green => Color::Green,
            ConsoleColor::Cyan => Color::Cyan,
            ConsoleColor::Red => Color::Red,
            ConsoleColor::Magenta => Color::Magenta,
            ConsoleColor::Yellow => Color::Yellow,
            ConsoleColor::White => Color::White,
        }
    }
}

/// Colours after a reset: the terminal's own foreground and background
pub const DEFAULT_COLORS: (ConsoleColor, ConsoleColor) = (ConsoleColor::Default, ConsoleColor::Default);

/// How the host terminal treats its bottom rows.
///
/// Resolved once at startup and handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminalDialect {
    /// Line-buffered Unix-style terminal: every row is usable and output
    /// past the bottom row scrolls the viewport.
    Unix,
    /// Console with a reserved bottom margin row (Windows console style).
    Reserved,
}

impl TerminalDialect {
    /// Dialect of the platform we were built for
    pub fn detect() -> Self {
        if cfg!(windows) {
            TerminalDialect::Reserved
        } else {
            TerminalDialect::Unix
        }
    }

    /// Parse a config or command line name; `auto` detects
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "auto" => Some(Self::detect()),
            "unix" | "line-buffered" => Some(TerminalDialect::Unix),
            "reserved" | "windows" => Some(TerminalDialect::Reserved),
            _ => None,
        }
    }

    /// Last row the cursor may be placed on without scrolling
    pub fn last_usable_row(self, height: u16) -> u16 {
        let reserved = match self {
            TerminalDialect::Unix => 1,
            TerminalDialect::Reserved => 2,
        };
        height.saturating_sub(reserved)
    }

    /// Line terminator appended by `write_line`
    pub fn newline(self) -> &'static str {
        match self {
            TerminalDialect::Unix => "\n",
            TerminalDialect::Reserved => "\r\n",
        }
    }
}

/// Output side of a terminal
pub trait Terminal: Send {
    /// Write text at the cursor
    fn write(&mut self, text: &str) -> io::Result<()>;
    /// Buffer size as (width, height)
    fn size(&self) -> io::Result<(u16, u16)>;
    /// Cursor position as (column, row)
    fn cursor_position(&self) -> (u16, u16);
    fn move_to(&mut self, x: u16, y: u16) -> io::Result<()>;
    /// Clear everything and home the cursor
    fn clear(&mut self) -> io::Result<()>;
    /// Scroll the content up, leaving the cursor in place
    fn scroll_up(&mut self, rows: u16) -> io::Result<()>;
    /// Current (foreground, background)
    fn colors(&self) -> (ConsoleColor, ConsoleColor);
    fn set_colors(&mut self, fg: ConsoleColor, bg: ConsoleColor) -> io::Result<()>;
    fn reset_colors(&mut self) -> io::Result<()>;
    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()>;
    fn set_title(&mut self, title: &str) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
    /// Give the terminal back to the shell
    fn restore(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Input side of a terminal
pub trait KeyReader: Send {
    /// Block until the next key; `None` once input is closed
    fn read_key(&mut self) -> io::Result<Option<KeyInput>>;
}

/// Cursor tracking that mirrors how a VT terminal moves its cursor.
///
/// Printing in the last column leaves a pending wrap that is resolved by
/// the next printable character; a line feed on the bottom row scrolls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CursorModel {
    pub col: u16,
    pub row: u16,
    pub wrap_pending: bool,
}

/// Visible effect of one step of output on the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStep {
    /// Put `ch` at (col, row)
    Put { ch: char, col: u16, row: u16 },
    /// Content scrolled up by one row
    Scroll,
}

impl CursorModel {
    pub fn move_to(&mut self, x: u16, y: u16, width: u16, height: u16) {
        self.col = x.min(width.saturating_sub(1));
        self.row = y.min(height.saturating_sub(1));
        self.wrap_pending = false;
    }

    fn line_feed(&mut self, height: u16, steps: &mut Vec<CursorStep>) {
        self.col = 0;
        self.wrap_pending = false;
        if self.row + 1 >= height {
            steps.push(CursorStep::Scroll);
        } else {
            self.row += 1;
        }
    }

    /// Advance over `text`, returning the cells and scrolls it produces
    pub fn advance(&mut self, text: &str, width: u16, height: u16) -> Vec<CursorStep> {
        let width = width.max(1);
        let height = height.max(1);
        let mut steps = Vec::with_capacity(text.len());

        for ch in text.chars() {
            match ch {
                '\r' => {
                    self.col = 0;
                    self.wrap_pending = false;
                }
                '\n' => self.line_feed(height, &mut steps),
                '\x08' => {
                    self.wrap_pending = false;
                    self.col = self.col.saturating_sub(1);
                }
                '\t' => {
                    let next = (self.col / 8 + 1) * 8;
                    self.col = next.min(width - 1);
                }
                ch if ch.is_control() => {}
                ch => {
                    let cells = ch.width().unwrap_or(0) as u16;
                    if cells == 0 {
                        continue;
                    }
                    if self.wrap_pending || self.col + cells > width {
                        self.line_feed(height, &mut steps);
                    }
                    steps.push(CursorStep::Put {
                        ch,
                        col: self.col,
                        row: self.row,
                    });
                    if self.col + cells >= width {
                        self.col = width - 1;
                        self.wrap_pending = true;
                    } else {
                        self.col += cells;
                    }
                }
            }
        }
        steps
    }
}

/// Real terminal driven through crossterm
pub struct CrosstermTerminal {
    cursor: CursorModel,
    colors: (ConsoleColor, ConsoleColor),
    /// Whether raw mode was enabled by us
    initialized: bool,
}

impl CrosstermTerminal {
    /// Take over stdout: raw mode on, colours reset, screen cleared.
    ///
    /// The user's own background is kept; only foregrounds are set later.
    pub fn new() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        execute!(io::stdout(), ResetColor, Clear(ClearType::All), MoveTo(0, 0))?;
        Ok(Self {
            cursor: CursorModel::default(),
            colors: DEFAULT_COLORS,
            initialized: true,
        })
    }
}

impl Terminal for CrosstermTerminal {
    fn write(&mut self, text: &str) -> io::Result<()> {
        let (width, height) = self.size()?;
        self.cursor.advance(text, width, height);

        // Raw mode turns off output post-processing, so a bare line feed
        // would not return the carriage.
        let mut out = String::with_capacity(text.len());
        let mut prev = '\0';
        for ch in text.chars() {
            if ch == '\n' && prev != '\r' {
                out.push('\r');
            }
            out.push(ch);
            prev = ch;
        }

        let mut stdout = io::stdout();
        queue!(stdout, Print(out))?;
        stdout.flush()
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        terminal::size()
    }

    fn cursor_position(&self) -> (u16, u16) {
        (self.cursor.col, self.cursor.row)
    }

    fn move_to(&mut self, x: u16, y: u16) -> io::Result<()> {
        let (width, height) = self.size()?;
        self.cursor.move_to(x, y, width, height);
        execute!(io::stdout(), MoveTo(self.cursor.col, self.cursor.row))
    }

    fn clear(&mut self) -> io::Result<()> {
        self.cursor = CursorModel::default();
        execute!(io::stdout(), Clear(ClearType::All), MoveTo(0, 0))
    }

    fn scroll_up(&mut self, rows: u16) -> io::Result<()> {
        if rows == 0 {
            return Ok(());
        }
        execute!(io::stdout(), ScrollUp(rows))
    }

    fn colors(&self) -> (ConsoleColor, ConsoleColor) {
        self.colors
    }

    fn set_colors(&mut self, fg: ConsoleColor, bg: ConsoleColor) -> io::Result<()> {
        self.colors = (fg, bg);
        execute!(
            io::stdout(),
            SetForegroundColor(fg.to_crossterm()),
            SetBackgroundColor(bg.to_crossterm())
        )
    }

    fn reset_colors(&mut self) -> io::Result<()> {
        self.colors = DEFAULT_COLORS;
        execute!(io::stdout(), ResetColor)
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        if visible {
            execute!(io::stdout(), Show)
        } else {
            execute!(io::stdout(), Hide)
        }
    }

    fn set_title(&mut self, title: &str) -> io::Result<()> {
        execute!(io::stdout(), SetTitle(title))
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stdout().flush()
    }

    fn restore(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;

        let mut stdout = io::stdout();
        let _ = execute!(stdout, ResetColor, Show);
        let _ = stdout.flush();
        terminal::disable_raw_mode()?;

        // Leave the shell on a fresh line
        println!();
        Ok(())
    }
}

impl Drop for CrosstermTerminal {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Blocking key source reading crossterm events
#[derive(Debug, Default)]
pub struct CrosstermKeys;

impl CrosstermKeys {
    pub fn new() -> Self {
        Self
    }
}

impl KeyReader for CrosstermKeys {
    fn read_key(&mut self) -> io::Result<Option<KeyInput>> {
        loop {
            if let Event::Key(key_event) = event::read()? {
                if key_event.kind == KeyEventKind::Release {
                    continue;
                }
                if let Some(key) = KeyMapper::map(&key_event) {
                    return Ok(Some(key));
                }
            }
        }
    }
}
