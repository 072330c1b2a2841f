//! In-memory terminal.
//!
//! A character grid that behaves like a small VT screen: pending wrap in
//! the last column, scrolling on a bottom-row line feed, clear, colours and
//! cursor visibility. Handles are cheap clones sharing one grid, so a test
//! can hand one to a console and inspect the other.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};

use super::lock;
use super::terminal::{ConsoleColor, CursorModel, CursorStep, KeyReader, Terminal, DEFAULT_COLORS};
use crate::ui::keymapper::KeyInput;

#[derive(Debug)]
struct Grid {
    width: u16,
    height: u16,
    cells: Vec<Vec<char>>,
    cursor: CursorModel,
    colors: (ConsoleColor, ConsoleColor),
    cursor_visible: bool,
    title: String,
    clears: usize,
    scrolled: usize,
}

impl Grid {
    fn blank_row(width: u16) -> Vec<char> {
        vec![' '; width as usize]
    }

    fn scroll(&mut self) {
        self.cells.remove(0);
        self.cells.push(Self::blank_row(self.width));
        self.scrolled += 1;
    }
}

/// Shared in-memory terminal
#[derive(Debug, Clone)]
pub struct MemoryTerminal {
    grid: Arc<Mutex<Grid>>,
}

impl MemoryTerminal {
    pub fn new(width: u16, height: u16) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            grid: Arc::new(Mutex::new(Grid {
                width,
                height,
                cells: vec![Grid::blank_row(width); height as usize],
                cursor: CursorModel::default(),
                colors: DEFAULT_COLORS,
                cursor_visible: true,
                title: String::new(),
                clears: 0,
                scrolled: 0,
            })),
        }
    }

    /// Text of row `y` with trailing blanks removed
    pub fn row_text(&self, y: u16) -> String {
        let grid = lock(&self.grid);
        grid.cells
            .get(y as usize)
            .map(|row| row.iter().collect::<String>().trim_end().to_string())
            .unwrap_or_default()
    }

    /// All rows, trailing blanks removed
    pub fn lines(&self) -> Vec<String> {
        let height = lock(&self.grid).height;
        (0..height).map(|y| self.row_text(y)).collect()
    }

    /// Whole screen joined with newlines, trailing empty rows dropped
    pub fn contents(&self) -> String {
        let mut lines = self.lines();
        while lines.last().map_or(false, |l| l.is_empty()) {
            lines.pop();
        }
        lines.join("\n")
    }

    /// Index of the first row containing `needle`
    pub fn find_row(&self, needle: &str) -> Option<u16> {
        self.lines()
            .iter()
            .position(|line| line.contains(needle))
            .map(|y| y as u16)
    }

    pub fn cursor(&self) -> (u16, u16) {
        let grid = lock(&self.grid);
        (grid.cursor.col, grid.cursor.row)
    }

    pub fn cursor_visible(&self) -> bool {
        lock(&self.grid).cursor_visible
    }

    pub fn title(&self) -> String {
        lock(&self.grid).title.clone()
    }

    /// Number of full clears so far
    pub fn clear_count(&self) -> usize {
        lock(&self.grid).clears
    }

    /// Number of rows scrolled off the top so far
    pub fn scrolled_rows(&self) -> usize {
        lock(&self.grid).scrolled
    }

    /// Change the buffer size, keeping the top-left content
    pub fn resize(&self, width: u16, height: u16) {
        let mut grid = lock(&self.grid);
        let width = width.max(1);
        let height = height.max(1);
        grid.cells.resize(height as usize, Grid::blank_row(width));
        for row in grid.cells.iter_mut() {
            row.resize(width as usize, ' ');
        }
        grid.width = width;
        grid.height = height;
        let (col, row) = (grid.cursor.col, grid.cursor.row);
        grid.cursor.move_to(col, row, width, height);
    }
}

impl Terminal for MemoryTerminal {
    fn write(&mut self, text: &str) -> io::Result<()> {
        let mut grid = lock(&self.grid);
        let (width, height) = (grid.width, grid.height);
        let steps = grid.cursor.advance(text, width, height);
        for step in steps {
            match step {
                CursorStep::Put { ch, col, row } => {
                    if let Some(cell) = grid
                        .cells
                        .get_mut(row as usize)
                        .and_then(|r| r.get_mut(col as usize))
                    {
                        *cell = ch;
                    }
                }
                CursorStep::Scroll => grid.scroll(),
            }
        }
        Ok(())
    }

    fn size(&self) -> io::Result<(u16, u16)> {
        let grid = lock(&self.grid);
        Ok((grid.width, grid.height))
    }

    fn cursor_position(&self) -> (u16, u16) {
        self.cursor()
    }

    fn move_to(&mut self, x: u16, y: u16) -> io::Result<()> {
        let mut grid = lock(&self.grid);
        let (width, height) = (grid.width, grid.height);
        grid.cursor.move_to(x, y, width, height);
        Ok(())
    }

    fn clear(&mut self) -> io::Result<()> {
        let mut grid = lock(&self.grid);
        let width = grid.width;
        for row in grid.cells.iter_mut() {
            *row = Grid::blank_row(width);
        }
        grid.cursor = CursorModel::default();
        grid.clears += 1;
        Ok(())
    }

    fn scroll_up(&mut self, rows: u16) -> io::Result<()> {
        let mut grid = lock(&self.grid);
        for _ in 0..rows.min(grid.height) {
            grid.scroll();
        }
        Ok(())
    }

    fn colors(&self) -> (ConsoleColor, ConsoleColor) {
        lock(&self.grid).colors
    }

    fn set_colors(&mut self, fg: ConsoleColor, bg: ConsoleColor) -> io::Result<()> {
        lock(&self.grid).colors = (fg, bg);
        Ok(())
    }

    fn reset_colors(&mut self) -> io::Result<()> {
        lock(&self.grid).colors = DEFAULT_COLORS;
        Ok(())
    }

    fn set_cursor_visible(&mut self, visible: bool) -> io::Result<()> {
        lock(&self.grid).cursor_visible = visible;
        Ok(())
    }

    fn set_title(&mut self, title: &str) -> io::Result<()> {
        lock(&self.grid).title = title.to_string();
        Ok(())
    }
}

/// Key source replaying a fixed list of keys, then reporting end of input
#[derive(Debug, Default)]
pub struct ScriptedKeys {
    keys: VecDeque<KeyInput>,
}

impl ScriptedKeys {
    pub fn new(keys: impl IntoIterator<Item = KeyInput>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }
}

impl KeyReader for ScriptedKeys {
    fn read_key(&mut self) -> io::Result<Option<KeyInput>> {
        Ok(self.keys.pop_front())
    }
}
