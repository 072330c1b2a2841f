//! Cursor placement for the console prompt.
//!
//! All positions are clamped against the terminal's current size before the
//! cursor is moved, so a stale row never makes the terminal scroll on its
//! own. The dialect decides how many bottom rows are off limits.

use std::io;

use super::scrollback::Scrollback;
use super::terminal::{Terminal, TerminalDialect};

/// Result of clamping a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clamped {
    pub row: u16,
    /// Whether the requested row was past the last usable one
    pub clamped: bool,
}

/// Wrap-aware cursor math for one terminal dialect
#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    dialect: TerminalDialect,
}

impl Renderer {
    pub fn new(dialect: TerminalDialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> TerminalDialect {
        self.dialect
    }

    /// Last row the prompt may live on for a terminal `height` rows tall
    pub fn last_usable_row(&self, height: u16) -> u16 {
        self.dialect.last_usable_row(height)
    }

    /// Clamp `y` to the last usable row
    pub fn clamp_row(&self, y: u16, height: u16) -> Clamped {
        let last = self.last_usable_row(height);
        if y > last {
            Clamped { row: last, clamped: true }
        } else {
            Clamped { row: y, clamped: false }
        }
    }

    /// Move the cursor, keeping it off the reserved bottom rows.
    ///
    /// Returns the row actually used.
    pub fn set_cursor(&self, term: &mut dyn Terminal, x: u16, y: u16) -> io::Result<u16> {
        let (width, height) = term.size()?;
        let Clamped { row, .. } = self.clamp_row(y, height);
        term.move_to(x.min(width.saturating_sub(1)), row)?;
        Ok(row)
    }

    /// Move the cursor, clamping only against the physical bottom row
    pub fn place_at_bottom(&self, term: &mut dyn Terminal, x: u16, y: u16) -> io::Result<u16> {
        let (width, height) = term.size()?;
        let row = y.min(height.saturating_sub(1));
        term.move_to(x.min(width.saturating_sub(1)), row)?;
        Ok(row)
    }

    /// Screen position of buffer column `index` behind a prompt of
    /// `prefix` columns, as (x, rows below the prompt anchor).
    pub fn cursor_for_logical_index(prefix: usize, index: usize, width: u16) -> (u16, u16) {
        let width = usize::from(width.max(1));
        let offset = prefix + index;
        ((offset % width) as u16, (offset / width) as u16)
    }

    /// Number of rows below the anchor touched by `columns` of prompt text
    pub fn wrapped_rows(columns: usize, width: u16) -> u16 {
        let width = usize::from(width.max(1));
        (columns.max(1).saturating_sub(1) / width) as u16
    }

    /// Overwrite the cursor's row with `fill` and return to its start.
    ///
    /// When `log` is given, the scrollback entry at that row index goes too.
    pub fn clear_line(
        &self,
        term: &mut dyn Terminal,
        fill: char,
        log: Option<&mut Scrollback>,
    ) -> io::Result<()> {
        let (width, _) = term.size()?;
        let (_, row) = term.cursor_position();

        if let Some(log) = log {
            log.remove(usize::from(row));
        }

        term.move_to(0, row)?;
        let line: String = std::iter::repeat(fill).take(usize::from(width)).collect();
        term.write(&line)?;
        term.move_to(0, row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryTerminal;
    use crate::core::scrollback::LogLine;
    use crate::core::terminal::ConsoleColor;
    use proptest::prelude::*;

    #[test]
    fn test_logical_index_wraps() {
        assert_eq!(Renderer::cursor_for_logical_index(3, 0, 80), (3, 0));
        assert_eq!(Renderer::cursor_for_logical_index(3, 76, 80), (79, 0));
        assert_eq!(Renderer::cursor_for_logical_index(3, 80, 80), (3, 1));
        assert_eq!(Renderer::cursor_for_logical_index(3, 157, 80), (0, 2));
    }

    #[test]
    fn test_wrapped_rows() {
        assert_eq!(Renderer::wrapped_rows(0, 80), 0);
        assert_eq!(Renderer::wrapped_rows(80, 80), 0);
        assert_eq!(Renderer::wrapped_rows(81, 80), 1);
    }

    #[test]
    fn test_clamp_per_dialect() {
        let unix = Renderer::new(TerminalDialect::Unix);
        let reserved = Renderer::new(TerminalDialect::Reserved);

        assert_eq!(unix.clamp_row(23, 24), Clamped { row: 23, clamped: false });
        assert_eq!(reserved.clamp_row(23, 24), Clamped { row: 22, clamped: true });
        assert_eq!(unix.clamp_row(40, 24), Clamped { row: 23, clamped: true });
    }

    #[test]
    fn test_set_cursor_vs_place_at_bottom() {
        let renderer = Renderer::new(TerminalDialect::Reserved);
        let mut term = MemoryTerminal::new(20, 10);

        assert_eq!(renderer.set_cursor(&mut term, 5, 9).unwrap(), 8);
        assert_eq!(term.cursor(), (5, 8));

        assert_eq!(renderer.place_at_bottom(&mut term, 0, 9).unwrap(), 9);
        assert_eq!(renderer.place_at_bottom(&mut term, 0, 30).unwrap(), 9);
    }

    #[test]
    fn test_clear_line_drops_log_entry() {
        let renderer = Renderer::new(TerminalDialect::Unix);
        let mut term = MemoryTerminal::new(10, 5);
        let mut log = Scrollback::new(5);
        for text in ["zero\n", "one\n"] {
            term.write(text).unwrap();
            log.push(LogLine::new(text, ConsoleColor::White, ConsoleColor::Black));
        }

        term.move_to(3, 1).unwrap();
        renderer.clear_line(&mut term, ' ', Some(&mut log)).unwrap();

        assert_eq!(term.row_text(0), "zero");
        assert_eq!(term.row_text(1), "");
        assert_eq!(term.cursor(), (0, 1));
        assert_eq!(log.iter().map(|l| l.text.as_str()).collect::<Vec<_>>(), vec!["zero\n"]);
    }

    proptest! {
        #[test]
        fn prop_logical_index_matches_wrap(prefix in 0usize..10, index in 0usize..500, width in 1u16..200) {
            let (x, dy) = Renderer::cursor_for_logical_index(prefix, index, width);
            prop_assert!(x < width);
            prop_assert_eq!(usize::from(dy) * usize::from(width) + usize::from(x), prefix + index);
            prop_assert_eq!(Renderer::cursor_for_logical_index(prefix, index, width), (x, dy));
        }
    }
}
