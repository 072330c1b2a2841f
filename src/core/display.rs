//! Shared display state.
//!
//! Everything that decides what is on screen lives here behind one lock:
//! the terminal, the scrollback log, the prompt position, the input editor
//! and the screen manager. Output hooks, the key listener and command
//! callbacks all come through this type, so row accounting never
//! interleaves.

use std::io;

use tracing::{debug, info, warn};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::renderer::Renderer;
use super::scrollback::{LogLine, Scrollback};
use super::terminal::{ConsoleColor, Terminal, TerminalDialect};
use crate::error::DefinitionError;
use crate::ui::editor::{Effect, InputEditor};
use crate::ui::screens::{Screen, ScreenManager};

/// Where the prompt is on screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PromptState {
    /// Row the next output goes to
    pub top: u16,
    /// Row the prompt starts on
    pub anchor: u16,
    /// Extra rows the wrapped prompt occupies below the anchor
    pub rows: u16,
}

/// Terminal plus everything drawn on it
pub struct Display {
    term: Option<Box<dyn Terminal>>,
    renderer: Renderer,
    scrollback: Scrollback,
    prompt: PromptState,
    prompt_text: String,
    prompt_color: ConsoleColor,
    pub(crate) editor: InputEditor,
    pub(crate) screens: ScreenManager,
}

impl Display {
    pub fn new(
        term: Option<Box<dyn Terminal>>,
        dialect: TerminalDialect,
        prompt_text: &str,
        prompt_color: ConsoleColor,
        history_length: usize,
    ) -> Self {
        let height = term
            .as_ref()
            .and_then(|t| t.size().ok())
            .map_or(24, |(_, h)| h);

        Self {
            term,
            renderer: Renderer::new(dialect),
            scrollback: Scrollback::new(Scrollback::capacity_for_height(height)),
            prompt: PromptState::default(),
            prompt_text: prompt_text.to_string(),
            prompt_color,
            editor: InputEditor::new(history_length),
            screens: ScreenManager::new(),
        }
    }

    pub fn has_terminal(&self) -> bool {
        self.term.is_some()
    }

    pub fn dialect(&self) -> TerminalDialect {
        self.renderer.dialect()
    }

    /// Terminal size, `None` when headless
    pub fn size(&self) -> Option<(u16, u16)> {
        self.term.as_ref().and_then(|t| t.size().ok())
    }

    pub fn is_main(&self) -> bool {
        self.screens.is_main()
    }

    pub fn prompt(&self) -> PromptState {
        self.prompt
    }

    pub fn scrollback(&self) -> &Scrollback {
        &self.scrollback
    }

    pub fn editor(&self) -> &InputEditor {
        &self.editor
    }

    pub fn set_prompt(&mut self, text: &str, color: ConsoleColor) {
        self.prompt_text = text.to_string();
        self.prompt_color = color;
    }

    fn prompt_columns(&self) -> usize {
        self.prompt_text.width()
    }

    /// Account for a write that went through the output stream.
    ///
    /// On the main view the text is drawn at `top` and the prompt is drawn
    /// again below it; under an overlay only the row count moves.
    pub fn record_write(&mut self, text: &str) {
        let Some(term) = self.term.as_deref_mut() else {
            return;
        };
        let Ok((width, height)) = term.size() else {
            return;
        };

        let (fg, bg) = term.colors();
        self.scrollback
            .set_capacity(Scrollback::capacity_for_height(height));
        self.scrollback.push(LogLine::new(text, fg, bg));

        if !self.screens.is_main() {
            self.prompt.top = self.prompt.top.saturating_add(1).min(height.saturating_sub(1));
            return;
        }

        // One row per line feed plus the rows the text wraps onto
        let newlines = text.matches('\n').count();
        let visible: usize = text
            .chars()
            .filter(|c| *c != '\r' && *c != '\n')
            .map(|c| c.width().unwrap_or(0))
            .sum();
        let advance = newlines + visible / usize::from(width.max(1));

        if let Err(err) = self.draw_write(text, advance) {
            debug!(error = %err, "output redraw failed");
        }
        self.write_input_line();
    }

    fn draw_write(&mut self, text: &str, advance: usize) -> io::Result<()> {
        let Some(term) = self.term.as_deref_mut() else {
            return Ok(());
        };
        let (_, height) = term.size()?;
        let bottom = height.saturating_sub(1);

        let top = self.renderer.set_cursor(term, 0, self.prompt.top)?;
        let last = top.saturating_add(self.prompt.rows).min(bottom);
        for row in top..=last {
            term.move_to(0, row)?;
            self.renderer.clear_line(term, ' ', None)?;
        }
        term.move_to(0, top)?;
        term.write(text)?;

        let next = usize::from(top) + advance;
        self.prompt.top = next.min(usize::from(bottom)) as u16;
        self.prompt.rows = 0;
        Ok(())
    }

    /// Draw the prompt and the edit buffer at `top`
    pub fn write_input_line(&mut self) {
        if let Err(err) = self.draw_input_line() {
            debug!(error = %err, "prompt redraw failed");
        }
    }

    fn draw_input_line(&mut self) -> io::Result<()> {
        if !self.screens.is_main() {
            return Ok(());
        }
        let prompt_columns = self.prompt_columns();
        let Some(term) = self.term.as_deref_mut() else {
            return Ok(());
        };
        let (width, height) = term.size()?;
        let bottom = height.saturating_sub(1);

        let last_usable = self.renderer.last_usable_row(height);
        if self.prompt.top > last_usable {
            term.scroll_up(self.prompt.top - last_usable)?;
            self.prompt.top = last_usable;
        }
        let top = self.prompt.top;

        let previous = top.saturating_add(self.prompt.rows).min(bottom);
        for row in top..=previous {
            term.move_to(0, row)?;
            self.renderer.clear_line(term, ' ', None)?;
        }

        let (_, bg) = term.colors();
        term.set_colors(self.prompt_color, bg)?;
        term.move_to(0, top)?;
        let line = format!("{}{}", self.prompt_text, self.editor.buffer.text());
        term.write(&line)?;

        // A prompt reaching past the bottom row pushed everything up
        let columns = prompt_columns + self.editor.buffer.columns();
        let written = Renderer::wrapped_rows(columns, width);
        let rows = (columns / usize::from(width.max(1))) as u16;
        let scrolled = (top + written).saturating_sub(bottom);
        let overflow = (top + rows).saturating_sub(bottom);
        if overflow > scrolled {
            term.scroll_up(overflow - scrolled)?;
        }

        self.prompt.anchor = top.saturating_sub(overflow);
        self.prompt.top = self.prompt.anchor;
        self.prompt.rows = rows;
        self.place_cursor()
    }

    /// Put the terminal cursor on the edit cursor
    pub fn set_cursor_pos(&mut self) {
        if let Err(err) = self.place_cursor() {
            debug!(error = %err, "cursor placement failed");
        }
    }

    fn place_cursor(&mut self) -> io::Result<()> {
        if !self.screens.is_main() {
            return Ok(());
        }
        let prompt_columns = self.prompt_columns();
        let Some(term) = self.term.as_deref_mut() else {
            return Ok(());
        };
        let (width, _) = term.size()?;
        let (x, dy) =
            Renderer::cursor_for_logical_index(prompt_columns, self.editor.buffer.cursor_columns(), width);
        self.renderer
            .place_at_bottom(term, x, self.prompt.anchor.saturating_add(dy))?;
        Ok(())
    }

    /// Show what an editor key did
    pub fn apply(&mut self, effect: &Effect) {
        match effect {
            Effect::Echo(ch) => self.echo(*ch),
            Effect::MoveCursor => self.set_cursor_pos(),
            Effect::Redraw => self.write_input_line(),
            _ => {}
        }
    }

    /// Append a just-typed char without redrawing when it fits on the row
    fn echo(&mut self, ch: char) {
        let prompt_columns = self.prompt_columns();
        let Some(term) = self.term.as_deref_mut() else {
            return;
        };
        let Ok((width, _)) = term.size() else {
            return;
        };

        let cells = ch.width().unwrap_or(0);
        let before = prompt_columns + self.editor.buffer.columns() - cells;
        if before % usize::from(width.max(1)) + cells < usize::from(width) {
            let mut buf = [0u8; 4];
            if term.write(ch.encode_utf8(&mut buf)).is_ok() {
                return;
            }
        }
        self.write_input_line();
    }

    /// Replace the edit buffer with a completion
    pub fn accept_completion(&mut self, suggestion: &str) {
        let erase = self.editor.buffer.cursor_columns();
        let prompt_columns = self.prompt_columns();
        self.editor.buffer.replace(suggestion);

        let fits = self.size().map_or(false, |(width, _)| {
            prompt_columns + suggestion.width() < usize::from(width)
                && prompt_columns + erase < usize::from(width)
        });
        if fits && self.prompt.rows == 0 {
            if let Some(term) = self.term.as_deref_mut() {
                let rewrite = format!("{}{}", "\x08".repeat(erase), suggestion);
                if term.write(&rewrite).is_ok() {
                    return;
                }
            }
        }
        self.write_input_line();
    }

    /// Wipe the terminal and the log, prompt back to the top row
    pub fn clear_screen(&mut self) {
        self.scrollback.clear();
        self.prompt = PromptState::default();
        let Some(term) = self.term.as_deref_mut() else {
            return;
        };
        if let Err(err) = term.clear() {
            debug!(error = %err, "clear failed");
        }
        self.write_input_line();
    }

    /// Draw the whole log again from the top.
    ///
    /// Failures on single entries are skipped; the repaint always finishes
    /// with a prompt.
    pub fn repaint_log(&mut self) {
        let Some(term) = self.term.as_deref_mut() else {
            return;
        };
        if let Err(err) = term.clear() {
            warn!(error = %err, "clear before repaint failed");
        }
        for line in self.scrollback.iter() {
            let drawn = term
                .set_colors(line.fg, line.bg)
                .and_then(|_| term.write(&line.text));
            if let Err(err) = drawn {
                warn!(error = %err, "skipping log line during repaint");
            }
        }

        let bottom = term.size().map_or(0, |(_, h)| h.saturating_sub(1));
        let (_, row) = term.cursor_position();
        self.prompt = PromptState {
            top: row.min(bottom),
            anchor: row.min(bottom),
            rows: 0,
        };
        self.write_input_line();
    }

    pub fn add_screen(&mut self, screen: Box<dyn Screen>) -> Result<(), DefinitionError> {
        self.screens.add(screen)
    }

    /// Unregister a screen; the main view comes back if it was shown
    pub fn remove_screen(&mut self, name: &str) -> Result<(), DefinitionError> {
        let (_, was_active) = self.screens.remove(name)?;
        if was_active {
            self.restore_main_view();
        }
        Ok(())
    }

    /// Show the named overlay, or the main view for `None`
    pub fn switch_screen(&mut self, name: Option<&str>) -> Result<(), DefinitionError> {
        let Some(name) = name else {
            self.screens.stop_active();
            self.restore_main_view();
            return Ok(());
        };

        if !self.screens.contains(name) {
            return Err(DefinitionError::UnknownScreen(name.to_string()));
        }
        let Some(term) = self.term.as_deref_mut() else {
            return Ok(());
        };

        self.screens.stop_active();
        if let Err(err) = term.clear().and_then(|_| term.set_cursor_visible(false)) {
            warn!(error = %err, "preparing overlay failed");
        }
        if let Err(err) = self.screens.start(name, term)? {
            warn!(screen = name, error = %err, "screen failed to start");
        }
        info!(screen = name, "overlay shown");
        Ok(())
    }

    fn restore_main_view(&mut self) {
        let Some(term) = self.term.as_deref_mut() else {
            return;
        };
        // Whatever the overlay did, the cursor and colours come back
        let _ = term.set_cursor_visible(true);
        let _ = term.reset_colors();
        info!("main view restored");
        self.repaint_log();
    }

    pub fn colors(&self) -> Option<(ConsoleColor, ConsoleColor)> {
        self.term.as_ref().map(|t| t.colors())
    }

    pub fn set_foreground(&mut self, fg: ConsoleColor) {
        if let Some(term) = self.term.as_deref_mut() {
            let (_, bg) = term.colors();
            let _ = term.set_colors(fg, bg);
        }
    }

    pub fn set_title(&mut self, title: &str) {
        if let Some(term) = self.term.as_deref_mut() {
            if let Err(err) = term.set_title(title) {
                debug!(error = %err, "set title failed");
            }
        }
    }

    pub fn flush(&mut self) {
        if let Some(term) = self.term.as_deref_mut() {
            let _ = term.flush();
        }
    }

    /// Hand the terminal back
    pub fn restore(&mut self) -> io::Result<()> {
        match self.term.as_deref_mut() {
            Some(term) => term.restore(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::MemoryTerminal;
    use crate::ui::keymapper::KeyInput;

    fn display(term: &MemoryTerminal, dialect: TerminalDialect) -> Display {
        Display::new(
            Some(Box::new(term.clone())),
            dialect,
            "#> ",
            ConsoleColor::White,
            30,
        )
    }

    #[test]
    fn test_write_lands_above_prompt() {
        let term = MemoryTerminal::new(20, 24);
        let mut display = display(&term, TerminalDialect::Unix);
        display.write_input_line();
        display.record_write("hello\n");
        display.record_write("world\n");

        assert_eq!(term.row_text(0), "hello");
        assert_eq!(term.row_text(1), "world");
        assert_eq!(term.row_text(2), "#>");
        assert_eq!(display.prompt().top, 2);
        assert_eq!(term.cursor(), (3, 2));
        assert_eq!(display.scrollback().len(), 2);
    }

    #[test]
    fn test_typed_text_survives_output() {
        let term = MemoryTerminal::new(20, 24);
        let mut display = display(&term, TerminalDialect::Unix);
        display.write_input_line();
        for ch in "ab".chars() {
            let effect = display.editor.handle_key(&KeyInput::char(ch), true);
            display.apply(&effect);
        }
        display.record_write("log\n");

        assert_eq!(term.row_text(0), "log");
        assert_eq!(term.row_text(1), "#> ab");
        assert_eq!(term.cursor(), (5, 1));
    }

    #[test]
    fn test_wrap_correction_advances_top() {
        let term = MemoryTerminal::new(10, 24);
        let mut display = display(&term, TerminalDialect::Unix);
        display.record_write("0123456789abc\n");

        assert_eq!(term.row_text(0), "0123456789");
        assert_eq!(term.row_text(1), "abc");
        assert_eq!(display.prompt().top, 2);
    }

    #[test]
    fn test_bottom_row_unix_scrolls() {
        let term = MemoryTerminal::new(20, 5);
        let mut display = display(&term, TerminalDialect::Unix);
        for i in 0..6 {
            display.record_write(&format!("line{}\n", i));
        }

        assert_eq!(term.lines(), vec!["line2", "line3", "line4", "line5", "#>"]);
        assert_eq!(display.prompt().top, 4);
    }

    #[test]
    fn test_bottom_row_reserved_keeps_margin() {
        let term = MemoryTerminal::new(20, 5);
        let mut display = display(&term, TerminalDialect::Reserved);
        for i in 0..6 {
            display.record_write(&format!("line{}\r\n", i));
        }

        assert_eq!(term.lines(), vec!["line3", "line4", "line5", "#>", ""]);
        assert_eq!(display.prompt().top, 3);
    }

    #[test]
    fn test_echo_and_wrapped_prompt() {
        let term = MemoryTerminal::new(8, 10);
        let mut display = display(&term, TerminalDialect::Unix);
        display.write_input_line();
        for ch in "abcdefg".chars() {
            let effect = display.editor.handle_key(&KeyInput::char(ch), true);
            display.apply(&effect);
        }

        assert_eq!(term.row_text(0), "#> abcde");
        assert_eq!(term.row_text(1), "fg");
        assert_eq!(term.cursor(), (2, 1));
        assert_eq!(display.prompt().rows, 1);
    }

    #[test]
    fn test_shorter_redraw_clears_wrapped_row() {
        let term = MemoryTerminal::new(8, 10);
        let mut display = display(&term, TerminalDialect::Unix);
        display.editor.buffer.replace("abcdefg");
        display.write_input_line();
        display.editor.buffer.replace("x");
        display.write_input_line();

        assert_eq!(term.row_text(0), "#> x");
        assert_eq!(term.row_text(1), "");
    }

    #[test]
    fn test_clear_screen_resets_log() {
        let term = MemoryTerminal::new(20, 24);
        let mut display = display(&term, TerminalDialect::Unix);
        display.record_write("junk\n");
        display.clear_screen();

        assert!(display.scrollback().is_empty());
        assert_eq!(display.prompt().top, 0);
        assert_eq!(term.contents(), "#>");
    }

    #[test]
    fn test_completion_rewrite() {
        let term = MemoryTerminal::new(20, 24);
        let mut display = display(&term, TerminalDialect::Unix);
        display.write_input_line();
        for ch in "vo".chars() {
            let effect = display.editor.handle_key(&KeyInput::char(ch), true);
            display.apply(&effect);
        }
        display.accept_completion("volume");

        assert_eq!(term.row_text(0), "#> volume");
        assert_eq!(term.cursor(), (9, 0));
        assert_eq!(display.editor().buffer.text(), "volume");
    }

    #[test]
    fn test_headless_is_silent() {
        let mut display = Display::new(None, TerminalDialect::Unix, "#> ", ConsoleColor::White, 30);
        display.record_write("nobody sees this\n");
        display.write_input_line();
        display.clear_screen();
        assert!(display.scrollback().is_empty());
        assert_eq!(display.size(), None);
    }
}
