//! Key mapping for console input
//!
//! Converts crossterm key events to the small key vocabulary the input
//! editor understands.

use bitflags::bitflags;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

bitflags! {
    /// Modifier keys
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        result
    }
}

/// Keys the console reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleKey {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    Tab,
    Escape,
    /// Ctrl+C
    Interrupt,
}

/// One key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyInput {
    pub key: ConsoleKey,
    pub modifiers: Modifiers,
    /// Whether the key produces no printable character
    pub control: bool,
}

impl KeyInput {
    pub fn new(key: ConsoleKey, modifiers: Modifiers) -> Self {
        let control = match key {
            ConsoleKey::Char(ch) => ch.is_control() || modifiers.intersects(Modifiers::CTRL | Modifiers::ALT),
            _ => true,
        };
        Self {
            key,
            modifiers,
            control,
        }
    }

    /// Plain printable key
    pub fn char(ch: char) -> Self {
        Self::new(ConsoleKey::Char(ch), Modifiers::empty())
    }

    /// Unmodified special key
    pub fn key(key: ConsoleKey) -> Self {
        Self::new(key, Modifiers::empty())
    }

    /// Printable character carried by this key, if any
    pub fn printable(&self) -> Option<char> {
        match self.key {
            ConsoleKey::Char(ch) if !self.control => Some(ch),
            _ => None,
        }
    }
}

/// Key mapper for converting key events to console keys
pub struct KeyMapper;

impl KeyMapper {
    /// Map a crossterm KeyEvent; `None` for keys the console ignores
    pub fn map(event: &KeyEvent) -> Option<KeyInput> {
        let mods = Modifiers::from(event.modifiers);

        let key = match event.code {
            KeyCode::Char(ch) => Self::map_char(ch, mods),
            KeyCode::Enter => ConsoleKey::Enter,
            KeyCode::Backspace => ConsoleKey::Backspace,
            KeyCode::Delete => ConsoleKey::Delete,
            KeyCode::Tab => ConsoleKey::Tab,
            KeyCode::Esc => ConsoleKey::Escape,

            // Arrow keys
            KeyCode::Up => ConsoleKey::Up,
            KeyCode::Down => ConsoleKey::Down,
            KeyCode::Right => ConsoleKey::Right,
            KeyCode::Left => ConsoleKey::Left,

            // Navigation keys
            KeyCode::Home => ConsoleKey::Home,
            KeyCode::End => ConsoleKey::End,

            _ => return None,
        };

        Some(KeyInput::new(key, mods))
    }

    /// Map a character with modifiers
    fn map_char(ch: char, mods: Modifiers) -> ConsoleKey {
        if mods.contains(Modifiers::CTRL) && !mods.contains(Modifiers::ALT) {
            match ch.to_ascii_lowercase() {
                'c' => return ConsoleKey::Interrupt,
                'h' => return ConsoleKey::Backspace, // Ctrl+H = BS
                'm' | 'j' => return ConsoleKey::Enter,
                'i' => return ConsoleKey::Tab,
                '[' => return ConsoleKey::Escape, // Ctrl+[ = ESC
                _ => {}
            }
        }

        ConsoleKey::Char(ch)
    }
}
