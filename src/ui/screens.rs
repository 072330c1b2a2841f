//! Overlay screens
//!
//! A screen takes over the whole terminal until the user presses Escape.
//! The manager only keeps the registry and which screen is up; the actual
//! transitions happen in the display, which owns the terminal.

use std::io;

use crate::core::terminal::Terminal;
use crate::error::DefinitionError;

/// A full-terminal view shown instead of the log and prompt
pub trait Screen: Send {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Draw the screen; the terminal was just cleared
    fn start(&mut self, term: &mut dyn Terminal) -> io::Result<()>;

    /// Called when the screen is dismissed or replaced
    fn stop(&mut self) {}
}

/// Registered screens and the active one
#[derive(Default)]
pub struct ScreenManager {
    /// Screens in registration order
    screens: Vec<Box<dyn Screen>>,
    /// Index of the active screen, `None` on the main view
    active: Option<usize>,
}

impl ScreenManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, screen: Box<dyn Screen>) -> Result<(), DefinitionError> {
        let name = screen.name();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(DefinitionError::InvalidName(name.to_string()));
        }
        if self.position(name).is_some() {
            return Err(DefinitionError::DuplicateScreen(name.to_string()));
        }
        self.screens.push(screen);
        Ok(())
    }

    /// Unregister a screen, stopping it first if it is up.
    ///
    /// Returns the screen and whether it was the active one.
    pub fn remove(&mut self, name: &str) -> Result<(Box<dyn Screen>, bool), DefinitionError> {
        let index = self
            .position(name)
            .ok_or_else(|| DefinitionError::UnknownScreen(name.to_string()))?;

        let was_active = self.active == Some(index);
        match self.active {
            Some(active) if active == index => self.active = None,
            Some(active) if active > index => self.active = Some(active - 1),
            _ => {}
        }

        let mut screen = self.screens.remove(index);
        if was_active {
            screen.stop();
        }
        Ok((screen, was_active))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Whether the main view is shown
    pub fn is_main(&self) -> bool {
        self.active.is_none()
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active
            .and_then(|i| self.screens.get(i))
            .map(|s| s.name())
    }

    /// (name, description) in registration order
    pub fn list(&self) -> Vec<(String, String)> {
        self.screens
            .iter()
            .map(|s| (s.name().to_string(), s.description().to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    /// Stop the active screen, if any, and mark the main view active
    pub fn stop_active(&mut self) {
        if let Some(index) = self.active.take() {
            if let Some(screen) = self.screens.get_mut(index) {
                screen.stop();
            }
        }
    }

    /// Mark `name` active and start it
    pub fn start(&mut self, name: &str, term: &mut dyn Terminal) -> Result<io::Result<()>, DefinitionError> {
        let index = self
            .position(name)
            .ok_or_else(|| DefinitionError::UnknownScreen(name.to_string()))?;
        self.active = Some(index);
        Ok(self.screens[index].start(term))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.screens.iter().position(|s| s.name() == name)
    }
}
