//! Command registry and metadata.
//!
//! Commands are kept in registration order, which is the order `help`
//! lists them and tab completion offers them.

use std::fmt;
use std::sync::Arc;

use crate::core::session::Console;
use crate::error::DefinitionError;

/// Called with the argument tokens when a command runs.
pub type CommandCallback = Arc<dyn Fn(&Console, &[String]) -> anyhow::Result<()> + Send + Sync>;

/// A registered command.
#[derive(Clone)]
pub struct CommandEntry {
    pub name: String,
    pub help: String,
    pub syntax: String,
    /// Left out of `help`
    pub hidden: bool,
    /// Cannot be unregistered
    pub core: bool,
    pub callback: CommandCallback,
}

impl CommandEntry {
    /// A blank help text hides the command from `help`; a blank syntax
    /// falls back to the command name.
    pub fn new(name: &str, help: &str, syntax: &str, callback: CommandCallback) -> Self {
        let help = help.trim();
        let syntax = syntax.trim();
        Self {
            name: name.to_string(),
            help: help.to_string(),
            syntax: if syntax.is_empty() { name.to_string() } else { syntax.to_string() },
            hidden: help.is_empty(),
            core: false,
            callback,
        }
    }
}

impl fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEntry")
            .field("name", &self.name)
            .field("help", &self.help)
            .field("syntax", &self.syntax)
            .field("hidden", &self.hidden)
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

/// Registered commands in registration order.
#[derive(Debug, Default)]
pub struct CommandRegistry {
    entries: Vec<CommandEntry>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, entry: CommandEntry) -> Result<(), DefinitionError> {
        if entry.name.is_empty() || entry.name.contains(char::is_whitespace) || entry.name.contains(';') {
            return Err(DefinitionError::InvalidName(entry.name));
        }
        if self.contains(&entry.name) {
            return Err(DefinitionError::DuplicateCommand(entry.name));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Result<CommandEntry, DefinitionError> {
        let index = self
            .entries
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| DefinitionError::UnknownCommand(name.to_string()))?;
        if self.entries[index].core {
            return Err(DefinitionError::CoreCommand(name.to_string()));
        }
        Ok(self.entries.remove(index))
    }

    pub fn lookup(&self, name: &str) -> Option<&CommandEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// In-place access for flag changes
    pub fn entry_mut(&mut self, name: &str) -> Option<&mut CommandEntry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn is_core(&self, name: &str) -> bool {
        self.lookup(name).map_or(false, |e| e.core)
    }

    /// Every command, in registration order
    pub fn list(&self) -> impl Iterator<Item = &CommandEntry> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
