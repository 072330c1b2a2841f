//! promptline - an interactive command console for terminal applications
//!
//! Program output scrolls above a fixed prompt line while the user edits a
//! command with history and tab completion. Entered lines run registered
//! commands or read and assign typed configuration variables (CVars).
//! Full-terminal overlay screens can temporarily take over the display.
//!
//! # Quick Start
//!
//! ```no_run
//! use promptline::{Config, Console};
//!
//! let console = Console::crossterm(Config::load())?;
//! console.add_cvar("volume", 5)?;
//! console.add_command("say", "Prints its arguments.", |c, args| {
//!     c.write_line(&promptline::combine_args(args));
//!     Ok(())
//! })?;
//! console.start();
//! console.listen(false);
//! console.stop();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod commands;
pub mod config;
pub mod core;
pub mod cvars;
pub mod error;
pub mod history;
pub mod ui;

pub use crate::commands::{combine_args, CommandCallback};
pub use crate::config::{ColorScheme, Config};
pub use crate::core::interceptor::StreamObserver;
pub use crate::core::memory::{MemoryTerminal, ScriptedKeys};
pub use crate::core::session::{Console, ConsoleBuilder, PrintOptions};
pub use crate::core::terminal::{ConsoleColor, KeyReader, Terminal, TerminalDialect};
pub use crate::cvars::{CVarType, CVarValue, FromCVar};
pub use crate::error::{ConversionError, DefinitionError, DispatchError};
pub use crate::ui::screens::Screen;
pub use crate::ui::keymapper::{ConsoleKey, KeyInput};
