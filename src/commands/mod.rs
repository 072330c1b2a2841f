//! Command handling.
//!
//! - **parse**: splitting a line into sub-commands and arguments
//! - **registry**: registered commands and their metadata
//! - **dispatch**: resolving a sub-command to a command, CVar or error
//! - **builtin**: the commands every console starts with

pub mod builtin;
pub mod dispatch;
pub mod parse;
pub mod registry;

pub use parse::combine_args;
pub use registry::{CommandCallback, CommandEntry, CommandRegistry};
