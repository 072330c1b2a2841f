//! Input handling and overlay screens.
//!
//! - **keymapper**: crossterm key events to console keys
//! - **editor**: edit buffer, key handling and tab completion
//! - **screens**: full-terminal overlay views

pub mod editor;
pub mod keymapper;
pub mod screens;

pub use keymapper::{ConsoleKey, KeyInput, KeyMapper, Modifiers};
pub use screens::Screen;
