//! Configuration and color scheme management for promptline.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.promptline/config.toml`
//! - Built-in color schemes for the console's output levels
//!
//! # Configuration File
//!
//! The configuration file is located at `~/.promptline/config.toml`:
//!
//! ```toml
//! prompt = "#> "
//! prepend_timestamp = true
//! timestamp_format = "%-m/%-d/%Y %-I:%M:%S %p"
//! history_length = 30
//!
//! # Bottom row handling: auto, unix, reserved
//! dialect = "auto"
//!
//! allow_cmd_history = true
//! allow_cmd_exit = true
//!
//! # Color scheme: default, classic, solarized, mono
//! color_scheme = "default"
//! title = "promptline"
//! ```
//!
//! # Available Color Schemes
//!
//! - `default` - White text, cyan/yellow/red for important, warning, error
//! - `classic` - Gray text on the old console palette
//! - `solarized` - Blue/green tinted levels
//! - `mono` - Everything in the standard colour

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::terminal::{ConsoleColor, TerminalDialect};
use crate::history::{DEFAULT_HISTORY_LENGTH, MAX_HISTORY_LENGTH};

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Text drawn before the edit buffer
    pub prompt: String,
    /// Prefix printed lines with the time
    pub prepend_timestamp: bool,
    /// chrono format string for the timestamp
    pub timestamp_format: String,
    /// Remembered command lines
    pub history_length: usize,
    /// `auto`, `unix` or `reserved`
    pub dialect: String,
    /// Whether `cmd-history` may be used
    pub allow_cmd_history: bool,
    /// Whether `cmd-exit` may be used
    pub allow_cmd_exit: bool,
    /// Color scheme name
    pub color_scheme: String,
    /// Terminal window title
    pub title: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            prompt: "#> ".to_string(),
            prepend_timestamp: true,
            timestamp_format: "%-m/%-d/%Y %-I:%M:%S %p".to_string(),
            history_length: DEFAULT_HISTORY_LENGTH,
            dialect: "auto".to_string(),
            allow_cmd_history: true,
            allow_cmd_exit: true,
            color_scheme: "default".to_string(),
            title: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Self {
        match Self::get_config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from `path`, defaults if missing or malformed
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(path) {
            Ok(content) => Self::parse(&content).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "ignoring malformed config");
                Self::default()
            }),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot read config");
                Self::default()
            }
        }
    }

    /// Parse TOML text
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Directory holding the config and the log file
    pub fn config_dir() -> Option<PathBuf> {
        let dir = home_dir()?.join(".promptline");
        if !dir.exists() {
            let _ = fs::create_dir_all(&dir);
        }
        Some(dir)
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Resolved terminal dialect; unknown names fall back to detection
    pub fn dialect(&self) -> TerminalDialect {
        TerminalDialect::from_name(&self.dialect).unwrap_or_else(TerminalDialect::detect)
    }

    /// History length clamped to what `cmd-history` accepts
    pub fn history_length(&self) -> usize {
        self.history_length.clamp(1, MAX_HISTORY_LENGTH)
    }

    /// Get the color scheme
    pub fn get_color_scheme(&self) -> ColorScheme {
        ColorScheme::by_name(&self.color_scheme)
    }
}

/// Colours for each output level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub name: String,
    pub standard: ConsoleColor,
    pub important: ConsoleColor,
    pub warning: ConsoleColor,
    pub error: ConsoleColor,
    pub prompt: ConsoleColor,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_scheme()
    }
}

impl ColorScheme {
    /// Default color scheme
    pub fn default_scheme() -> Self {
        Self {
            name: "default".to_string(),
            standard: ConsoleColor::White,
            important: ConsoleColor::Cyan,
            warning: ConsoleColor::Yellow,
            error: ConsoleColor::Red,
            prompt: ConsoleColor::White,
        }
    }

    /// Gray text, dark accents
    pub fn classic() -> Self {
        Self {
            name: "classic".to_string(),
            standard: ConsoleColor::Gray,
            important: ConsoleColor::DarkCyan,
            warning: ConsoleColor::DarkYellow,
            error: ConsoleColor::DarkRed,
            prompt: ConsoleColor::White,
        }
    }

    /// Solarized-like accents
    pub fn solarized() -> Self {
        Self {
            name: "solarized".to_string(),
            standard: ConsoleColor::Gray,
            important: ConsoleColor::Blue,
            warning: ConsoleColor::DarkYellow,
            error: ConsoleColor::Magenta,
            prompt: ConsoleColor::Green,
        }
    }

    /// No accents
    pub fn mono() -> Self {
        Self {
            name: "mono".to_string(),
            standard: ConsoleColor::White,
            important: ConsoleColor::White,
            warning: ConsoleColor::White,
            error: ConsoleColor::White,
            prompt: ConsoleColor::White,
        }
    }

    /// Get scheme by name
    pub fn by_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "classic" => Self::classic(),
            "solarized" | "solarized-dark" => Self::solarized(),
            "mono" | "monochrome" => Self::mono(),
            _ => Self::default_scheme(),
        }
    }

    /// List available schemes
    pub fn list() -> Vec<&'static str> {
        vec!["default", "classic", "solarized", "mono"]
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}
