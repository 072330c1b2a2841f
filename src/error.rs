//! Error types for promptline.
//!
//! Registration problems are returned to the caller as [`DefinitionError`].
//! Everything that can go wrong while running a command line is a
//! [`DispatchError`]; those never leave the dispatcher; they are rendered
//! as a single error line in the console.

use thiserror::Error;

/// A rejected registration or removal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Command already registered: {0}")]
    DuplicateCommand(String),

    #[error("Command does not exist: {0}")]
    UnknownCommand(String),

    #[error("Cannot unregister a core command: {0}")]
    CoreCommand(String),

    #[error("Screen already registered: {0}")]
    DuplicateScreen(String),

    #[error("Screen not registered: {0}")]
    UnknownScreen(String),

    #[error("CVar \"{0}\" already exists!")]
    DuplicateCVar(String),

    #[error("CVar \"{0}\" does not exist!")]
    UnknownCVar(String),

    #[error("Invalid name: {0:?}")]
    InvalidName(String),
}

/// A value could not be converted to a CVar's declared type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot convert {value:?} to {expected}")]
pub struct ConversionError {
    pub value: String,
    pub expected: &'static str,
}

/// Failure while dispatching one sub-command.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Command not defined: {0}")]
    UnknownCommand(String),

    #[error("Failed to change {name} to {value}. (Wrong datatype?)")]
    Conversion {
        name: String,
        value: String,
        #[source]
        source: ConversionError,
    },

    #[error("{name}: {source:#}")]
    Callback {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{name}: command panicked: {message}")]
    Panicked { name: String, message: String },
}
