//! Command routing.
//!
//! A parsed sub-command resolves, in order, to: a registered command (or
//! its syntax line), a CVar assignment, a CVar read, or an unknown-command
//! error. CVar assignments happen here while the caller holds the store.

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use tracing::{debug, warn};

use super::parse::{is_syntax_flag, ParsedCommand};
use super::registry::{CommandCallback, CommandRegistry};
use crate::core::session::Console;
use crate::cvars::CVarStore;
use crate::error::DispatchError;

/// What a sub-command resolved to
pub enum Outcome {
    /// Print the command's syntax
    Syntax(String),
    /// Run a command callback
    Invoke {
        name: String,
        callback: CommandCallback,
        args: Vec<String>,
    },
    /// A CVar was assigned `raw`
    Assigned { name: String, raw: String },
    /// Show a CVar's value
    Value { name: String, value: String },
}

/// Resolve one sub-command
pub fn route(
    parsed: ParsedCommand,
    commands: &CommandRegistry,
    cvars: &mut CVarStore,
) -> Result<Outcome, DispatchError> {
    let ParsedCommand { name, args } = parsed;

    if let Some(entry) = commands.lookup(&name) {
        if args.first().map_or(false, |arg| is_syntax_flag(arg)) {
            return Ok(Outcome::Syntax(entry.syntax.clone()));
        }
        return Ok(Outcome::Invoke {
            name,
            callback: entry.callback.clone(),
            args,
        });
    }

    if !cvars.contains(&name) {
        return Err(DispatchError::UnknownCommand(name));
    }

    match args.into_iter().next() {
        Some(raw) => match cvars.set_from_str(&name, &raw) {
            Ok(_) => {
                debug!(cvar = %name, value = %raw, "cvar assigned");
                Ok(Outcome::Assigned { name, raw })
            }
            Err(source) => Err(DispatchError::Conversion {
                name,
                value: raw,
                source,
            }),
        },
        None => {
            let value = cvars
                .get(&name)
                .map(|var| var.value.to_string())
                .unwrap_or_default();
            Ok(Outcome::Value { name, value })
        }
    }
}

thread_local! {
    /// Nesting depth of command callbacks on this thread
    static CALLBACK_DEPTH: Cell<usize> = Cell::new(0);
}

static QUIET_HOOK: Once = Once::new();

/// Route panics inside command callbacks to the log instead of stderr.
///
/// Installed once per process; panics anywhere else still reach the
/// previous hook.
fn install_quiet_hook() {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if in_callback() {
                warn!(panic = %info, "command callback panicked");
            } else {
                previous(info);
            }
        }));
    });
}

/// Whether this thread is running a command callback
pub(crate) fn in_callback() -> bool {
    CALLBACK_DEPTH.with(|depth| depth.get() > 0)
}

/// Marks the current thread as inside a callback until dropped
struct CallbackScope;

impl CallbackScope {
    fn enter() -> Self {
        CALLBACK_DEPTH.with(|depth| depth.set(depth.get() + 1));
        CallbackScope
    }
}

impl Drop for CallbackScope {
    fn drop(&mut self) {
        CALLBACK_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Run a callback, turning errors and panics into a [`DispatchError`]
pub fn invoke(
    console: &Console,
    name: &str,
    callback: &CommandCallback,
    args: &[String],
) -> Result<(), DispatchError> {
    install_quiet_hook();
    let result = {
        let _scope = CallbackScope::enter();
        panic::catch_unwind(AssertUnwindSafe(|| callback(console, args)))
    };
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(source)) => Err(DispatchError::Callback {
            name: name.to_string(),
            source,
        }),
        Err(payload) => Err(DispatchError::Panicked {
            name: name.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
