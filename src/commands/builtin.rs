//! Built-in commands.
//!
//! Registered on every console and marked core, so they cannot be removed.

use std::sync::Arc;

use super::parse::combine_args;
use crate::core::session::Console;
use crate::error::DefinitionError;
use crate::history::MAX_HISTORY_LENGTH;

pub const CMD_HELP: &str = "help";
pub const CMD_SCREENS: &str = "screens";
pub const CMD_SCREEN: &str = "screen";
pub const CMD_CLS: &str = "cls";
pub const CMD_ALLVARS: &str = "allvars";
pub const CMD_HISTORY: &str = "cmd-history";
pub const CMD_EXIT: &str = "cmd-exit";

/// Register every built-in command on `console`
pub fn register(console: &Console) -> Result<(), DefinitionError> {
    console.register_core(CMD_HELP, "Displays basic help for all commands.", "", Arc::new(help))?;
    console.register_core(CMD_SCREENS, "Displays all registered screens.", "", Arc::new(screens))?;
    console.register_core(
        CMD_SCREEN,
        "Switches to a screen.",
        "screen [screen name] (when name not provided, it goes back to main screen)",
        Arc::new(screen),
    )?;
    console.register_core(CMD_CLS, "Clears the screen.", "", Arc::new(cls))?;
    console.register_core(
        CMD_ALLVARS,
        "Prints a list of all available CVars.",
        "allvars [page]",
        Arc::new(allvars),
    )?;
    console.register_core(
        CMD_HISTORY,
        "Sets the length of the history.",
        "cmd-history <length [1 - 300]>",
        Arc::new(cmd_history),
    )?;
    console.register_core(CMD_EXIT, "Exits the console.", "", Arc::new(cmd_exit))?;
    Ok(())
}

fn help(console: &Console, _args: &[String]) -> anyhow::Result<()> {
    let commands = console.command_listing();
    console.write_standard(&format!("Defined Commands ({}):", commands.len()));
    console.write_standard("");
    for (name, help, hidden) in &commands {
        if !hidden {
            console.write_standard(&format!("{:<20}{}", name, help));
        }
    }
    console.write_important(
        "\nYou can also use the argument --syntax or --? for each command, to view that commands syntax.\n",
    );
    Ok(())
}

fn screens(console: &Console, _args: &[String]) -> anyhow::Result<()> {
    let screens = console.screen_listing();
    console.write_standard(&format!("Defined Screens ({}):", screens.len()));
    console.write_standard("");
    for (name, description) in &screens {
        console.write_standard(&format!("{:<20}{}", name, description));
    }
    console.write_standard("");
    Ok(())
}

fn screen(console: &Console, args: &[String]) -> anyhow::Result<()> {
    let name = combine_args(args);
    let name = name.trim();
    if name.is_empty() {
        console.switch_screen(None)?;
    } else if console.is_screen_defined(name) {
        console.switch_screen(Some(name))?;
    } else {
        console.write_error(&format!("Screen '{}' is not defined.", name));
    }
    Ok(())
}

fn cls(console: &Console, _args: &[String]) -> anyhow::Result<()> {
    console.clear_screen();
    Ok(())
}

fn allvars(console: &Console, args: &[String]) -> anyhow::Result<()> {
    let vars = console.cvar_listing();
    let per_page = console
        .terminal_size()
        .map_or(22, |(_, height)| usize::from(height.saturating_sub(2)))
        .max(1);
    let last_page = ((vars.len() + per_page - 1) / per_page).saturating_sub(1);

    // Unparsable or negative pages show the first one
    let page = args
        .first()
        .and_then(|arg| arg.trim().parse::<usize>().ok())
        .unwrap_or(0)
        .min(last_page);

    console.write_important(&format!("-- -- CVars (Page: {} of {}) -- --", page, last_page));
    if vars.is_empty() {
        console.write_line("There are no CVars defined!");
    } else {
        for (name, value) in vars.iter().skip(page * per_page).take(per_page) {
            console.write_line(&format!("{:<20}= {}", name, value));
        }
    }
    console.write_line("");
    Ok(())
}

fn cmd_history(console: &Console, args: &[String]) -> anyhow::Result<()> {
    if !console.allow_cmd_history() {
        console.write_error("Command not allowed.");
        return Ok(());
    }
    let Some(arg) = args.first().filter(|arg| !arg.is_empty()) else {
        console.write_error("Wrong number of arguments");
        return Ok(());
    };

    match arg.trim().parse::<usize>() {
        Ok(length) if (1..=MAX_HISTORY_LENGTH).contains(&length) => {
            console.set_history_length(length);
        }
        _ => console.write_error(&format!(
            "Invalid length: must be between 1 and {}",
            MAX_HISTORY_LENGTH
        )),
    }
    Ok(())
}

fn cmd_exit(console: &Console, _args: &[String]) -> anyhow::Result<()> {
    if !console.allow_cmd_exit() {
        console.write_error("Command not allowed.");
        return Ok(());
    }
    console.stop_listening();
    Ok(())
}
