//! promptline - interactive command console demo
//!
//! Starts a console on the current terminal with a few demo commands,
//! CVars and an overlay screen.
//!
//! # Quick Start
//!
//! ```text
//! promptline                        # Interactive console
//! promptline --scheme solarized     # Pick a colour scheme
//! promptline --headless-dump cmds   # Run a script on an in-memory terminal
//! ```
//!
//! # Keys
//!
//! | Key | Action |
//! |-----|--------|
//! | Enter | Run the line (`;` separates commands) |
//! | Tab | Complete a command or CVar name |
//! | Up/Down | Walk the command history |
//! | Home/End | Jump to the start or end of the line |
//! | Esc | Leave an overlay screen |
//! | Ctrl+C | Stop the console |

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use promptline::{
    combine_args, Config, Console, ConsoleBuilder, MemoryTerminal, Screen, Terminal,
    TerminalDialect,
};

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Command line options
#[derive(Default)]
struct Options {
    /// Config file instead of `~/.promptline/config.toml`
    config_path: Option<PathBuf>,
    dialect: Option<String>,
    no_timestamps: bool,
    scheme: Option<String>,
    /// Script to run on an in-memory terminal
    headless_dump: Option<PathBuf>,
}

fn print_version() {
    eprintln!("promptline {}", VERSION);
}

fn print_help() {
    eprintln!("promptline {} - interactive command console", VERSION);
    eprintln!();
    eprintln!("Usage: promptline [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <PATH>         Read configuration from PATH");
    eprintln!("  --dialect <NAME>        Bottom row handling: auto, unix, reserved");
    eprintln!("  --no-timestamps         Do not prefix lines with the time");
    eprintln!("  --scheme <NAME>         Colour scheme: {}", promptline::ColorScheme::list().join(", "));
    eprintln!("  --headless-dump <FILE>  Run FILE line by line on an 80x24 in-memory");
    eprintln!("                          terminal and print the final screen");
    eprintln!("  -v, --version           Show version");
    eprintln!("  -h, --help              Show this help");
    eprintln!();
    eprintln!("Built-in commands:");
    eprintln!("  help, screens, screen [name], cls, allvars [page],");
    eprintln!("  cmd-history <length>, cmd-exit");
    eprintln!();
    eprintln!("Append --syntax or --? to any command to see its syntax.");
}

fn parse_args() -> Result<Options, String> {
    let args: Vec<String> = env::args().collect();
    let mut options = Options::default();
    let mut i = 1;

    let value = |i: &mut usize, flag: &str| -> Result<String, String> {
        *i += 1;
        args.get(*i)
            .cloned()
            .ok_or_else(|| format!("Missing argument for {}", flag))
    };

    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-v" | "--version" => {
                print_version();
                std::process::exit(0);
            }
            "--config" => options.config_path = Some(PathBuf::from(value(&mut i, "--config")?)),
            "--dialect" => {
                let name = value(&mut i, "--dialect")?;
                if TerminalDialect::from_name(&name).is_none() {
                    return Err(format!("Unknown dialect: {}", name));
                }
                options.dialect = Some(name);
            }
            "--no-timestamps" => options.no_timestamps = true,
            "--scheme" => options.scheme = Some(value(&mut i, "--scheme")?),
            "--headless-dump" => {
                options.headless_dump = Some(PathBuf::from(value(&mut i, "--headless-dump")?))
            }
            arg => {
                return Err(format!("Unknown argument: {}. Use -h for help.", arg));
            }
        }
        i += 1;
    }

    Ok(options)
}

/// Log to `~/.promptline/promptline.log`; `RUST_LOG` sets the filter
fn init_logging() {
    let log_path = Config::config_dir()
        .map(|dir| dir.join("promptline.log"))
        .unwrap_or_else(|| PathBuf::from("promptline.log"));

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// Overlay with information about the console
struct AboutScreen;

impl Screen for AboutScreen {
    fn name(&self) -> &str {
        "about"
    }

    fn description(&self) -> &str {
        "About promptline"
    }

    fn start(&mut self, term: &mut dyn Terminal) -> io::Result<()> {
        term.write(&format!("promptline {}\r\n\r\n", VERSION))?;
        term.write("An interactive command console.\r\n")?;
        term.write("Press Esc to go back.")?;
        term.flush()
    }
}

/// Commands, CVars and screens of the demo
fn install_demo(console: &Console) -> anyhow::Result<()> {
    console.add_cvar("volume", 5)?;
    console.add_cvar("gravity", 9.81)?;
    console.add_cvar("god", false)?;
    console.add_cvar("name", "player")?;

    console.add_command_with_syntax("say", "Prints a message.", "say <message>", |c, args| {
        c.write_line(&combine_args(args));
        Ok(())
    })?;
    console.add_command_with_syntax(
        "warn",
        "Prints a message as a warning.",
        "warn <message>",
        |c, args| {
            c.write_warning(&combine_args(args));
            Ok(())
        },
    )?;
    console.add_command_with_syntax("title", "Sets the window title.", "title <text>", |c, args| {
        c.set_title(&combine_args(args));
        Ok(())
    })?;
    console.add_command("history", "Shows the command history.", |c, _| {
        for (i, line) in c.history().iter().enumerate() {
            c.write_line(&format!("{:>3}  {}", i, line));
        }
        Ok(())
    })?;
    console.add_command_with_syntax("add", "Adds two integers.", "add <a> <b>", |c, args| {
        let [a, b] = args else {
            anyhow::bail!("expected two numbers");
        };
        let a: i64 = a.parse().with_context(|| format!("not a number: {}", a))?;
        let b: i64 = b.parse().with_context(|| format!("not a number: {}", b))?;
        c.write_important(&format!("{}", a + b));
        Ok(())
    })?;

    console.add_screen(AboutScreen)?;
    Ok(())
}

fn headless_dump(config: Config, script: &Path) -> anyhow::Result<()> {
    let content = fs::read_to_string(script)
        .with_context(|| format!("cannot read script {}", script.display()))?;

    let term = MemoryTerminal::new(80, 24);
    let console = ConsoleBuilder::new().config(config).terminal(term.clone()).build();
    install_demo(&console)?;
    console.start();
    for line in content.lines().filter(|line| !line.trim().is_empty()) {
        console.submit_line(line);
    }

    println!("{}", term.contents());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let options = match parse_args() {
        Ok(o) => o,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Use --help for usage information");
            std::process::exit(1);
        }
    };

    init_logging();
    info!("promptline starting...");

    // Command line overrides the config file
    let mut config = match &options.config_path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    if let Some(dialect) = options.dialect {
        config.dialect = dialect;
    }
    if let Some(scheme) = options.scheme {
        config.color_scheme = scheme;
    }
    if options.no_timestamps {
        config.prepend_timestamp = false;
    }

    if let Some(script) = &options.headless_dump {
        return headless_dump(config, script);
    }

    let console = Console::crossterm(config).context("cannot open terminal")?;
    install_demo(&console)?;

    console.start();
    console.listen(false);
    console.stop();

    info!("promptline exited");
    Ok(())
}
