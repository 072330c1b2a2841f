//! Console session
//!
//! [`Console`] is the handle applications keep: it owns the command and
//! CVar registries, routes all output through the intercepted stream, runs
//! the key listener and dispatches entered lines. Handles are cheap clones
//! of one shared session.
//!
//! Locks are always taken in the order output stream, display, commands,
//! CVars, and none of them is held while a command callback runs.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};

use chrono::format::{Item, StrftimeItems};
use chrono::Local;
use tracing::{debug, info, warn};

use super::display::Display;
use super::interceptor::{DisplayHook, InterceptedStream, StreamObserver};
use super::terminal::{
    ConsoleColor, CrosstermKeys, CrosstermTerminal, KeyReader, Terminal, TerminalDialect,
};
use super::{lock, read_lock, write_lock};
use crate::commands::builtin;
use crate::commands::dispatch::{self, Outcome};
use crate::commands::parse::{split_commands, tokenize};
use crate::commands::registry::{CommandCallback, CommandEntry, CommandRegistry};
use crate::config::{ColorScheme, Config};
use crate::cvars::{CVar, CVarStore, CVarValue, FromCVar};
use crate::error::{ConversionError, DefinitionError};
use crate::ui::editor::{self, format_suggestions, Effect};
use crate::ui::keymapper::KeyInput;
use crate::ui::screens::Screen;

/// Fallback when the configured timestamp format is unusable
const DEFAULT_TIMESTAMP_FORMAT: &str = "%-m/%-d/%Y %-I:%M:%S %p";

/// How a line is printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintOptions {
    /// Prefix with the time (when timestamps are on and not suppressed)
    pub timestamped: bool,
    /// Foreground colour, the scheme's standard colour when `None`
    pub color: Option<ConsoleColor>,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            timestamped: true,
            color: None,
        }
    }
}

impl PrintOptions {
    /// No timestamp
    pub fn plain() -> Self {
        Self {
            timestamped: false,
            color: None,
        }
    }

    pub fn color(mut self, color: ConsoleColor) -> Self {
        self.color = Some(color);
        self
    }
}

struct Inner {
    display: Arc<Mutex<Display>>,
    /// Every console write goes through here
    out: Mutex<InterceptedStream<io::Sink>>,
    commands: RwLock<CommandRegistry>,
    cvars: RwLock<CVarStore>,
    keys: Mutex<Option<Box<dyn KeyReader>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
    listening: AtomicBool,
    started: AtomicBool,
    prepend_timestamp: AtomicBool,
    suppress_timestamps: AtomicBool,
    allow_cmd_history: AtomicBool,
    allow_cmd_exit: AtomicBool,
    timestamp_format: String,
    scheme: ColorScheme,
    title: Mutex<String>,
}

/// Builder for [`Console`]
pub struct ConsoleBuilder {
    config: Config,
    terminal: Option<Box<dyn Terminal>>,
    keys: Option<Box<dyn KeyReader>>,
    dialect: Option<TerminalDialect>,
    observers: Vec<Box<dyn StreamObserver>>,
}

impl Default for ConsoleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            terminal: None,
            keys: None,
            dialect: None,
            observers: Vec::new(),
        }
    }

    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn terminal(mut self, terminal: impl Terminal + 'static) -> Self {
        self.terminal = Some(Box::new(terminal));
        self
    }

    pub fn keys(mut self, keys: impl KeyReader + 'static) -> Self {
        self.keys = Some(Box::new(keys));
        self
    }

    /// Override the dialect from the config
    pub fn dialect(mut self, dialect: TerminalDialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    /// Watch everything the console prints.
    ///
    /// Observers see each write after the display has drawn it. They run
    /// while the output stream is locked and must not print to the console.
    pub fn observer(mut self, observer: Box<dyn StreamObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn build(self) -> Console {
        let config = self.config;
        let scheme = config.get_color_scheme();
        let dialect = self.dialect.unwrap_or_else(|| config.dialect());

        let display = Arc::new(Mutex::new(Display::new(
            self.terminal,
            dialect,
            &config.prompt,
            scheme.prompt,
            config.history_length(),
        )));

        let mut out = InterceptedStream::new(io::sink());
        out.subscribe(Box::new(DisplayHook::new(display.clone())));
        for observer in self.observers {
            out.subscribe(observer);
        }

        let timestamp_format = if StrftimeItems::new(&config.timestamp_format).any(|item| item == Item::Error) {
            warn!(format = %config.timestamp_format, "invalid timestamp format, using default");
            DEFAULT_TIMESTAMP_FORMAT.to_string()
        } else {
            config.timestamp_format.clone()
        };

        let console = Console {
            inner: Arc::new(Inner {
                display,
                out: Mutex::new(out),
                commands: RwLock::new(CommandRegistry::new()),
                cvars: RwLock::new(CVarStore::new()),
                keys: Mutex::new(self.keys),
                listener: Mutex::new(None),
                listening: AtomicBool::new(false),
                started: AtomicBool::new(false),
                prepend_timestamp: AtomicBool::new(config.prepend_timestamp),
                suppress_timestamps: AtomicBool::new(false),
                allow_cmd_history: AtomicBool::new(true),
                allow_cmd_exit: AtomicBool::new(true),
                timestamp_format,
                scheme,
                title: Mutex::new(config.title.clone().unwrap_or_else(|| "promptline".to_string())),
            }),
        };

        if let Err(err) = builtin::register(&console) {
            warn!(error = %err, "registering built-in commands failed");
        }
        console.set_allow_cmd_history(config.allow_cmd_history);
        console.set_allow_cmd_exit(config.allow_cmd_exit);
        console
    }
}

/// Handle to an interactive console session
#[derive(Clone)]
pub struct Console {
    inner: Arc<Inner>,
}

impl Console {
    /// Console on the process terminal, driven by crossterm
    pub fn crossterm(config: Config) -> io::Result<Self> {
        Ok(ConsoleBuilder::new()
            .config(config)
            .terminal(CrosstermTerminal::new()?)
            .keys(CrosstermKeys::new())
            .build())
    }

    /// Console without a terminal: commands run, output is dropped
    pub fn headless(config: Config) -> Self {
        ConsoleBuilder::new().config(config).build()
    }

    pub fn has_terminal(&self) -> bool {
        lock(&self.inner.display).has_terminal()
    }

    /// Terminal (width, height)
    pub fn terminal_size(&self) -> Option<(u16, u16)> {
        lock(&self.inner.display).size()
    }

    pub fn color_scheme(&self) -> &ColorScheme {
        &self.inner.scheme
    }

    // ---- lifecycle ----

    /// Clear the terminal, print the banner and draw the prompt
    pub fn start(&self) {
        if !self.has_terminal() {
            return;
        }
        self.inner.started.store(true, Ordering::SeqCst);

        let title = lock(&self.inner.title).clone();
        {
            let mut display = lock(&self.inner.display);
            display.set_title(&title);
            display.clear_screen();
        }
        self.write_important(&format!("Started promptline v{}", env!("CARGO_PKG_VERSION")));
        info!(version = env!("CARGO_PKG_VERSION"), "console started");
    }

    /// Stop listening and give the terminal back
    pub fn stop(&self) {
        if !self.has_terminal() {
            return;
        }
        self.stop_listening();
        self.inner.started.store(false, Ordering::SeqCst);
        if let Err(err) = lock(&self.inner.display).restore() {
            warn!(error = %err, "restoring terminal failed");
        }
        info!("console stopped");
    }

    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst)
    }

    /// Read keys until stopped, on a worker thread when `run_async`.
    ///
    /// Only one listener runs at a time; extra calls return immediately.
    pub fn listen(&self, run_async: bool) {
        if !self.has_terminal() {
            return;
        }
        if self
            .inner
            .listening
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        if run_async {
            let console = self.clone();
            let spawned = thread::Builder::new()
                .name("promptline-listener".to_string())
                .spawn(move || console.run_listener());
            match spawned {
                Ok(handle) => *lock(&self.inner.listener) = Some(handle),
                Err(err) => {
                    warn!(error = %err, "spawning listener failed");
                    self.inner.listening.store(false, Ordering::SeqCst);
                }
            }
        } else {
            self.run_listener();
        }
    }

    fn run_listener(&self) {
        let Some(mut keys) = lock(&self.inner.keys).take() else {
            debug!("no key source, listener not started");
            self.inner.listening.store(false, Ordering::SeqCst);
            return;
        };
        info!("listener started");

        while self.is_listening() {
            match keys.read_key() {
                Ok(Some(key)) => self.handle_key(&key),
                Ok(None) => {
                    debug!("key input closed");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "reading key failed");
                    break;
                }
            }
        }

        *lock(&self.inner.keys) = Some(keys);
        self.inner.listening.store(false, Ordering::SeqCst);
        info!("listener stopped");
    }

    /// Ask the listener to exit after the key it is waiting for
    pub fn stop_listening(&self) {
        self.inner.listening.store(false, Ordering::SeqCst);
    }

    pub fn is_listening(&self) -> bool {
        self.inner.listening.load(Ordering::SeqCst)
    }

    /// Wait for a listener started with `listen(true)`
    pub fn wait(&self) {
        let handle = lock(&self.inner.listener).take();
        if let Some(handle) = handle {
            if handle.thread().id() != thread::current().id() && handle.join().is_err() {
                warn!("listener thread panicked");
            }
        }
    }

    // ---- input ----

    /// Feed one key to the editor
    pub fn handle_key(&self, key: &KeyInput) {
        let effect = {
            let mut display = lock(&self.inner.display);
            let on_main = display.is_main();
            let effect = display.editor.handle_key(key, on_main);
            display.apply(&effect);
            effect
        };

        match effect {
            Effect::Submit(line) => self.submit_line(&line),
            Effect::Blank => self.blank_line(),
            Effect::Complete(prefix) => self.complete(&prefix),
            Effect::LeaveScreen => {
                if let Err(err) = self.switch_screen(None) {
                    warn!(error = %err, "leaving screen failed");
                }
            }
            Effect::Interrupt => self.stop_listening(),
            Effect::None | Effect::Echo(_) | Effect::MoveCursor | Effect::Redraw => {}
        }
    }

    fn blank_line(&self) {
        let previous = self.inner.suppress_timestamps.swap(true, Ordering::SeqCst);
        self.write_standard("");
        self.inner.suppress_timestamps.store(previous, Ordering::SeqCst);
    }

    fn complete(&self, prefix: &str) {
        let suggestions = {
            let commands = read_lock(&self.inner.commands);
            let cvars = read_lock(&self.inner.cvars);
            editor::complete(prefix, cvars.names(), commands.names())
        };

        match suggestions.as_slice() {
            [] => {}
            [only] => lock(&self.inner.display).accept_completion(only),
            many => {
                let previous = self.inner.suppress_timestamps.swap(true, Ordering::SeqCst);
                for row in format_suggestions(many) {
                    self.write_standard(&row);
                }
                self.write_standard("");
                self.inner.suppress_timestamps.store(previous, Ordering::SeqCst);
            }
        }
    }

    /// Run a line as if it had been typed
    pub fn submit_line(&self, line: &str) {
        {
            let mut display = lock(&self.inner.display);
            display.editor.history.push(line);
            display.editor.buffer.clear();
        }

        let previous = self.inner.suppress_timestamps.swap(true, Ordering::SeqCst);
        for command in split_commands(line) {
            self.execute(&command);
        }
        self.inner.suppress_timestamps.store(previous, Ordering::SeqCst);

        // The submitted text is gone from the buffer even when nothing ran
        self.redraw_prompt();
    }

    fn execute(&self, command: &str) {
        let parsed = tokenize(command);
        debug!(command = %parsed.name, "dispatching");

        let routed = {
            let commands = read_lock(&self.inner.commands);
            let mut cvars = write_lock(&self.inner.cvars);
            dispatch::route(parsed, &commands, &mut cvars)
        };

        let result = match routed {
            Ok(Outcome::Syntax(syntax)) => {
                self.write_standard(&format!("Syntax: {}", syntax));
                Ok(())
            }
            Ok(Outcome::Invoke { name, callback, args }) => {
                dispatch::invoke(self, &name, &callback, &args).map(|()| self.redraw_prompt())
            }
            Ok(Outcome::Assigned { name, raw }) => {
                self.write_standard(&format!("{} -> {}", name, raw));
                Ok(())
            }
            Ok(Outcome::Value { name, value }) => {
                self.write_standard(&format!("{} = {}", name, value));
                Ok(())
            }
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            debug!(error = %err, "dispatch failed");
            self.write_error(&err.to_string());
        }
    }

    fn redraw_prompt(&self) {
        lock(&self.inner.display).write_input_line();
    }

    /// Submitted lines, newest first
    pub fn history(&self) -> Vec<String> {
        lock(&self.inner.display)
            .editor()
            .history
            .iter()
            .map(str::to_string)
            .collect()
    }

    pub fn set_history_length(&self, length: usize) {
        lock(&self.inner.display).editor.history.set_max_len(length);
    }

    /// Clear the terminal and the log
    pub fn clear_screen(&self) {
        lock(&self.inner.display).clear_screen();
    }

    // ---- output ----

    /// Write text as is: no timestamp, no line break
    pub fn write(&self, msg: &str) {
        if !self.has_terminal() {
            return;
        }
        self.emit(msg, self.inner.scheme.standard);
    }

    /// Write a line with the default options
    pub fn write_line(&self, msg: &str) {
        self.print(msg, PrintOptions::default());
    }

    pub fn print(&self, msg: &str, options: PrintOptions) {
        let newline = {
            let display = lock(&self.inner.display);
            if !display.has_terminal() {
                return;
            }
            display.dialect().newline()
        };

        let mut text = String::with_capacity(msg.len() + 32);
        if options.timestamped && self.timestamps_active() {
            text.push('[');
            text.push_str(&Local::now().format(&self.inner.timestamp_format).to_string());
            text.push_str("] ");
        }
        text.push_str(msg);
        text.push_str(newline);

        self.emit(&text, options.color.unwrap_or(self.inner.scheme.standard));
    }

    pub fn write_standard(&self, msg: &str) {
        self.print(msg, PrintOptions::default().color(self.inner.scheme.standard));
    }

    pub fn write_important(&self, msg: &str) {
        self.print(msg, PrintOptions::default().color(self.inner.scheme.important));
    }

    pub fn write_warning(&self, msg: &str) {
        self.print(msg, PrintOptions::default().color(self.inner.scheme.warning));
    }

    pub fn write_error(&self, msg: &str) {
        self.print(msg, PrintOptions::default().color(self.inner.scheme.error));
    }

    fn timestamps_active(&self) -> bool {
        self.inner.prepend_timestamp.load(Ordering::SeqCst)
            && !self.inner.suppress_timestamps.load(Ordering::SeqCst)
    }

    pub fn set_prepend_timestamp(&self, enabled: bool) {
        self.inner.prepend_timestamp.store(enabled, Ordering::SeqCst);
    }

    fn emit(&self, text: &str, color: ConsoleColor) {
        let mut out = lock(&self.inner.out);
        lock(&self.inner.display).set_foreground(color);
        if let Err(err) = out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
            debug!(error = %err, "console write failed");
        }
        let mut display = lock(&self.inner.display);
        display.set_foreground(self.inner.scheme.standard);
        display.flush();
    }

    pub fn set_title(&self, title: &str) {
        *lock(&self.inner.title) = title.to_string();
        lock(&self.inner.display).set_title(title);
    }

    pub fn title(&self) -> String {
        lock(&self.inner.title).clone()
    }

    // ---- commands ----

    /// Register a command; a blank `help` hides it from `help`
    pub fn add_command<F>(&self, name: &str, help: &str, callback: F) -> Result<(), DefinitionError>
    where
        F: Fn(&Console, &[String]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.add_command_with_syntax(name, help, "", callback)
    }

    /// Register a command with a syntax line; a blank syntax shows the name
    pub fn add_command_with_syntax<F>(
        &self,
        name: &str,
        help: &str,
        syntax: &str,
        callback: F,
    ) -> Result<(), DefinitionError>
    where
        F: Fn(&Console, &[String]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(CommandEntry::new(name, help, syntax, Arc::new(callback)))
    }

    pub(crate) fn register(&self, entry: CommandEntry) -> Result<(), DefinitionError> {
        debug!(command = %entry.name, core = entry.core, "command registered");
        write_lock(&self.inner.commands).register(entry)
    }

    pub(crate) fn register_core(
        &self,
        name: &str,
        help: &str,
        syntax: &str,
        callback: CommandCallback,
    ) -> Result<(), DefinitionError> {
        let mut entry = CommandEntry::new(name, help, syntax, callback);
        entry.core = true;
        self.register(entry)
    }

    pub fn remove_command(&self, name: &str) -> Result<(), DefinitionError> {
        write_lock(&self.inner.commands).unregister(name).map(|_| ())
    }

    pub fn is_command_defined(&self, name: &str) -> bool {
        read_lock(&self.inner.commands).contains(name)
    }

    /// Print a command's syntax line
    pub fn show_syntax(&self, name: &str) {
        let syntax = read_lock(&self.inner.commands)
            .lookup(name)
            .map(|entry| entry.syntax.clone());
        match syntax {
            Some(syntax) => self.write_standard(&format!("Syntax: {}", syntax)),
            None => self.write_error(&format!(
                "Failed to display syntax. Command '{}' is not defined!",
                name
            )),
        }
    }

    /// (name, help, hidden) for every command in registration order
    pub(crate) fn command_listing(&self) -> Vec<(String, String, bool)> {
        read_lock(&self.inner.commands)
            .list()
            .map(|e| (e.name.clone(), e.help.clone(), e.hidden))
            .collect()
    }

    pub fn allow_cmd_history(&self) -> bool {
        self.inner.allow_cmd_history.load(Ordering::SeqCst)
    }

    /// Allow `cmd-history`; a disallowed command is also hidden from `help`
    pub fn set_allow_cmd_history(&self, allow: bool) {
        self.inner.allow_cmd_history.store(allow, Ordering::SeqCst);
        self.set_hidden(builtin::CMD_HISTORY, !allow);
    }

    pub fn allow_cmd_exit(&self) -> bool {
        self.inner.allow_cmd_exit.load(Ordering::SeqCst)
    }

    /// Allow `cmd-exit`; a disallowed command is also hidden from `help`
    pub fn set_allow_cmd_exit(&self, allow: bool) {
        self.inner.allow_cmd_exit.store(allow, Ordering::SeqCst);
        self.set_hidden(builtin::CMD_EXIT, !allow);
    }

    fn set_hidden(&self, name: &str, hidden: bool) {
        if let Some(entry) = write_lock(&self.inner.commands).entry_mut(name) {
            entry.hidden = hidden;
        }
    }

    // ---- CVars ----

    /// Declare a CVar; its type is fixed by `value`
    pub fn add_cvar(&self, name: &str, value: impl Into<CVarValue>) -> Result<(), DefinitionError> {
        write_lock(&self.inner.cvars).add(name, value)
    }

    /// Set a CVar, declaring it if needed; existing CVars keep their type
    pub fn set_cvar(&self, name: &str, value: impl Into<CVarValue>) -> Result<(), ConversionError> {
        write_lock(&self.inner.cvars).set(name, value)
    }

    pub fn get_cvar<T: FromCVar>(&self, name: &str) -> Option<T> {
        read_lock(&self.inner.cvars).value(name)
    }

    pub fn remove_cvar(&self, name: &str) -> Result<CVar, DefinitionError> {
        write_lock(&self.inner.cvars).remove(name)
    }

    pub fn is_cvar_defined(&self, name: &str) -> bool {
        read_lock(&self.inner.cvars).contains(name)
    }

    /// (name, value) ordered by name
    pub(crate) fn cvar_listing(&self) -> Vec<(String, String)> {
        read_lock(&self.inner.cvars)
            .ordered_by_name()
            .map(|(name, var)| (name.to_string(), var.value.to_string()))
            .collect()
    }

    // ---- screens ----

    /// Register an overlay screen.
    ///
    /// `Screen::start` runs while the display is locked and must not call
    /// back into the console.
    pub fn add_screen(&self, screen: impl Screen + 'static) -> Result<(), DefinitionError> {
        lock(&self.inner.display).add_screen(Box::new(screen))
    }

    pub fn remove_screen(&self, name: &str) -> Result<(), DefinitionError> {
        lock(&self.inner.display).remove_screen(name)
    }

    /// Show the named overlay, or the main view for `None`
    pub fn switch_screen(&self, name: Option<&str>) -> Result<(), DefinitionError> {
        lock(&self.inner.display).switch_screen(name)
    }

    pub fn is_screen_defined(&self, name: &str) -> bool {
        lock(&self.inner.display).screens.contains(name)
    }

    pub fn active_screen(&self) -> Option<String> {
        lock(&self.inner.display)
            .screens
            .active_name()
            .map(str::to_string)
    }

    pub fn is_on_main_screen(&self) -> bool {
        lock(&self.inner.display).is_main()
    }

    /// (name, description) in registration order
    pub(crate) fn screen_listing(&self) -> Vec<(String, String)> {
        lock(&self.inner.display).screens.list()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::memory::{MemoryTerminal, ScriptedKeys};
    use crate::ui::keymapper::ConsoleKey;
    use std::sync::atomic::AtomicUsize;

    fn test_config() -> Config {
        Config {
            prepend_timestamp: false,
            dialect: "unix".into(),
            ..Config::default()
        }
    }

    fn console(width: u16, height: u16) -> (Console, MemoryTerminal) {
        let term = MemoryTerminal::new(width, height);
        let console = ConsoleBuilder::new()
            .config(test_config())
            .terminal(term.clone())
            .build();
        (console, term)
    }

    fn keys_for(text: &str) -> Vec<KeyInput> {
        text.chars()
            .map(|ch| match ch {
                '\n' => KeyInput::key(ConsoleKey::Enter),
                '\t' => KeyInput::key(ConsoleKey::Tab),
                ch => KeyInput::char(ch),
            })
            .collect()
    }

    fn type_keys(console: &Console, text: &str) {
        for key in keys_for(text) {
            console.handle_key(&key);
        }
    }

    fn log_texts(console: &Console) -> Vec<String> {
        lock(&console.inner.display)
            .scrollback()
            .iter()
            .map(|line| line.text.clone())
            .collect()
    }

    struct Banner;

    impl Screen for Banner {
        fn name(&self) -> &str {
            "stats"
        }

        fn description(&self) -> &str {
            "Server statistics"
        }

        fn start(&mut self, term: &mut dyn Terminal) -> io::Result<()> {
            term.write("STATS")
        }
    }

    #[test]
    fn test_start_banner() {
        let (console, term) = console(80, 24);
        console.start();

        let banner = format!("Started promptline v{}", env!("CARGO_PKG_VERSION"));
        assert_eq!(term.row_text(0), banner);
        assert_eq!(term.row_text(1), "#>");
        assert_eq!(term.title(), "promptline");
        assert!(console.is_started());
    }

    #[test]
    fn test_cvar_set_and_conversion_failure() {
        let (console, term) = console(80, 24);
        console.add_cvar("volume", 5).unwrap();

        console.submit_line("volume 10");
        assert_eq!(console.get_cvar::<i64>("volume"), Some(10));
        assert!(term.find_row("volume -> 10").is_some());

        console.submit_line("volume abc");
        assert_eq!(console.get_cvar::<i64>("volume"), Some(10));
        assert!(term
            .find_row("Failed to change volume to abc. (Wrong datatype?)")
            .is_some());

        let display = lock(&console.inner.display);
        let last = display.scrollback().iter().last().unwrap();
        assert_eq!(last.fg, ConsoleColor::Red);
    }

    #[test]
    fn test_cvar_read_and_unknown() {
        let (console, term) = console(80, 24);
        console.add_cvar("name", "player").unwrap();
        console.submit_line("name");
        console.submit_line("nothing 1");

        assert!(term.find_row("name = player").is_some());
        assert!(term.find_row("Command not defined: nothing").is_some());
    }

    #[test]
    fn test_sub_commands_run_in_order() {
        let (console, term) = console(80, 24);
        let seen = Arc::new(AtomicUsize::new(0));
        let probe = seen.clone();
        console
            .add_command("probe", "", move |c, _| {
                probe.store(log_texts(c).len(), Ordering::SeqCst);
                Ok(())
            })
            .unwrap();
        let clears = term.clear_count();

        console.submit_line("help;probe;cls");

        assert!(seen.load(Ordering::SeqCst) > 0);
        assert!(log_texts(&console).is_empty());
        assert_eq!(term.clear_count(), clears + 1);
        assert_eq!(term.contents(), "#>");
        assert_eq!(console.history(), vec!["help;probe;cls".to_string()]);
    }

    #[test]
    fn test_help_lists_visible_commands() {
        let (console, term) = console(80, 30);
        console.add_command("secret", "", |_, _| Ok(())).unwrap();
        console.set_allow_cmd_exit(false);
        console.submit_line("help");

        assert!(term.find_row("Defined Commands (8):").is_some());
        assert!(term.find_row(&format!("{:<20}{}", "cls", "Clears the screen.")).is_some());
        assert!(term.find_row("secret").is_none());
        assert!(term.find_row("cmd-exit").is_none());
        assert!(term.find_row("--syntax or --?").is_some());
    }

    #[test]
    fn test_syntax_flag_and_show_syntax() {
        let (console, term) = console(100, 24);
        console.submit_line("allvars --?");
        assert!(term.find_row("Syntax: allvars [page]").is_some());

        console.show_syntax("missing");
        assert!(term
            .find_row("Failed to display syntax. Command 'missing' is not defined!")
            .is_some());
    }

    #[test]
    fn test_callback_error_and_panic_are_reported() {
        let (console, term) = console(80, 24);
        console
            .add_command("broken", "Fails.", |_, _| Err(anyhow::anyhow!("it broke")))
            .unwrap();
        console
            .add_command("explode", "Panics.", |_, _| panic!("kaboom"))
            .unwrap();

        console.submit_line("broken");
        console.submit_line("explode");

        assert!(term.find_row("broken: it broke").is_some());
        assert!(term.find_row("explode: command panicked: kaboom").is_some());
        // The console still works afterwards
        console.submit_line("cls");
        assert_eq!(term.contents(), "#>");
    }

    #[test]
    fn test_tab_lists_multiple_matches() {
        let (console, term) = console(80, 24);
        console.add_command("history", "Shows history.", |_, _| Ok(())).unwrap();

        type_keys(&console, "h\t");

        assert!(log_texts(&console).contains(&"help\thistory\t\n".to_string()));
        assert_eq!(lock(&console.inner.display).editor().buffer.text(), "h");
        let prompt_row = lock(&console.inner.display).prompt().anchor;
        assert_eq!(term.row_text(prompt_row), "#> h");
    }

    #[test]
    fn test_tab_completes_single_match() {
        let (console, term) = console(80, 24);
        console.start();
        console.add_cvar("volume", 1).unwrap();

        type_keys(&console, "vo\t");
        let prompt_row = lock(&console.inner.display).prompt().anchor;
        assert_eq!(term.row_text(prompt_row), "#> volume");

        type_keys(&console, " 4\n");
        assert_eq!(console.get_cvar::<i64>("volume"), Some(4));
    }

    #[test]
    fn test_history_recall_with_arrows() {
        let (console, _term) = console(80, 24);
        console.submit_line("a");
        console.submit_line("b");

        console.handle_key(&KeyInput::key(ConsoleKey::Up));
        assert_eq!(lock(&console.inner.display).editor().buffer.text(), "b");
        console.handle_key(&KeyInput::key(ConsoleKey::Up));
        console.handle_key(&KeyInput::key(ConsoleKey::Up));
        assert_eq!(lock(&console.inner.display).editor().buffer.text(), "a");
    }

    #[test]
    fn test_blank_enter_writes_empty_line() {
        let (console, _term) = console(80, 24);
        type_keys(&console, "   \n");
        assert_eq!(log_texts(&console), vec!["\n".to_string()]);
        assert!(console.history().is_empty());
    }

    #[test]
    fn test_screen_round_trip() {
        let (console, term) = console(80, 24);
        console.add_screen(Banner).unwrap();
        console.write_line("before");

        console.submit_line("screen stats");
        assert_eq!(console.active_screen().as_deref(), Some("stats"));
        assert!(!term.cursor_visible());
        assert_eq!(term.row_text(0), "STATS");

        console.write_line("while away");
        assert_eq!(term.row_text(0), "STATS");

        // Keys other than Escape are ignored by overlays
        console.handle_key(&KeyInput::char('x'));
        console.handle_key(&KeyInput::key(ConsoleKey::Escape));

        assert!(console.is_on_main_screen());
        assert!(term.cursor_visible());
        assert_eq!(term.row_text(0), "before");
        assert_eq!(term.row_text(1), "while away");
        assert_eq!(term.row_text(2), "#>");
    }

    #[test]
    fn test_screen_command_errors_and_listing() {
        let (console, term) = console(80, 24);
        console.add_screen(Banner).unwrap();
        assert_eq!(
            console.add_screen(Banner),
            Err(DefinitionError::DuplicateScreen("stats".into()))
        );

        console.submit_line("screen nope");
        assert!(term.find_row("Screen 'nope' is not defined.").is_some());

        console.submit_line("screens");
        assert!(term.find_row("Defined Screens (1):").is_some());
        assert!(term.find_row(&format!("{:<20}{}", "stats", "Server statistics")).is_some());

        console.remove_screen("stats").unwrap();
        assert!(!console.is_screen_defined("stats"));
    }

    #[test]
    fn test_allvars_pages() {
        let (console, term) = console(80, 30);
        console.submit_line("allvars");
        assert!(term.find_row("-- -- CVars (Page: 0 of 0) -- --").is_some());
        assert!(term.find_row("There are no CVars defined!").is_some());

        for i in 0..30 {
            console.add_cvar(&format!("v{:02}", i), i).unwrap();
        }
        console.submit_line("cls;allvars 9");
        assert!(term.find_row("-- -- CVars (Page: 1 of 1) -- --").is_some());
        assert!(term.find_row(&format!("{:<20}= 29", "v29")).is_some());
        assert!(term.find_row("v00").is_none());
    }

    #[test]
    fn test_cmd_history_and_allow_flags() {
        let (console, term) = console(80, 24);
        console.submit_line("cmd-history 2");
        for line in ["a", "b", "c"] {
            console.submit_line(line);
        }
        assert_eq!(console.history(), vec!["c".to_string(), "b".to_string()]);

        console.submit_line("cmd-history 0");
        assert!(term.find_row("Invalid length").is_some());

        console.set_allow_cmd_history(false);
        console.submit_line("cls;cmd-history 5");
        assert!(term.find_row("Command not allowed.").is_some());
    }

    #[test]
    fn test_remove_core_command_rejected() {
        let (console, _term) = console(80, 24);
        assert_eq!(
            console.remove_command("help"),
            Err(DefinitionError::CoreCommand("help".into()))
        );
        console.add_command("mine", "Mine.", |_, _| Ok(())).unwrap();
        assert!(console.remove_command("mine").is_ok());
        assert!(!console.is_command_defined("mine"));
    }

    #[test]
    fn test_listener_runs_scripted_keys() {
        let term = MemoryTerminal::new(80, 24);
        let console = ConsoleBuilder::new()
            .config(test_config())
            .terminal(term.clone())
            .keys(ScriptedKeys::new(keys_for("volume 7\n")))
            .build();
        console.add_cvar("volume", 1).unwrap();

        console.listen(false);

        assert_eq!(console.get_cvar::<i64>("volume"), Some(7));
        assert_eq!(console.history(), vec!["volume 7".to_string()]);
        assert!(!console.is_listening());
    }

    #[test]
    fn test_cmd_exit_stops_async_listener() {
        let term = MemoryTerminal::new(80, 24);
        let console = ConsoleBuilder::new()
            .config(test_config())
            .terminal(term.clone())
            .keys(ScriptedKeys::new(keys_for("cmd-exit\nvolume 9\n")))
            .build();
        console.add_cvar("volume", 1).unwrap();

        console.listen(true);
        console.wait();

        assert!(!console.is_listening());
        assert_eq!(console.get_cvar::<i64>("volume"), Some(1));
    }

    #[test]
    fn test_cmd_exit_refused_when_disallowed() {
        let term = MemoryTerminal::new(80, 24);
        let console = ConsoleBuilder::new()
            .config(Config {
                allow_cmd_exit: false,
                ..test_config()
            })
            .terminal(term.clone())
            .keys(ScriptedKeys::new(keys_for("cmd-exit\nvolume 9\n")))
            .build();
        console.add_cvar("volume", 1).unwrap();

        console.listen(false);

        assert!(term.find_row("Command not allowed.").is_some());
        assert_eq!(console.get_cvar::<i64>("volume"), Some(9));
    }

    #[test]
    fn test_headless_still_dispatches() {
        let console = Console::headless(test_config());
        console.add_cvar("volume", 5).unwrap();

        console.start();
        console.write_line("dropped");
        console.submit_line("volume 3");
        console.listen(false);

        assert_eq!(console.get_cvar::<i64>("volume"), Some(3));
        assert!(!console.is_listening());
        assert!(!console.has_terminal());
        assert_eq!(console.terminal_size(), None);
    }

    #[test]
    fn test_timestamps_and_suppression() {
        let term = MemoryTerminal::new(80, 24);
        let console = ConsoleBuilder::new()
            .config(Config {
                dialect: "unix".into(),
                timestamp_format: "%H:%M".into(),
                ..Config::default()
            })
            .terminal(term.clone())
            .build();
        console.add_cvar("volume", 5).unwrap();

        console.write_line("hello");
        let row = term.row_text(0);
        assert!(row.starts_with('['));
        assert!(row.ends_with("] hello"));

        console.submit_line("volume");
        assert_eq!(term.row_text(1), "volume = 5");

        console.print("plain", PrintOptions::plain());
        assert_eq!(term.row_text(2), "plain");
    }

    #[test]
    fn test_reserved_dialect_keeps_bottom_row_free() {
        let term = MemoryTerminal::new(40, 6);
        let console = ConsoleBuilder::new()
            .config(test_config())
            .dialect(TerminalDialect::Reserved)
            .terminal(term.clone())
            .build();

        for i in 0..10 {
            console.write_line(&format!("line {}", i));
        }

        assert_eq!(term.row_text(4), "#>");
        assert_eq!(term.row_text(5), "");
        assert_eq!(term.row_text(3), "line 9");
    }

    #[test]
    fn test_set_title() {
        let (console, term) = console(80, 24);
        console.set_title("Game Server");
        assert_eq!(console.title(), "Game Server");
        assert_eq!(term.title(), "Game Server");
    }

    #[test]
    fn test_empty_submission_redraws_prompt() {
        let (console, term) = console(80, 24);
        console.start();

        type_keys(&console, " ; ");
        assert_eq!(term.row_text(1), "#>  ;");
        type_keys(&console, "\n");

        let anchor = lock(&console.inner.display).prompt().anchor;
        assert_eq!(anchor, 1);
        assert_eq!(term.row_text(anchor), "#>");
        assert_eq!(term.cursor(), (3, 1));
        assert!(lock(&console.inner.display).editor().buffer.is_empty());
    }

    struct Tap(Arc<Mutex<Vec<String>>>);

    impl StreamObserver for Tap {
        fn on_write(&mut self, bytes: &[u8]) {
            lock(&self.0).push(String::from_utf8_lossy(bytes).into_owned());
        }
    }

    #[test]
    fn test_observer_sees_console_output() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let term = MemoryTerminal::new(80, 24);
        let console = ConsoleBuilder::new()
            .config(test_config())
            .terminal(term.clone())
            .observer(Box::new(Tap(seen.clone())))
            .build();
        console.add_cvar("volume", 5).unwrap();

        console.write_line("hello");
        console.submit_line("volume");

        assert_eq!(*lock(&seen), vec!["hello\n".to_string(), "volume = 5\n".to_string()]);
        assert_eq!(term.row_text(0), "hello");
    }

    #[test]
    fn test_nested_listen_is_ignored() {
        let term = MemoryTerminal::new(80, 24);
        let console = ConsoleBuilder::new()
            .config(test_config())
            .terminal(term.clone())
            .keys(ScriptedKeys::new(keys_for("again\nvolume 9\n")))
            .build();
        console.add_cvar("volume", 1).unwrap();
        let still_listening = Arc::new(AtomicBool::new(false));
        let flag = still_listening.clone();
        console
            .add_command("again", "", move |c, _| {
                c.listen(false);
                c.listen(true);
                flag.store(c.is_listening(), Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        console.listen(false);

        assert!(still_listening.load(Ordering::SeqCst));
        assert_eq!(console.get_cvar::<i64>("volume"), Some(9));
        assert!(!console.is_listening());
        assert!(lock(&console.inner.listener).is_none());
    }

    #[test]
    fn test_shrinking_terminal_keeps_prompt_on_screen() {
        let (console, term) = console(80, 24);
        for i in 0..30 {
            console.write_line(&format!("line {}", i));
        }
        assert_eq!(lock(&console.inner.display).prompt().top, 23);

        term.resize(80, 10);
        console.write_line("after");
        type_keys(&console, "abc");

        let prompt = lock(&console.inner.display).prompt();
        assert!(prompt.top < 10);
        assert_eq!(prompt.anchor, 9);
        assert_eq!(term.row_text(8), "after");
        assert_eq!(term.row_text(9), "#> abc");
        assert_eq!(term.cursor(), (6, 9));
    }

    #[test]
    fn test_output_keeps_terminal_background() {
        let (console, _term) = console(80, 24);
        console.add_screen(Banner).unwrap();
        console.write_line("one");
        console.switch_screen(Some("stats")).unwrap();
        console.switch_screen(None).unwrap();
        console.write_line("two");

        let display = lock(&console.inner.display);
        let lines: Vec<_> = display.scrollback().iter().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            assert_eq!(line.bg, ConsoleColor::Default);
            assert_eq!(line.fg, ConsoleColor::White);
        }
        assert_eq!(display.colors(), Some((ConsoleColor::White, ConsoleColor::Default)));
    }
}
