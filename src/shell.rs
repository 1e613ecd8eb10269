//! The interactive shell
//!
//! [`Shell`] drives a [`Session`]: it tokenizes a line, records it in the
//! history file, looks the command up in the session's registry and runs its
//! handler. [`Shell::run`] wraps that in a line-editor loop.
//!
//! ## Examples
//!
//! ```rust,no_run
//! use undosh::{ShellBuilder, ScriptedPrompter};
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut shell = ShellBuilder::new()
//!     .data_dir(PathBuf::from("/tmp/undosh-data"))
//!     .cwd(PathBuf::from("/tmp/work"))
//!     .prompter(Box::new(ScriptedPrompter::new(["y"])))
//!     .build()?;
//!
//! shell.execute("cp notes.txt notes.bak")?;
//! shell.execute("undo")?;
//! # Ok(())
//! # }
//! ```

use crate::command::{CommandRegistry, Outcome};
use crate::config::{self, ShellConfig};
use crate::error::{Result, ShellError};
use crate::paths;
use crate::session::{Prompter, Session, StdinPrompter};
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::{Config, DefaultEditor};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Command line front end over a [`Session`]
#[derive(Debug)]
pub struct Shell {
    session: Session,
}

impl Shell {
    /// Shell over `session`, dispatching through the session's commands
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// The session state
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable session state
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Registered commands
    pub fn registry(&self) -> &CommandRegistry {
        self.session.commands()
    }

    /// Prompt text: the abbreviated working directory followed by `=>`
    pub fn prompt(&self) -> String {
        let cwd = paths::pretty(self.session.cwd());
        if self.session.config().color {
            format!("{} => ", cwd.cyan().bold())
        } else {
            format!("{} => ", cwd)
        }
    }

    /// Run one command line.
    ///
    /// Tokens follow POSIX shell quoting. A blank line does nothing; any
    /// other line is appended to the history file before it runs.
    ///
    /// # Errors
    ///
    /// - [`ShellError::InvalidArgument`] for unbalanced quotes
    /// - [`ShellError::CommandNotFound`] for an unknown command name
    /// - whatever the command itself fails with
    pub fn execute(&mut self, line: &str) -> Result<Outcome> {
        let tokens = shlex::split(line)
            .ok_or_else(|| ShellError::invalid_argument("unbalanced quotes"))?;
        let Some((name, args)) = tokens.split_first() else {
            return Ok(Outcome::Done);
        };

        if let Err(err) = self.session.record_history(line.trim()) {
            warn!("Could not record history: {}", err);
        }

        let command = *self
            .session
            .commands()
            .get(name)
            .ok_or_else(|| ShellError::CommandNotFound(name.clone()))?;

        debug!("Executing: {}", line.trim());
        (command.handler)(&mut self.session, args)
    }

    /// Run command lines one after another, stopping at the first failure or `exit`
    pub fn run_script<I, S>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            let outcome = self.execute(line.as_ref())?;
            if !report(&outcome) {
                break;
            }
        }
        Ok(())
    }

    /// Interactive loop until `exit` or end of input.
    ///
    /// The history file is loaded into the line editor for recall; new lines
    /// reach it through [`Shell::execute`].
    ///
    /// Command failures are printed and the loop goes on, unless the session
    /// runs in debug mode, where the first failure ends it.
    pub fn run(&mut self) -> Result<()> {
        let config = self.session.config().clone();
        if !config.color {
            colored::control::set_override(false);
        }

        let editor_config = Config::builder()
            .max_history_size(config.history_size)?
            .auto_add_history(false)
            .build();
        let mut editor = DefaultEditor::with_config(editor_config)?;

        let history_path = config.history_path();
        if history_path.exists() {
            if let Err(err) = editor.load_history(&history_path) {
                warn!("Could not load history from {:?}: {}", history_path, err);
            }
        }

        info!("Session started in {:?}", self.session.cwd());
        loop {
            let line = match editor.readline(&self.prompt()) {
                Ok(line) => line,
                // Ctrl-C only cancels the line being typed
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err.into()),
            };
            if line.trim().is_empty() {
                continue;
            }
            editor.add_history_entry(line.as_str())?;

            match self.execute(&line) {
                Ok(outcome) => {
                    if !report(&outcome) {
                        break;
                    }
                }
                Err(err) if config.debug => return Err(err),
                Err(err) => {
                    eprintln!("{}: {}", "Error".red().bold(), err.user_message());
                }
            }
        }

        info!("Session ended");
        Ok(())
    }
}

/// Print what a command produced; `false` when the shell should stop
fn report(outcome: &Outcome) -> bool {
    match outcome {
        Outcome::Done => {}
        Outcome::Output(text) if text.is_empty() => {}
        Outcome::Output(text) => println!("{}", text),
        Outcome::NothingDone(message) => println!("{}", message.yellow()),
        Outcome::Exit => return false,
    }
    true
}


/// Builder for configuring a [`Shell`]
///
/// # Examples
///
/// ```rust,no_run
/// use undosh::ShellBuilder;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let shell = ShellBuilder::new().debug(true).build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct ShellBuilder {
    data_dir: Option<PathBuf>,
    cwd: Option<PathBuf>,
    debug: Option<bool>,
    prompter: Option<Box<dyn Prompter>>,
}

impl ShellBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the data directory
    ///
    /// Defaults to `$UNDOSH_HOME`, then `~/.undosh`.
    pub fn data_dir(mut self, data_dir: PathBuf) -> Self {
        self.data_dir = Some(data_dir);
        self
    }

    /// Set the starting working directory (defaults to the process's)
    pub fn cwd(mut self, cwd: PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }

    /// Override the `debug` setting from `config.json`
    ///
    /// In debug mode a failing command ends the session with its error
    /// instead of being printed.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = Some(debug);
        self
    }

    /// Set how confirmation questions are answered (defaults to stdin)
    pub fn prompter(mut self, prompter: Box<dyn Prompter>) -> Self {
        self.prompter = Some(prompter);
        self
    }

    /// Build the shell
    ///
    /// Loads `config.json`, creates the data directory layout on first use
    /// and opens the undo log and trash.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The working directory is not a directory
    /// - The data directory cannot be created, or was written by a newer layout
    /// - `config.json` is malformed
    pub fn build(self) -> Result<Shell> {
        let process_cwd = std::env::current_dir()?;
        let absolute = |path: PathBuf| paths::normalize(&process_cwd.join(path));

        let data_dir = absolute(self.data_dir.unwrap_or_else(config::default_data_dir));
        let mut config = ShellConfig::load(&data_dir)?;
        if let Some(debug) = self.debug {
            config.debug = debug;
        }
        config.init_storage()?;

        let cwd = absolute(self.cwd.unwrap_or_else(|| process_cwd.clone()));
        let prompter = self.prompter.unwrap_or_else(|| Box::new(StdinPrompter));
        let session = Session::new(config, cwd, prompter)?;

        Ok(Shell::new(session))
    }
}
