//! Command table and the values commands return
//!
//! A command is plain data: a name, two help strings and a handler function
//! with a fixed signature. Command modules add themselves to a
//! [`CommandRegistry`] through a `register` function called once at startup.

use crate::error::{Result, ShellError};
use crate::session::Session;
use std::collections::BTreeMap;

/// Signature every command handler satisfies
pub type Handler = fn(&mut Session, &[String]) -> Result<Outcome>;

/// What a successful command reports back to the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The command finished and has nothing to print
    Done,
    /// Text to show the user
    Output(String),
    /// A deliberate no-op, such as a declined confirmation
    NothingDone(String),
    /// The session should end
    Exit,
}

impl Outcome {
    /// Whether the command changed nothing on purpose
    pub fn is_nothing_done(&self) -> bool {
        matches!(self, Outcome::NothingDone(_))
    }
}

/// A named command and its handler
#[derive(Debug, Clone, Copy)]
pub struct Command {
    /// Name typed at the prompt
    pub name: &'static str,
    /// One-line summary for `help`
    pub description: &'static str,
    /// Argument synopsis for `help <name>`
    pub help: &'static str,
    /// Function run with the session and the arguments after the name
    pub handler: Handler,
}

/// Name to command table
#[derive(Debug, Default, Clone)]
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, Command>,
}

impl CommandRegistry {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The table with every command shipped with the shell
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        crate::ops::register(&mut registry);
        crate::builtins::register(&mut registry);
        registry
    }

    /// Add a command, replacing any previous one with the same name
    pub fn register(&mut self, command: Command) {
        self.commands.insert(command.name, command);
    }

    /// Look a command up by name
    pub fn get(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    /// Commands sorted by name
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }
}

/// Result of argument parsing: the arguments, or help text to print instead
#[derive(Debug)]
pub enum Parsed<T> {
    /// Arguments parsed successfully
    Args(T),
    /// The user asked for `--help`
    Help(String),
}

/// Parse `args` for command `name` with a clap derive struct.
///
/// Parse failures become [`ShellError::InvalidArgument`] instead of exiting
/// the process.
pub fn parse_args<T: clap::Parser>(name: &str, args: &[String]) -> Result<Parsed<T>> {
    let argv = std::iter::once(name.to_string()).chain(args.iter().cloned());
    match T::try_parse_from(argv) {
        Ok(parsed) => Ok(Parsed::Args(parsed)),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                Ok(Parsed::Help(err.render().to_string()))
            }
            _ => Err(ShellError::invalid_argument(err.render().to_string().trim_end())),
        },
    }
}
