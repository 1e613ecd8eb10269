//! Per-shell session state
//!
//! A [`Session`] is the explicit context every command handler receives: the
//! working directory, the undo log, the trash store, the command table and
//! the way to ask the user a yes/no question. Nothing here is global; two
//! sessions over two data directories are fully independent.

use crate::command::CommandRegistry;
use crate::config::ShellConfig;
use crate::error::{IoResultExt, Result, ShellError};
use crate::paths;
use crate::trash::TrashStore;
use crate::undo_log::UndoLog;
use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Source of answers to interactive questions
pub trait Prompter {
    /// Show `question` and return the raw answer, or `None` at end of input
    fn ask(&mut self, question: &str) -> Result<Option<String>>;
}

/// Asks on stdout and reads the answer from stdin
#[derive(Debug, Default)]
pub struct StdinPrompter;

impl Prompter for StdinPrompter {
    fn ask(&mut self, question: &str) -> Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", question)?;
        stdout.flush()?;

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer)? == 0 {
            return Ok(None);
        }
        Ok(Some(answer))
    }
}

/// Replays canned answers, for tests and non-interactive runs
#[derive(Debug, Default, Clone)]
pub struct ScriptedPrompter {
    answers: VecDeque<String>,
}

impl ScriptedPrompter {
    /// Answer the questions with `answers`, in order, then report end of input
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn ask(&mut self, _question: &str) -> Result<Option<String>> {
        Ok(self.answers.pop_front())
    }
}

/// State shared by every command of one shell
pub struct Session {
    cwd: PathBuf,
    config: ShellConfig,
    undo_log: UndoLog,
    trash: TrashStore,
    commands: CommandRegistry,
    prompter: Box<dyn Prompter>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("cwd", &self.cwd)
            .field("config", &self.config)
            .field("undo_log", &self.undo_log)
            .field("trash", &self.trash)
            .field("commands", &self.commands.iter().map(|c| c.name).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open a session on an initialized data directory, with every built-in
    /// command registered
    ///
    /// # Errors
    ///
    /// - [`ShellError::NotADirectory`] if `cwd` is not a directory
    pub fn new(config: ShellConfig, cwd: PathBuf, prompter: Box<dyn Prompter>) -> Result<Self> {
        let cwd = paths::normalize(&cwd);
        if !cwd.is_dir() {
            return Err(ShellError::NotADirectory { path: cwd });
        }

        let trash = TrashStore::open(config.trash_dir())?;
        let undo_log = UndoLog::open(config.undo_log_path());

        Ok(Self {
            cwd,
            config,
            undo_log,
            trash,
            commands: CommandRegistry::builtin(),
            prompter,
        })
    }

    /// Current working directory
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Change the working directory; the caller has checked it is a directory
    pub fn set_cwd(&mut self, cwd: PathBuf) {
        self.cwd = cwd;
    }

    /// Resolve a user-typed path against the working directory
    pub fn resolve(&self, raw: &str) -> PathBuf {
        paths::resolve(&self.cwd, raw)
    }

    /// Active configuration
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Data directory holding the log and trash
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// The undo log
    pub fn undo_log(&self) -> &UndoLog {
        &self.undo_log
    }

    /// The trash store
    pub fn trash(&self) -> &TrashStore {
        &self.trash
    }

    /// Commands this session dispatches through
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    /// Replace the command table
    pub fn set_commands(&mut self, commands: CommandRegistry) {
        self.commands = commands;
    }

    /// Append one entered command line to the history file
    pub fn record_history(&self, line: &str) -> Result<()> {
        let path = self.config.history_path();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .at(&path)?;
        writeln!(file, "{}", line.replace('\n', " ")).at(&path)
    }

    /// Every recorded command line, oldest first
    pub fn history(&self) -> Result<Vec<String>> {
        let path = self.config.history_path();
        match fs::read_to_string(&path) {
            Ok(content) => Ok(content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(str::to_string)
                .collect()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(ShellError::from_io(err, &path)),
        }
    }

    /// Ask a yes/no question until a valid answer is given.
    ///
    /// Accepts `y`, `yes`, `n` and `no` in any case. End of input counts as no.
    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        let prompt = format!("{} [y/n] ", question);
        loop {
            let Some(answer) = self.prompter.ask(&prompt)? else {
                return Ok(false);
            };
            match answer.trim().to_lowercase().as_str() {
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => continue,
            }
        }
    }
}
