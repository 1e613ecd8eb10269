//! Commands outside the undoable core
//!
//! Navigation and inspection (`cd`, `pwd`, `ls`, `cat`, `tree`, `history`,
//! `help`, `exit`) live here; `grep` and the archive commands have their own
//! modules. None of them touch the undo log.

pub mod archive;
pub mod grep;

use crate::command::{parse_args, Command, CommandRegistry, Outcome, Parsed};
use crate::error::{IoResultExt, Result, ShellError};
use crate::safety;
use crate::session::Session;
use crate::utils;
use chrono::{DateTime, Local};
use clap::Parser;
use std::fs;
use std::path::Path;

#[derive(Parser, Debug)]
#[command(name = "cd", about = "Change the working directory")]
struct CdArgs {
    /// Directory to enter (defaults to home)
    #[arg(default_value = "~")]
    path: String,
}

#[derive(Parser, Debug)]
#[command(name = "ls", about = "List a directory")]
struct LsArgs {
    /// Long format: mode, size, modification time
    #[arg(short = 'l')]
    long: bool,
    /// Include entries starting with a dot
    #[arg(short = 'a', long = "all")]
    all: bool,
    /// Directory to list (defaults to the working directory)
    path: Option<String>,
}

#[derive(Parser, Debug)]
#[command(name = "cat", about = "Print a text file")]
struct CatArgs {
    /// File to print
    file: String,
}

#[derive(Parser, Debug)]
#[command(name = "tree", about = "Print a directory as a sorted tree")]
struct TreeArgs {
    /// Directory to print (defaults to the working directory)
    path: Option<String>,
}

/// Lines shown by `history` without an argument
const DEFAULT_HISTORY_LINES: usize = 10;

#[derive(Parser, Debug)]
#[command(name = "history", about = "Show previously entered command lines")]
struct HistoryArgs {
    /// How many of the most recent lines to show
    #[arg(default_value_t = DEFAULT_HISTORY_LINES)]
    count: usize,
}

#[derive(Parser, Debug)]
#[command(name = "help", about = "List commands or describe one")]
struct HelpArgs {
    /// Command to describe
    command: Option<String>,
}

/// Add every command outside the undoable core to the registry
pub fn register(registry: &mut CommandRegistry) {
    grep::register(registry);
    archive::register(registry);

    let commands = [
        Command {
            name: "cd",
            description: "change the working directory",
            help: "cd [path]",
            handler: cmd_cd,
        },
        Command {
            name: "pwd",
            description: "print the working directory",
            help: "pwd",
            handler: cmd_pwd,
        },
        Command {
            name: "ls",
            description: "list directory contents",
            help: "ls [-l] [-a] [path]",
            handler: cmd_ls,
        },
        Command {
            name: "cat",
            description: "print the contents of a text file",
            help: "cat <file>",
            handler: cmd_cat,
        },
        Command {
            name: "tree",
            description: "print a directory as a sorted tree",
            help: "tree [path]",
            handler: cmd_tree,
        },
        Command {
            name: "history",
            description: "show previously entered command lines",
            help: "history [n]",
            handler: cmd_history,
        },
        Command {
            name: "help",
            description: "list commands, or describe one",
            help: "help [command]",
            handler: cmd_help,
        },
        Command {
            name: "exit",
            description: "leave the shell",
            help: "exit",
            handler: cmd_exit,
        },
    ];
    for command in commands {
        registry.register(command);
    }
}

fn cmd_cd(session: &mut Session, args: &[String]) -> Result<Outcome> {
    let args = match parse_args::<CdArgs>("cd", args)? {
        Parsed::Args(args) => args,
        Parsed::Help(text) => return Ok(Outcome::Output(text)),
    };
    let path = session.resolve(&args.path);
    safety::validate_path(&path)?;
    if !path.is_dir() {
        return Err(ShellError::NotADirectory { path });
    }
    session.set_cwd(path);
    Ok(Outcome::Done)
}

fn cmd_pwd(session: &mut Session, _args: &[String]) -> Result<Outcome> {
    Ok(Outcome::Output(session.cwd().display().to_string()))
}

fn cmd_ls(session: &mut Session, args: &[String]) -> Result<Outcome> {
    let args = match parse_args::<LsArgs>("ls", args)? {
        Parsed::Args(args) => args,
        Parsed::Help(text) => return Ok(Outcome::Output(text)),
    };
    let dir = directory_arg(session, args.path.as_deref())?;

    let mut entries = Vec::new();
    for entry in fs::read_dir(&dir).at(&dir)? {
        let entry = entry.at(&dir)?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if args.all || !name.starts_with('.') {
            entries.push((name, entry.path()));
        }
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    if !args.long {
        let names: Vec<_> = entries.into_iter().map(|(name, _)| name).collect();
        return Ok(Outcome::Output(names.join(" ")));
    }

    let mut rows = Vec::with_capacity(entries.len());
    for (name, path) in entries {
        let metadata = fs::symlink_metadata(&path).at(&path)?;
        let modified: DateTime<Local> = metadata.modified().at(&path)?.into();
        rows.push((
            utils::mode_string(&metadata),
            metadata.len().to_string(),
            modified.format("%Y-%m-%d %H:%M:%S").to_string(),
            name,
        ));
    }

    let width = rows.iter().map(|row| row.1.len()).max().unwrap_or(0);
    let lines: Vec<_> = rows
        .into_iter()
        .map(|(mode, size, modified, name)| {
            format!("{} {:>width$} {} {}", mode, size, modified, name, width = width)
        })
        .collect();
    Ok(Outcome::Output(lines.join("\n")))
}

fn cmd_cat(session: &mut Session, args: &[String]) -> Result<Outcome> {
    let args = match parse_args::<CatArgs>("cat", args)? {
        Parsed::Args(args) => args,
        Parsed::Help(text) => return Ok(Outcome::Output(text)),
    };
    let path = session.resolve(&args.file);
    safety::validate_path(&path)?;
    if path.is_dir() {
        return Err(ShellError::IsADirectory { path });
    }
    if !path.is_file() {
        return Err(ShellError::not_found(path));
    }

    let bytes = fs::read(&path).at(&path)?;
    let text = String::from_utf8(bytes).map_err(|_| {
        ShellError::invalid_argument(format!("{} is not a UTF-8 text file", path.display()))
    })?;
    Ok(Outcome::Output(text.trim_end_matches('\n').to_string()))
}

fn cmd_tree(session: &mut Session, args: &[String]) -> Result<Outcome> {
    let args = match parse_args::<TreeArgs>("tree", args)? {
        Parsed::Args(args) => args,
        Parsed::Help(text) => return Ok(Outcome::Output(text)),
    };
    let dir = directory_arg(session, args.path.as_deref())?;
    let rendered = render_tree(&dir)?;
    Ok(Outcome::Output(rendered.trim_end().to_string()))
}

fn cmd_history(session: &mut Session, args: &[String]) -> Result<Outcome> {
    let args = match parse_args::<HistoryArgs>("history", args)? {
        Parsed::Args(args) => args,
        Parsed::Help(text) => return Ok(Outcome::Output(text)),
    };

    if args.count == 0 {
        return Err(ShellError::invalid_argument("history: n must be at least 1"));
    }

    let mut lines = session.history()?;
    // The last line is this `history` command itself
    lines.pop();
    let skip = lines.len().saturating_sub(args.count);

    let numbered: Vec<_> = lines
        .iter()
        .enumerate()
        .skip(skip)
        .map(|(idx, line)| format!("{:>5}  {}", idx + 1, line))
        .collect();
    Ok(Outcome::Output(numbered.join("\n")))
}

fn cmd_help(session: &mut Session, args: &[String]) -> Result<Outcome> {
    let args = match parse_args::<HelpArgs>("help", args)? {
        Parsed::Args(args) => args,
        Parsed::Help(text) => return Ok(Outcome::Output(text)),
    };
    let registry = session.commands();

    if let Some(name) = args.command {
        let command = registry
            .get(&name)
            .ok_or(ShellError::CommandNotFound(name))?;
        return Ok(Outcome::Output(format!(
            "usage: {}\n{}",
            command.help, command.description
        )));
    }

    let width = registry.iter().map(|c| c.name.len()).max().unwrap_or(0);
    let lines: Vec<_> = registry
        .iter()
        .map(|c| format!("  {:<width$}  {}", c.name, c.description, width = width))
        .collect();
    Ok(Outcome::Output(format!("Commands:\n{}", lines.join("\n"))))
}

fn cmd_exit(_session: &mut Session, _args: &[String]) -> Result<Outcome> {
    Ok(Outcome::Exit)
}

/// Resolve an optional directory argument, defaulting to the working directory
fn directory_arg(session: &Session, raw: Option<&str>) -> Result<std::path::PathBuf> {
    let path = match raw {
        Some(raw) => session.resolve(raw),
        None => session.cwd().to_path_buf(),
    };
    safety::validate_path(&path)?;
    if !path.is_dir() {
        return Err(ShellError::NotADirectory { path });
    }
    Ok(path)
}

/// Render `dir` and everything below it, children sorted by name.
///
/// ```text
/// dir
/// ├── file1
/// ├── file2
/// └── subdir
///     └── file1
/// ```
pub fn render_tree(dir: &Path) -> Result<String> {
    let mut out = String::new();
    out.push_str(&dir.file_name().unwrap_or(dir.as_os_str()).to_string_lossy());
    out.push('\n');
    render_children(dir, "", &mut out)?;
    Ok(out)
}

fn render_children(dir: &Path, prefix: &str, out: &mut String) -> Result<()> {
    let mut children = fs::read_dir(dir)
        .at(dir)?
        .collect::<std::io::Result<Vec<_>>>()
        .at(dir)?;
    children.sort_by_key(|entry| entry.file_name());

    let count = children.len();
    for (i, child) in children.into_iter().enumerate() {
        let is_last = i + 1 == count;
        let connector = if is_last { "└── " } else { "├── " };

        out.push_str(prefix);
        out.push_str(connector);
        out.push_str(&child.file_name().to_string_lossy());
        out.push('\n');

        let path = child.path();
        if utils::is_real_dir(&path) {
            let extension = if is_last { "    " } else { "│   " };
            render_children(&path, &format!("{}{}", prefix, extension), out)?;
        }
    }
    Ok(())
}
