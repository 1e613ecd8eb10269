//! Reversible file operations
//!
//! `cp`, `mv` and `rm` each run their safety checks, mutate the file system
//! through the trash store and append exactly one undo log entry. `undo` pops
//! the most recent entry and replays its inverse.
//!
//! ## Sequence prefixes
//!
//! An operation started while the log holds `n` entries owns trash prefix
//! `n + 1`. Its backups are named `{n + 1}_{basename}`, so undo can find them
//! again from nothing but the log position of the entry it is reverting.

pub mod cp;
pub mod merge;
pub mod mv;
pub mod rm;
pub mod undo;

pub use cp::copy;
pub use mv::move_to;
pub use rm::{remove, RemoveOptions};
pub use undo::undo;

use crate::command::{parse_args, Command, CommandRegistry, Outcome, Parsed};
use crate::error::{Result, ShellError};
use crate::session::Session;
use crate::utils;
use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "cp", about = "Copy a file or directory")]
struct CpArgs {
    /// Copy directories recursively
    #[arg(short, long)]
    recursive: bool,
    /// File or directory to copy
    source: String,
    /// Destination path or directory
    dest: String,
}

#[derive(Parser, Debug)]
#[command(name = "mv", about = "Move or rename a file or directory")]
struct MvArgs {
    /// File or directory to move
    source: String,
    /// Destination path or directory
    dest: String,
}

#[derive(Parser, Debug)]
#[command(name = "rm", about = "Remove a file or directory into the trash")]
struct RmArgs {
    /// Remove directories and their contents
    #[arg(short, long)]
    recursive: bool,
    /// Do not ask before removing a non-empty directory
    #[arg(short, long)]
    force: bool,
    /// Run every check but leave the file system untouched
    #[arg(long)]
    test: bool,
    /// File or directory to remove
    source: String,
}

#[derive(Parser, Debug)]
#[command(name = "undo", about = "Revert the most recent cp, mv or rm")]
struct UndoArgs {}

/// Add `cp`, `mv`, `rm` and `undo` to the registry
pub fn register(registry: &mut CommandRegistry) {
    registry.register(Command {
        name: "cp",
        description: "copy a file or directory (undoable)",
        help: "cp [-r] <source> <dest>",
        handler: cmd_cp,
    });
    registry.register(Command {
        name: "mv",
        description: "move or rename a file or directory (undoable)",
        help: "mv <source> <dest>",
        handler: cmd_mv,
    });
    registry.register(Command {
        name: "rm",
        description: "remove a file or directory into the trash (undoable)",
        help: "rm [-r] [-f] [--test] <source>",
        handler: cmd_rm,
    });
    registry.register(Command {
        name: "undo",
        description: "revert the most recent cp, mv or rm",
        help: "undo",
        handler: cmd_undo,
    });
}

fn cmd_cp(session: &mut Session, args: &[String]) -> Result<Outcome> {
    let args = match parse_args::<CpArgs>("cp", args)? {
        Parsed::Args(args) => args,
        Parsed::Help(text) => return Ok(Outcome::Output(text)),
    };
    let source = session.resolve(&args.source);
    let dest = session.resolve(&args.dest);
    copy(session, &source, &dest, args.recursive)
}

fn cmd_mv(session: &mut Session, args: &[String]) -> Result<Outcome> {
    let args = match parse_args::<MvArgs>("mv", args)? {
        Parsed::Args(args) => args,
        Parsed::Help(text) => return Ok(Outcome::Output(text)),
    };
    let source = session.resolve(&args.source);
    let dest = session.resolve(&args.dest);
    move_to(session, &source, &dest)
}

fn cmd_rm(session: &mut Session, args: &[String]) -> Result<Outcome> {
    let args = match parse_args::<RmArgs>("rm", args)? {
        Parsed::Args(args) => args,
        Parsed::Help(text) => return Ok(Outcome::Output(text)),
    };
    let source = session.resolve(&args.source);
    let options = RemoveOptions {
        recursive: args.recursive,
        force: args.force,
        test: args.test,
    };
    remove(session, &source, options)
}

fn cmd_undo(session: &mut Session, args: &[String]) -> Result<Outcome> {
    if let Parsed::Help(text) = parse_args::<UndoArgs>("undo", args)? {
        return Ok(Outcome::Output(text));
    }
    undo(session)
}

/// `dest/basename(source)` when `dest` is an existing directory, else `dest`
pub(crate) fn effective_destination(source: &Path, dest: &Path) -> Result<PathBuf> {
    if utils::is_real_dir(dest) {
        Ok(dest.join(utils::basename(source)?))
    } else {
        Ok(dest.to_path_buf())
    }
}

/// The directory a new entry would be created in must already exist
pub(crate) fn ensure_parent(dest: &Path) -> Result<()> {
    match dest.parent() {
        Some(parent) if !parent.is_dir() => Err(ShellError::not_found(parent)),
        _ => Ok(()),
    }
}
