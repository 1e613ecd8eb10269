//! # undosh - A shell whose file operations can be undone
//!
//! An interactive command shell where `cp`, `mv` and `rm` are reversible:
//! every destructive operation is logged together with backups of whatever
//! it overwrote or removed, and `undo` restores the previous file-system
//! state exactly.
//!
//! ## Overview
//!
//! undosh provides:
//! - Copy, move and remove of files and whole directory trees
//! - Recursive merges into existing directories, with every overwritten leaf
//!   backed up first
//! - A LIFO undo of the most recent operation, repeatable all the way back
//! - Safety checks that refuse the filesystem root, ancestors of the working
//!   directory and the shell's own data directory
//! - Thin navigation commands (`cd`, `ls`, `cat`, `tree`, ...) and a
//!   line-editing REPL with persistent history
//!
//! ## Architecture
//!
//! - **Undo Log**: a text file with one shell-quoted line per operation. Its
//!   length mints the sequence number of the next operation
//! - **Trash Store**: a flat directory of backups named `{sequence}_{name}`,
//!   so undo finds them from the log position alone
//! - **Executors**: `cp`, `mv` and `rm`, sharing one recursive merge walk
//! - **Session**: the explicit context (working directory, log, trash,
//!   confirmation prompter) every command receives
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use undosh::ShellBuilder;
//! use std::path::PathBuf;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut shell = ShellBuilder::new()
//!     .data_dir(PathBuf::from("./.undosh"))
//!     .cwd(PathBuf::from("./my_project"))
//!     .build()?;
//!
//! // Overwrite a file, then take it back
//! shell.execute("cp draft.txt final.txt")?;
//! shell.execute("undo")?;
//!
//! // Removed trees go to the trash and come back byte for byte
//! shell.execute("rm -rf build")?;
//! shell.execute("undo")?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Calling the executors directly
//!
//! ```rust,no_run
//! # use undosh::{ops, ShellBuilder};
//! # use std::path::Path;
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let shell = ShellBuilder::new().build()?;
//! let session = shell.session();
//! ops::copy(session, Path::new("/work/a"), Path::new("/work/b"), true)?;
//! ops::undo(session)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, ShellError>`. Variants follow the usual
//! file-operation taxonomy (`NotFound`, `IsADirectory`, `PermissionDenied`,
//! ...). "Nothing to undo" and a declined confirmation are not errors; they
//! come back as [`Outcome::NothingDone`].
//!
//! ## Module Organization
//!
//! - [`shell`]: the REPL, command dispatch and [`ShellBuilder`]
//! - [`session`]: per-shell state and confirmation prompts
//! - [`command`]: the command table and argument parsing
//! - [`ops`]: the reversible `cp`, `mv`, `rm` and `undo`
//! - [`builtins`]: navigation and inspection commands
//! - [`undo_log`]: the on-disk operation log
//! - [`trash`]: the backup store
//! - [`safety`]: pre-mutation checks
//! - [`config`]: settings and the data directory layout
//! - [`error`]: error types and handling

// Public API modules
pub mod builtins;
pub mod command;
pub mod config;
pub mod error;
pub mod ops;
pub mod paths;
pub mod safety;
pub mod session;
pub mod shell;
pub mod trash;
pub mod undo_log;

// Internal modules (not part of public API)
mod utils;

// Re-export main types for convenience
pub use command::{Command, CommandRegistry, Outcome};
pub use config::ShellConfig;
pub use error::{Result, ShellError};
pub use ops::RemoveOptions;
pub use session::{Prompter, ScriptedPrompter, Session, StdinPrompter};
pub use shell::{Shell, ShellBuilder};
pub use trash::TrashStore;
pub use undo_log::{LogEntry, OperationKind, UndoLog};
