//! # undosh - a shell whose cp, mv and rm can be undone
//!
//! ## Usage
//! ```bash
//! # Start the interactive shell in the current directory
//! undosh
//!
//! # Keep the undo log and trash somewhere else
//! undosh --data-dir /tmp/undosh-data
//!
//! # Run commands without the REPL
//! undosh -c "cp notes.txt notes.bak" -c "undo"
//! ```
//!
//! Every operation is recorded in `<data-dir>/shell.log`.

use clap::Parser;
use colored::*;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use undosh::{config, Result, ShellBuilder, ShellConfig};

/// undosh - an interactive shell with undoable file operations
#[derive(Parser)]
#[command(name = "undosh")]
#[command(version)]
#[command(about = "An interactive shell whose cp, mv and rm can be undone")]
#[command(long_about = None)]
struct Cli {
    /// Directory holding the undo log, trash and history
    /// (defaults to $UNDOSH_HOME, then ~/.undosh)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Starting working directory (defaults to the current one)
    #[arg(long)]
    cwd: Option<PathBuf>,

    /// Stop at the first failing command and exit with its error
    #[arg(long)]
    debug: bool,

    /// Log per-file actions to the audit log
    #[arg(short, long)]
    verbose: bool,

    /// Run COMMAND instead of starting the REPL (repeatable)
    #[arg(short = 'c', long = "command", value_name = "COMMAND")]
    command: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e.user_message());
        std::process::exit(1);
    }
}

/// Main runner
fn run(cli: Cli) -> Result<()> {
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(config::default_data_dir);
    init_logging(&data_dir, cli.verbose)?;

    let mut builder = ShellBuilder::new().data_dir(data_dir);
    if let Some(cwd) = cli.cwd {
        builder = builder.cwd(cwd);
    }
    if cli.debug {
        builder = builder.debug(true);
    }
    let mut shell = builder.build()?;

    if cli.command.is_empty() {
        shell.run()
    } else {
        shell.run_script(&cli.command)
    }
}

/// Send tracing output to the audit log inside the data directory.
///
/// `RUST_LOG` overrides the level chosen by `--verbose`.
fn init_logging(data_dir: &std::path::Path, verbose: bool) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;
    let path = ShellConfig::load(data_dir)?.audit_log_path();
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("undosh={}", default_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
    Ok(())
}
