//! The undo log: an append-only record of reversible operations
//!
//! Each forward `cp`, `mv` or `rm` appends one line to a UTF-8 text file:
//!
//! ```text
//! cp /work/file2
//! cp /work/dir_copy /work/dir_copy /work/dir_copy/file1
//! mv /work/dir /work/dir_move
//! rm '/work/notes with spaces.txt'
//! ```
//!
//! The first token is the operation keyword, the rest are paths whose meaning
//! depends on the operation (see [`LogEntry`]). Tokens use POSIX shell
//! quoting so paths with spaces or quotes survive the round trip.
//!
//! The number of lines doubles as the sequence counter: an operation started
//! while the log has `n` entries owns trash prefix `n + 1`, and undo always
//! consumes the last line.
//!
//! Removing the last line rewrites the file through a temporary file and an
//! atomic rename, so a crash leaves either the old or the new log, never a
//! truncated one.

use crate::error::{IoResultExt, Result, ShellError};
use crate::utils;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Kind of a reversible operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// `cp`: args are `[dest, newly_created_paths...]`
    Copy,
    /// `mv`: args are `[source, dest, moved_leaves...]`
    Move,
    /// `rm`: args are `[source]`
    Remove,
}

impl OperationKind {
    /// Keyword written as the first token of a log line
    pub fn keyword(self) -> &'static str {
        match self {
            OperationKind::Copy => "cp",
            OperationKind::Move => "mv",
            OperationKind::Remove => "rm",
        }
    }

    /// Parse a keyword; the long names are accepted as well
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "cp" | "copy" => Some(OperationKind::Copy),
            "mv" | "move" => Some(OperationKind::Move),
            "rm" | "remove" => Some(OperationKind::Remove),
            _ => None,
        }
    }

    /// Minimum number of path arguments a well-formed entry carries
    fn min_args(self) -> usize {
        match self {
            OperationKind::Copy | OperationKind::Remove => 1,
            OperationKind::Move => 2,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// One reversible operation as recorded in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// What was done
    pub kind: OperationKind,
    /// Operation-specific path arguments
    pub args: Vec<PathBuf>,
}

impl LogEntry {
    /// Entry for a copy onto `dest` that created `created` (in creation order)
    pub fn copy(dest: PathBuf, created: Vec<PathBuf>) -> Self {
        let mut args = Vec::with_capacity(created.len() + 1);
        args.push(dest);
        args.extend(created);
        Self { kind: OperationKind::Copy, args }
    }

    /// Entry for a move of `source` to `dest`, optionally listing every leaf moved
    pub fn moved(source: PathBuf, dest: PathBuf, leaves: Vec<PathBuf>) -> Self {
        let mut args = Vec::with_capacity(leaves.len() + 2);
        args.push(source);
        args.push(dest);
        args.extend(leaves);
        Self { kind: OperationKind::Move, args }
    }

    /// Entry for a removal of `source`
    pub fn remove(source: PathBuf) -> Self {
        Self {
            kind: OperationKind::Remove,
            args: vec![source],
        }
    }

    /// Serialize to one log line (without the trailing newline)
    pub fn to_line(&self) -> Result<String> {
        let mut tokens = Vec::with_capacity(self.args.len() + 1);
        tokens.push(self.kind.keyword().to_string());
        for arg in &self.args {
            let raw = arg.to_str().ok_or_else(|| {
                ShellError::invalid_argument(format!("path is not valid UTF-8: {:?}", arg))
            })?;
            let quoted = shlex::try_quote(raw).map_err(|e| {
                ShellError::invalid_argument(format!("cannot record {:?}: {}", raw, e))
            })?;
            tokens.push(quoted.into_owned());
        }
        Ok(tokens.join(" "))
    }

    /// Parse one log line; `line_no` is only used for error messages
    pub fn parse(line: &str, line_no: usize) -> Result<Self> {
        let invalid = |reason: String| ShellError::InvalidLog { line: line_no, reason };

        let tokens = shlex::split(line).ok_or_else(|| invalid("unbalanced quotes".to_string()))?;
        let (keyword, rest) = tokens
            .split_first()
            .ok_or_else(|| invalid("empty entry".to_string()))?;
        let kind = OperationKind::from_keyword(keyword)
            .ok_or_else(|| invalid(format!("unknown operation '{}'", keyword)))?;

        if rest.len() < kind.min_args() {
            return Err(invalid(format!(
                "'{}' needs at least {} path(s), found {}",
                kind,
                kind.min_args(),
                rest.len()
            )));
        }

        Ok(Self {
            kind,
            args: rest.iter().map(PathBuf::from).collect(),
        })
    }
}

/// File-backed undo log
#[derive(Debug, Clone)]
pub struct UndoLog {
    path: PathBuf,
}

impl UndoLog {
    /// Open the log at `path`; the file is created lazily on first append
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All entries, oldest first
    pub fn entries(&self) -> Result<Vec<LogEntry>> {
        self.lines()?
            .iter()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| LogEntry::parse(line, idx + 1))
            .collect()
    }

    /// Number of entries currently recorded
    pub fn len(&self) -> Result<usize> {
        Ok(self.lines()?.iter().filter(|line| !line.trim().is_empty()).count())
    }

    /// Whether the log holds no entries
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Prefix for the trash entries of the operation about to start
    pub fn next_sequence(&self) -> Result<u64> {
        Ok(self.len()? as u64 + 1)
    }

    /// Append one entry
    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        let line = entry.to_line()?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .at(&self.path)?;
        writeln!(file, "{}", line).at(&self.path)?;
        file.sync_data().at(&self.path)?;

        debug!("Appended undo entry: {}", line);
        Ok(())
    }

    /// The most recent entry with its sequence number, if any
    pub fn last(&self) -> Result<Option<(u64, LogEntry)>> {
        let lines = self.lines()?;
        let count = lines.iter().filter(|line| !line.trim().is_empty()).count();
        match lines.iter().enumerate().rev().find(|(_, line)| !line.trim().is_empty()) {
            Some((idx, line)) => Ok(Some((count as u64, LogEntry::parse(line, idx + 1)?))),
            None => Ok(None),
        }
    }

    /// Drop the last entry, persisting every remaining line
    pub fn truncate_last(&self) -> Result<()> {
        let mut lines = self.lines()?;
        while lines.last().is_some_and(|line| line.trim().is_empty()) {
            lines.pop();
        }
        if lines.pop().is_none() {
            return Ok(());
        }

        let mut content = lines.join("\n");
        if !content.is_empty() {
            content.push('\n');
        }
        utils::atomic_write(&self.path, content.as_bytes())?;

        debug!("Undo log compacted to {} entries", lines.len());
        Ok(())
    }

    fn lines(&self) -> Result<Vec<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.lines().map(str::to_string).collect()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(ShellError::from_io(err, &self.path)),
        }
    }
}
