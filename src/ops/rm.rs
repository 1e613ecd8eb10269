//! `rm [-r] [-f] [--test] source`

use crate::command::Outcome;
use crate::error::{Result, ShellError};
use crate::paths;
use crate::safety;
use crate::session::Session;
use crate::undo_log::LogEntry;
use crate::utils;
use std::path::Path;
use tracing::{info, instrument};

/// Flags accepted by `rm`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveOptions {
    /// Allow removing directories
    pub recursive: bool,
    /// Skip the confirmation for non-empty directories
    pub force: bool,
    /// Validate and confirm, then stop before touching anything
    pub test: bool,
}

/// Remove `source` by moving it wholesale into the trash.
///
/// A non-empty directory asks for confirmation unless `force` is set; a
/// declined confirmation is [`Outcome::NothingDone`], not an error.
///
/// # Errors
///
/// - [`ShellError::NotFound`] if `source` does not exist
/// - [`ShellError::PermissionDenied`] for the root, the data directory, or an
///   ancestor of the working directory
/// - [`ShellError::IsADirectory`] for a directory without `recursive`
#[instrument(skip(session))]
pub fn remove(session: &mut Session, source: &Path, options: RemoveOptions) -> Result<Outcome> {
    safety::validate_path(source)?;
    safety::guard_root(source)?;
    safety::guard_protected(source, session.data_dir())?;
    safety::guard_ancestor(source, session.cwd())?;

    if utils::is_real_dir(source) {
        if !options.recursive {
            return Err(ShellError::IsADirectory {
                path: source.to_path_buf(),
            });
        }
        if !options.force && !utils::is_empty_dir(source)? {
            let question = format!("rm: remove non-empty directory '{}'?", paths::pretty(source));
            if !session.confirm(&question)? {
                return Ok(Outcome::NothingDone("nothing done".to_string()));
            }
        }
    }

    if options.test {
        return Ok(Outcome::NothingDone(format!(
            "test mode: {} would be removed",
            paths::pretty(source)
        )));
    }

    let log = session.undo_log();
    let prefix = log.next_sequence()?;
    let entry = session.trash().stash(source, prefix)?;
    log.append(&LogEntry::remove(source.to_path_buf()))?;

    info!("rm {:?} (sequence {}, stashed as {:?})", source, prefix, entry);
    Ok(Outcome::Done)
}
