//! `cp [-r] source dest`

use super::merge::{merge_tree, MergeContext, MergeMode};
use crate::command::Outcome;
use crate::error::{IoResultExt, Result, ShellError};
use crate::safety;
use crate::session::Session;
use crate::trash::TrashStore;
use crate::undo_log::LogEntry;
use crate::utils;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Copy `source` to `dest`, backing up whatever gets overwritten.
///
/// When `dest` is an existing directory the copy lands at
/// `dest/basename(source)`. Directories need `recursive` and are merged into
/// an existing destination directory rather than replacing it.
///
/// The undo entry lists the effective destination followed by every path the
/// copy created, in creation order.
///
/// # Errors
///
/// - [`ShellError::NotFound`] if `source` or the destination's parent is missing
/// - [`ShellError::PermissionDenied`] for the root, the data directory, an
///   ancestor of the working directory, or a destination inside `source`
/// - [`ShellError::IsADirectory`] for a directory without `recursive`, or a
///   file onto an existing directory
/// - [`ShellError::NotADirectory`] for a directory onto an existing file
#[instrument(skip(session))]
pub fn copy(session: &Session, source: &Path, dest: &Path, recursive: bool) -> Result<Outcome> {
    safety::validate_path(source)?;
    safety::guard_root(source)?;
    safety::guard_protected(source, session.data_dir())?;
    safety::guard_ancestor(source, session.cwd())?;

    let source_is_dir = utils::is_real_dir(source);
    if source_is_dir && !recursive {
        return Err(ShellError::IsADirectory {
            path: source.to_path_buf(),
        });
    }

    let dest = super::effective_destination(source, dest)?;
    safety::guard_protected(&dest, session.data_dir())?;
    safety::guard_ancestor(source, &dest)?;
    super::ensure_parent(&dest)?;

    let dest_is_dir = utils::is_real_dir(&dest);
    if !source_is_dir && dest_is_dir {
        return Err(ShellError::IsADirectory { path: dest });
    }
    if source_is_dir && utils::path_exists(&dest) && !dest_is_dir {
        return Err(ShellError::NotADirectory { path: dest });
    }

    let trash = session.trash();
    let log = session.undo_log();
    let prefix = log.next_sequence()?;
    trash.prepare(prefix, &utils::basename(&dest)?)?;

    let (created, backups) = if source_is_dir {
        let mut ctx = MergeContext::new(trash, prefix, dest.clone(), MergeMode::Copy);
        merge_tree(source, &dest, &mut ctx)?;
        (ctx.recorded, ctx.backups)
    } else {
        copy_file(trash, prefix, source, &dest)?
    };

    log.append(&LogEntry::copy(dest.clone(), created))?;
    info!(
        "cp {:?} -> {:?} (sequence {}, {} backed up)",
        source, dest, prefix, backups
    );
    Ok(Outcome::Done)
}

fn copy_file(
    trash: &TrashStore,
    prefix: u64,
    source: &Path,
    dest: &Path,
) -> Result<(Vec<PathBuf>, usize)> {
    if !trash.backup_if_exists(dest, dest, prefix)? {
        utils::copy_file_with_metadata(source, dest)?;
        return Ok((vec![dest.to_path_buf()], 0));
    }

    // Overwrite the link itself, not whatever it points at
    if fs::symlink_metadata(dest).at(dest)?.file_type().is_symlink() {
        fs::remove_file(dest).at(dest)?;
    }
    utils::copy_file_with_metadata(source, dest)?;
    Ok((Vec::new(), 1))
}
