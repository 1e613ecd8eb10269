//! `mv source dest`

use super::merge::{merge_tree, MergeContext, MergeMode};
use crate::command::Outcome;
use crate::error::{IoResultExt, Result, ShellError};
use crate::safety;
use crate::session::Session;
use crate::undo_log::LogEntry;
use crate::utils;
use std::fs;
use std::path::Path;
use tracing::{info, instrument};

/// Move `source` to `dest`.
///
/// An existing directory `dest` receives `dest/basename(source)`. Three cases
/// follow from what is at that effective destination:
///
/// - nothing: a plain rename
/// - a file, with a file source: the file is backed up and replaced
/// - a directory, with a directory source: the trees are merged leaf by leaf,
///   overwritten leaves are backed up, and every moved leaf is logged so undo
///   can carry it back
///
/// # Errors
///
/// - [`ShellError::FileExists`] when a file and a directory would collide
/// - [`ShellError::PermissionDenied`] for the root, the data directory, an
///   ancestor of the working directory, or a destination inside `source`
#[instrument(skip(session))]
pub fn move_to(session: &Session, source: &Path, dest: &Path) -> Result<Outcome> {
    safety::validate_path(source)?;
    safety::guard_root(source)?;
    safety::guard_protected(source, session.data_dir())?;
    safety::guard_ancestor(source, session.cwd())?;

    let dest = super::effective_destination(source, dest)?;
    safety::guard_protected(&dest, session.data_dir())?;
    safety::guard_ancestor(source, &dest)?;
    super::ensure_parent(&dest)?;

    let source_is_dir = utils::is_real_dir(source);
    let dest_exists = utils::path_exists(&dest);
    if dest_exists && source_is_dir != utils::is_real_dir(&dest) {
        return Err(ShellError::FileExists { path: dest });
    }

    let trash = session.trash();
    let log = session.undo_log();
    let prefix = log.next_sequence()?;
    trash.prepare(prefix, &utils::basename(&dest)?)?;

    let leaves = if !dest_exists {
        utils::rename_or_copy(source, &dest)?;
        Vec::new()
    } else if !source_is_dir {
        trash.backup_if_exists(&dest, &dest, prefix)?;
        utils::rename_or_copy(source, &dest)?;
        Vec::new()
    } else {
        let mut ctx = MergeContext::new(trash, prefix, dest.clone(), MergeMode::Move);
        merge_tree(source, &dest, &mut ctx)?;
        // Only empty directories are left behind
        fs::remove_dir_all(source).at(source)?;
        ctx.recorded
    };

    let merged = leaves.len();
    log.append(&LogEntry::moved(source.to_path_buf(), dest.clone(), leaves))?;
    info!(
        "mv {:?} -> {:?} (sequence {}, {} leaves merged)",
        source, dest, prefix, merged
    );
    Ok(Outcome::Done)
}
