//! `undo`: revert the most recent logged operation
//!
//! The log is only rewritten once the replay has succeeded; if the replay
//! fails the entry stays and the error surfaces as-is.

use crate::command::Outcome;
use crate::error::{IoResultExt, Result, ShellError};
use crate::session::Session;
use crate::trash::TrashStore;
use crate::undo_log::{LogEntry, OperationKind};
use crate::utils;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Pop the last undo log entry and replay its inverse
#[instrument(skip(session))]
pub fn undo(session: &Session) -> Result<Outcome> {
    let log = session.undo_log();
    let Some((prefix, entry)) = log.last()? else {
        return Ok(Outcome::NothingDone("nothing to undo".to_string()));
    };

    let trash = session.trash();
    match entry.kind {
        OperationKind::Copy => undo_copy(trash, prefix, &entry)?,
        OperationKind::Move => undo_move(trash, prefix, &entry)?,
        OperationKind::Remove => undo_remove(trash, prefix, &entry)?,
    }
    log.truncate_last()?;

    let summary = summarize(&entry);
    info!("undo {} (sequence {})", summary, prefix);
    Ok(Outcome::Output(format!("undone: {}", summary)))
}

fn summarize(entry: &LogEntry) -> String {
    match entry.kind {
        OperationKind::Move => format!(
            "{} {} -> {}",
            entry.kind,
            entry.args[0].display(),
            entry.args[1].display()
        ),
        _ => format!("{} {}", entry.kind, entry.args[0].display()),
    }
}

/// Delete what the copy created, newest first, then restore overwritten leaves
fn undo_copy(trash: &TrashStore, prefix: u64, entry: &LogEntry) -> Result<()> {
    let (dest, created) = split_first(entry)?;

    for path in created.iter().rev() {
        if utils::is_real_dir(path) {
            utils::remove_dir_if_empty(path)?;
        } else if utils::path_exists(path) {
            fs::remove_file(path).at(path)?;
            debug!("Removed copied {:?}", path);
        }
    }

    trash.restore(prefix, &utils::basename(dest)?, dest)?;
    Ok(())
}

fn undo_move(trash: &TrashStore, prefix: u64, entry: &LogEntry) -> Result<()> {
    let (source, rest) = split_first(entry)?;
    let (dest, leaves) = rest
        .split_first()
        .ok_or_else(|| ShellError::internal("move entry without a destination"))?;

    if leaves.is_empty() {
        if utils::path_exists(source) {
            return Err(ShellError::FileExists {
                path: source.clone(),
            });
        }
        utils::rename_or_copy(dest, source)?;
        debug!("Renamed {:?} back to {:?}", dest, source);
    } else {
        for leaf in leaves.iter().rev() {
            move_leaf_back(leaf, source, dest)?;
        }
    }

    trash.restore(prefix, &utils::basename(dest)?, dest)?;
    Ok(())
}

/// Carry one merged leaf from under `dest` back to the same place under `source`
fn move_leaf_back(leaf: &Path, source: &Path, dest: &Path) -> Result<()> {
    let relative = utils::make_relative(leaf, dest)?;
    let target = source.join(&relative);

    if utils::is_real_dir(leaf) {
        fs::create_dir_all(&target).at(&target)?;
        if leaf != dest && utils::remove_dir_if_empty(leaf)? {
            if let Some(parent) = leaf.parent() {
                utils::prune_empty_parents(parent, dest)?;
            }
        }
        return Ok(());
    }

    if utils::path_exists(&target) {
        return Err(ShellError::FileExists { path: target });
    }
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).at(parent)?;
    }
    utils::rename_or_copy(leaf, &target)?;
    if let Some(parent) = leaf.parent() {
        utils::prune_empty_parents(parent, dest)?;
    }
    debug!("Moved {:?} back to {:?}", leaf, target);
    Ok(())
}

fn undo_remove(trash: &TrashStore, prefix: u64, entry: &LogEntry) -> Result<()> {
    let (source, _) = split_first(entry)?;
    trash.take(prefix, &utils::basename(source)?, source)
}

fn split_first(entry: &LogEntry) -> Result<(&PathBuf, &[PathBuf])> {
    entry
        .args
        .split_first()
        .ok_or_else(|| ShellError::internal(format!("{} entry without paths", entry.kind)))
}
