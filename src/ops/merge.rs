//! Recursive merge of one directory tree into another
//!
//! Shared by `cp -r` and by `mv` onto an existing directory. Every leaf about
//! to be overwritten is first backed up into the trash under the operation's
//! sequence prefix, so the overwrite can be undone.
//!
//! What gets recorded depends on the mode:
//!
//! - [`MergeMode::Copy`] records every path that did not exist before, in
//!   creation order (a directory comes before its contents). Undo deletes
//!   them in reverse; overwritten leaves come back from the trash.
//! - [`MergeMode::Move`] records every leaf moved (files, symlinks and empty
//!   directories), since undo has to carry each one back under the source.

use crate::error::{IoResultExt, Result, ShellError};
use crate::trash::TrashStore;
use crate::utils;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

/// Whether leaves are copied or moved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Leave the source untouched
    Copy,
    /// Rename leaves out of the source
    Move,
}

/// State threaded through one merge
#[derive(Debug)]
pub struct MergeContext<'a> {
    /// Where backups go
    pub trash: &'a TrashStore,
    /// Sequence prefix of the running operation
    pub prefix: u64,
    /// Root of the destination; backups keep their layout relative to it
    pub top_level: PathBuf,
    /// Copy or move
    pub mode: MergeMode,
    /// Created paths (copy) or moved leaves (move)
    pub recorded: Vec<PathBuf>,
    /// Number of destination leaves backed up before being overwritten
    pub backups: usize,
}

impl<'a> MergeContext<'a> {
    /// Fresh context for merging into `top_level`
    pub fn new(trash: &'a TrashStore, prefix: u64, top_level: PathBuf, mode: MergeMode) -> Self {
        Self {
            trash,
            prefix,
            top_level,
            mode,
            recorded: Vec::new(),
            backups: 0,
        }
    }

    fn backup(&mut self, destination: &Path) -> Result<()> {
        if self.trash.backup_if_exists(destination, &self.top_level, self.prefix)? {
            self.backups += 1;
        }
        Ok(())
    }
}

/// Merge directory `source` into `dest` (which may not exist yet)
///
/// Kind conflicts anywhere in the tree are reported before anything is
/// touched, so a failed merge leaves both trees as they were.
pub fn merge_tree(source: &Path, dest: &Path, ctx: &mut MergeContext<'_>) -> Result<()> {
    check_conflicts(source, dest)?;
    if ctx.mode == MergeMode::Move && utils::is_empty_dir(source)? {
        // Nothing to carry over; the destination itself stands in as the leaf
        // so undo knows to recreate the source directory.
        ensure_dir(source, dest, ctx)?;
        ctx.recorded.push(dest.to_path_buf());
        return Ok(());
    }
    merge_dir(source, dest, ctx)
}

/// Find the first place where a directory would meet a non-directory
fn check_conflicts(source: &Path, dest: &Path) -> Result<()> {
    if !utils::path_exists(dest) {
        return Ok(());
    }
    if !utils::is_real_dir(dest) {
        return Err(ShellError::FileExists {
            path: dest.to_path_buf(),
        });
    }

    for child in fs::read_dir(source).at(source)? {
        let child = child.at(source)?;
        let target = dest.join(child.file_name());
        if child.file_type().at(&child.path())?.is_dir() {
            check_conflicts(&child.path(), &target)?;
        } else if utils::is_real_dir(&target) {
            return Err(ShellError::FileExists { path: target });
        }
    }
    Ok(())
}

fn merge_dir(source: &Path, dest: &Path, ctx: &mut MergeContext<'_>) -> Result<()> {
    // Undo prunes directories it empties; an empty one that was already here
    // has to come back from the trash.
    if ctx.mode == MergeMode::Move && dest != ctx.top_level && utils::is_empty_dir(dest)? {
        ctx.backup(dest)?;
    }
    ensure_dir(source, dest, ctx)?;

    let mut children = fs::read_dir(source)
        .at(source)?
        .collect::<std::io::Result<Vec<_>>>()
        .at(source)?;
    children.sort_by_key(|entry| entry.file_name());

    for child in children {
        let child_path = child.path();
        let target = dest.join(child.file_name());
        let is_dir = child.file_type().at(&child_path)?.is_dir();

        if !is_dir {
            merge_leaf(&child_path, &target, ctx)?;
        } else if ctx.mode == MergeMode::Move && utils::is_empty_dir(&child_path)? {
            merge_empty_dir(&child_path, &target, ctx)?;
        } else {
            merge_dir(&child_path, &target, ctx)?;
        }
    }
    Ok(())
}

/// Create `dest` as a directory if it is missing, mirroring `source`'s mode
fn ensure_dir(source: &Path, dest: &Path, ctx: &mut MergeContext<'_>) -> Result<()> {
    if utils::is_real_dir(dest) {
        return Ok(());
    }
    if utils::path_exists(dest) {
        return Err(ShellError::FileExists {
            path: dest.to_path_buf(),
        });
    }

    fs::create_dir(dest).at(dest)?;
    let metadata = fs::metadata(source).at(source)?;
    utils::set_permissions(dest, utils::get_permissions(&metadata))?;

    if ctx.mode == MergeMode::Copy {
        ctx.recorded.push(dest.to_path_buf());
    }
    trace!("Created directory {:?}", dest);
    Ok(())
}

/// Move an empty source directory; an empty one already at `target` is backed
/// up so undo can put it back after vacating the leaf.
fn merge_empty_dir(source: &Path, target: &Path, ctx: &mut MergeContext<'_>) -> Result<()> {
    if utils::is_empty_dir(target)? {
        ctx.backup(target)?;
    }
    ensure_dir(source, target, ctx)?;
    ctx.recorded.push(target.to_path_buf());
    Ok(())
}

fn merge_leaf(source: &Path, target: &Path, ctx: &mut MergeContext<'_>) -> Result<()> {
    if utils::is_real_dir(target) {
        return Err(ShellError::FileExists {
            path: target.to_path_buf(),
        });
    }

    let existed = utils::path_exists(target);
    if existed {
        ctx.backup(target)?;
    }

    match ctx.mode {
        MergeMode::Copy => {
            if existed && fs::symlink_metadata(target).at(target)?.file_type().is_symlink() {
                fs::remove_file(target).at(target)?;
            }
            utils::copy_file_with_metadata(source, target)?;
            if !existed {
                ctx.recorded.push(target.to_path_buf());
            }
        }
        MergeMode::Move => {
            utils::rename_or_copy(source, target)?;
            ctx.recorded.push(target.to_path_buf());
        }
    }

    trace!("{:?} {:?} -> {:?}", ctx.mode, source, target);
    Ok(())
}
