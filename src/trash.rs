//! Trash store: backups that make operations reversible
//!
//! The trash is a flat directory. Every forward operation gets a sequence
//! prefix `N` (its 1-based position in the undo log) and may create one entry
//! per destination named `{N}_{basename}`:
//!
//! ```text
//! trash/
//! ├── 2_file2              # file overwritten by `cp file1 file2`
//! ├── 4_dir                # leaves overwritten while merging into `dir`
//! │   └── subdir/
//! │       └── file1
//! └── 5_notes              # whole entry removed by `rm -r notes`
//! ```
//!
//! Entries are consumed by undo. Nothing is ever evicted automatically; the
//! store grows with the history.

use crate::error::{IoResultExt, Result, ShellError};
use crate::utils;
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use walkdir::WalkDir;

/// Flat backup directory namespaced by operation sequence numbers
#[derive(Debug, Clone)]
pub struct TrashStore {
    root: PathBuf,
}

impl TrashStore {
    /// Open (creating if needed) the trash directory at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).at(&root)?;
        Ok(Self { root })
    }

    /// Trash directory location
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the entry `{prefix}_{name}`
    pub fn entry_path(&self, prefix: u64, name: &str) -> PathBuf {
        self.root.join(format!("{}_{}", prefix, name))
    }

    /// Make sure `{prefix}_{name}` is free for a new operation.
    ///
    /// An entry already there was left behind by an operation whose log line
    /// is gone (a crash between mutation and log write, or an edited log).
    /// It is renamed aside rather than merged with the new backups.
    pub fn prepare(&self, prefix: u64, name: &str) -> Result<()> {
        let entry = self.entry_path(prefix, name);
        if !utils::path_exists(&entry) {
            return Ok(());
        }

        let aside = self.root.join(format!(
            "{}_{}.stale-{}",
            prefix,
            name,
            Utc::now().format("%Y%m%dT%H%M%S%.3f")
        ));
        warn!("Stale trash entry {:?} set aside as {:?}", entry, aside);
        fs::rename(&entry, &aside).at(&entry)
    }

    /// Back up `destination` before it gets overwritten.
    ///
    /// The copy lands in `{prefix}_{basename(top_level)}`, at the same
    /// relative position `destination` has under `top_level`. Returns whether
    /// a backup was made.
    pub fn backup_if_exists(&self, destination: &Path, top_level: &Path, prefix: u64) -> Result<bool> {
        if !utils::path_exists(destination) {
            return Ok(false);
        }

        let relative = utils::make_relative(destination, top_level)?;
        let entry = self.entry_path(prefix, &utils::basename(top_level)?);
        let target = if relative.as_os_str().is_empty() {
            entry
        } else {
            entry.join(relative)
        };

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }
        utils::copy_tree(destination, &target)?;

        debug!("Backed up {:?} to {:?}", destination, target);
        Ok(true)
    }

    /// Move `source` wholesale into the trash as `{prefix}_{basename(source)}`
    pub fn stash(&self, source: &Path, prefix: u64) -> Result<PathBuf> {
        let name = utils::basename(source)?;
        self.prepare(prefix, &name)?;

        let entry = self.entry_path(prefix, &name);
        utils::rename_or_copy(source, &entry)?;

        debug!("Stashed {:?} as {:?}", source, entry);
        Ok(entry)
    }

    /// Move the stashed entry `{prefix}_{name}` back to `destination`.
    ///
    /// Fails with [`ShellError::NotFound`] when the entry is missing and with
    /// [`ShellError::FileExists`] when something occupies `destination`.
    pub fn take(&self, prefix: u64, name: &str, destination: &Path) -> Result<()> {
        let entry = self.entry_path(prefix, name);
        if !utils::path_exists(&entry) {
            return Err(ShellError::not_found(entry));
        }
        if utils::path_exists(destination) {
            return Err(ShellError::FileExists {
                path: destination.to_path_buf(),
            });
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }
        utils::rename_or_copy(&entry, destination)?;

        debug!("Took {:?} back to {:?}", entry, destination);
        Ok(())
    }

    /// Put the backup `{prefix}_{name}` back onto `destination`, overwriting.
    ///
    /// A file backup replaces `destination`; a directory backup is merged
    /// into it leaf by leaf. Returns `false`, and changes nothing, when there
    /// is no backup for this operation.
    pub fn restore(&self, prefix: u64, name: &str, destination: &Path) -> Result<bool> {
        let entry = self.entry_path(prefix, name);
        if !utils::path_exists(&entry) {
            debug!("No backup {:?} to restore, nothing to do", entry);
            return Ok(false);
        }

        if !utils::is_real_dir(&entry) {
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).at(parent)?;
            }
            utils::rename_or_copy(&entry, destination)?;
            debug!("Restored {:?} from {:?}", destination, entry);
            return Ok(true);
        }

        // Collected up front: leaves are renamed out of the tree being walked
        let items = WalkDir::new(&entry)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for item in items {
            let relative = utils::make_relative(item.path(), &entry)?;
            let target = destination.join(&relative);

            if item.file_type().is_dir() {
                fs::create_dir_all(&target).at(&target)?;
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).at(parent)?;
            }
            if utils::is_real_dir(&target) {
                return Err(ShellError::IsADirectory { path: target });
            }
            utils::rename_or_copy(item.path(), &target)?;
            trace!("Restored leaf {:?}", target);
        }

        fs::remove_dir_all(&entry).at(&entry)?;
        debug!("Restored backups under {:?} from {:?}", destination, entry);
        Ok(true)
    }

    /// Names of every entry currently in the trash, sorted
    pub fn entries(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for item in fs::read_dir(&self.root).at(&self.root)? {
            let item = item.at(&self.root)?;
            names.push(item.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}
