//! Utility functions for undosh
//!
//! Small file-system helpers shared by the trash store, the undo log and the
//! operation executors.
//!
//! ## Categories of Utilities
//!
//! ### File Operations
//! - Metadata-preserving file copy (permissions and timestamps)
//! - Rename with a copy + delete fallback across devices
//! - Recursive tree copy
//! - Atomic file writing
//! - Symbolic link handling (cross-platform)
//!
//! ### Path Manipulation
//! - Converting absolute paths to relative paths
//! - Existence checks that do not follow symlinks
//! - Empty directory pruning
//!
//! ## Error Handling
//!
//! Every function returns [`Result`] and attaches the offending path to OS
//! errors through [`ShellError::from_io`].

use crate::error::{IoResultExt, Result, ShellError};
use filetime::FileTime;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::trace;
use walkdir::WalkDir;

/// Whether anything (file, directory, symlink, even a dangling one) is at `path`
pub fn path_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Whether `path` is a real directory (symlinks to directories are not)
pub fn is_real_dir(path: &Path) -> bool {
    fs::symlink_metadata(path)
        .map(|m| m.file_type().is_dir())
        .unwrap_or(false)
}

/// Whether `path` is a directory with no entries
pub fn is_empty_dir(path: &Path) -> Result<bool> {
    if !is_real_dir(path) {
        return Ok(false);
    }
    Ok(fs::read_dir(path).at(path)?.next().is_none())
}

/// Remove directory if empty
pub fn remove_dir_if_empty(path: &Path) -> Result<bool> {
    if is_empty_dir(path)? {
        fs::remove_dir(path).at(path)?;
        trace!("Removed empty directory: {:?}", path);
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Remove empty directories from `start` upwards, stopping before `stop`.
///
/// Only directories strictly inside `stop` are candidates. Returns the number
/// of directories removed.
pub fn prune_empty_parents(start: &Path, stop: &Path) -> Result<usize> {
    let mut removed = 0;
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir == stop || !dir.starts_with(stop) {
            break;
        }
        if !remove_dir_if_empty(dir)? {
            break;
        }
        removed += 1;
        current = dir.parent();
    }
    Ok(removed)
}

/// Make a path relative to a base path
///
/// Both paths are expected to be lexically normalized; no symlinks are
/// resolved so a symlinked component is kept as written.
///
/// # Errors
///
/// - [`ShellError::Internal`] if the path is not under the base path
pub fn make_relative(path: &Path, base: &Path) -> Result<PathBuf> {
    path.strip_prefix(base)
        .map(|p| p.to_path_buf())
        .map_err(|_| {
            ShellError::internal(format!("Path {:?} is not relative to {:?}", path, base))
        })
}

/// Final path component as an owned string, for trash entry names
pub fn basename(path: &Path) -> Result<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| ShellError::invalid_argument(format!("{} has no file name", path.display())))
}

/// Copy one file, keeping permissions and access/modification times.
///
/// Symlinks are recreated as symlinks instead of being followed. An existing
/// file at `dest` is overwritten.
pub fn copy_file_with_metadata(source: &Path, dest: &Path) -> Result<u64> {
    let metadata = fs::symlink_metadata(source).at(source)?;

    if metadata.file_type().is_symlink() {
        let target = read_symlink(source)?;
        if path_exists(dest) {
            fs::remove_file(dest).at(dest)?;
        }
        create_symlink(&target, dest)?;
        return Ok(0);
    }

    let bytes = fs::copy(source, dest).at(dest)?;
    let atime = FileTime::from_last_access_time(&metadata);
    let mtime = FileTime::from_last_modification_time(&metadata);
    filetime::set_file_times(dest, atime, mtime).at(dest)?;
    Ok(bytes)
}

/// Recursively copy `source` to `dest`, preserving file metadata.
///
/// Directories are created as needed with the source's permissions; files
/// already present under `dest` are overwritten.
pub fn copy_tree(source: &Path, dest: &Path) -> Result<u64> {
    if !is_real_dir(source) {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }
        return copy_file_with_metadata(source, dest);
    }

    let mut bytes = 0;
    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry?;
        let relative = make_relative(entry.path(), source)?;
        let target = dest.join(&relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).at(&target)?;
            set_permissions(&target, get_permissions(&entry.metadata()?))?;
        } else {
            bytes += copy_file_with_metadata(entry.path(), &target)?;
        }
    }
    Ok(bytes)
}

/// Rename `source` to `dest`, copying then deleting when a plain rename fails.
///
/// A rename across file systems fails on every platform; the fallback keeps
/// `mv` and the trash store working when the trash lives on another device.
pub fn rename_or_copy(source: &Path, dest: &Path) -> Result<()> {
    match fs::rename(source, dest) {
        Ok(()) => Ok(()),
        Err(err) if matches!(
            err.kind(),
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
        ) => Err(ShellError::from_io(err, source)),
        Err(err) => {
            trace!("Rename {:?} -> {:?} failed ({}), copying instead", source, dest, err);
            copy_tree(source, dest)?;
            if is_real_dir(source) {
                fs::remove_dir_all(source).at(source)?;
            } else {
                fs::remove_file(source).at(source)?;
            }
            Ok(())
        }
    }
}

/// Atomic file write (write to temp file then rename)
///
/// The temporary file is created next to `path` so the final rename never
/// crosses a file system; the target is either the old or the new content.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(parent).at(parent)?;
    temp.write_all(content).at(temp.path())?;
    temp.as_file().sync_all().at(temp.path())?;
    temp.persist(path)
        .map_err(|err| ShellError::from_io(err.error, path))?;

    Ok(())
}

/// Get Unix permissions from metadata
#[cfg(unix)]
pub fn get_permissions(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

/// Get permissions from metadata (Windows implementation)
#[cfg(windows)]
pub fn get_permissions(metadata: &fs::Metadata) -> u32 {
    let mut mode = if metadata.permissions().readonly() { 0o444 } else { 0o644 };
    if metadata.is_dir() {
        mode |= 0o111;
    }
    mode
}

/// Set Unix permissions
#[cfg(unix)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).at(path)
}

/// Set permissions (Windows implementation)
#[cfg(windows)]
pub fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    let mut perms = fs::metadata(path).at(path)?.permissions();
    perms.set_readonly((mode & 0o200) == 0);
    fs::set_permissions(path, perms).at(path)
}

/// Render a mode the way `ls -l` does, e.g. `drwxr-xr-x`
pub fn mode_string(metadata: &fs::Metadata) -> String {
    let kind = if metadata.file_type().is_symlink() {
        'l'
    } else if metadata.is_dir() {
        'd'
    } else {
        '-'
    };

    let mode = get_permissions(metadata);
    let mut out = String::with_capacity(10);
    out.push(kind);
    for shift in [6u32, 3, 0] {
        let bits = (mode >> shift) & 0o7;
        out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    out
}

/// Create a symlink (cross-platform)
#[cfg(unix)]
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link).at(link)
}

/// Create a symlink (Windows)
#[cfg(windows)]
pub fn create_symlink(target: &Path, link: &Path) -> Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};

    if target.is_dir() {
        symlink_dir(target, link).at(link)
    } else {
        symlink_file(target, link).at(link)
    }
}

/// Read symlink target
pub fn read_symlink(path: &Path) -> Result<PathBuf> {
    fs::read_link(path).at(path)
}
