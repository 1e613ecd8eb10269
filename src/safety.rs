//! Safety checks run before any mutation
//!
//! Every check fails fast and has no side effects. Executors call them in a
//! fixed order before touching the file system, so a rejected command never
//! leaves partial state behind.

use crate::error::{Result, ShellError};
use crate::utils;
use std::path::Path;

/// Fail with [`ShellError::NotFound`] unless something exists at `path`
pub fn validate_path(path: &Path) -> Result<()> {
    if utils::path_exists(path) {
        Ok(())
    } else {
        Err(ShellError::not_found(path))
    }
}

/// Refuse to operate on the file system root
pub fn guard_root(path: &Path) -> Result<()> {
    let is_root = path.parent().is_none()
        || path
            .canonicalize()
            .map(|canonical| canonical.parent().is_none())
            .unwrap_or(false);

    if is_root {
        Err(ShellError::permission_denied(path, "refusing to operate on the filesystem root"))
    } else {
        Ok(())
    }
}

/// Refuse when `dest` is `source` itself or lies inside it.
///
/// Used both to keep an operation from writing into the tree it reads from
/// and to keep `mv`/`rm` away from ancestors of the working directory.
pub fn guard_ancestor(source: &Path, dest: &Path) -> Result<()> {
    let contained = is_ancestor(source, dest)
        || match (source.canonicalize(), dest.canonicalize()) {
            (Ok(source), Ok(dest)) => is_ancestor(&source, &dest),
            _ => false,
        };

    if contained {
        Err(ShellError::permission_denied(
            source,
            format!("{} is inside it", dest.display()),
        ))
    } else {
        Ok(())
    }
}

/// Refuse to touch the shell's own data directory or anything containing it
pub fn guard_protected(path: &Path, data_dir: &Path) -> Result<()> {
    if is_ancestor(data_dir, path) || is_ancestor(path, data_dir) {
        Err(ShellError::permission_denied(path, "the undo log and trash live here"))
    } else {
        Ok(())
    }
}

/// Whether `ancestor` equals `path` or is one of its parents.
///
/// Comparison is per path component, so `/foo` is not an ancestor of
/// `/foobar`.
pub fn is_ancestor(ancestor: &Path, path: &Path) -> bool {
    path.starts_with(ancestor)
}
