//! Path resolution for user-typed arguments
//!
//! Turns what the user typed plus the session's working directory into an
//! absolute, lexically normalized path. Symlinks are never resolved here:
//! `..` is applied to the path as written, like a shell does.

use std::path::{Component, Path, PathBuf};

/// Resolve a user-typed path against the working directory.
///
/// `~` and `~/...` expand to the home directory. Relative paths are joined to
/// `cwd`. The result is normalized with [`normalize`].
pub fn resolve(cwd: &Path, raw: &str) -> PathBuf {
    let expanded = expand_home(raw);
    if expanded.is_absolute() {
        normalize(&expanded)
    } else {
        normalize(&cwd.join(expanded))
    }
}

/// Lexically normalize a path: drop `.`, apply `..`, never climb above root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::RootDir => out.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                // pop() refuses to remove the root, so `/..` stays `/`
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            Component::Normal(name) => out.push(name),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Abbreviate the home directory to `~` for display
pub fn pretty(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if home.parent().is_some() {
            if let Ok(rest) = path.strip_prefix(&home) {
                if rest.as_os_str().is_empty() {
                    return "~".to_string();
                }
                return format!("~/{}", rest.display());
            }
        }
    }
    path.display().to_string()
}

fn expand_home(raw: &str) -> PathBuf {
    let home = || dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
    if raw == "~" {
        home()
    } else if let Some(rest) = raw.strip_prefix("~/") {
        home().join(rest)
    } else {
        PathBuf::from(raw)
    }
}
