//! Integration tests for undosh
//!
//! Each test drives a shell over a sandbox directory through command lines
//! and compares whole-tree snapshots before and after undo.

use ::undosh::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// A shell over a fresh sandbox, with its data directory beside it
pub struct ShellTestHarness {
    pub temp_dir: TempDir,
    pub shell: Shell,
}

/// What a tree looks like: relative path to file content (`None` for directories)
pub type TreeSnapshot = BTreeMap<PathBuf, Option<Vec<u8>>>;

impl ShellTestHarness {
    /// Create a new test harness answering confirmations with `answers`
    pub fn with_answers(answers: &[&str]) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let sandbox = temp_dir.path().join("sandbox");
        fs::create_dir(&sandbox).unwrap();

        let shell = ShellBuilder::new()
            .data_dir(temp_dir.path().join("data"))
            .cwd(sandbox)
            .debug(true)
            .prompter(Box::new(ScriptedPrompter::new(answers.iter().copied())))
            .build()
            .unwrap();

        Self { temp_dir, shell }
    }

    /// Create a new test harness with no canned answers
    pub fn new() -> Self {
        Self::with_answers(&[])
    }

    /// Sandbox root
    pub fn sandbox(&self) -> PathBuf {
        self.temp_dir.path().join("sandbox")
    }

    /// Absolute path of a sandbox-relative path
    pub fn path(&self, relative: &str) -> PathBuf {
        self.sandbox().join(relative)
    }

    pub fn create_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    pub fn create_dir(&self, relative: &str) -> PathBuf {
        let path = self.path(relative);
        fs::create_dir_all(&path).unwrap();
        path
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn exists(&self, relative: &str) -> bool {
        fs::symlink_metadata(self.path(relative)).is_ok()
    }

    /// Run a command line that must succeed
    pub fn run(&mut self, line: &str) -> Outcome {
        self.shell
            .execute(line)
            .unwrap_or_else(|e| panic!("`{}` failed: {}", line, e))
    }

    /// Run a command line that must fail
    pub fn fail(&mut self, line: &str) -> ShellError {
        match self.shell.execute(line) {
            Ok(outcome) => panic!("`{}` unexpectedly succeeded with {:?}", line, outcome),
            Err(e) => e,
        }
    }

    /// Snapshot of the tree rooted at `relative` (or the whole sandbox for "")
    pub fn snapshot(&self, relative: &str) -> TreeSnapshot {
        snapshot(&self.path(relative))
    }

    pub fn log_len(&self) -> usize {
        self.shell.session().undo_log().len().unwrap()
    }
}

/// Relative path to content for every entry under `root`
pub fn snapshot(root: &Path) -> TreeSnapshot {
    let mut tree = BTreeMap::new();
    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = entry.unwrap();
        let relative = entry.path().strip_prefix(root).unwrap().to_path_buf();
        let content = if entry.file_type().is_dir() {
            None
        } else if entry.file_type().is_symlink() {
            Some(
                fs::read_link(entry.path())
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
                    .into_bytes(),
            )
        } else {
            Some(fs::read(entry.path()).unwrap())
        };
        tree.insert(relative, content);
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populate(harness: &ShellTestHarness) {
        harness.create_file("file1", "file1\n");
        harness.create_file("file2", "file2\n");
        harness.create_file("dir/file1", "file1_dir\n");
        harness.create_file("dir/file2", "file2_dir\n");
        harness.create_file("dir/subdir/file1", "file1_subdir\n");
        harness.create_file("subdir/file1", "file1_subdir2\n");
    }

    #[test]
    fn test_cp_and_undo() {
        let mut harness = ShellTestHarness::new();
        populate(&harness);
        let initial = harness.snapshot("");

        // no -r flag present
        assert!(matches!(
            harness.fail("cp dir dir3"),
            ShellError::IsADirectory { .. }
        ));

        // copy file
        harness.run("cp file1 file3");
        assert_eq!(harness.read("file3"), "file1\n");

        // copy and overwrite existing file
        harness.run("cp file1 file2");
        assert_eq!(harness.read("file2"), "file1\n");

        // copy directory
        harness.run("cp -r dir dir_copy");
        assert_eq!(harness.snapshot("dir"), harness.snapshot("dir_copy"));

        // copy and overwrite directory
        harness.run("cp -r subdir dir");
        assert_eq!(harness.snapshot("subdir"), harness.snapshot("dir/subdir"));
        assert_eq!(harness.read("dir/subdir/file1"), "file1_subdir2\n");

        // undo, newest first
        harness.run("undo");
        assert_eq!(harness.read("dir/subdir/file1"), "file1_subdir\n");

        harness.run("undo");
        assert!(!harness.exists("dir_copy"));

        harness.run("undo");
        assert_eq!(harness.read("file2"), "file2\n");

        harness.run("undo");
        assert!(!harness.exists("file3"));

        assert_eq!(harness.snapshot(""), initial);
        assert_eq!(harness.log_len(), 0);
    }

    #[test]
    fn test_mv_and_undo() {
        let mut harness = ShellTestHarness::new();
        populate(&harness);
        let initial = harness.snapshot("");

        // move file
        harness.run("mv file1 file3");
        assert_eq!(harness.read("file3"), "file1\n");
        assert!(!harness.exists("file1"));

        // move and overwrite existing file
        harness.run("mv file3 file2");
        assert_eq!(harness.read("file2"), "file1\n");
        assert!(!harness.exists("file3"));

        // move directory
        let dir_tree = harness.snapshot("dir");
        harness.run("mv dir dir_move");
        assert_eq!(harness.snapshot("dir_move"), dir_tree);
        assert!(!harness.exists("dir"));

        // move and overwrite directory
        let subdir_tree = harness.snapshot("subdir");
        harness.run("mv subdir dir_move");
        assert_eq!(harness.snapshot("dir_move/subdir"), subdir_tree);
        assert_eq!(harness.read("dir_move/subdir/file1"), "file1_subdir2\n");
        assert!(!harness.exists("subdir"));

        // undo, newest first
        harness.run("undo");
        assert_eq!(harness.read("dir_move/subdir/file1"), "file1_subdir\n");
        assert_eq!(harness.read("subdir/file1"), "file1_subdir2\n");

        harness.run("undo");
        assert!(!harness.exists("dir_move"));
        assert_eq!(harness.snapshot("dir"), dir_tree);

        harness.run("undo");
        assert_eq!(harness.read("file2"), "file2\n");
        assert_eq!(harness.read("file3"), "file1\n");

        harness.run("undo");
        assert!(!harness.exists("file3"));
        assert_eq!(harness.read("file1"), "file1\n");

        assert_eq!(harness.snapshot(""), initial);
    }

    #[test]
    fn test_rm_and_undo() {
        let mut harness = ShellTestHarness::new();
        harness.create_file("file1", "file1\n");
        harness.create_file("dir/file1", "file1_dir\n");
        harness.create_file("dir/file2", "file2_dir\n");
        harness.create_file("dir/subdir/file1", "file1_subdir\n");
        harness.create_file("dir2/file1", "file1_dir2\n");
        let dir_tree = harness.snapshot("dir");
        let dir2_tree = harness.snapshot("dir2");

        // no -r flag present
        assert!(matches!(
            harness.fail("rm --test -f dir"),
            ShellError::IsADirectory { .. }
        ));
        // prevent root trashing
        assert!(harness.fail("rm --test -f /").is_permission_denied());
        // prevent parent directory trashing
        assert!(harness.fail("rm --test -f ..").is_permission_denied());

        harness.run("rm file1");
        assert!(!harness.exists("file1"));

        harness.run("rm -rf dir2");
        assert!(!harness.exists("dir2"));

        harness.run("rm -rf dir");
        assert!(!harness.exists("dir"));

        harness.run("undo");
        assert_eq!(harness.snapshot("dir"), dir_tree);

        harness.run("undo");
        assert_eq!(harness.snapshot("dir2"), dir2_tree);

        harness.run("undo");
        assert_eq!(harness.read("file1"), "file1\n");
    }

    #[test]
    fn test_rm_confirmation() {
        let mut harness = ShellTestHarness::with_answers(&["nope", "no", "yes"]);
        harness.create_file("dir/file1", "x");
        harness.create_dir("empty");

        // Invalid answer is asked again, then declined
        let outcome = harness.run("rm -r dir");
        assert!(outcome.is_nothing_done());
        assert!(harness.exists("dir/file1"));

        // An empty directory needs no confirmation
        harness.run("rm -r empty");
        assert!(!harness.exists("empty"));

        harness.run("rm -r dir");
        assert!(!harness.exists("dir"));
        assert_eq!(harness.log_len(), 2);
    }

    #[test]
    fn test_shell_commands() {
        let mut harness = ShellTestHarness::new();

        assert!(matches!(
            harness.fail("unknown_command"),
            ShellError::CommandNotFound(_)
        ));
        assert_eq!(harness.run(""), Outcome::Done);
    }

    #[test]
    fn test_safety_leaves_tree_untouched() {
        let mut harness = ShellTestHarness::new();
        populate(&harness);
        let initial = harness.snapshot("");

        assert!(harness.fail("rm -rf /").is_permission_denied());
        assert!(harness.fail("rm -rf .").is_permission_denied());
        assert!(harness.fail("mv . ../elsewhere").is_permission_denied());
        assert!(harness.fail("cp -r dir dir/subdir").is_permission_denied());
        assert!(harness.fail("mv dir dir/subdir/deeper").is_permission_denied());
        assert!(matches!(
            harness.fail("cp missing anywhere"),
            ShellError::NotFound { .. }
        ));
        assert!(matches!(
            harness.fail("cp file1 nowhere/file1"),
            ShellError::NotFound { .. }
        ));
        assert!(matches!(
            harness.fail("mv dir file1"),
            ShellError::FileExists { .. }
        ));

        assert_eq!(harness.snapshot(""), initial);
        assert_eq!(harness.log_len(), 0);
    }

    #[test]
    fn test_copy_of_cwd_ancestor_leaves_tree_untouched() {
        let mut harness = ShellTestHarness::new();
        populate(&harness);
        let outside = harness.temp_dir.path().join("out");
        fs::create_dir(&outside).unwrap();
        let initial = harness.snapshot("");

        harness.run("cd dir/subdir");
        let target = outside.join("copy");
        let quoted = shlex::try_quote(target.to_str().unwrap()).unwrap().into_owned();
        for line in [
            format!("cp -r .. {}", quoted),
            format!("cp -r . {}", quoted),
            format!("cp -r ../.. {}", quoted),
        ] {
            assert!(harness.fail(&line).is_permission_denied(), "{}", line);
        }

        assert!(!target.exists());
        assert_eq!(harness.snapshot(""), initial);
        assert_eq!(harness.log_len(), 0);
    }

    #[test]
    fn test_merge_move_with_nested_overwrites() {
        let mut harness = ShellTestHarness::new();
        harness.create_file("src/a.txt", "new a");
        harness.create_file("src/deep/b.txt", "new b");
        harness.create_file("src/deep/c.txt", "only in source");
        harness.create_dir("src/empty");
        harness.create_file("dest/src/a.txt", "old a");
        harness.create_file("dest/src/deep/b.txt", "old b");
        harness.create_file("dest/src/keep.txt", "untouched");
        let initial = harness.snapshot("");

        harness.run("mv src dest");
        assert!(!harness.exists("src"));
        assert_eq!(harness.read("dest/src/a.txt"), "new a");
        assert_eq!(harness.read("dest/src/deep/c.txt"), "only in source");
        assert!(harness.path("dest/src/empty").is_dir());

        harness.run("undo");
        assert_eq!(harness.snapshot(""), initial);
        assert!(harness.shell.session().trash().entries().unwrap().is_empty());
    }

    #[test]
    fn test_copy_merge_into_existing_tree() {
        let mut harness = ShellTestHarness::new();
        harness.create_file("src/a.txt", "new a");
        harness.create_file("src/nested/deeper/b.txt", "b");
        harness.create_file("dest/src/a.txt", "old a");
        harness.create_file("dest/src/other.txt", "other");
        let initial = harness.snapshot("");

        harness.run("cp -r src dest");
        assert_eq!(harness.read("dest/src/a.txt"), "new a");
        assert_eq!(harness.read("dest/src/nested/deeper/b.txt"), "b");

        harness.run("undo");
        assert_eq!(harness.snapshot(""), initial);
    }
}
