//! Property-based testing for undosh
//!
//! Uses proptest to check that any sequence of operations over a random
//! tree, undone in reverse, leaves the tree exactly as it started.

use super::integration::{snapshot, ShellTestHarness};
use proptest::prelude::*;
use std::fs;
use std::path::PathBuf;

/// An operation over a small fixed namespace, so collisions are common
#[derive(Debug, Clone)]
pub enum FileOperation {
    Copy { source: String, dest: String },
    Move { source: String, dest: String },
    Remove { target: String },
}

/// Generate relative paths inside a shallow namespace
fn path_strategy() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(prop_oneof![Just("a"), Just("b"), Just("c")], 0..=2),
        prop_oneof![Just("x"), Just("y"), Just("z")],
    )
        .prop_map(|(dirs, name)| {
            let mut path = PathBuf::new();
            for dir in dirs {
                path.push(dir);
            }
            path.push(name);
            path.to_string_lossy().into_owned()
        })
}

/// Generate an initial tree: relative path to content
fn tree_strategy() -> impl Strategy<Value = Vec<(String, Vec<u8>)>> {
    prop::collection::vec(
        (path_strategy(), prop::collection::vec(any::<u8>(), 0..64)),
        1..12,
    )
}

fn operation_strategy() -> impl Strategy<Value = FileOperation> {
    let any_path = prop_oneof![path_strategy(), Just("a".to_string()), Just("b".to_string())];
    prop_oneof![
        (any_path.clone(), any_path.clone())
            .prop_map(|(source, dest)| FileOperation::Copy { source, dest }),
        (any_path.clone(), any_path.clone())
            .prop_map(|(source, dest)| FileOperation::Move { source, dest }),
        any_path.prop_map(|target| FileOperation::Remove { target }),
    ]
}

/// Write the tree, skipping entries that collide with an earlier one's kind
fn build_tree(harness: &ShellTestHarness, files: &[(String, Vec<u8>)]) {
    for (relative, content) in files {
        let path = harness.path(relative);
        if let Some(parent) = path.parent() {
            if fs::create_dir_all(parent).is_err() {
                continue;
            }
        }
        if path.is_dir() {
            continue;
        }
        fs::write(&path, content).unwrap();
    }
}

fn command_line(op: &FileOperation) -> String {
    match op {
        FileOperation::Copy { source, dest } => format!("cp -r {} {}", source, dest),
        FileOperation::Move { source, dest } => format!("mv {} {}", source, dest),
        FileOperation::Remove { target } => format!("rm -rf {}", target),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_copies_undone_in_reverse_restore_tree(
        files in tree_strategy(),
        copies in prop::collection::vec((path_strategy(), path_strategy()), 1..8),
    ) {
        let mut harness = ShellTestHarness::new();
        build_tree(&harness, &files);
        let initial = snapshot(&harness.sandbox());

        let mut applied = 0;
        for (source, dest) in &copies {
            // Rejected copies change nothing and log nothing
            if harness.shell.execute(&format!("cp -r {} {}", source, dest)).is_ok() {
                applied += 1;
            }
        }
        prop_assert_eq!(harness.log_len(), applied);

        for _ in 0..applied {
            harness.run("undo");
        }
        prop_assert_eq!(snapshot(&harness.sandbox()), initial);
        prop_assert!(harness.shell.execute("undo").unwrap().is_nothing_done());
    }

    #[test]
    fn prop_mixed_operations_undone_in_reverse_restore_tree(
        files in tree_strategy(),
        ops in prop::collection::vec(operation_strategy(), 1..8),
    ) {
        let mut harness = ShellTestHarness::new();
        build_tree(&harness, &files);
        let initial = snapshot(&harness.sandbox());

        let mut applied = 0;
        for op in &ops {
            if harness.shell.execute(&command_line(op)).is_ok() {
                applied += 1;
            }
        }

        for _ in 0..applied {
            harness.run("undo");
        }
        prop_assert_eq!(snapshot(&harness.sandbox()), initial);
        prop_assert!(harness.shell.session().trash().entries().unwrap().is_empty());
    }
}
