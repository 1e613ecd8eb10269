//! Main test module for undosh
//!
//! This module includes all test suites:
//! - Integration tests for the command scenarios
//! - Property-based tests for undo invariants
//! - Edge cases: awkward names, metadata, stale state, a hand-edited log

pub mod integration;
pub mod property;

#[cfg(test)]
mod edge_cases {
    use super::integration::ShellTestHarness;
    use ::undosh::*;
    use std::fs;

    #[test]
    fn test_special_filenames() {
        let mut harness = ShellTestHarness::new();

        let special_names = vec![
            "file with spaces.txt",
            "it's quoted.txt",
            "file-with-dashes.txt",
            "file@with#special$chars.txt",
            "file(with)parens.txt",
            "file[with]brackets.txt",
            "файл.txt",
            "🚀🌟💾.txt",
        ];

        let mut created = Vec::new();
        for name in &special_names {
            if fs::write(harness.path(name), format!("Content of {}", name)).is_ok() {
                created.push(*name);
            }
        }

        for name in &created {
            let quoted = shlex::try_quote(name).unwrap();
            harness.run(&format!("rm {}", quoted));
            assert!(!harness.exists(name));
        }

        // The log must round-trip every name
        for _ in &created {
            harness.run("undo");
        }
        for name in &created {
            assert_eq!(harness.read(name), format!("Content of {}", name));
        }
    }

    #[test]
    fn test_permission_preservation() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mut harness = ShellTestHarness::new();
            let script = harness.create_file("tools/run.sh", "#!/bin/sh\n");
            fs::set_permissions(&script, fs::Permissions::from_mode(0o750)).unwrap();

            harness.run("cp -r tools copied");
            let mode = fs::metadata(harness.path("copied/run.sh"))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o750);

            harness.run("rm -rf tools");
            harness.run("undo");
            let mode = fs::metadata(&script).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o750);
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks_are_not_followed() {
        let mut harness = ShellTestHarness::new();
        harness.create_file("target.txt", "target");
        std::os::unix::fs::symlink("target.txt", harness.path("link")).unwrap();
        std::os::unix::fs::symlink("missing", harness.path("dangling")).unwrap();

        harness.run("cp link link_copy");
        assert_eq!(
            fs::read_link(harness.path("link_copy")).unwrap(),
            std::path::PathBuf::from("target.txt")
        );

        // A dangling link still exists as far as rm is concerned
        harness.run("rm dangling");
        assert!(!harness.exists("dangling"));
        harness.run("undo");
        assert!(harness.exists("dangling"));

        // Overwriting a link replaces the link, not its target
        harness.create_file("other.txt", "other");
        harness.run("cp other.txt link");
        assert_eq!(harness.read("target.txt"), "target");
        harness.run("undo");
        assert_eq!(
            fs::read_link(harness.path("link")).unwrap(),
            std::path::PathBuf::from("target.txt")
        );
    }

    #[test]
    fn test_empty_directory_moves() {
        let mut harness = ShellTestHarness::new();
        harness.create_dir("empty");
        harness.create_dir("dest/empty");
        let initial = harness.snapshot("");

        harness.run("mv empty dest");
        assert!(!harness.exists("empty"));

        harness.run("undo");
        assert_eq!(harness.snapshot(""), initial);
    }

    #[test]
    fn test_stale_trash_entry_is_set_aside() {
        let mut harness = ShellTestHarness::new();
        harness.create_file("file1", "file1\n");
        harness.create_file("file2", "file2\n");

        // Left behind by an operation whose log line never got written
        let trash = harness.shell.session().trash().clone();
        fs::write(trash.entry_path(1, "file2"), "stale").unwrap();

        harness.run("cp file1 file2");
        harness.run("undo");

        assert_eq!(harness.read("file2"), "file2\n");
        let entries = trash.entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].starts_with("1_file2.stale-"));
    }

    #[test]
    fn test_sequence_prefix_is_reused_after_undo() {
        let mut harness = ShellTestHarness::new();
        harness.create_file("a", "a1");
        harness.create_file("b", "b1");

        harness.run("cp a b");
        harness.run("undo");
        fs::write(harness.path("a"), "a2").unwrap();
        harness.run("cp a b");
        harness.run("undo");

        assert_eq!(harness.read("b"), "b1");
        assert!(harness.shell.session().trash().entries().unwrap().is_empty());
    }

    #[test]
    fn test_hand_edited_log_is_reported() {
        let mut harness = ShellTestHarness::new();
        let log_path = harness.shell.session().undo_log().path().to_path_buf();
        fs::write(&log_path, "rm /tmp/x\nfrobnicate /tmp/y\n").unwrap();

        match harness.fail("undo") {
            ShellError::InvalidLog { line, .. } => assert_eq!(line, 2),
            other => panic!("expected InvalidLog, got {:?}", other),
        }
        // Nothing was consumed
        assert_eq!(fs::read_to_string(&log_path).unwrap(), "rm /tmp/x\nfrobnicate /tmp/y\n");
    }

    #[test]
    fn test_sessions_share_history_through_data_dir() {
        let mut harness = ShellTestHarness::new();
        harness.create_file("file1", "file1\n");
        harness.run("rm file1");

        // A second shell over the same data directory sees the entry
        let mut second = ShellBuilder::new()
            .data_dir(harness.temp_dir.path().join("data"))
            .cwd(harness.sandbox())
            .prompter(Box::new(ScriptedPrompter::default()))
            .build()
            .unwrap();
        second.execute("undo").unwrap();
        assert_eq!(harness.read("file1"), "file1\n");
    }
}
