//! `grep [-r] [-i] pattern path`

use crate::command::{parse_args, Command, CommandRegistry, Outcome, Parsed};
use crate::error::{IoResultExt, Result, ShellError};
use crate::paths;
use crate::safety;
use crate::session::Session;
use crate::utils;
use clap::Parser;
use regex::{Regex, RegexBuilder};
use std::fs;
use std::path::Path;
use tracing::trace;
use walkdir::WalkDir;

/// Characters of context shown on each side of a match
pub const MATCH_PADDING: usize = 25;

#[derive(Parser, Debug)]
#[command(name = "grep", about = "Find lines matching a pattern")]
struct GrepArgs {
    /// Search every file below a directory
    #[arg(short = 'r')]
    recursive: bool,
    /// Case-insensitive matching
    #[arg(short = 'i')]
    ignore_case: bool,
    /// Regular expression
    pattern: String,
    /// File or directory to search
    path: String,
}

pub(crate) fn register(registry: &mut CommandRegistry) {
    registry.register(Command {
        name: "grep",
        description: "find lines matching a regular expression",
        help: "grep [-r] [-i] <pattern> <path>",
        handler: cmd_grep,
    });
}

fn cmd_grep(session: &mut Session, args: &[String]) -> Result<Outcome> {
    let args = match parse_args::<GrepArgs>("grep", args)? {
        Parsed::Args(args) => args,
        Parsed::Help(text) => return Ok(Outcome::Output(text)),
    };

    let pattern = RegexBuilder::new(&args.pattern)
        .case_insensitive(args.ignore_case)
        .build()
        .map_err(|e| ShellError::invalid_argument(format!("grep: {}", e)))?;

    let path = session.resolve(&args.path);
    safety::validate_path(&path)?;

    let mut found = Vec::new();
    if utils::is_real_dir(&path) {
        if !args.recursive {
            return Err(ShellError::IsADirectory { path });
        }
        for entry in WalkDir::new(&path).follow_links(false).sort_by_file_name() {
            let entry = entry?;
            if entry.file_type().is_file() {
                search_file(&pattern, entry.path(), &mut found)?;
            }
        }
    } else {
        search_file(&pattern, &path, &mut found)?;
    }

    if found.is_empty() {
        Ok(Outcome::NothingDone("no patterns found".to_string()))
    } else {
        Ok(Outcome::Output(found.join("\n")))
    }
}

/// Append one line per match in `file`; files that are not UTF-8 text are skipped
fn search_file(pattern: &Regex, file: &Path, found: &mut Vec<String>) -> Result<()> {
    let bytes = fs::read(file).at(file)?;
    let Ok(text) = String::from_utf8(bytes) else {
        trace!("Skipping binary file {:?}", file);
        return Ok(());
    };

    let shown = paths::pretty(file);
    for (idx, line) in text.lines().enumerate() {
        for m in pattern.find_iter(line) {
            found.push(format!(
                "{}:{} -> {}",
                shown,
                idx + 1,
                excerpt(line, m.start(), m.end())
            ));
        }
    }
    Ok(())
}

/// The match in quotes with up to [`MATCH_PADDING`] characters either side
pub fn excerpt(line: &str, start: usize, end: usize) -> String {
    let before: Vec<char> = line[..start].chars().collect();
    let after: Vec<char> = line[end..].chars().collect();

    let mut out = String::new();
    if before.len() > MATCH_PADDING {
        out.push_str("...");
    }
    out.extend(&before[before.len().saturating_sub(MATCH_PADDING)..]);
    out.push('"');
    out.push_str(&line[start..end]);
    out.push('"');
    out.extend(after.iter().take(MATCH_PADDING));
    if after.len() > MATCH_PADDING {
        out.push_str("...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShellConfig;
    use crate::session::ScriptedPrompter;
    use tempfile::TempDir;

    fn create_test_session() -> (Session, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let work = temp_dir.path().join("work");
        fs::create_dir_all(work.join("dir/subdir")).unwrap();
        fs::write(work.join("file1"), "python c c#\n").unwrap();
        fs::write(work.join("dir/subdir/file2"), "c++ goose goose\n").unwrap();
        fs::write(work.join("dir/subdir/file3"), "goose\n").unwrap();
        fs::write(work.join("dir/blob"), [0xff, 0xfe, b'c']).unwrap();
        let config = ShellConfig::load(&temp_dir.path().join("data")).unwrap();
        config.init_storage().unwrap();
        let session = Session::new(config, work, Box::new(ScriptedPrompter::default())).unwrap();
        (session, temp_dir)
    }

    fn grep(session: &mut Session, args: &[&str]) -> Result<Outcome> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        cmd_grep(session, &args)
    }

    fn matches_of(outcome: Outcome, needle: &str) -> usize {
        match outcome {
            Outcome::Output(text) => text.matches(needle).count(),
            other => panic!("expected output, got {:?}", other),
        }
    }

    #[test]
    fn test_grep_file_and_directory() {
        let (mut session, _temp_dir) = create_test_session();

        assert_eq!(matches_of(grep(&mut session, &["c", "file1"]).unwrap(), "\"c\""), 2);
        assert_eq!(matches_of(grep(&mut session, &["-r", "c", "."]).unwrap(), "\"c\""), 3);
        assert_eq!(
            matches_of(grep(&mut session, &["-r", "goose", "dir"]).unwrap(), "\"goose\""),
            3
        );
        assert_eq!(
            matches_of(grep(&mut session, &["-i", "-r", "GOOSE", "dir"]).unwrap(), "\"goose\""),
            3
        );
    }

    #[test]
    fn test_grep_reports_line_numbers_in_walk_order() {
        let (mut session, _temp_dir) = create_test_session();
        let outcome = grep(&mut session, &["-r", "goose", "dir"]).unwrap();
        let Outcome::Output(text) = outcome else {
            panic!("expected output");
        };
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("file2:1 -> c++ \"goose\" goose"));
        assert!(lines[2].ends_with("file3:1 -> \"goose\""));
    }

    #[test]
    fn test_grep_errors_and_no_match() {
        let (mut session, _temp_dir) = create_test_session();

        assert!(matches!(
            grep(&mut session, &["goose", "dir"]),
            Err(ShellError::IsADirectory { .. })
        ));
        assert!(matches!(
            grep(&mut session, &["(", "file1"]),
            Err(ShellError::InvalidArgument(_))
        ));
        assert!(matches!(
            grep(&mut session, &["x", "missing"]),
            Err(ShellError::NotFound { .. })
        ));
        assert_eq!(
            grep(&mut session, &["-r", "test", "."]).unwrap(),
            Outcome::NothingDone("no patterns found".to_string())
        );
    }

    #[test]
    fn test_excerpt_padding() {
        let line = format!("{}needle{}", "a".repeat(30), "b".repeat(30));
        let start = 30;
        let shown = excerpt(&line, start, start + 6);
        assert_eq!(
            shown,
            format!("...{}\"needle\"{}...", "a".repeat(25), "b".repeat(25))
        );

        assert_eq!(excerpt("héllo wörld", 7, 13), "héllo \"wörld\"");
    }
}
