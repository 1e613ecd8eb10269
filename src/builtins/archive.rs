//! `zip`/`tar` and `unzip`/`untar`
//!
//! Archives hold the contents of a directory with paths relative to it.
//! Creating one never overwrites anything, and extracting one refuses to
//! replace existing files, so neither needs an undo log entry.

use crate::command::{parse_args, Command, CommandRegistry, Outcome, Parsed};
use crate::error::{IoResultExt, Result, ShellError};
use crate::paths;
use crate::safety;
use crate::session::Session;
use crate::utils;
use clap::Parser;
use std::fmt;
use std::fs::{self, File};
use std::io;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Supported archive formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Deflate-compressed zip
    Zip,
    /// Uncompressed ustar
    Tar,
}

impl ArchiveFormat {
    /// File extension appended to the destination
    pub fn extension(self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Parser, Debug)]
struct PackArgs {
    /// Directory to archive
    source: String,
    /// Archive path without the extension (defaults to the source's name in
    /// the working directory)
    dest: Option<String>,
}

#[derive(Parser, Debug)]
struct ExtractArgs {
    /// Archive to extract into the working directory
    archive: String,
}

pub(crate) fn register(registry: &mut CommandRegistry) {
    let commands = [
        Command {
            name: "zip",
            description: "create a zip archive of a directory",
            help: "zip <source> [dest]",
            handler: cmd_zip,
        },
        Command {
            name: "tar",
            description: "create a tar archive of a directory",
            help: "tar <source> [dest]",
            handler: cmd_tar,
        },
        Command {
            name: "unzip",
            description: "extract a zip archive here",
            help: "unzip <archive>",
            handler: cmd_unzip,
        },
        Command {
            name: "untar",
            description: "extract a tar archive here",
            help: "untar <archive>",
            handler: cmd_untar,
        },
    ];
    for command in commands {
        registry.register(command);
    }
}

fn cmd_zip(session: &mut Session, args: &[String]) -> Result<Outcome> {
    match parse_args::<PackArgs>("zip", args)? {
        Parsed::Args(args) => pack(session, ArchiveFormat::Zip, args),
        Parsed::Help(text) => Ok(Outcome::Output(text)),
    }
}

fn cmd_tar(session: &mut Session, args: &[String]) -> Result<Outcome> {
    match parse_args::<PackArgs>("tar", args)? {
        Parsed::Args(args) => pack(session, ArchiveFormat::Tar, args),
        Parsed::Help(text) => Ok(Outcome::Output(text)),
    }
}

fn cmd_unzip(session: &mut Session, args: &[String]) -> Result<Outcome> {
    match parse_args::<ExtractArgs>("unzip", args)? {
        Parsed::Args(args) => extract(session, ArchiveFormat::Zip, args),
        Parsed::Help(text) => Ok(Outcome::Output(text)),
    }
}

fn cmd_untar(session: &mut Session, args: &[String]) -> Result<Outcome> {
    match parse_args::<ExtractArgs>("untar", args)? {
        Parsed::Args(args) => extract(session, ArchiveFormat::Tar, args),
        Parsed::Help(text) => Ok(Outcome::Output(text)),
    }
}

fn pack(session: &Session, format: ArchiveFormat, args: PackArgs) -> Result<Outcome> {
    let source = session.resolve(&args.source);
    safety::validate_path(&source)?;
    if !utils::is_real_dir(&source) {
        return Err(ShellError::NotADirectory { path: source });
    }

    let base = match args.dest {
        Some(dest) => session.resolve(&dest),
        None => session.cwd().join(utils::basename(&source)?),
    };
    let archive = with_extension(base, format);
    safety::guard_protected(&archive, session.data_dir())?;
    if utils::path_exists(&archive) {
        return Err(ShellError::FileExists { path: archive });
    }
    crate::ops::ensure_parent(&archive)?;

    // Listed before the temporary file exists, in case it lands inside `source`
    let entries = collect_entries(&source)?;

    let parent = archive
        .parent()
        .ok_or_else(|| ShellError::internal("archive path without a parent"))?;
    let mut temp = NamedTempFile::new_in(parent).at(parent)?;
    match format {
        ArchiveFormat::Zip => write_zip(temp.as_file_mut(), &entries)?,
        ArchiveFormat::Tar => write_tar(temp.as_file_mut(), &entries).at(&archive)?,
    }
    temp.persist_noclobber(&archive)
        .map_err(|err| ShellError::from_io(err.error, &archive))?;

    info!("{} {:?} -> {:?} ({} entries)", format, source, archive, entries.len());
    Ok(Outcome::Output(format!(
        "{} archived {} to {}",
        format,
        paths::pretty(&source),
        paths::pretty(&archive)
    )))
}

fn extract(session: &Session, format: ArchiveFormat, args: ExtractArgs) -> Result<Outcome> {
    let source = session.resolve(&args.archive);
    safety::validate_path(&source)?;
    if utils::is_real_dir(&source) {
        return Err(ShellError::IsADirectory { path: source });
    }
    let dest = session.cwd().to_path_buf();
    safety::guard_protected(&dest, session.data_dir())?;

    let planned = match format {
        ArchiveFormat::Zip => zip_entries(&source)?,
        ArchiveFormat::Tar => tar_entries(&source)?,
    };
    for (relative, is_dir) in &planned {
        check_target(&dest, relative, *is_dir)?;
    }

    match format {
        ArchiveFormat::Zip => {
            let file = File::open(&source).at(&source)?;
            ZipArchive::new(file)?.extract(&dest)?;
        }
        ArchiveFormat::Tar => {
            let file = File::open(&source).at(&source)?;
            tar::Archive::new(file).unpack(&dest).at(&source)?;
        }
    }

    info!("un{} {:?} into {:?} ({} entries)", format, source, dest, planned.len());
    Ok(Outcome::Output(format!(
        "extracted {} entries from {}",
        planned.len(),
        paths::pretty(&source)
    )))
}

/// `base` with `.zip` or `.tar` appended to its file name
fn with_extension(base: PathBuf, format: ArchiveFormat) -> PathBuf {
    let mut raw = base.into_os_string();
    raw.push(".");
    raw.push(format.extension());
    PathBuf::from(raw)
}

/// Everything below `source`, sorted, with `/`-separated names relative to it
fn collect_entries(source: &Path) -> Result<Vec<(PathBuf, String)>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(source)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        let relative = utils::make_relative(entry.path(), source)?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        entries.push((entry.path().to_path_buf(), name));
    }
    Ok(entries)
}

fn write_zip(out: &mut File, entries: &[(PathBuf, String)]) -> Result<()> {
    let mut writer = ZipWriter::new(out);

    for (path, name) in entries {
        let metadata = fs::symlink_metadata(path).at(path)?;
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(utils::get_permissions(&metadata) & 0o777);
        if metadata.file_type().is_symlink() {
            let target = utils::read_symlink(path)?;
            writer.add_symlink(name.as_str(), target.to_string_lossy().into_owned(), options)?;
        } else if metadata.is_dir() {
            writer.add_directory(name.as_str(), options)?;
        } else {
            writer.start_file(name.as_str(), options)?;
            let mut file = File::open(path).at(path)?;
            io::copy(&mut file, &mut writer).at(path)?;
        }
        debug!("Archived {:?} as {}", path, name);
    }

    writer.finish()?;
    Ok(())
}

fn write_tar(out: &mut File, entries: &[(PathBuf, String)]) -> io::Result<()> {
    let mut builder = tar::Builder::new(out);
    builder.follow_symlinks(false);
    for (path, name) in entries {
        builder.append_path_with_name(path, name)?;
        debug!("Archived {:?} as {}", path, name);
    }
    builder.into_inner()?;
    Ok(())
}

/// Relative path and directory flag of every zip entry
fn zip_entries(source: &Path) -> Result<Vec<(PathBuf, bool)>> {
    let file = File::open(source).at(source)?;
    let mut archive = ZipArchive::new(file)?;
    let mut planned = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        let relative = entry.enclosed_name().ok_or_else(|| {
            ShellError::invalid_argument(format!("unsafe entry name {:?}", entry.name()))
        })?;
        planned.push((relative, entry.is_dir()));
    }
    Ok(planned)
}

/// Relative path and directory flag of every tar entry
fn tar_entries(source: &Path) -> Result<Vec<(PathBuf, bool)>> {
    let file = File::open(source).at(source)?;
    let mut archive = tar::Archive::new(file);
    let mut planned = Vec::new();
    for entry in archive.entries().at(source)? {
        let entry = entry.at(source)?;
        let relative = entry.path().at(source)?.into_owned();
        planned.push((relative, entry.header().entry_type().is_dir()));
    }
    Ok(planned)
}

/// Refuse entries that escape `dest` or would replace something already there
fn check_target(dest: &Path, relative: &Path, is_dir: bool) -> Result<()> {
    let escapes = relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ShellError::invalid_argument(format!(
            "unsafe entry name {:?}",
            relative
        )));
    }

    let target = dest.join(relative);
    if utils::path_exists(&target) && !(is_dir && utils::is_real_dir(&target)) {
        return Err(ShellError::FileExists { path: target });
    }
    Ok(())
}
