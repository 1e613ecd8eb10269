//! Shell configuration and the on-disk data directory
//!
//! Everything undosh persists lives under one data directory:
//!
//! ```text
//! ~/.undosh/
//! ├── config.json     # Optional user settings (ShellConfig)
//! ├── metadata.json   # Layout version and creation time
//! ├── undo_history    # Undo log, one operation per line
//! ├── history         # Command lines, one per line
//! ├── shell.log       # Audit trail written by tracing
//! └── trash/          # Backups namespaced by sequence number
//! ```
//!
//! The directory is chosen by `--data-dir`, then `$UNDOSH_HOME`, then
//! `~/.undosh`.

use crate::error::{IoResultExt, Result, ShellError};
use crate::utils;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Layout version written to `metadata.json`
pub const FORMAT_VERSION: u32 = 1;

/// Environment variable overriding the default data directory
pub const DATA_DIR_ENV: &str = "UNDOSH_HOME";

/// User-facing settings, read from `config.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ShellConfig {
    /// Where the undo log, trash and history are kept
    pub data_dir: PathBuf,
    /// Propagate command errors and end the session instead of reporting them
    pub debug: bool,
    /// Maximum number of lines kept in the line editor history
    pub history_size: usize,
    /// Colour the prompt and error messages
    pub color: bool,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            debug: false,
            history_size: 1000,
            color: true,
        }
    }
}

impl ShellConfig {
    /// Load `config.json` from `data_dir` if present, otherwise use defaults.
    ///
    /// `data_dir` always wins over a `data_dir` field inside the file.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join("config.json");
        let mut config = if path.exists() {
            let raw = fs::read_to_string(&path).at(&path)?;
            debug!("Loaded configuration from {:?}", path);
            serde_json::from_str::<ShellConfig>(&raw)?
        } else {
            ShellConfig::default()
        };
        config.data_dir = data_dir.to_path_buf();
        Ok(config)
    }

    /// Trash directory
    pub fn trash_dir(&self) -> PathBuf {
        self.data_dir.join("trash")
    }

    /// Undo log file
    pub fn undo_log_path(&self) -> PathBuf {
        self.data_dir.join("undo_history")
    }

    /// Command history file, shared with the line editor
    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("history")
    }

    /// Audit log written by the tracing subscriber
    pub fn audit_log_path(&self) -> PathBuf {
        self.data_dir.join("shell.log")
    }

    fn metadata_path(&self) -> PathBuf {
        self.data_dir.join("metadata.json")
    }

    /// Create the data directory layout, or check an existing one.
    ///
    /// # Errors
    ///
    /// - [`ShellError::Internal`] if the directory was written by a newer,
    ///   incompatible layout
    pub fn init_storage(&self) -> Result<DataDirMetadata> {
        fs::create_dir_all(&self.data_dir).at(&self.data_dir)?;
        let trash = self.trash_dir();
        fs::create_dir_all(&trash).at(&trash)?;

        let metadata_path = self.metadata_path();
        if metadata_path.exists() {
            let raw = fs::read_to_string(&metadata_path).at(&metadata_path)?;
            let metadata: DataDirMetadata = serde_json::from_str(&raw)?;
            if metadata.format_version > FORMAT_VERSION {
                return Err(ShellError::internal(format!(
                    "{} uses layout version {}, this build understands up to {}",
                    self.data_dir.display(),
                    metadata.format_version,
                    FORMAT_VERSION
                )));
            }
            return Ok(metadata);
        }

        let metadata = DataDirMetadata {
            format_version: FORMAT_VERSION,
            undosh_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&metadata)?;
        utils::atomic_write(&metadata_path, json.as_bytes())?;

        info!("Initialized data directory at {:?}", self.data_dir);
        Ok(metadata)
    }
}

/// Contents of `metadata.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DataDirMetadata {
    /// Layout version
    pub format_version: u32,
    /// Version of the shell that created the directory
    pub undosh_version: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// `$UNDOSH_HOME`, else `~/.undosh`, else `.undosh` in the current directory
pub fn default_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".undosh"))
        .unwrap_or_else(|| PathBuf::from(".undosh"))
}
