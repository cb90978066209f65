//! Core configuration types.
//! - MoveSettings carries the per-move policy flags the executor consults.
//! - Config holds runtime settings with sensible defaults.
//! - LogLevel represents verbosity with simple parsing helpers.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use super::{DEFAULT_DUPLICATES_DIR, DEFAULT_ITEM_TIMEOUT, DESTINATION_ROOT_DEFAULT};

/// Program-defined verbosity levels exposed to users/config.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LogLevel {
    /// Only errors
    Quiet,
    /// Informational output (default)
    #[default]
    Normal,
    /// More info (like verbose)
    Info,
    /// Debug/trace
    Debug,
}

impl LogLevel {
    /// Parse common string names into our LogLevel (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "quiet" | "error" | "none" => Some(LogLevel::Quiet),
            "normal" => Some(LogLevel::Normal),
            "info" | "verbose" | "detailed" => Some(LogLevel::Info),
            "debug" | "trace" => Some(LogLevel::Debug),
            _ => None,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Normal => "normal",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("invalid log level: '{s}'"))
    }
}

/// Policy flags consulted while planning and executing moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveSettings {
    /// Relocate into the destination root (false = rename in place)
    pub move_enabled: bool,
    /// Use the caller-computed name (false = keep the source filename)
    pub rename_enabled: bool,
    /// Delete source directories left empty by a successful move
    pub remove_empty_dirs: bool,
    /// Subdirectory that receives indexed duplicates when moving
    pub duplicates_dir: Option<String>,
    /// Empty-directory cleanup never touches this directory or anything above it
    pub reap_root: Option<PathBuf>,
    /// Stamp the destination's mtime with the current time after a move
    pub touch_on_success: bool,
}

impl Default for MoveSettings {
    fn default() -> Self {
        Self {
            move_enabled: true,
            rename_enabled: true,
            remove_empty_dirs: false,
            duplicates_dir: Some(DEFAULT_DUPLICATES_DIR.to_string()),
            reap_root: None,
            touch_on_success: true,
        }
    }
}

/// Runtime configuration used by the binary and the scheduler.
#[derive(Debug, Clone)]
pub struct Config {
    /// Where moved files land when moving is enabled
    pub destination_root: PathBuf,
    /// Move policy
    pub settings: MoveSettings,
    /// Worker pool size
    pub workers: usize,
    /// How long the coordinator waits for each move
    pub item_timeout: Duration,
    /// Console verbosity
    pub log_level: LogLevel,
    /// Optional path to a log file
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            destination_root: PathBuf::from(DESTINATION_ROOT_DEFAULT),
            settings: MoveSettings::default(),
            workers: default_workers(),
            item_timeout: DEFAULT_ITEM_TIMEOUT,
            log_level: LogLevel::Normal,
            log_file: None,
        }
    }
}

impl Config {
    /// Construct a Config with an explicit destination root; other fields use defaults.
    pub fn new(destination_root: impl Into<PathBuf>) -> Self {
        Self {
            destination_root: destination_root.into(),
            ..Default::default()
        }
    }
}

/// Parallel I/O does not scale with cores; keep the pool small.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .clamp(2, 8)
}
