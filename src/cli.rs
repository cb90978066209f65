//! CLI definition and parsing.
//! Defines Args and provides parse() for command-line handling.
//!
//! Notes:
//! - Each positional is `SOURCE` or `SOURCE=NEW_NAME`; an existing path containing
//!   '=' is taken literally.
//! - --debug is a shorthand for --log-level debug.

use clap::{Parser, ValueHint};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::types::{Config, LogLevel};

/// CLI wrapper for the batch_mover library.
/// CLI flags override config values (which are loaded from XML if present).
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Move a batch of files to computed destinations, numbering name collisions"
)]
pub struct Args {
    /// Files (or directories of files) to move, optionally with a new name: SOURCE[=NEW_NAME]
    #[arg(value_name = "SOURCE[=NEW_NAME]", required_unless_present = "print_config")]
    pub sources: Vec<String>,

    /// Destination root directory.
    #[arg(long, value_hint = ValueHint::DirPath, help = "Destination root directory")]
    pub dest: Option<PathBuf>,

    /// Rename in place instead of moving into the destination root.
    #[arg(long, help = "Rename in place; do not move into the destination root")]
    pub no_move: bool,

    /// Keep the source filenames (ignore any NEW_NAME).
    #[arg(long, help = "Keep original filenames; ignore NEW_NAME")]
    pub no_rename: bool,

    /// Delete source directories left empty (requires --reap-root or config reap_root).
    #[arg(long, help = "Delete source directories emptied by a move")]
    pub remove_empty_dirs: bool,

    /// Empty-directory cleanup never goes at or above this directory.
    #[arg(long, value_hint = ValueHint::DirPath, help = "Upper bound for empty-directory cleanup")]
    pub reap_root: Option<PathBuf>,

    /// Folder (inside the destination) that receives numbered duplicates.
    #[arg(long, value_name = "NAME", help = "Folder name for numbered duplicates")]
    pub duplicates_dir: Option<String>,

    /// Leave the modification time of moved files untouched.
    #[arg(long, help = "Do not stamp moved files with the current time")]
    pub no_touch: bool,

    /// Number of parallel move workers.
    #[arg(long, value_name = "N", help = "Number of parallel move workers")]
    pub workers: Option<usize>,

    /// Seconds to wait for each move before giving up on it.
    #[arg(long, value_name = "SECS", help = "Per-move timeout in seconds")]
    pub timeout: Option<u64>,

    /// Enable debug logging (equivalent to `--log-level debug`).
    #[arg(
        short = 'd',
        long,
        help = "Enable debug logging (shorthand for --log-level debug)"
    )]
    pub debug: bool,

    /// Set log level. One of: quiet, normal, info, debug.
    #[arg(long, help = "Set log level: quiet, normal, info, debug")]
    pub log_level: Option<String>,

    /// Print where batch_mover will look for the config file, then exit.
    #[arg(long, help = "Print the config file location and exit")]
    pub print_config: bool,

    /// Emit logs in structured JSON (includes timestamp, level, and structured fields).
    #[arg(long, help = "Emit logs in structured JSON")]
    pub json: bool,
}

/// One positional argument, split into path and optional new name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub path: PathBuf,
    pub new_name: Option<String>,
}

impl SourceSpec {
    pub fn parse(raw: &str) -> Self {
        let raw = sanitize_str(raw);
        if Path::new(&raw).exists() {
            return Self {
                path: PathBuf::from(raw),
                new_name: None,
            };
        }
        match raw.rsplit_once('=') {
            Some((path, name)) if !path.is_empty() && !name.is_empty() => Self {
                path: PathBuf::from(path),
                new_name: Some(name.to_string()),
            },
            _ => Self {
                path: PathBuf::from(raw),
                new_name: None,
            },
        }
    }
}

/// Trim surrounding quotes left behind by shells that pass them through (PowerShell, CMD).
fn sanitize_str(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.len() >= 2
        && ((trimmed.starts_with('"') && trimmed.ends_with('"'))
            || (trimmed.starts_with('\'') && trimmed.ends_with('\'')))
    {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

impl Args {
    pub fn source_specs(&self) -> Vec<SourceSpec> {
        self.sources.iter().map(|s| SourceSpec::parse(s)).collect()
    }

    /// Effective log level derived from flags.
    /// Precedence: --debug > --log-level value > None (use config default).
    pub fn effective_log_level(&self) -> Option<LogLevel> {
        if self.debug {
            return Some(LogLevel::Debug);
        }
        self.log_level.as_deref().and_then(LogLevel::parse)
    }

    /// Apply CLI overrides to a loaded Config (in-place). No-ops for unset flags.
    pub fn apply_overrides(&self, cfg: &mut Config) {
        if let Some(dest) = &self.dest {
            cfg.destination_root = dest.clone();
        }
        if self.no_move {
            cfg.settings.move_enabled = false;
        }
        if self.no_rename {
            cfg.settings.rename_enabled = false;
        }
        if self.remove_empty_dirs {
            cfg.settings.remove_empty_dirs = true;
        }
        if let Some(root) = &self.reap_root {
            cfg.settings.reap_root = Some(root.clone());
        }
        if let Some(name) = &self.duplicates_dir {
            cfg.settings.duplicates_dir = Some(name.clone());
        }
        if self.no_touch {
            cfg.settings.touch_on_success = false;
        }
        if let Some(n) = self.workers {
            cfg.workers = n;
        }
        if let Some(secs) = self.timeout {
            cfg.item_timeout = Duration::from_secs(secs);
        }
        if let Some(level) = self.effective_log_level() {
            cfg.log_level = level;
        }
    }
}

pub fn parse() -> Args {
    Args::parse()
}
