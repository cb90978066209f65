//! XML configuration support.
//! - Loads settings from config.xml (quick_xml + serde).
//! - A missing file means "use defaults"; a malformed or unknown field is an error.
//!
//! Notes:
//! - This module only reads the config file; directory validation happens elsewhere.

use anyhow::{Context, Result};
use quick_xml::de::from_str as from_xml_str;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::paths::default_config_path;
use crate::config::types::{Config, LogLevel};

/// Struct mirroring the XML config for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename = "config")]
#[serde(deny_unknown_fields)]
struct XmlConfig {
    destination_root: Option<String>,
    move_enabled: Option<bool>,
    rename_enabled: Option<bool>,
    remove_empty_dirs: Option<bool>,
    duplicates_dir: Option<String>,
    reap_root: Option<String>,
    touch_on_success: Option<bool>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    workers: Option<u64>,
    #[serde(default, deserialize_with = "de_u64_trimmed_opt")]
    item_timeout_seconds: Option<u64>,
    log_level: Option<String>,
    log_file: Option<String>,
}

// Custom deserializer that trims surrounding whitespace for optional u64
fn de_u64_trimmed_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt: Option<String> = Option::deserialize(deserializer)?;
    Ok(opt.and_then(|s| s.trim().parse::<u64>().ok()))
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|t| !t.is_empty())
}

// Map XmlConfig -> Config, keeping defaults for anything left out.
fn xml_to_config(parsed: XmlConfig) -> Config {
    let mut cfg = Config::default();

    if let Some(root) = non_empty(parsed.destination_root.as_deref()) {
        cfg.destination_root = PathBuf::from(root);
    }
    if let Some(v) = parsed.move_enabled {
        cfg.settings.move_enabled = v;
    }
    if let Some(v) = parsed.rename_enabled {
        cfg.settings.rename_enabled = v;
    }
    if let Some(v) = parsed.remove_empty_dirs {
        cfg.settings.remove_empty_dirs = v;
    }
    if let Some(raw) = parsed.duplicates_dir.as_deref() {
        // An explicitly empty element turns the duplicates folder off.
        cfg.settings.duplicates_dir = non_empty(Some(raw)).map(str::to_string);
    }
    cfg.settings.reap_root = non_empty(parsed.reap_root.as_deref()).map(PathBuf::from);
    if let Some(v) = parsed.touch_on_success {
        cfg.settings.touch_on_success = v;
    }
    if let Some(n) = parsed.workers {
        cfg.workers = n as usize;
    }
    if let Some(secs) = parsed.item_timeout_seconds {
        cfg.item_timeout = Duration::from_secs(secs);
    }
    if let Some(level) = non_empty(parsed.log_level.as_deref()).and_then(LogLevel::parse) {
        cfg.log_level = level;
    }
    cfg.log_file = non_empty(parsed.log_file.as_deref()).map(PathBuf::from);

    cfg
}

/// Load a Config from a specific XML file path.
pub fn load_config_from_xml_path(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("read config xml '{}'", path.display()))?;
    let parsed: XmlConfig = from_xml_str(&contents)
        .with_context(|| format!("parse config xml '{}'", path.display()))?;
    Ok(xml_to_config(parsed))
}

/// Load the config from `$BATCH_MOVER_CONFIG` or the default location.
/// Falls back to defaults when no file exists.
pub fn load_config() -> Result<Config> {
    match default_config_path() {
        Some(path) if path.exists() => {
            debug!(path = %path.display(), "loading config");
            load_config_from_xml_path(&path)
        }
        Some(path) => {
            debug!(path = %path.display(), "no config file; using defaults");
            Ok(Config::default())
        }
        None => Ok(Config::default()),
    }
}
