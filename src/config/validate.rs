//! Config validation logic.
//! Verifies the destination root is usable and the numeric/path settings are sane.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Component, Path};
use tracing::{debug, error, info};

use super::types::Config;
use crate::fs_ops::{io_error_with_help, is_writable_probe};

impl Config {
    /// Validate settings; creates the destination root if moving is enabled and it is missing.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("workers must be at least 1");
        }
        if self.item_timeout.is_zero() {
            bail!("item timeout must be greater than zero");
        }

        if let Some(name) = self.settings.duplicates_dir.as_deref() {
            ensure_single_component(name)?;
        }

        if let Some(root) = self.settings.reap_root.as_deref() {
            if !root.is_dir() {
                error!("reap_root is not a directory: {}", root.display());
                bail!("reap_root is not an existing directory: {}", root.display());
            }
        }

        if self.settings.move_enabled {
            let root = &self.destination_root;
            ensure_dir_is_or_create(root, "destination_root")?;
            ensure_writable(root, "destination_root")?;
        }

        info!(
            destination = %self.destination_root.display(),
            workers = self.workers,
            timeout_secs = self.item_timeout.as_secs(),
            "Config validated"
        );
        Ok(())
    }
}

/// The duplicates folder must be a plain child name, never a path.
fn ensure_single_component(name: &str) -> Result<()> {
    let mut comps = Path::new(name).components();
    match (comps.next(), comps.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => bail!("duplicates_dir must be a single folder name, got '{name}'"),
    }
}

/// Ensure directory exists (create if missing). If exists, it must be a directory.
fn ensure_dir_is_or_create(path: &Path, name: &str) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            error!("{name} exists but isn't a directory: {}", path.display());
            bail!("{name} exists but isn't a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path).map_err(io_error_with_help("create directory", path))?;
        info!("Created {name} directory: {}", path.display());
    }
    Ok(())
}

/// Ensure directory is writable using a non-destructive probe file.
fn ensure_writable(path: &Path, name: &str) -> Result<()> {
    is_writable_probe(path).with_context(|| {
        format!("Cannot write to {name} '{}'; check permissions", path.display())
    })?;
    debug!("{name} writable: {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn creates_missing_destination_root() {
        let td = tempdir().unwrap();
        let cfg = Config::new(td.path().join("a").join("b"));
        cfg.validate().unwrap();
        assert!(td.path().join("a").join("b").is_dir());
    }

    #[test]
    fn rejects_nested_duplicates_dir() {
        let td = tempdir().unwrap();
        let mut cfg = Config::new(td.path());
        cfg.settings.duplicates_dir = Some("a/b".into());
        assert!(cfg.validate().is_err());
        cfg.settings.duplicates_dir = Some("..".into());
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_zero_workers_and_timeout() {
        let td = tempdir().unwrap();
        let mut cfg = Config::new(td.path());
        cfg.workers = 0;
        assert!(cfg.validate().is_err());
        cfg.workers = 2;
        cfg.item_timeout = Duration::ZERO;
        assert!(cfg.validate().is_err());
    }
}
