//! Removal of directories emptied by a move.
//!
//! Starting from a directory, delete it if empty and walk up, stopping at the
//! first directory that is missing, not a directory, non-empty, or not strictly
//! below the configured root. Failures are logged and end the walk.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct DirectoryReaper {
    root: PathBuf,
}

impl DirectoryReaper {
    /// `root` and everything above it are never removed.
    pub fn new(root: &Path) -> Self {
        let root = dunce::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());
        Self { root }
    }

    /// Remove `dir` and its ancestors while they are empty. Returns how many were removed.
    pub fn reap(&self, dir: &Path) -> usize {
        let mut removed = 0;
        let mut current = dir.to_path_buf();
        loop {
            // symlink_metadata: a symlink to a directory is not a directory here.
            match fs::symlink_metadata(&current) {
                Ok(meta) if meta.is_dir() => {}
                _ => break,
            }
            let real = match dunce::canonicalize(&current) {
                Ok(p) => p,
                Err(_) => break,
            };
            if real == self.root || !real.starts_with(&self.root) {
                break;
            }
            match fs::read_dir(&real) {
                Ok(mut entries) => {
                    if entries.next().is_some() {
                        break;
                    }
                }
                Err(e) => {
                    debug!(dir = %real.display(), error = %e, "cannot list directory; stop reaping");
                    break;
                }
            }
            if let Err(e) = fs::remove_dir(&real) {
                warn!(dir = %real.display(), error = %e, "Could not remove empty directory");
                break;
            }
            debug!(dir = %real.display(), "removed empty directory");
            removed += 1;
            match real.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => break,
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn removes_empty_chain_up_to_root() {
        let td = tempdir().unwrap();
        let root = td.path().join("in");
        let deep = root.join("a").join("b").join("c");
        fs::create_dir_all(&deep).unwrap();

        let reaper = DirectoryReaper::new(&root);
        assert_eq!(reaper.reap(&deep), 3);
        assert!(root.is_dir());
        assert!(!root.join("a").exists());
    }

    #[test]
    fn stops_at_non_empty_ancestor() {
        let td = tempdir().unwrap();
        let root = td.path().join("in");
        let deep = root.join("a").join("b");
        fs::create_dir_all(&deep).unwrap();
        fs::write(root.join("a").join("keep.txt"), b"k").unwrap();

        assert_eq!(DirectoryReaper::new(&root).reap(&deep), 1);
        assert!(root.join("a").join("keep.txt").exists());
    }

    #[test]
    fn never_touches_root_or_outside() {
        let td = tempdir().unwrap();
        let root = td.path().join("in");
        let outside = td.path().join("elsewhere");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&outside).unwrap();

        let reaper = DirectoryReaper::new(&root);
        assert_eq!(reaper.reap(&root), 0);
        assert_eq!(reaper.reap(&outside), 0);
        assert_eq!(reaper.reap(&root.join("missing")), 0);
        assert!(root.is_dir() && outside.is_dir());
    }
}
