//! Move descriptors: one record per pending relocation.
//!
//! The caller owns the descriptors (shared as `Arc<Mutex<_>>` so worker threads
//! can report back). The move subsystem only ever touches the source path and
//! the status; the disambiguation index is written once by the conflict resolver.

use anyhow::{anyhow, Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::types::MoveSettings;
use crate::fs_ops::indexed_filename;

/// Lifecycle of a single move. `Renamed`, `Failed` and `NotFound` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveStatus {
    #[default]
    Pending,
    Moving,
    Renamed,
    Failed,
    NotFound,
}

impl MoveStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, MoveStatus::Renamed | MoveStatus::Failed | MoveStatus::NotFound)
    }
}

impl fmt::Display for MoveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MoveStatus::Pending => "pending",
            MoveStatus::Moving => "moving",
            MoveStatus::Renamed => "moved",
            MoveStatus::Failed => "failed",
            MoveStatus::NotFound => "missing",
        };
        f.write_str(s)
    }
}

/// Descriptor handle shared between the caller, the executors and the coordinator.
pub type SharedDescriptor = Arc<Mutex<MoveDescriptor>>;

#[derive(Debug, Clone)]
pub struct MoveDescriptor {
    source: PathBuf,
    destination_root: PathBuf,
    basename: String,
    suffix: String,
    size: u64,
    index: Option<u32>,
    status: MoveStatus,
}

impl MoveDescriptor {
    /// `suffix` includes its leading dot (".mkv"), or is empty.
    pub fn new(
        source: impl Into<PathBuf>,
        destination_root: impl Into<PathBuf>,
        basename: impl Into<String>,
        suffix: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            source: source.into(),
            destination_root: destination_root.into(),
            basename: basename.into(),
            suffix: suffix.into(),
            size,
            index: None,
            status: MoveStatus::Pending,
        }
    }

    pub fn share(self) -> SharedDescriptor {
        Arc::new(Mutex::new(self))
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination_root(&self) -> &Path {
        &self.destination_root
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn index(&self) -> Option<u32> {
        self.index
    }

    pub fn status(&self) -> MoveStatus {
        self.status
    }

    /// Filename the caller asked for, ignoring any disambiguation index.
    pub fn desired_filename(&self) -> String {
        format!("{}{}", self.basename, self.suffix)
    }

    /// Filename actually used at the destination: `"<basename> (N)<suffix>"` once indexed.
    pub fn effective_filename(&self) -> String {
        match self.index {
            Some(n) => indexed_filename(&self.basename, &self.suffix, n),
            None => self.desired_filename(),
        }
    }

    /// Record a disambiguation index. Returns false (and keeps the old value)
    /// if an index was already assigned.
    pub fn assign_index(&mut self, index: u32) -> bool {
        if self.index.is_some() {
            return false;
        }
        self.index = Some(index);
        true
    }

    /// PENDING -> MOVING. Returns false if the descriptor already left PENDING.
    pub fn begin(&mut self) -> bool {
        if self.status != MoveStatus::Pending {
            return false;
        }
        self.status = MoveStatus::Moving;
        true
    }

    /// Set a terminal status. Only the first terminal status sticks; later
    /// calls return false and change nothing.
    pub fn conclude(&mut self, status: MoveStatus) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        true
    }

    pub(crate) fn set_source(&mut self, source: PathBuf) {
        self.source = source;
    }
}

/// Lock a shared descriptor, recovering the data if a worker panicked while holding it.
pub fn lock(desc: &SharedDescriptor) -> std::sync::MutexGuard<'_, MoveDescriptor> {
    desc.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Split a filename into (basename, suffix). Dotfiles without a further
/// extension have an empty suffix.
pub fn split_filename(name: &str) -> (String, String) {
    match name.rfind('.') {
        Some(0) | None => (name.to_string(), String::new()),
        Some(pos) => (name[..pos].to_string(), name[pos..].to_string()),
    }
}

/// Build a descriptor for `source`.
///
/// - When renaming is enabled and `new_name` is given, it becomes basename + suffix;
///   otherwise the source keeps its own filename.
/// - When moving is disabled the destination root is the source's own directory.
pub fn plan_descriptor(
    source: &Path,
    new_name: Option<&str>,
    destination_root: &Path,
    settings: &MoveSettings,
) -> Result<MoveDescriptor> {
    let meta = std::fs::metadata(source)
        .with_context(|| format!("stat source '{}'", source.display()))?;
    if !meta.is_file() {
        return Err(anyhow!("Source is not a regular file: {}", source.display()));
    }

    let own_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Source has no UTF-8 file name: {}", source.display()))?;
    let name = match new_name {
        Some(n) if settings.rename_enabled && !n.trim().is_empty() => n.trim(),
        _ => own_name,
    };
    let (basename, suffix) = split_filename(name);

    let root = if settings.move_enabled {
        destination_root.to_path_buf()
    } else {
        source
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| anyhow!("Source has no parent directory: {}", source.display()))?
    };

    Ok(MoveDescriptor::new(source, root, basename, suffix, meta.len()))
}
