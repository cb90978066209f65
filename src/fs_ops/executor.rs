//! Per-file move state machine.
//!
//! PENDING -> MOVING -> RENAMED | FAILED | NOT_FOUND
//!
//! The executor never returns an error to its caller: every failure is logged,
//! folded into a terminal status on the descriptor, and reported once to the
//! progress observer. There are no retries here; a stuck move is the
//! scheduler's problem.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::helpers::describe_io;
use super::meta::maybe_touch;
use super::reaper::DirectoryReaper;
use super::transfer::{transfer, Strategy};
use super::util::is_writable_probe;
use crate::config::types::MoveSettings;
use crate::descriptor::{lock, MoveStatus, SharedDescriptor};
use crate::errors::MoveError;
use crate::platform::{same_file, same_filesystem};
use crate::progress::{CancelToken, ProgressObserver, Silent};

/// What happened to one descriptor.
#[derive(Debug)]
pub struct MoveOutcome {
    pub status: MoveStatus,
    /// Final location on success.
    pub destination: Option<PathBuf>,
    /// Why the move did not succeed.
    pub error: Option<MoveError>,
}

impl MoveOutcome {
    pub fn is_success(&self) -> bool {
        self.status == MoveStatus::Renamed
    }
}

/// Values read from the descriptor once, so the lock is not held during I/O.
struct Plan {
    source: PathBuf,
    destination_root: PathBuf,
    filename: String,
    indexed: bool,
    size: u64,
}

pub struct MoveExecutor {
    descriptor: SharedDescriptor,
    settings: Arc<MoveSettings>,
    observer: Arc<dyn ProgressObserver>,
    cancel: CancelToken,
}

impl MoveExecutor {
    pub fn new(descriptor: SharedDescriptor, settings: Arc<MoveSettings>) -> Self {
        Self {
            descriptor,
            settings,
            observer: Arc::new(Silent),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Drive the descriptor to a terminal status.
    pub fn run(self) -> MoveOutcome {
        if self.cancel.is_cancelled() {
            let src = lock(&self.descriptor).source().to_path_buf();
            debug!(src = %src.display(), "discarding cancelled move before start");
            return self.conclude(Err(MoveError::Cancelled(src)));
        }

        let plan = {
            let mut d = lock(&self.descriptor);
            if !d.begin() {
                let status = d.status();
                debug!(src = %d.source().display(), %status, "descriptor not pending; skipping");
                return MoveOutcome {
                    status,
                    destination: None,
                    error: None,
                };
            }
            Plan {
                source: d.source().to_path_buf(),
                destination_root: d.destination_root().to_path_buf(),
                filename: d.effective_filename(),
                indexed: d.index().is_some(),
                size: d.size(),
            }
        };

        let result = self.execute(&plan);
        self.conclude(result)
    }

    fn execute(&self, plan: &Plan) -> Result<PathBuf, MoveError> {
        self.observer.initialize(plan.size);

        // 1. Canonical source; gone means NOT_FOUND with no side effects.
        let source = resolve_source(&plan.source)?;

        // 2-4. Destination directory: duplicates folder for indexed moves, created if needed.
        let dest_dir = self.destination_dir(plan);
        let dest_dir = prepare_dir(&dest_dir)?;
        let dest = dest_dir.join(&plan.filename);

        // 5. Never overwrite; the same file already there is a no-op success.
        if fs::symlink_metadata(&dest).is_ok() {
            if same_file(&source, &dest).unwrap_or(false) {
                info!(path = %dest.display(), "File already in place; nothing to do");
                self.observer.status("Already in place");
                return Ok(dest);
            }
            return Err(MoveError::DestinationConflict(dest));
        }

        // 6. Rename within a filesystem, copy across.
        let strategy = match same_filesystem(&source, &dest_dir) {
            Ok(true) => Strategy::Rename,
            Ok(false) => Strategy::CopyThenDelete,
            Err(e) => {
                debug!(error = %e, "filesystem comparison failed; trying rename");
                Strategy::Rename
            }
        };
        let used = transfer(&source, &dest, strategy, self.observer.as_ref(), &self.cancel)?;

        // 7. The file must be exactly where we meant to put it.
        verify_destination(&dest)?;

        info!(src = %source.display(), dest = %dest.display(), strategy = ?used, "Moved file");

        // 8. Timestamp.
        maybe_touch(&dest, self.settings.touch_on_success);

        // 9. Empty-directory cleanup of where the file came from.
        if self.settings.remove_empty_dirs {
            self.reap_source_parent(&source);
        }

        Ok(dest)
    }

    fn destination_dir(&self, plan: &Plan) -> PathBuf {
        match (&self.settings.duplicates_dir, plan.indexed && self.settings.move_enabled) {
            (Some(dup), true) => plan.destination_root.join(dup),
            _ => plan.destination_root.clone(),
        }
    }

    fn reap_source_parent(&self, source: &Path) {
        let (Some(root), Some(parent)) = (self.settings.reap_root.as_deref(), source.parent()) else {
            debug!("no reap root configured; leaving source directories");
            return;
        };
        let removed = DirectoryReaper::new(root).reap(parent);
        if removed > 0 {
            debug!(removed, from = %parent.display(), "removed emptied directories");
        }
    }

    /// 10. Record the terminal status and tell the observer, exactly once.
    fn conclude(&self, result: Result<PathBuf, MoveError>) -> MoveOutcome {
        let (status, destination, err) = match result {
            Ok(dest) => (MoveStatus::Renamed, Some(dest), None),
            Err(e @ MoveError::SourceVanished(_)) => (MoveStatus::NotFound, None, Some(e)),
            Err(e) => (MoveStatus::Failed, None, Some(e)),
        };

        let first = {
            let mut d = lock(&self.descriptor);
            let first = d.conclude(status);
            if first && let Some(dest) = &destination {
                d.set_source(dest.clone());
            }
            first
        };

        if let Some(e) = &err {
            let code = e.code();
            let kind = e.kind();
            match status {
                MoveStatus::NotFound => warn!(code, kind, error = %e, "Source not found"),
                _ => error!(code, kind, error = %e, "Move failed"),
            }
            self.observer.status(&e.to_string());
        }

        if first {
            self.observer.finish(status == MoveStatus::Renamed);
        } else {
            debug!(%status, "descriptor already concluded; late outcome ignored");
        }

        MoveOutcome {
            status,
            destination,
            error: err,
        }
    }
}

fn resolve_source(source: &Path) -> Result<PathBuf, MoveError> {
    match dunce::canonicalize(source) {
        Ok(p) => Ok(p),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            Err(MoveError::SourceVanished(source.to_path_buf()))
        }
        Err(e) => Err(MoveError::RenameFailed {
            src: source.to_path_buf(),
            dest: PathBuf::new(),
            context: describe_io("resolve source", source, &e),
        }),
    }
}

/// Create `dir` if needed, check it is writable, and return its real path.
fn prepare_dir(dir: &Path) -> Result<PathBuf, MoveError> {
    let unwritable = |op: &str, e: &io::Error| MoveError::DirectoryUnwritable {
        path: dir.to_path_buf(),
        context: describe_io(op, dir, e),
    };
    fs::create_dir_all(dir).map_err(|e| unwritable("create directory", &e))?;
    is_writable_probe(dir).map_err(|e| unwritable("write to directory", &e))?;
    dunce::canonicalize(dir).map_err(|e| unwritable("resolve directory", &e))
}

fn verify_destination(dest: &Path) -> Result<(), MoveError> {
    match dunce::canonicalize(dest) {
        Ok(actual) if actual == dest => Ok(()),
        Ok(actual) => Err(MoveError::PathMismatch {
            expected: dest.to_path_buf(),
            actual,
        }),
        Err(_) => Err(MoveError::PathMismatch {
            expected: dest.to_path_buf(),
            actual: PathBuf::from("<missing>"),
        }),
    }
}
