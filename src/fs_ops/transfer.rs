//! The two ways a file gets to its destination.
//!
//! - Same filesystem: atomic rename that refuses to replace an existing file,
//!   then fsync of the destination directory.
//! - Different filesystems: streaming copy (fsynced), then delete the source.
//!
//! Either way the caller is left with exactly one of source/destination on success,
//! and with the untouched source on failure.

use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, error, info, warn};

use super::helpers::describe_io;
use super::io_copy::{copy_with_progress, CopyError};
use super::space::ensure_space_for_copy;
use super::util::{fsync_dir, is_cross_device};
use crate::errors::MoveError;
use crate::platform::rename_noreplace;
use crate::progress::{CancelToken, ProgressObserver};

/// How the bytes are moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Rename,
    CopyThenDelete,
}

/// Move `src` to `dest` using `strategy`. A rename that reports a cross-device
/// error (bind mounts, overlay filesystems) falls back to copy-then-delete.
pub fn transfer(
    src: &Path,
    dest: &Path,
    strategy: Strategy,
    observer: &dyn ProgressObserver,
    cancel: &CancelToken,
) -> Result<Strategy, MoveError> {
    match strategy {
        Strategy::CopyThenDelete => {
            copy_then_delete(src, dest, observer, cancel)?;
            Ok(Strategy::CopyThenDelete)
        }
        Strategy::Rename => match rename(src, dest, observer) {
            Err(RenameError::CrossDevice) => {
                debug!(src = %src.display(), "rename crossed devices; copying instead");
                copy_then_delete(src, dest, observer, cancel)?;
                Ok(Strategy::CopyThenDelete)
            }
            Err(RenameError::Failed(e)) => Err(e),
            Ok(()) => Ok(Strategy::Rename),
        },
    }
}

enum RenameError {
    /// The filesystem cannot do this rename; copying can.
    CrossDevice,
    Failed(MoveError),
}

/// Rename that never replaces an existing `dest`; whatever appeared there first wins.
fn rename(src: &Path, dest: &Path, observer: &dyn ProgressObserver) -> Result<(), RenameError> {
    observer.status("Renaming");
    if let Err(e) = rename_noreplace(src, dest) {
        if is_cross_device(&e) || e.kind() == io::ErrorKind::Unsupported {
            return Err(RenameError::CrossDevice);
        }
        if e.kind() == io::ErrorKind::AlreadyExists {
            return Err(RenameError::Failed(MoveError::DestinationConflict(dest.to_path_buf())));
        }
        return Err(RenameError::Failed(MoveError::RenameFailed {
            src: src.to_path_buf(),
            dest: dest.to_path_buf(),
            context: describe_io("rename", src, &e),
        }));
    }

    // Persist the directory entry; ignore errors so a done rename is not reported as failed.
    if let Some(parent) = dest.parent() {
        let _ = fsync_dir(parent);
    }
    Ok(())
}

/// Copy `src` to `dest` (never overwriting), then delete `src`.
///
/// - Copy failure: the partial destination is removed and the source is left intact.
/// - Source deletion failure: the fresh copy is removed again so source and
///   destination never both remain, and the move fails.
pub fn copy_then_delete(
    src: &Path,
    dest: &Path,
    observer: &dyn ProgressObserver,
    cancel: &CancelToken,
) -> Result<u64, MoveError> {
    observer.status("Copying");
    let copy_failed = |context: String| MoveError::CopyFailed {
        src: src.to_path_buf(),
        dest: dest.to_path_buf(),
        context,
    };

    let size = fs::metadata(src)
        .map_err(|e| copy_failed(describe_io("stat source", src, &e)))?
        .len();
    if let Some(dir) = dest.parent() {
        ensure_space_for_copy(dir, size).map_err(|e| copy_failed(e.to_string()))?;
    }

    let bytes = match copy_with_progress(src, dest, cancel, &mut |b| observer.progress(b)) {
        Ok(n) => n,
        Err(CopyError { error, created }) => {
            if created {
                match fs::remove_file(dest) {
                    Ok(()) => info!(dest = %dest.display(), "incomplete copy removed"),
                    Err(e) => {
                        warn!(dest = %dest.display(), error = %e, "incomplete copy left in place")
                    }
                }
            }
            if cancel.is_cancelled() {
                return Err(MoveError::Cancelled(src.to_path_buf()));
            }
            return Err(copy_failed(describe_io("copy to destination", dest, &error)));
        }
    };

    if let Err(e) = fs::remove_file(src) {
        let context = describe_io("remove source after copy", src, &e);
        if let Err(e2) = fs::remove_file(dest) {
            error!(
                src = %src.display(),
                dest = %dest.display(),
                error = %e2,
                "Source could not be deleted and the copy could not be removed; both remain"
            );
        }
        return Err(MoveError::CleanupFailed {
            path: src.to_path_buf(),
            context,
        });
    }

    debug!(src = %src.display(), dest = %dest.display(), bytes, "copied and removed source");
    Ok(bytes)
}
