//! Post-move timestamp handling.

use filetime::{set_file_mtime, FileTime};
use std::path::Path;
use tracing::warn;

/// Stamp `dest` with the current time as its modification time when enabled.
/// Failure only logs; the move itself already succeeded.
pub(super) fn maybe_touch(dest: &Path, enabled: bool) {
    if !enabled {
        return;
    }
    if let Err(e) = set_file_mtime(dest, FileTime::now()) {
        warn!(dest = %dest.display(), error = %e, "Could not update modification time");
    }
}
