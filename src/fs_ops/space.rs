//! Free-space pre-check for cross-filesystem copies.

use std::io;
use std::path::Path;
use tracing::debug;

use crate::platform::free_space_bytes;

/// Headroom kept free on the destination beyond the file itself.
const CUSHION: u64 = 4 * 1024 * 1024;

pub(super) fn format_bytes(n: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let f = n as f64;
    if f >= GB {
        format!("{:.1} GiB", f / GB)
    } else if f >= MB {
        format!("{:.1} MiB", f / MB)
    } else if f >= KB {
        format!("{:.1} KiB", f / KB)
    } else {
        format!("{} B", n)
    }
}

/// Fail with `StorageFull` when `dst_dir` cannot take `required` bytes plus a cushion.
/// If free space cannot be queried the check is skipped.
pub(super) fn ensure_space_for_copy(dst_dir: &Path, required: u64) -> io::Result<()> {
    let free = match free_space_bytes(dst_dir) {
        Ok(f) => f,
        Err(e) => {
            debug!(dir = %dst_dir.display(), error = %e, "free-space query failed; skipping check");
            return Ok(());
        }
    };
    if free < required.saturating_add(CUSHION) {
        return Err(io::Error::new(
            io::ErrorKind::StorageFull,
            format!(
                "not enough free space in '{}': need ~{}, free {}",
                dst_dir.display(),
                format_bytes(required),
                format_bytes(free)
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn impossible_request_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = ensure_space_for_copy(dir.path(), u64::MAX - 1).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::StorageFull);
    }
}
