//! Streaming copy with progress and cooperative cancellation.
//!
//! Features:
//! - Writes to a newly created destination file (O_EXCL semantics; never clobbers).
//! - Large (1 MiB) chunks; the progress callback fires after each chunk.
//! - The cancel token is checked between chunks; a cancelled copy stops with
//!   `ErrorKind::Interrupted`.
//! - The destination is fsynced before returning so the caller may delete the source.
//!
//! Snapshot semantics: the source is read once from start to EOF; bytes appended
//! concurrently after EOF are not included.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

use crate::progress::CancelToken;

const BUF_SIZE: usize = 1024 * 1024;

/// Why a copy stopped, and whether the destination file was created by us.
#[derive(Debug)]
pub(super) struct CopyError {
    pub error: io::Error,
    /// True once `dst` was opened; only then is there a partial artifact to remove.
    pub created: bool,
}

/// Copy `src` -> `dst`, reporting cumulative bytes through `on_progress`.
pub(super) fn copy_with_progress(
    src: &Path,
    dst: &Path,
    cancel: &CancelToken,
    on_progress: &mut dyn FnMut(u64),
) -> Result<u64, CopyError> {
    let not_created = |error| CopyError { error, created: false };
    let mut src_f = File::open(src).map_err(not_created)?;
    let dst_f = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dst)
        .map_err(not_created)?;

    copy_loop(&mut src_f, dst_f, cancel, on_progress)
        .map_err(|error| CopyError { error, created: true })
}

fn copy_loop(
    src: &mut File,
    dst: File,
    cancel: &CancelToken,
    on_progress: &mut dyn FnMut(u64),
) -> io::Result<u64> {
    let mut writer = io::BufWriter::with_capacity(BUF_SIZE, dst);
    let mut buf = vec![0u8; BUF_SIZE];
    let mut total: u64 = 0;
    loop {
        if cancel.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "copy cancelled"));
        }
        let n = match src.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
        on_progress(total);
    }
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(total)
}
