//! Windows implementations of platform helpers (best-effort).
//!
//! Notes:
//! - std exposes no stable file index on Windows, so identity falls back to
//!   comparing canonical paths.
//! - Filesystem identity is approximated by the volume prefix (drive or UNC share).

use std::fs::{File, OpenOptions};
use std::io;
use std::iter::once;
use std::os::windows::ffi::OsStrExt;
use std::path::{Component, Path};

/// Open log file for appending (no symlink defense available via std on Windows).
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

pub fn same_file(a: &Path, b: &Path) -> io::Result<bool> {
    Ok(dunce::canonicalize(a)? == dunce::canonicalize(b)?)
}

pub fn same_filesystem(a: &Path, b: &Path) -> io::Result<bool> {
    let pa = std::fs::canonicalize(a)?;
    let pb = std::fs::canonicalize(b)?;
    let prefix = |p: &Path| match p.components().next() {
        Some(Component::Prefix(pre)) => Some(pre.as_os_str().to_ascii_lowercase()),
        _ => None,
    };
    Ok(prefix(&pa) == prefix(&pb))
}

/// Rename without `MOVEFILE_REPLACE_EXISTING`, so an existing `dest` makes the
/// call fail with `AlreadyExists`.
pub fn rename_noreplace(src: &Path, dest: &Path) -> io::Result<()> {
    use windows_sys::Win32::Storage::FileSystem::{MoveFileExW, MOVEFILE_WRITE_THROUGH};
    let wide = |p: &Path| -> Vec<u16> { p.as_os_str().encode_wide().chain(once(0)).collect() };
    let (src_w, dest_w) = (wide(src), wide(dest));
    let ok = unsafe { MoveFileExW(src_w.as_ptr(), dest_w.as_ptr(), MOVEFILE_WRITE_THROUGH) };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

pub fn free_space_bytes(path: &Path) -> io::Result<u64> {
    use windows_sys::Win32::Storage::FileSystem::GetDiskFreeSpaceExW;
    let wide: Vec<u16> = path.as_os_str().encode_wide().chain(once(0)).collect();
    let mut free_avail: u64 = 0;
    let mut _total: u64 = 0;
    let mut _total_free: u64 = 0;
    let ok = unsafe {
        GetDiskFreeSpaceExW(
            wide.as_ptr(),
            &mut free_avail as *mut u64,
            &mut _total as *mut u64,
            &mut _total_free as *mut u64,
        )
    };
    if ok == 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(free_avail)
}
