//! Unix implementations of platform helpers.

use std::ffi::CString;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{MetadataExt, OpenOptionsExt, PermissionsExt};
use std::path::Path;

/// Open log file for appending; set 0600 only when creating a new file.
/// If the file already exists, we preserve its existing permissions.
pub fn open_log_file_secure_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    let existed = path.exists();
    let f = OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o600) // applies on create
        .custom_flags(libc::O_NOFOLLOW)
        .open(path)?;
    if !existed {
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(f)
}

/// True when both paths name the same inode on the same device.
pub fn same_file(a: &Path, b: &Path) -> io::Result<bool> {
    let ma = fs::metadata(a)?;
    let mb = fs::metadata(b)?;
    Ok(ma.dev() == mb.dev() && ma.ino() == mb.ino())
}

/// True when both paths live on the same mounted filesystem (st_dev match).
pub fn same_filesystem(a: &Path, b: &Path) -> io::Result<bool> {
    Ok(fs::metadata(a)?.dev() == fs::metadata(b)?.dev())
}

/// Rename `src` to `dest`, failing with `AlreadyExists` instead of replacing
/// anything at `dest`.
///
/// Linux uses `renameat2(RENAME_NOREPLACE)`. Where that is unavailable (other
/// unixes, or filesystems rejecting the flag) a hard link plus unlink of the
/// source gives the same guarantee. A filesystem that supports neither reports
/// `Unsupported`.
pub fn rename_noreplace(src: &Path, dest: &Path) -> io::Result<()> {
    match renameat2_noreplace(src, dest) {
        Err(e) if matches!(e.raw_os_error(), Some(libc::EINVAL | libc::ENOSYS)) => {
            link_then_unlink(src, dest)
        }
        other => other,
    }
}

#[cfg(not(target_os = "linux"))]
fn renameat2_noreplace(_src: &Path, _dest: &Path) -> io::Result<()> {
    Err(io::Error::from_raw_os_error(libc::ENOSYS))
}

#[cfg(target_os = "linux")]
fn renameat2_noreplace(src: &Path, dest: &Path) -> io::Result<()> {
    let src_c = c_path(src)?;
    let dest_c = c_path(dest)?;
    // SAFETY: both pointers come from live CStrings; AT_FDCWD resolves relative paths
    // against the working directory.
    let rc = unsafe {
        libc::renameat2(
            libc::AT_FDCWD,
            src_c.as_ptr(),
            libc::AT_FDCWD,
            dest_c.as_ptr(),
            libc::RENAME_NOREPLACE,
        )
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(io::Error::last_os_error())
    }
}

fn link_then_unlink(src: &Path, dest: &Path) -> io::Result<()> {
    if let Err(e) = fs::hard_link(src, dest) {
        return match e.raw_os_error() {
            Some(code) if code == libc::EPERM || code == libc::ENOTSUP || code == libc::EOPNOTSUPP => {
                Err(io::Error::new(io::ErrorKind::Unsupported, e))
            }
            _ => Err(e),
        };
    }
    if let Err(e) = fs::remove_file(src) {
        // Never leave two names for one move.
        let _ = fs::remove_file(dest);
        return Err(e);
    }
    Ok(())
}

fn c_path(p: &Path) -> io::Result<CString> {
    CString::new(p.as_os_str().as_bytes())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "path contains NUL"))
}

/// Bytes available to unprivileged users on the filesystem holding `path`.
pub fn free_space_bytes(path: &Path) -> io::Result<u64> {
    let cpath = c_path(path)?;
    let mut s: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(cpath.as_ptr(), &mut s) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    #[allow(clippy::unnecessary_cast)]
    Ok((s.f_bavail as u64).saturating_mul(s.f_frsize as u64))
}
